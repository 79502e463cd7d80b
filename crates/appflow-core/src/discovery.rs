//! 設定ファイルの自動発見
//!
//! 規約ベースで apps.kdl を探索します。

use crate::error::{ConfigError, Result};
use std::path::PathBuf;
use tracing::{debug, info};

const CANDIDATES: [&str; 2] = ["apps.kdl", ".apps.kdl"];

/// 設定ファイルを検出
///
/// 以下の優先順位で検索:
/// 1. 環境変数 APPFLOW_CONFIG_PATH (直接パス指定)
/// 2. カレントディレクトリから上に向かって apps.kdl / .apps.kdl を探す
/// 3. ~/.config/appflow/apps.kdl (グローバル設定)
pub fn find_config_file() -> Result<PathBuf> {
    // 1. 環境変数で直接指定
    if let Ok(config_path) = std::env::var("APPFLOW_CONFIG_PATH") {
        let path = PathBuf::from(&config_path);
        debug!(env_path = %config_path, "Checking APPFLOW_CONFIG_PATH");
        if path.exists() {
            return Ok(path);
        }
    }

    // 2. カレントディレクトリから上に向かって探す
    let start_dir = std::env::current_dir()?;
    let mut current = start_dir.clone();
    debug!(start_dir = %start_dir.display(), "Searching for config file");

    loop {
        for filename in &CANDIDATES {
            let path = current.join(filename);
            if path.exists() {
                info!(config = %path.display(), "Found config file");
                return Ok(path);
            }
        }

        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => break,
        }
    }

    // 3. グローバル設定ファイル (~/.config/appflow/apps.kdl)
    if let Some(config_dir) = dirs::config_dir() {
        let global_config = config_dir.join("appflow").join("apps.kdl");
        if global_config.exists() {
            info!(config = %global_config.display(), "Found global config file");
            return Ok(global_config);
        }
    }

    // どの設定ファイルも見つからなかった
    Err(ConfigError::ConfigFileNotFound(start_dir))
}
