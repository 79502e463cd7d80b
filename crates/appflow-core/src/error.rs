use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("KDLパースエラー: {0}")]
    KdlParse(#[from] kdl::KdlError),

    #[error("ファイル読み込みエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("無効な設定: {0}")]
    InvalidConfig(String),

    #[error("アプリ '{app}' に必須フィールド '{field}' が指定されていません")]
    MissingField { app: String, field: String },

    #[error(
        "無効なプロセスキー: '{0}'\nヒント: organization.app の形式で指定してください（例: chronista.api）"
    )]
    InvalidKey(String),

    #[error(
        "設定ファイルが見つかりません\n探索開始位置: {0}\nヒント: apps.kdl ファイルを含むディレクトリで実行するか、APPFLOW_CONFIG_PATH を設定してください"
    )]
    ConfigFileNotFound(PathBuf),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
