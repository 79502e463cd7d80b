//! アプリ定義

use super::key::ProcessKey;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// アプリ定義
///
/// 設定ファイルからロードされる不変の定義。port / workdir / command は
/// 必須フィールドで、ロード時に検証済みであることが保証されます。
///
/// KDL形式：
/// ```kdl
/// app "api" port=8001 name="Chronista API" {
///     workdir "/srv/chronista/api"
///     command "uvicorn" "main:app" "--port" "8001"
///     env {
///         DATABASE_URL "postgres://localhost/chronista"
///     }
///     health_path "/health"
///     max_restarts 3
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppDefinition {
    /// 所属組織ID
    pub organization: String,
    /// アプリID（組織内で一意）
    pub id: String,
    /// 表示名（未指定の場合はアプリID）
    pub name: String,
    /// リッスンポート
    pub port: u16,
    /// 作業ディレクトリ
    pub workdir: PathBuf,
    /// 起動コマンド（argv形式）
    pub command: Vec<String>,
    /// 環境変数オーバーライド（継承環境の上に適用）
    #[serde(default)]
    pub environment: HashMap<String, String>,
    /// ヘルスチェックパス（相対HTTPパス）
    pub health_path: String,
    /// 自動再起動の上限回数
    pub max_restarts: u32,
    /// 認証レベルラベル
    pub auth: String,
    /// ライフサイクルステータスラベル (active, beta, deprecated など)
    pub lifecycle: String,
    /// 説明文
    pub description: String,
    /// エントリポイント（情報表示用）
    pub entrypoint: Option<String>,
}

impl AppDefinition {
    /// このアプリのプロセスキー
    pub fn key(&self) -> ProcessKey {
        ProcessKey::new(self.organization.clone(), self.id.clone())
    }

    /// ヘルスチェックのURL
    pub fn health_url(&self) -> String {
        let path = if self.health_path.starts_with('/') {
            self.health_path.clone()
        } else {
            format!("/{}", self.health_path)
        };
        format!("http://127.0.0.1:{}{}", self.port, path)
    }
}

pub fn default_health_path() -> String {
    "/".to_string()
}

pub fn default_max_restarts() -> u32 {
    3
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition() -> AppDefinition {
        AppDefinition {
            organization: "kb".to_string(),
            id: "tracker".to_string(),
            name: "tracker".to_string(),
            port: 9001,
            workdir: PathBuf::from("/tmp"),
            command: vec!["sleep".to_string(), "30".to_string()],
            environment: HashMap::new(),
            health_path: default_health_path(),
            max_restarts: default_max_restarts(),
            auth: "none".to_string(),
            lifecycle: "active".to_string(),
            description: String::new(),
            entrypoint: None,
        }
    }

    #[test]
    fn test_health_url() {
        let mut def = definition();
        assert_eq!(def.health_url(), "http://127.0.0.1:9001/");

        def.health_path = "health".to_string();
        assert_eq!(def.health_url(), "http://127.0.0.1:9001/health");

        def.health_path = "/api/health".to_string();
        assert_eq!(def.health_url(), "http://127.0.0.1:9001/api/health");
    }

    #[test]
    fn test_key() {
        assert_eq!(definition().key().to_string(), "kb.tracker");
    }
}
