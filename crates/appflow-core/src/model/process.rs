//! プロセス実行時状態

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// プロセス状態
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProcessStatus {
    /// 停止済み
    Stopped,
    /// 起動中
    Starting,
    /// 実行中
    Running,
    /// ヘルスチェック失敗
    Unhealthy,
    /// 停止処理中
    Stopping,
    /// 再起動上限到達（終端状態）
    Failed,
}

impl ProcessStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Unhealthy => "unhealthy",
            Self::Stopping => "stopping",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// プロセス実行時状態
///
/// 定義1つにつき1エントリ。ProcessController（start/stop）と
/// HealthChecker（probe/自動再起動）だけが書き換えます。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessRuntimeState {
    /// OSプロセスID（実行中のみ）
    pub pid: Option<u32>,
    /// プロセス状態
    pub status: ProcessStatus,
    /// 最終ヘルスチェック時刻
    pub last_health_check: Option<DateTime<Utc>>,
    /// 最終再起動成功時刻
    pub last_restart: Option<DateTime<Utc>>,
    /// 再起動回数（単調増加、max_restartsを超えない）
    pub restart_count: u32,
    /// ヘルス詳細（"healthy", "unhealthy (code N)", "unreachable (...)", "stopped"）
    pub health_detail: String,
}

impl Default for ProcessRuntimeState {
    fn default() -> Self {
        Self {
            pid: None,
            status: ProcessStatus::Stopped,
            last_health_check: None,
            last_restart: None,
            restart_count: 0,
            health_detail: String::new(),
        }
    }
}
