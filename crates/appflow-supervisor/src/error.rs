use thiserror::Error;

#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("プロセス '{0}' が見つかりません\nヒント: appflow status で登録済みのプロセスキーを確認してください")]
    ProcessNotFound(String),

    #[error(
        "ポート {port} は既に別のプロセスに使用されています\n\nヒント:\n  • 占有しているプロセスを確認してください: lsof -i:{port}\n  • AppFlowの管理外で起動したプロセスは自動では停止されません"
    )]
    PortInUse { key: String, port: u16 },

    #[error("プロセス '{key}' は起動直後に終了しました\n--- captured stderr ---\n{stderr}")]
    Startup { key: String, stderr: String },

    #[error("プロセス '{key}' のgraceful停止がタイムアウトしました（{timeout_secs}秒、SIGKILLで強制終了）")]
    StopTimeout { key: String, timeout_secs: u64 },

    #[error("プロセス '{key}' は再起動上限（{limit}回）に達しています")]
    RestartLimitExceeded { key: String, limit: u32 },

    #[error("ヘルスプローブエラー: {0}")]
    HealthProbe(String),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SupervisorError>;
