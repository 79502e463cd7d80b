//! グローバル設定

use serde::{Deserialize, Serialize};

/// グローバル設定
///
/// KDL形式：
/// ```kdl
/// settings {
///     health_check_interval 30
///     auto_restart #true
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalSettings {
    /// ヘルスチェックのスイープ間隔（秒）
    #[serde(default = "default_health_check_interval")]
    pub health_check_interval: u64,
    /// 停止検知時の自動再起動を有効化
    #[serde(default = "default_auto_restart")]
    pub auto_restart: bool,
    /// ライフサイクル操作のタイミング設定
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
}

fn default_health_check_interval() -> u64 {
    30
}

fn default_auto_restart() -> bool {
    true
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            health_check_interval: default_health_check_interval(),
            auto_restart: default_auto_restart(),
            lifecycle: LifecycleConfig::default(),
        }
    }
}

/// ライフサイクル操作のタイミング設定
///
/// デフォルト値が運用上の既定の挙動。テストでは短縮した値を使います。
///
/// KDL形式：
/// ```kdl
/// lifecycle settle_ms=2000 stop_timeout_secs=10 probe_timeout_secs=5
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleConfig {
    /// spawn後・stop後に安定を待つ時間（ミリ秒）
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    /// graceful停止の待機上限（秒）
    #[serde(default = "default_stop_timeout")]
    pub stop_timeout_secs: u64,
    /// 停止待機中のポーリング間隔（ミリ秒）
    #[serde(default = "default_stop_poll_ms")]
    pub stop_poll_ms: u64,
    /// HTTPヘルスプローブのタイムアウト（秒）
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,
    /// TCPポートプローブのタイムアウト（ミリ秒）
    #[serde(default = "default_port_probe_timeout_ms")]
    pub port_probe_timeout_ms: u64,
    /// スイープループのjoin待機上限（秒）
    #[serde(default = "default_loop_join_timeout")]
    pub loop_join_timeout_secs: u64,
}

fn default_settle_ms() -> u64 {
    2000 // 2秒
}

fn default_stop_timeout() -> u64 {
    10
}

fn default_stop_poll_ms() -> u64 {
    1000 // 1秒
}

fn default_probe_timeout() -> u64 {
    5
}

fn default_port_probe_timeout_ms() -> u64 {
    500
}

fn default_loop_join_timeout() -> u64 {
    5
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            settle_ms: default_settle_ms(),
            stop_timeout_secs: default_stop_timeout(),
            stop_poll_ms: default_stop_poll_ms(),
            probe_timeout_secs: default_probe_timeout(),
            port_probe_timeout_ms: default_port_probe_timeout_ms(),
            loop_join_timeout_secs: default_loop_join_timeout(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = GlobalSettings::default();
        assert_eq!(settings.health_check_interval, 30);
        assert!(settings.auto_restart);
        assert_eq!(settings.lifecycle.settle_ms, 2000);
        assert_eq!(settings.lifecycle.stop_timeout_secs, 10);
        assert_eq!(settings.lifecycle.probe_timeout_secs, 5);
    }
}
