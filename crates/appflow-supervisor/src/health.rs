//! ヘルスチェッカー
//!
//! レジストリ全体を定期的にスイープし、プロセスごとの生存確認と
//! HTTPヘルスエンドポイントのプローブを行います。停止を検知した場合、
//! ポリシーに応じてProcessController経由で自動再起動します。

use crate::controller::ProcessController;
use crate::error::{Result, SupervisorError};
use crate::port::is_port_in_use;
use crate::registry::ProcessRegistry;
use appflow_core::{LifecycleConfig, ProcessKey, ProcessStatus};
use chrono::Utc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// 停止フラグの確認間隔
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(250);

pub struct HealthChecker {
    registry: Arc<ProcessRegistry>,
    controller: Arc<ProcessController>,
    client: reqwest::Client,
    lifecycle: LifecycleConfig,
}

impl HealthChecker {
    pub fn new(
        registry: Arc<ProcessRegistry>,
        controller: Arc<ProcessController>,
        lifecycle: LifecycleConfig,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(lifecycle.probe_timeout_secs))
            .build()
            .map_err(|e| SupervisorError::HealthProbe(e.to_string()))?;
        Ok(Self {
            registry,
            controller,
            client,
            lifecycle,
        })
    }

    /// 1プロセスをプローブし、health_detailを更新して返す
    ///
    /// 生存判定は「管理ハンドルの生存 OR ポート占有」。生存している場合のみ
    /// HTTPヘルスエンドポイントへGETし、200なら "healthy"、それ以外の
    /// ステータスコードなら "unhealthy (code N)"、ネットワークエラーなら
    /// "unreachable (...)" を記録する。プローブ失敗はこの境界より外へ
    /// 伝播しない。
    pub async fn probe(&self, key: &ProcessKey) -> Result<String> {
        let definition = self.registry.definition(key)?;
        let now = Utc::now();

        let handle_alive = self.registry.alive(key);
        let port_timeout = Duration::from_millis(self.lifecycle.port_probe_timeout_ms);
        let port_open = is_port_in_use(definition.port, port_timeout).await;

        if !handle_alive && !port_open {
            self.registry.mutate(key, |s| {
                s.last_health_check = Some(now);
                s.health_detail = "stopped".to_string();
                s.pid = None;
                // Failedは終端状態なので上書きしない
                if s.status != ProcessStatus::Failed {
                    s.status = ProcessStatus::Stopped;
                }
            })?;
            return Ok("stopped".to_string());
        }

        let detail = match self.client.get(definition.health_url()).send().await {
            Ok(resp) if resp.status().as_u16() == 200 => "healthy".to_string(),
            Ok(resp) => format!("unhealthy (code {})", resp.status().as_u16()),
            Err(e) => format!("unreachable ({})", probe_error_reason(&e)),
        };
        debug!(app = %key, detail = %detail, "Health probe");

        let healthy = detail == "healthy";
        self.registry.mutate(key, |s| {
            s.last_health_check = Some(now);
            s.health_detail = detail.clone();
            if s.status != ProcessStatus::Failed {
                s.status = if healthy {
                    ProcessStatus::Running
                } else {
                    ProcessStatus::Unhealthy
                };
            }
        })?;
        Ok(detail)
    }

    /// 全キーを順番にプローブする1回分のスイープ
    ///
    /// 自動再起動はhealth_detailが正確に "stopped" の場合のみ。
    /// "unhealthy" / "unreachable" では再起動しない。再起動の失敗
    /// （上限到達を含む）はログに残してスイープを継続する。
    pub async fn sweep_once(&self, auto_restart: bool) {
        for key in self.registry.list_keys() {
            let detail = match self.probe(&key).await {
                Ok(detail) => detail,
                Err(e) => {
                    warn!(app = %key, error = %e, "Health probe failed");
                    continue;
                }
            };

            if !auto_restart || detail != "stopped" {
                continue;
            }

            // 終端状態のキーは自動再起動の対象外
            match self.registry.get(&key) {
                Ok((_, state)) if state.status == ProcessStatus::Failed => continue,
                Ok(_) => {}
                Err(_) => continue,
            }

            info!(app = %key, "Process stopped. Attempting automatic restart");
            match self.controller.restart(&key).await {
                Ok(()) => info!(app = %key, "Automatic restart succeeded"),
                Err(e @ SupervisorError::RestartLimitExceeded { .. }) => {
                    warn!(app = %key, "{}", e);
                    // 以後のスイープで再試行しないよう終端状態にする
                    let _ = self
                        .registry
                        .mutate(&key, |s| s.status = ProcessStatus::Failed);
                }
                Err(e) => warn!(app = %key, error = %e, "Automatic restart failed"),
            }
        }
    }

    /// 停止フラグが立つまでスイープを繰り返す
    ///
    /// interval_secsはスイープ完了後の待機時間。プロセス数 × プローブ
    /// タイムアウトがスイープ1回の最悪所要時間になる。
    pub async fn run_loop(&self, interval_secs: u64, auto_restart: bool, stop: Arc<AtomicBool>) {
        info!(interval_secs, auto_restart, "Health check loop started");
        'sweep: while !stop.load(Ordering::Relaxed) {
            self.sweep_once(auto_restart).await;

            // 停止フラグはサブ秒間隔で確認しつつinterval分待つ
            let wait = Duration::from_secs(interval_secs);
            let start = Instant::now();
            while start.elapsed() < wait {
                if stop.load(Ordering::Relaxed) {
                    break 'sweep;
                }
                tokio::time::sleep(STOP_POLL_INTERVAL).await;
            }
        }
        info!("Health check loop stopped");
    }
}

fn probe_error_reason(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        "timeout".to_string()
    } else if err.is_connect() {
        "connection refused".to_string()
    } else {
        err.to_string()
    }
}
