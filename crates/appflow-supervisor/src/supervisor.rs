//! スーパーバイザ（ファサード）
//!
//! ProcessRegistry / ProcessController / HealthCheckerを合成し、
//! 一括操作とバックグラウンドのスイープループの寿命を管理します。

use crate::controller::ProcessController;
use crate::error::Result;
use crate::health::HealthChecker;
use crate::registry::ProcessRegistry;
use crate::status::FleetSnapshot;
use appflow_core::{AppDefinition, Fleet, GlobalSettings, ProcessKey};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub struct Supervisor {
    registry: Arc<ProcessRegistry>,
    controller: Arc<ProcessController>,
    checker: Arc<HealthChecker>,
    settings: GlobalSettings,
    /// スイープループへの協調停止フラグ
    stop_flag: Arc<AtomicBool>,
    loop_handle: Mutex<Option<JoinHandle<()>>>,
}

impl Supervisor {
    /// Fleet定義からスーパーバイザを構築する
    pub fn new(fleet: &Fleet) -> Result<Self> {
        let registry = Arc::new(ProcessRegistry::load(fleet.definitions())?);
        let controller = Arc::new(ProcessController::new(
            registry.clone(),
            fleet.settings.lifecycle.clone(),
        ));
        let checker = Arc::new(HealthChecker::new(
            registry.clone(),
            controller.clone(),
            fleet.settings.lifecycle.clone(),
        )?);

        Ok(Self {
            registry,
            controller,
            checker,
            settings: fleet.settings.clone(),
            stop_flag: Arc::new(AtomicBool::new(false)),
            loop_handle: Mutex::new(None),
        })
    }

    pub fn registry(&self) -> &Arc<ProcessRegistry> {
        &self.registry
    }

    pub fn controller(&self) -> &Arc<ProcessController> {
        &self.controller
    }

    pub fn health_checker(&self) -> &Arc<HealthChecker> {
        &self.checker
    }

    /// 全プロセスを起動し、スイープループを開始する
    ///
    /// 個々の起動失敗は許容し、キーごとの結果として返す（部分成功）。
    /// 冪等：既に起動済みのプロセスは成功扱い、ループも二重には起動しない。
    pub async fn start_all(&self) -> Vec<(ProcessKey, Result<()>)> {
        let mut results = Vec::new();
        for key in self.registry.list_keys() {
            let result = self.controller.start(&key).await;
            if let Err(e) = &result {
                warn!(app = %key, error = %e, "Failed to start process");
            }
            results.push((key, result));
        }

        self.spawn_health_loop();
        results
    }

    /// スイープループをバックグラウンドタスクとして起動する（冪等）
    pub fn spawn_health_loop(&self) {
        let mut handle = self
            .loop_handle
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        if let Some(h) = handle.as_ref()
            && !h.is_finished()
        {
            return;
        }

        self.stop_flag.store(false, Ordering::Relaxed);
        let checker = self.checker.clone();
        let stop_flag = self.stop_flag.clone();
        let interval = self.settings.health_check_interval;
        let auto_restart = self.settings.auto_restart;

        *handle = Some(tokio::spawn(async move {
            checker.run_loop(interval, auto_restart, stop_flag).await;
        }));
    }

    /// スイープループを止めてから全プロセスを停止する
    ///
    /// ループの停止は協調的（ベストエフォート）。joinがタイムアウトしても
    /// シャットダウンは続行する。個々の停止失敗も許容し、キーごとの
    /// 結果として返す。
    pub async fn stop_all(&self) -> Vec<(ProcessKey, Result<()>)> {
        self.stop_flag.store(true, Ordering::Relaxed);
        let handle = self
            .loop_handle
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = handle {
            let join_timeout = Duration::from_secs(self.settings.lifecycle.loop_join_timeout_secs);
            match tokio::time::timeout(join_timeout, handle).await {
                Ok(_) => info!("Health check loop joined"),
                Err(_) => {
                    warn!("Health check loop did not stop within timeout; continuing shutdown")
                }
            }
        }

        let mut results = Vec::new();
        for key in self.registry.list_keys() {
            let result = self.controller.stop(&key).await;
            if let Err(e) = &result {
                warn!(app = %key, error = %e, "Failed to stop process");
            }
            results.push((key, result));
        }
        results
    }

    /// 単一プロセスの起動（ループとは独立に使用可能）
    pub async fn start_one(&self, key: &ProcessKey) -> Result<()> {
        self.controller.start(key).await
    }

    /// 単一プロセスの停止
    pub async fn stop_one(&self, key: &ProcessKey) -> Result<()> {
        self.controller.stop(key).await
    }

    /// 単一プロセスの再起動
    pub async fn restart_one(&self, key: &ProcessKey) -> Result<()> {
        self.controller.restart(key).await
    }

    /// 組織IDでグルーピングしたスナップショットを返す
    pub fn status(&self) -> FleetSnapshot {
        self.status_by(|definition| definition.organization.clone())
    }

    /// 任意のグルーピング関数でスナップショットを返す
    ///
    /// 個々のプロセスの状態がどうであれ失敗しない。
    pub fn status_by<F>(&self, group_fn: F) -> FleetSnapshot
    where
        F: Fn(&AppDefinition) -> String,
    {
        FleetSnapshot::build(self.registry.snapshot(), group_fn)
    }
}
