//! ステータススナップショット

use appflow_core::{AppDefinition, ProcessKey, ProcessRuntimeState, ProcessStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// フリート全体のスナップショット
///
/// タイムスタンプ、グループ別のプロセス状態、および集計を含む。
/// 個々のプロセスが不健全でもスナップショット生成は失敗しない。
#[derive(Debug, Clone, Serialize)]
pub struct FleetSnapshot {
    pub timestamp: DateTime<Utc>,
    /// グループキー（既定では組織ID） → プロセス状態一覧
    pub groups: BTreeMap<String, Vec<AppSnapshot>>,
    pub summary: FleetSummary,
}

/// プロセス1つ分のスナップショット
#[derive(Debug, Clone, Serialize)]
pub struct AppSnapshot {
    pub key: String,
    pub name: String,
    pub port: u16,
    pub lifecycle: String,
    pub auth: String,
    pub description: String,
    pub status: ProcessStatus,
    pub running: bool,
    pub health_detail: String,
    pub last_health_check: Option<DateTime<Utc>>,
    pub last_restart: Option<DateTime<Utc>>,
    pub restart_count: u32,
    pub pid: Option<u32>,
}

/// 集計ブロック
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct FleetSummary {
    pub total: usize,
    pub running: usize,
    pub healthy: usize,
    pub stopped: usize,
}

impl FleetSnapshot {
    /// レジストリのスナップショットからグルーピングして構築する
    pub fn build<F>(
        rows: Vec<(ProcessKey, AppDefinition, ProcessRuntimeState)>,
        group_fn: F,
    ) -> Self
    where
        F: Fn(&AppDefinition) -> String,
    {
        let mut groups: BTreeMap<String, Vec<AppSnapshot>> = BTreeMap::new();
        let mut summary = FleetSummary::default();

        for (key, definition, state) in rows {
            let running = matches!(
                state.status,
                ProcessStatus::Starting | ProcessStatus::Running | ProcessStatus::Unhealthy
            );

            summary.total += 1;
            if running {
                summary.running += 1;
            } else {
                summary.stopped += 1;
            }
            if state.health_detail == "healthy" {
                summary.healthy += 1;
            }

            groups
                .entry(group_fn(&definition))
                .or_default()
                .push(AppSnapshot {
                    key: key.to_string(),
                    name: definition.name,
                    port: definition.port,
                    lifecycle: definition.lifecycle,
                    auth: definition.auth,
                    description: definition.description,
                    status: state.status,
                    running,
                    health_detail: state.health_detail,
                    last_health_check: state.last_health_check,
                    last_restart: state.last_restart,
                    restart_count: state.restart_count,
                    pid: state.pid,
                });
        }

        Self {
            timestamp: Utc::now(),
            groups,
            summary,
        }
    }

    /// キーでプロセススナップショットを引く（テスト・CLI用）
    pub fn find(&self, key: &str) -> Option<&AppSnapshot> {
        self.groups.values().flatten().find(|app| app.key == key)
    }
}
