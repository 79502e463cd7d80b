//! ヘルスチェックと自動再起動の統合テスト

mod common;

use appflow_core::{ProcessKey, ProcessStatus};
use appflow_supervisor::Supervisor;
use common::{app, fleet, free_port, spawn_http_responder};
use nix::sys::signal::{Signal, killpg};
use nix::unistd::Pid;
use std::time::Duration;
use tokio::time::sleep;

#[tokio::test]
async fn test_probe_healthy() {
    let (port, server) = spawn_http_responder(200).await;
    let fleet = fleet(vec![app("kb", "api", port, &["sleep", "30"])]);
    let supervisor = Supervisor::new(&fleet).unwrap();
    let key = ProcessKey::new("kb", "api");

    // ハンドルは無いがポートが応答する（管理外プロセスと同じ扱い）
    let detail = supervisor.health_checker().probe(&key).await.unwrap();
    assert_eq!(detail, "healthy");

    let snapshot = supervisor.status();
    let api = snapshot.find("kb.api").unwrap();
    assert_eq!(api.health_detail, "healthy");
    assert_eq!(api.status, ProcessStatus::Running);
    assert!(api.last_health_check.is_some());
    assert_eq!(snapshot.summary.healthy, 1);

    server.abort();
}

#[tokio::test]
async fn test_probe_non_200_is_unhealthy() {
    let (port, server) = spawn_http_responder(500).await;
    let fleet = fleet(vec![app("kb", "api", port, &["sleep", "30"])]);
    let supervisor = Supervisor::new(&fleet).unwrap();
    let key = ProcessKey::new("kb", "api");

    let detail = supervisor.health_checker().probe(&key).await.unwrap();
    assert_eq!(detail, "unhealthy (code 500)");

    let snapshot = supervisor.status();
    assert_eq!(
        snapshot.find("kb.api").unwrap().status,
        ProcessStatus::Unhealthy
    );

    // "unhealthy" は自動再起動の対象外。restart_countは増えない
    supervisor.health_checker().sweep_once(true).await;
    assert_eq!(supervisor.status().find("kb.api").unwrap().restart_count, 0);

    server.abort();
}

#[tokio::test]
async fn test_probe_dead_process_is_stopped() {
    let fleet = fleet(vec![app("kb", "api", free_port(), &["sleep", "30"])]);
    let supervisor = Supervisor::new(&fleet).unwrap();
    let key = ProcessKey::new("kb", "api");

    // ハンドルなし、ポートも空き → "stopped"
    let detail = supervisor.health_checker().probe(&key).await.unwrap();
    assert_eq!(detail, "stopped");
    assert_eq!(
        supervisor.status().find("kb.api").unwrap().status,
        ProcessStatus::Stopped
    );
}

#[tokio::test]
async fn test_probe_alive_without_endpoint_is_unreachable() {
    // プロセスは生きているがHTTPエンドポイントを持たない
    let fleet = fleet(vec![app("kb", "api", free_port(), &["sleep", "30"])]);
    let supervisor = Supervisor::new(&fleet).unwrap();
    let key = ProcessKey::new("kb", "api");

    supervisor.start_one(&key).await.unwrap();

    let detail = supervisor.health_checker().probe(&key).await.unwrap();
    assert!(detail.starts_with("unreachable"), "detail was: {}", detail);

    // "unreachable" も自動再起動の対象外
    supervisor.health_checker().sweep_once(true).await;
    assert_eq!(supervisor.status().find("kb.api").unwrap().restart_count, 0);

    supervisor.stop_one(&key).await.unwrap();
}

#[tokio::test]
async fn test_auto_restart_after_out_of_band_kill() {
    let fleet = fleet(vec![app("kb", "worker", free_port(), &["sleep", "30"])]);
    let supervisor = Supervisor::new(&fleet).unwrap();
    let key = ProcessKey::new("kb", "worker");

    supervisor.start_one(&key).await.unwrap();
    let first_pid = supervisor.status().find("kb.worker").unwrap().pid.unwrap();

    // 管理外でkillする
    killpg(Pid::from_raw(first_pid as i32), Signal::SIGKILL).unwrap();
    sleep(Duration::from_millis(100)).await;

    supervisor.health_checker().sweep_once(true).await;

    let snapshot = supervisor.status();
    let worker = snapshot.find("kb.worker").unwrap();
    assert_eq!(worker.restart_count, 1);
    assert!(worker.running);
    assert_ne!(worker.pid, Some(first_pid));

    supervisor.stop_one(&key).await.unwrap();
}

#[tokio::test]
async fn test_restart_limit_marks_failed_and_stops_storm() {
    let mut definition = app("kb", "worker", free_port(), &["sleep", "30"]);
    definition.max_restarts = 0;
    let fleet = fleet(vec![definition]);
    let supervisor = Supervisor::new(&fleet).unwrap();
    let key = ProcessKey::new("kb", "worker");

    supervisor.start_one(&key).await.unwrap();
    let pid = supervisor.status().find("kb.worker").unwrap().pid.unwrap();
    killpg(Pid::from_raw(pid as i32), Signal::SIGKILL).unwrap();
    sleep(Duration::from_millis(100)).await;

    // 1回目のスイープで上限到達 → Failed（終端状態）
    supervisor.health_checker().sweep_once(true).await;
    let snapshot = supervisor.status();
    let worker = snapshot.find("kb.worker").unwrap();
    assert_eq!(worker.status, ProcessStatus::Failed);
    assert_eq!(worker.restart_count, 0);

    // 以後のスイープでは再起動を試みない（restart storm防止）
    supervisor.health_checker().sweep_once(true).await;
    supervisor.health_checker().sweep_once(true).await;
    let snapshot = supervisor.status();
    let worker = snapshot.find("kb.worker").unwrap();
    assert_eq!(worker.status, ProcessStatus::Failed);
    assert_eq!(worker.restart_count, 0);
}

/// 2プロセス構成のシナリオ: start_allで両方起動し、片方を管理外で
/// killすると、スイープループが数周期以内に検知して復帰させる
#[tokio::test]
async fn test_start_all_with_sweep_loop_recovers_killed_process() {
    let fleet = fleet(vec![
        app("kb", "a", free_port(), &["sleep", "30"]),
        app("kb", "b", free_port(), &["sleep", "30"]),
    ]);
    let supervisor = Supervisor::new(&fleet).unwrap();

    let results = supervisor.start_all().await;
    assert_eq!(results.len(), 2);
    for (key, result) in &results {
        assert!(result.is_ok(), "start failed for {}", key);
    }
    assert_eq!(supervisor.status().summary.running, 2);

    let a_pid = supervisor.status().find("kb.a").unwrap().pid.unwrap();
    killpg(Pid::from_raw(a_pid as i32), Signal::SIGKILL).unwrap();

    // スイープ間隔1秒 + settle 150ms × 2 なので4秒あれば復帰しているはず
    let mut recovered = false;
    for _ in 0..40 {
        sleep(Duration::from_millis(100)).await;
        let snapshot = supervisor.status();
        let a = snapshot.find("kb.a").unwrap();
        if a.restart_count == 1 && a.running && a.pid != Some(a_pid) {
            recovered = true;
            break;
        }
    }
    assert!(recovered, "process a was not restarted by the sweep loop");

    // bは巻き込まれない
    let snapshot = supervisor.status();
    assert_eq!(snapshot.find("kb.b").unwrap().restart_count, 0);

    let results = supervisor.stop_all().await;
    for (key, result) in &results {
        assert!(result.is_ok(), "stop failed for {}", key);
    }
    assert_eq!(supervisor.status().summary.running, 0);
}
