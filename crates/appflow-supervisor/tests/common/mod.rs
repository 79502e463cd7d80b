//! 統合テスト用ヘルパー

use appflow_core::{
    AppDefinition, Fleet, GlobalSettings, LifecycleConfig, Organization,
};
use std::collections::{BTreeMap, HashMap};
use std::net::TcpListener;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// テスト用に短縮したタイミング設定
pub fn fast_lifecycle() -> LifecycleConfig {
    LifecycleConfig {
        settle_ms: 150,
        stop_timeout_secs: 2,
        stop_poll_ms: 50,
        probe_timeout_secs: 2,
        port_probe_timeout_ms: 200,
        loop_join_timeout_secs: 2,
    }
}

/// 空きポートを確保する
pub fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

/// テスト用アプリ定義
pub fn app(org: &str, id: &str, port: u16, command: &[&str]) -> AppDefinition {
    AppDefinition {
        organization: org.to_string(),
        id: id.to_string(),
        name: id.to_string(),
        port,
        workdir: std::env::temp_dir(),
        command: command.iter().map(|s| s.to_string()).collect(),
        environment: HashMap::new(),
        health_path: "/".to_string(),
        max_restarts: 3,
        auth: "none".to_string(),
        lifecycle: "active".to_string(),
        description: String::new(),
        entrypoint: None,
    }
}

/// テスト用Fleet（スイープ間隔1秒、短縮タイミング）
pub fn fleet(apps: Vec<AppDefinition>) -> Fleet {
    let mut organizations: BTreeMap<String, Organization> = BTreeMap::new();
    for definition in apps {
        let org = organizations
            .entry(definition.organization.clone())
            .or_insert_with(|| Organization {
                id: definition.organization.clone(),
                apps: BTreeMap::new(),
            });
        org.apps.insert(definition.id.clone(), definition);
    }

    Fleet {
        name: "test".to_string(),
        organizations,
        settings: GlobalSettings {
            health_check_interval: 1,
            auto_restart: true,
            lifecycle: fast_lifecycle(),
        },
    }
}

/// 固定ステータスコードを返すHTTPレスポンダを起動する
///
/// probeテスト用。戻り値はリッスンポートとサーバタスクのハンドル。
#[allow(dead_code)]
pub async fn spawn_http_responder(status: u16) -> (u16, tokio::task::JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let reason = match status {
                    200 => "OK",
                    500 => "Internal Server Error",
                    503 => "Service Unavailable",
                    _ => "Status",
                };
                let response = format!(
                    "HTTP/1.1 {} {}\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok",
                    status, reason
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (port, handle)
}
