//! ポートプローブ

use std::time::Duration;
use tokio::net::TcpStream;
use tracing::trace;

/// 指定されたポートがlocalhostでリッスン中かどうかを判定する
///
/// 短いタイムアウト付きでTCP接続を試み、成功すれば何かがリッスン中。
/// 副作用はありません。管理外プロセスによる占有もここで検出されるため、
/// 生存判定は「管理ハンドルの生存 OR ポート占有」になります。
pub async fn is_port_in_use(port: u16, timeout: Duration) -> bool {
    match tokio::time::timeout(timeout, TcpStream::connect(("127.0.0.1", port))).await {
        Ok(Ok(_)) => true,
        Ok(Err(e)) => {
            trace!(port, error = %e, "Port probe: connect failed");
            false
        }
        Err(_) => {
            trace!(port, "Port probe: connect timed out");
            false
        }
    }
}
