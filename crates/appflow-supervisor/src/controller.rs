//! プロセスコントローラ
//!
//! 単一プロセスの start / stop / restart を実行します。起動時は
//! ポートの二重bindを避けるためにPortProbeで占有を確認し、停止時は
//! プロセスグループ全体にシグナルを送って孤児プロセスを防ぎます。

use crate::error::{Result, SupervisorError};
use crate::port::is_port_in_use;
use crate::registry::ProcessRegistry;
use appflow_core::{LifecycleConfig, ProcessKey, ProcessStatus};
use chrono::Utc;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::collections::VecDeque;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// 起動診断用に保持するstderrの行数
const STDERR_TAIL_LINES: usize = 50;

type StderrTail = Arc<Mutex<VecDeque<String>>>;

pub struct ProcessController {
    registry: Arc<ProcessRegistry>,
    lifecycle: LifecycleConfig,
}

impl ProcessController {
    pub fn new(registry: Arc<ProcessRegistry>, lifecycle: LifecycleConfig) -> Self {
        Self {
            registry,
            lifecycle,
        }
    }

    /// プロセスを起動する
    ///
    /// 既に管理ハンドルが生存している場合は冪等に成功扱い。
    pub async fn start(&self, key: &ProcessKey) -> Result<()> {
        let lock = self.registry.op_lock(key)?;
        let _guard = lock.lock().await;
        self.start_locked(key).await
    }

    /// プロセスを停止する
    ///
    /// SIGTERM → ポーリング待機 → SIGKILL の順にエスカレーションする。
    /// 強制終了に至ってもstop操作自体は成功扱い（警告ログのみ）。
    pub async fn stop(&self, key: &ProcessKey) -> Result<()> {
        let lock = self.registry.op_lock(key)?;
        let _guard = lock.lock().await;
        self.stop_locked(key).await
    }

    /// プロセスを再起動する
    ///
    /// restart_countが上限に達している場合はRestartLimitExceededで
    /// 失敗し、状態は一切変更しない。
    pub async fn restart(&self, key: &ProcessKey) -> Result<()> {
        let lock = self.registry.op_lock(key)?;
        let _guard = lock.lock().await;

        let definition = self.registry.definition(key)?;
        let (_, state) = self.registry.get(key)?;
        if state.restart_count >= definition.max_restarts {
            return Err(SupervisorError::RestartLimitExceeded {
                key: key.to_string(),
                limit: definition.max_restarts,
            });
        }

        self.registry.mutate(key, |s| s.restart_count += 1)?;

        self.stop_locked(key).await?;
        sleep(Duration::from_millis(self.lifecycle.settle_ms)).await;
        self.start_locked(key).await?;

        self.registry
            .mutate(key, |s| s.last_restart = Some(Utc::now()))?;
        info!(app = %key, "Restart completed");
        Ok(())
    }

    /// start本体（呼び出し側が操作ロックを保持していること）
    pub(crate) async fn start_locked(&self, key: &ProcessKey) -> Result<()> {
        let definition = self.registry.definition(key)?;

        // 既に起動済みなら何もしない（冪等成功、エラーではない）
        if self.registry.alive(key) {
            info!(app = %key, "Already running");
            return Ok(());
        }

        // 管理ハンドルが死んでいるのにポートが埋まっている場合、
        // 占有者は管理外プロセス。二重bindを避けて起動を拒否する
        let port_timeout = Duration::from_millis(self.lifecycle.port_probe_timeout_ms);
        if is_port_in_use(definition.port, port_timeout).await {
            return Err(SupervisorError::PortInUse {
                key: key.to_string(),
                port: definition.port,
            });
        }

        if !definition.workdir.is_dir() {
            return Err(SupervisorError::Config(format!(
                "プロセス '{}' の作業ディレクトリが存在しません: {}",
                key,
                definition.workdir.display()
            )));
        }

        let Some(program) = definition.command.first() else {
            return Err(SupervisorError::Config(format!(
                "プロセス '{}' の起動コマンドが空です",
                key
            )));
        };
        let mut cmd = Command::new(program);
        cmd.args(&definition.command[1..])
            .current_dir(&definition.workdir)
            .envs(&definition.environment)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // 新しいプロセスグループのリーダーとして起動する。
        // pid == pgidになるため、停止時にグループ全体へシグナルを送れる
        #[cfg(unix)]
        unsafe {
            cmd.pre_exec(|| {
                if libc::setsid() == -1 {
                    return Err(std::io::Error::last_os_error());
                }
                Ok(())
            });
        }

        self.registry.mutate(key, |s| {
            s.status = ProcessStatus::Starting;
            s.health_detail = "starting".to_string();
        })?;

        info!(app = %key, command = %definition.command.join(" "), "Spawning process");
        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                self.registry.mutate(key, |s| {
                    s.status = ProcessStatus::Stopped;
                    s.health_detail = "stopped".to_string();
                })?;
                return Err(SupervisorError::Startup {
                    key: key.to_string(),
                    stderr: format!("spawn failed: {}", e),
                });
            }
        };

        let pid = child.id();

        // stdout/stderrをドレインしてOSバッファ詰まりを防ぐ。
        // stderrの直近行は起動失敗の診断用に保持する
        let stderr_tail: StderrTail = Arc::new(Mutex::new(VecDeque::new()));
        if let Some(stdout) = child.stdout.take() {
            spawn_output_drain(key.clone(), "stdout", stdout, None);
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_output_drain(key.clone(), "stderr", stderr, Some(stderr_tail.clone()));
        }

        self.registry.put_child(key, child)?;

        // 安定待ちの後に一度だけ生存確認
        sleep(Duration::from_millis(self.lifecycle.settle_ms)).await;

        if !self.registry.alive(key) {
            let _ = self.registry.take_child(key);
            self.registry.mutate(key, |s| {
                s.pid = None;
                s.status = ProcessStatus::Stopped;
                s.health_detail = "stopped".to_string();
            })?;

            // ドレインタスクがEOFまで読み切るのを待ってから回収
            sleep(Duration::from_millis(100)).await;
            let stderr = {
                let tail = stderr_tail.lock().unwrap_or_else(|e| e.into_inner());
                tail.iter().cloned().collect::<Vec<_>>().join("\n")
            };
            return Err(SupervisorError::Startup {
                key: key.to_string(),
                stderr,
            });
        }

        self.registry.mutate(key, |s| {
            s.pid = pid;
            s.status = ProcessStatus::Running;
        })?;
        info!(app = %key, pid = pid.unwrap_or(0), port = definition.port, "Process started");
        Ok(())
    }

    /// stop本体（呼び出し側が操作ロックを保持していること）
    pub(crate) async fn stop_locked(&self, key: &ProcessKey) -> Result<()> {
        let (_, state) = self.registry.get(key)?;

        // 起動していなければ何もしない
        if state.pid.is_none() || !self.registry.alive(key) {
            let _ = self.registry.take_child(key);
            self.registry.mutate(key, |s| {
                s.pid = None;
                s.status = ProcessStatus::Stopped;
            })?;
            return Ok(());
        }
        let pid = state.pid.unwrap_or_default();

        self.registry
            .mutate(key, |s| s.status = ProcessStatus::Stopping)?;

        // プロセスグループ全体にSIGTERMを送信（setsidによりpid == pgid）
        info!(app = %key, pid, "Sending SIGTERM to process group");
        if let Err(e) = signal::killpg(Pid::from_raw(pid as i32), Signal::SIGTERM) {
            debug!(app = %key, pid, error = %e, "Failed to send SIGTERM");
        }

        // graceful終了をポーリング待機
        let timeout = Duration::from_secs(self.lifecycle.stop_timeout_secs);
        let start = Instant::now();
        while start.elapsed() < timeout {
            if !self.registry.alive(key) {
                break;
            }
            sleep(Duration::from_millis(self.lifecycle.stop_poll_ms)).await;
        }

        let escalated = self.registry.alive(key);
        if escalated {
            warn!(app = %key, pid, "Timeout reached. Sending SIGKILL to process group");
            let _ = signal::killpg(Pid::from_raw(pid as i32), Signal::SIGKILL);
        }

        // ハンドルを回収してゾンビを残さない
        if let Some(mut child) = self.registry.take_child(key)? {
            let _ = child.wait().await;
        }

        self.registry.mutate(key, |s| {
            s.pid = None;
            s.status = ProcessStatus::Stopped;
            s.health_detail = "stopped".to_string();
        })?;

        if escalated {
            // エスカレーションは警告であって、stop操作の失敗ではない
            warn!(
                app = %key,
                "{}",
                SupervisorError::StopTimeout {
                    key: key.to_string(),
                    timeout_secs: self.lifecycle.stop_timeout_secs,
                }
            );
        } else {
            info!(app = %key, pid, "Process exited gracefully");
        }
        Ok(())
    }
}

/// 子プロセスの出力を読み捨てるタスクを起動する
///
/// tailが指定されている場合は直近の行をリングバッファに保持する。
fn spawn_output_drain<R>(key: ProcessKey, stream: &'static str, reader: R, tail: Option<StderrTail>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            debug!(app = %key, stream, "{}", line);
            if let Some(tail) = &tail {
                let mut tail = tail.lock().unwrap_or_else(|e| e.into_inner());
                if tail.len() >= STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
        }
        debug!(app = %key, stream, "Output drain ended");
    });
}
