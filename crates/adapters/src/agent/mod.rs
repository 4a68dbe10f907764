// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent child-process adapter.
//!
//! One adapter instance per active agent session. The child is spawned
//! with three pipes: stdin stays open for out-of-band input, stdout is
//! scanned line-by-line into typed [`AgentEvent`]s, and each stderr line
//! becomes an `error` event. The event channel closing is the completion
//! signal — it closes exactly once, when the child exits and both
//! scanners drain.

pub mod stream;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

use cosa_core::AgentEvent;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{ChildStderr, ChildStdout, Command};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Minimum stdout line buffer. Agent tool results can be enormous.
pub const LINE_BUFFER: usize = 1024 * 1024;

/// Event channel depth between the scanners and the consumer. Sends
/// await when full — agent events feed accounting and are never dropped.
const EVENT_BUFFER: usize = 256;

/// Grace period between closing stdin and killing the child on stop.
const STOP_GRACE: Duration = Duration::from_secs(2);

/// Errors from agent launch and control.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("failed to spawn agent: {0}")]
    SpawnFailed(String),

    #[error("agent input channel closed")]
    InputClosed,
}

/// Everything needed to start (or resume) one agent run.
#[derive(Debug, Clone, Default)]
pub struct LaunchSpec {
    /// Path to the agent executable.
    pub binary: String,
    /// Full prompt for the first turn.
    pub prompt: String,
    /// Working directory, normally the job's worktree.
    pub cwd: Option<PathBuf>,
    pub model: Option<String>,
    pub max_turns: Option<u32>,
    /// Resume a prior conversation instead of starting fresh.
    pub resume_session: Option<String>,
}

impl LaunchSpec {
    /// Command-line arguments for the agent binary.
    fn args(&self) -> Vec<String> {
        let mut args = vec![
            "-p".to_string(),
            self.prompt.clone(),
            "--output-format".to_string(),
            "stream-json".to_string(),
            "--verbose".to_string(),
        ];
        if let Some(model) = &self.model {
            args.push("--model".to_string());
            args.push(model.clone());
        }
        if let Some(max_turns) = self.max_turns {
            args.push("--max-turns".to_string());
            args.push(max_turns.to_string());
        }
        if let Some(session) = &self.resume_session {
            args.push("--resume".to_string());
            args.push(session.clone());
        }
        args
    }
}

enum Control {
    Input(String),
    Stop,
}

/// Cloneable handle for driving a running agent.
#[derive(Clone)]
pub struct AgentControl {
    tx: mpsc::Sender<Control>,
    session: Arc<Mutex<Option<String>>>,
}

impl AgentControl {
    /// Relay one line of input to the agent's stdin (a newline is
    /// appended by the writer).
    pub async fn send_input(&self, text: &str) -> Result<(), AgentError> {
        self.tx
            .send(Control::Input(text.to_string()))
            .await
            .map_err(|_| AgentError::InputClosed)
    }

    /// Close stdin and kill the child if it lingers. Idempotent.
    pub fn stop(&self) {
        let _ = self.tx.try_send(Control::Stop);
    }

    /// The session id latched from the first non-empty `init` event.
    pub fn session_id(&self) -> Option<String> {
        self.session.lock().clone()
    }
}

/// A running agent: the typed event stream plus its control handle.
pub struct AgentHandle {
    pub events: mpsc::Receiver<AgentEvent>,
    pub control: AgentControl,
}

/// Launches agent processes. The engine only sees this trait; tests swap
/// in [`fake::FakeAgentLauncher`].
#[async_trait::async_trait]
pub trait AgentLauncher: Send + Sync {
    async fn launch(&self, spec: LaunchSpec) -> Result<AgentHandle, AgentError>;
}

/// Production launcher: spawns the configured agent binary.
#[derive(Debug, Clone, Default)]
pub struct ProcessAgentLauncher;

#[async_trait::async_trait]
impl AgentLauncher for ProcessAgentLauncher {
    async fn launch(&self, spec: LaunchSpec) -> Result<AgentHandle, AgentError> {
        let mut cmd = Command::new(&spec.binary);
        cmd.args(spec.args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &spec.cwd {
            cmd.current_dir(cwd);
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| AgentError::SpawnFailed(format!("{}: {}", spec.binary, e)))?;

        let stdin = child.stdin.take();
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AgentError::SpawnFailed("stdout pipe missing".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| AgentError::SpawnFailed("stderr pipe missing".to_string()))?;

        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
        let (ctl_tx, ctl_rx) = mpsc::channel(16);
        let session = Arc::new(Mutex::new(None));

        tokio::spawn(scan_stdout(stdout, event_tx.clone(), Arc::clone(&session)));
        tokio::spawn(scan_stderr(stderr, event_tx));
        tokio::spawn(supervise(child, stdin, ctl_rx));

        Ok(AgentHandle {
            events: event_rx,
            control: AgentControl {
                tx: ctl_tx,
                session,
            },
        })
    }
}

/// Scan stdout lines into typed events, latching the session id from the
/// first non-empty `init`.
async fn scan_stdout(
    stdout: ChildStdout,
    events: mpsc::Sender<AgentEvent>,
    session: Arc<Mutex<Option<String>>>,
) {
    let mut lines = BufReader::with_capacity(LINE_BUFFER, stdout).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let Some(event) = stream::parse_agent_line(&line) else {
                    continue;
                };
                if let AgentEvent::Init { session_id } = &event {
                    if !session_id.is_empty() {
                        let mut latch = session.lock();
                        if latch.is_none() {
                            *latch = Some(session_id.clone());
                        }
                    }
                }
                if events.send(event).await.is_err() {
                    return;
                }
            }
            Ok(None) => return,
            Err(e) => {
                debug!(error = %e, "agent stdout read error");
                return;
            }
        }
    }
}

/// Each stderr line becomes an error event.
async fn scan_stderr(stderr: ChildStderr, events: mpsc::Sender<AgentEvent>) {
    let mut lines = BufReader::with_capacity(LINE_BUFFER, stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if line.trim().is_empty() {
            continue;
        }
        let event = AgentEvent::Error { message: line };
        if events.send(event).await.is_err() {
            return;
        }
    }
}

/// Own the child: relay input, handle stop, reap the exit status.
async fn supervise(
    mut child: tokio::process::Child,
    stdin: Option<tokio::process::ChildStdin>,
    mut ctl_rx: mpsc::Receiver<Control>,
) {
    let mut stdin = stdin;
    let mut ctl_open = true;
    loop {
        tokio::select! {
            cmd = ctl_rx.recv(), if ctl_open => match cmd {
                Some(Control::Input(text)) => {
                    if let Some(pipe) = stdin.as_mut() {
                        let mut line = text.into_bytes();
                        line.push(b'\n');
                        if let Err(e) = pipe.write_all(&line).await {
                            warn!(error = %e, "agent stdin write failed");
                        } else {
                            let _ = pipe.flush().await;
                        }
                    }
                }
                Some(Control::Stop) => {
                    // Close stdin first; kill only if the child lingers.
                    drop(stdin.take());
                    match tokio::time::timeout(STOP_GRACE, child.wait()).await {
                        Ok(_) => break,
                        Err(_) => {
                            let _ = child.start_kill();
                            let _ = child.wait().await;
                            break;
                        }
                    }
                }
                None => ctl_open = false,
            },
            status = child.wait() => {
                match status {
                    Ok(status) => debug!(?status, "agent exited"),
                    Err(e) => warn!(error = %e, "agent wait failed"),
                }
                break;
            }
        }
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
