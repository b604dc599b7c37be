//! Command Executor
//!
//! Runs a plan's shell commands one at a time in the active workspace
//! root, mirroring the file executor's approval/log/cancel pattern.
//! Stdout and stderr are streamed into the event log line by line as they
//! arrive; a non-zero exit is logged and the batch continues; cancellation
//! sends the child a graceful termination signal, waits briefly, then
//! kills it.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use draftsmith_core::plan::CommandRequest;
use draftsmith_core::streaming::StreamEvent;

use crate::approval::{ApprovalDecision, ApprovalGate, ApprovalRequest};
use crate::workspace::WorkspaceRoots;
use crate::{ActionError, ApplyOptions, ApplyReport};

/// Grace period between the termination signal and a hard kill.
const KILL_GRACE: Duration = Duration::from_secs(2);

/// Captured output of one completed command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs shell commands from a plan under approval gating.
pub struct CommandExecutor {
    roots: WorkspaceRoots,
    gate: Arc<dyn ApprovalGate>,
    events: mpsc::Sender<StreamEvent>,
}

impl CommandExecutor {
    pub fn new(
        roots: WorkspaceRoots,
        gate: Arc<dyn ApprovalGate>,
        events: mpsc::Sender<StreamEvent>,
    ) -> Self {
        Self {
            roots,
            gate,
            events,
        }
    }

    /// Run all command requests in order. Per-command failures are logged
    /// and the batch continues; only cancellation aborts it.
    pub async fn run_all(
        &self,
        requests: &[CommandRequest],
        options: ApplyOptions,
        cancel: &CancellationToken,
    ) -> Result<ApplyReport, ActionError> {
        let mut report = ApplyReport::default();

        for request in requests {
            if cancel.is_cancelled() {
                return Err(ActionError::Cancelled);
            }

            if options.require_approval {
                let approval = ApprovalRequest::for_command(request);
                if self.gate.confirm(approval).await == ApprovalDecision::Rejected {
                    report.skipped += 1;
                    self.emit(StreamEvent::ActionRejected {
                        description: format!("run {}", request.command),
                    })
                    .await;
                    continue;
                }
            }

            match self.run_one(request, cancel).await {
                Ok(_output) => report.applied += 1,
                Err(ActionError::Cancelled) => return Err(ActionError::Cancelled),
                Err(err) => {
                    report.failed += 1;
                    tracing::warn!(command = %request.command, "command failed: {err}");
                    self.emit(StreamEvent::ActionLog {
                        message: format!("command failed: {}: {err}", request.command),
                    })
                    .await;
                }
            }
        }
        Ok(report)
    }

    /// Spawn one command in the active workspace root and stream its
    /// output. Resolves with the captured (stdout, stderr) on exit 0, or
    /// `CommandFailed` carrying the non-zero exit code.
    pub async fn run_one(
        &self,
        request: &CommandRequest,
        cancel: &CancellationToken,
    ) -> Result<CommandOutput, ActionError> {
        #[cfg(windows)]
        let (shell, shell_arg) = ("cmd", "/C");
        #[cfg(not(windows))]
        let (shell, shell_arg) = ("sh", "-c");

        let mut child = Command::new(shell)
            .arg(shell_arg)
            .arg(&request.command)
            .current_dir(self.roots.active())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        self.emit(StreamEvent::CommandStarted {
            command: request.command.clone(),
        })
        .await;

        let stdout_task = self.spawn_line_reader(child.stdout.take(), false);
        let stderr_task = self.spawn_line_reader(child.stderr.take(), true);

        let status = tokio::select! {
            status = child.wait() => status?,
            _ = cancel.cancelled() => {
                terminate(&mut child).await;
                return Err(ActionError::Cancelled);
            }
        };

        let stdout = stdout_task.await.unwrap_or_default();
        let stderr = stderr_task.await.unwrap_or_default();

        let code = status.code().unwrap_or(-1);
        self.emit(StreamEvent::CommandExited {
            command: request.command.clone(),
            code,
        })
        .await;

        if status.success() {
            Ok(CommandOutput { stdout, stderr })
        } else {
            Err(ActionError::CommandFailed { code })
        }
    }

    /// Forward a child stream into the event log line by line, returning
    /// the accumulated text when the stream closes.
    fn spawn_line_reader<R>(
        &self,
        stream: Option<R>,
        stderr: bool,
    ) -> tokio::task::JoinHandle<String>
    where
        R: tokio::io::AsyncRead + Unpin + Send + 'static,
    {
        let events = self.events.clone();
        tokio::spawn(async move {
            let mut accumulated = String::new();
            let Some(stream) = stream else {
                return accumulated;
            };
            let mut lines = BufReader::new(stream).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                accumulated.push_str(&line);
                accumulated.push('\n');
                let _ = events.send(StreamEvent::CommandOutput { line, stderr }).await;
            }
            accumulated
        })
    }

    async fn emit(&self, event: StreamEvent) {
        let _ = self.events.send(event).await;
    }
}

/// Graceful-then-forceful child termination: SIGTERM, a short grace
/// period, then SIGKILL. On non-Unix platforms only the hard kill exists.
async fn terminate(child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        if let Some(id) = child.id() {
            let _ = kill(Pid::from_raw(id as i32), Signal::SIGTERM);
            if tokio::time::timeout(KILL_GRACE, child.wait()).await.is_ok() {
                return;
            }
        }
    }
    let _ = child.kill().await;
}
