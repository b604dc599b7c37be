//! File Action Executor
//!
//! Applies a plan's file actions in array order, one at a time, under
//! approval gating and cooperative cancellation. A single action's failure
//! is logged and the batch continues; cancellation aborts the whole batch
//! immediately. Cancellation is checked before and after every filesystem
//! call, so a cancel observed mid-action leaves at most one partial write.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use draftsmith_core::plan::{FileAction, FileActionKind};
use draftsmith_core::streaming::StreamEvent;

use crate::approval::{ApprovalDecision, ApprovalGate, ApprovalRequest};
use crate::workspace::WorkspaceRoots;
use crate::{ActionError, ApplyOptions, ApplyReport};

/// Applies file actions against the open workspace roots.
pub struct FileActionExecutor {
    roots: WorkspaceRoots,
    gate: Arc<dyn ApprovalGate>,
    events: mpsc::Sender<StreamEvent>,
}

impl FileActionExecutor {
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

    /// Apply actions in order.
    ///
    /// Never fails for a single action — resolution failures and rejected
    /// approvals are logged skips, filesystem failures are logged failures.
    /// The only error this returns is [`ActionError::Cancelled`], which
    /// aborts the remaining batch.
    pub async fn apply(
        &self,
        actions: &[FileAction],
        options: ApplyOptions,
        cancel: &CancellationToken,
    ) -> Result<ApplyReport, ActionError> {
        let mut report = ApplyReport::default();

        for action in actions {
            if cancel.is_cancelled() {
                return Err(ActionError::Cancelled);
            }

            let label = format!("{} {}", action.kind, action.path);
            match self.apply_one(action, options, cancel).await {
                Ok(()) => {
                    report.applied += 1;
                    self.emit(StreamEvent::ActionLog {
                        message: format!("applied: {label}"),
                    })
                    .await;
                }
                Err(ActionError::Cancelled) => return Err(ActionError::Cancelled),
                Err(ActionError::Rejected) => {
                    report.skipped += 1;
                    self.emit(StreamEvent::ActionRejected { description: label })
                        .await;
                }
                Err(err @ ActionError::PathUnresolved { .. }) => {
                    report.skipped += 1;
                    tracing::warn!(action = %label, "skipping action: {err}");
                    self.emit(StreamEvent::ActionSkipped {
                        description: label,
                        reason: err.to_string(),
                    })
                    .await;
                }
                Err(err) => {
                    report.failed += 1;
                    tracing::warn!(action = %label, "action failed: {err}");
                    self.emit(StreamEvent::ActionLog {
                        message: format!("failed: {label}: {err}"),
                    })
                    .await;
                }
            }
        }
        Ok(report)
    }

    async fn apply_one(
        &self,
        action: &FileAction,
        options: ApplyOptions,
        cancel: &CancellationToken,
    ) -> Result<(), ActionError> {
        let path = self.roots.resolve(&action.path)?;

        if options.require_approval {
            let request = ApprovalRequest::for_file(action);
            if self.gate.confirm(request).await == ApprovalDecision::Rejected {
                return Err(ActionError::Rejected);
            }
        } else {
            // Same write primitive as the approved path; only the prompt is skipped.
            self.emit(StreamEvent::ActionLog {
                message: format!(
                    "auto-applying {} {} (no approval required)",
                    action.kind, action.path
                ),
            })
            .await;
        }

        match action.kind {
            FileActionKind::Create => {
                self.write_file(&path, action.content.as_deref().unwrap_or(""), cancel)
                    .await
            }
            FileActionKind::Edit => {
                checkpoint(cancel)?;
                if !path.exists() {
                    return Err(ActionError::TargetMissing { path });
                }
                self.write_file(&path, action.content.as_deref().unwrap_or(""), cancel)
                    .await
            }
            FileActionKind::Delete => self.delete(&path, cancel).await,
        }
    }

    async fn write_file(
        &self,
        path: &Path,
        content: &str,
        cancel: &CancellationToken,
    ) -> Result<(), ActionError> {
        checkpoint(cancel)?;
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        checkpoint(cancel)?;
        std::fs::write(path, content)?;
        checkpoint(cancel)?;

        // Surface the written file so the user can review it.
        self.emit(StreamEvent::FileReady {
            path: path.display().to_string(),
        })
        .await;
        Ok(())
    }

    async fn delete(&self, path: &Path, cancel: &CancellationToken) -> Result<(), ActionError> {
        checkpoint(cancel)?;
        if path.is_dir() {
            std::fs::remove_dir_all(path)?;
        } else {
            std::fs::remove_file(path)?;
        }
        checkpoint(cancel)?;
        Ok(())
    }

    async fn emit(&self, event: StreamEvent) {
        let _ = self.events.send(event).await;
    }
}

/// Cancellation check interposed around every filesystem call.
fn checkpoint(cancel: &CancellationToken) -> Result<(), ActionError> {
    if cancel.is_cancelled() {
        Err(ActionError::Cancelled)
    } else {
        Ok(())
    }
}
