//! Draftsmith Tools
//!
//! The action side of a plan: resolving plan-supplied paths into the open
//! workspace roots, and applying file actions and shell commands under
//! approval gating and cooperative cancellation. Per-action failures never
//! abort a batch — they are logged and the batch moves on — while
//! cancellation always aborts immediately and is reported distinctly from
//! any failure.

pub mod approval;
pub mod commands;
pub mod files;
pub mod workspace;

pub use approval::{ApprovalDecision, ApprovalGate, ApprovalRequest, ApproveAll};
pub use commands::{CommandExecutor, CommandOutput};
pub use files::FileActionExecutor;
pub use workspace::WorkspaceRoots;

/// Errors raised while applying a single action or batch.
///
/// Only [`ActionError::Cancelled`] aborts a batch; every other variant is
/// confined to the action that produced it.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    /// No workspace roots are open; nothing can be resolved or run.
    #[error("no open workspace roots")]
    NoWorkspaceRoots,

    /// The path does not resolve into any open workspace root.
    #[error("path does not resolve into an open workspace root: {path}")]
    PathUnresolved { path: String },

    /// An edit targeted a file that does not exist.
    #[error("edit target does not exist: {path}")]
    TargetMissing { path: std::path::PathBuf },

    /// The user declined the approval prompt. A skip, not a failure.
    #[error("rejected by user")]
    Rejected,

    /// A shell command exited with a non-zero code.
    #[error("command exited with code {code}")]
    CommandFailed { code: i32 },

    /// The batch's cancellation token fired.
    #[error("cancelled")]
    Cancelled,

    /// Filesystem or process-spawn failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Options for one batch application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyOptions {
    /// Prompt through the approval gate before each action. When false,
    /// actions are logged as auto-applied instead.
    pub require_approval: bool,
}

/// Outcome counts for one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub applied: usize,
    pub skipped: usize,
    pub failed: usize,
}
