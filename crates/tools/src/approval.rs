//! Approval Gate
//!
//! Central gate consulted before each gated action. Implementations block
//! until the user answers; a non-affirmative answer skips the action — a
//! skip is reported as "rejected", never as a failure.

use async_trait::async_trait;

use draftsmith_core::plan::{CommandRequest, FileAction, FileActionKind};

/// Maximum characters of file content shown in an approval prompt.
const PREVIEW_MAX: usize = 400;

/// One approval request, rendered by whatever front end owns the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalRequest {
    /// Short action label: `create`, `edit`, `delete`, or `run`.
    pub action: String,
    /// The path or command line in question.
    pub subject: String,
    /// Truncated content preview (create/edit only).
    pub preview: Option<String>,
    /// Model-supplied description, when present.
    pub description: Option<String>,
}

impl ApprovalRequest {
    pub fn for_file(action: &FileAction) -> Self {
        let preview = match action.kind {
            FileActionKind::Create | FileActionKind::Edit => {
                action.content.as_deref().map(preview_of)
            }
            FileActionKind::Delete => None,
        };
        Self {
            action: action.kind.to_string(),
            subject: action.path.clone(),
            preview,
            description: action.description.clone(),
        }
    }

    pub fn for_command(request: &CommandRequest) -> Self {
        Self {
            action: "run".to_string(),
            subject: request.command.clone(),
            preview: None,
            description: request.description.clone(),
        }
    }
}

/// The user's answer to an approval request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalDecision {
    Approved,
    Rejected,
}

/// Gate that decides whether a gated action may run.
#[async_trait]
pub trait ApprovalGate: Send + Sync {
    async fn confirm(&self, request: ApprovalRequest) -> ApprovalDecision;
}

/// Gate that approves everything. Used by tests and callers that have
/// already obtained blanket consent.
#[derive(Debug, Default)]
pub struct ApproveAll;

#[async_trait]
impl ApprovalGate for ApproveAll {
    async fn confirm(&self, _request: ApprovalRequest) -> ApprovalDecision {
        ApprovalDecision::Approved
    }
}

/// Truncate content to a prompt-sized preview.
fn preview_of(content: &str) -> String {
    if content.len() <= PREVIEW_MAX {
        return content.to_string();
    }
    let mut cut = PREVIEW_MAX;
    while !content.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…", &content[..cut])
}
