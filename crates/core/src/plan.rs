//! Plan Schema
//!
//! The canonical typed representation of an assistant turn's output: a
//! narrative explanation plus the shell commands and file edits the
//! assistant proposes. Instances are produced by the recovery layer from
//! raw model text and consumed exactly once by the executors.

use serde::{Deserialize, Serialize};

/// The kind of file operation a plan proposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileActionKind {
    Create,
    Edit,
    Delete,
}

impl std::fmt::Display for FileActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileActionKind::Create => write!(f, "create"),
            FileActionKind::Edit => write!(f, "edit"),
            FileActionKind::Delete => write!(f, "delete"),
        }
    }
}

/// One step of the plan narrative.
///
/// `title` is required and non-blank; entries that cannot supply one are
/// dropped during recovery rather than null-patched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Step {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

impl Step {
    /// Create a step with only a title.
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            detail: None,
            result: None,
        }
    }
}

/// A shell command the plan asks to run, with an optional human-readable
/// description shown in the approval prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CommandRequest {
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A file create/edit/delete the plan asks to apply.
///
/// `path` is workspace-relative or resolvable against an open workspace
/// root. Never persisted: recovery creates it, the executor consumes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileAction {
    #[serde(rename = "type")]
    pub kind: FileActionKind,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// The canonical plan object the pipeline must ultimately produce.
///
/// Invariants: `summary` is non-empty (enforced by recovery); `message`
/// may be empty; every sequence defaults to empty rather than absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Plan {
    pub summary: String,
    pub message: String,
    pub steps: Vec<Step>,
    pub live_log: Vec<String>,
    pub qa_findings: Vec<String>,
    pub test_results: Vec<String>,
    pub command_requests: Vec<CommandRequest>,
    pub file_actions: Vec<FileAction>,
}

impl Plan {
    /// Whether the plan carries anything for the executors to apply.
    pub fn has_actions(&self) -> bool {
        !self.command_requests.is_empty() || !self.file_actions.is_empty()
    }
}
