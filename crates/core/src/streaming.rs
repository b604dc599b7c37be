//! Stream Event Types
//!
//! Observational events emitted while a turn runs: role output snapshots,
//! model pull progress, and executor activity. These are shared between the
//! orchestrator, the executors, and whatever front end is attached. Event
//! delivery is best-effort and must never affect control flow or the final
//! plan — a dropped receiver simply loses the view, not the turn.

use serde::{Deserialize, Serialize};

use crate::role::Role;

/// Unified event stream for one turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// A generation attempt has started (attempts restart the whole role
    /// sequence after a recovery failure).
    AttemptStarted { attempt: u32, max_attempts: u32 },

    /// A role has started generating.
    RoleStarted { role: Role, model: String },

    /// Incremental text from a running role.
    RoleDelta { role: Role, content: String },

    /// Final snapshot of a role's accumulated text.
    RoleCompleted { role: Role, content: String },

    /// Progress for a model being pulled by the local daemon.
    ModelPull {
        model: String,
        status: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        completed: Option<u64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        total: Option<u64>,
    },

    /// Recovery rejected the attempt's raw response; the orchestrator will
    /// retry with corrective feedback unless attempts are exhausted.
    RecoveryFailed { attempt: u32, reason: String },

    /// Free-form executor log line.
    ActionLog { message: String },

    /// The user declined an approval prompt. Reported distinctly from
    /// failures.
    ActionRejected { description: String },

    /// An action was skipped without being attempted (e.g. its path did not
    /// resolve to an open workspace root).
    ActionSkipped { description: String, reason: String },

    /// A created or edited file is ready for the user to review.
    FileReady { path: String },

    /// A shell command has been spawned.
    CommandStarted { command: String },

    /// One line of live output from a running command.
    CommandOutput { line: String, stderr: bool },

    /// A shell command finished with the given exit code.
    CommandExited { command: String, code: i32 },
}
