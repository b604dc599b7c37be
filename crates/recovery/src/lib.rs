//! Draftsmith Recovery
//!
//! Turns raw model text into a typed `Plan`. Model output is adversarial
//! by unreliability, not by malice: the JSON the pipeline asks for arrives
//! wrapped in prose, reasoning traces, and markdown fences, with comments,
//! trailing commas, synonym key names, and plan items written as bullet
//! strings. Recovery tries an ordered list of candidate extractions, parses
//! each strictly and then through a scrubber, and normalizes the first
//! object that parses. Unparseable items are dropped, never guessed.

pub mod candidates;
pub mod normalize;
pub mod scrub;

pub use candidates::{candidates, extract_brace_span, extract_fenced, strip_reasoning};
pub use normalize::normalize_plan;
pub use scrub::{parse_object, scrub};

use draftsmith_core::plan::Plan;

/// Errors produced by recovery.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RecoveryError {
    /// No candidate extraction yielded a usable plan object.
    #[error("unrecoverable response format: {0}")]
    UnrecoverableFormat(String),
}

/// Recover a `Plan` from a raw model response.
///
/// Candidates are tried in order; the first one that parses to a JSON
/// object (arrays never qualify) is normalized into the schema. Fails with
/// [`RecoveryError::UnrecoverableFormat`] when nothing parses or the
/// winning object lacks a usable summary.
pub fn recover(raw: &str) -> Result<Plan, RecoveryError> {
    for candidate in candidates(raw) {
        if let Some(object) = parse_object(&candidate) {
            return normalize_plan(&object);
        }
    }
    Err(RecoveryError::UnrecoverableFormat(
        "no candidate parsed as a JSON object".to_string(),
    ))
}
