//! Application Error Types
//!
//! Top-level error envelope for the binary and its services. Component
//! crates keep their own error enums; this type only aggregates them at
//! the application boundary.

use thiserror::Error;

use crate::orchestrator::TurnError;
use draftsmith_tools::ActionError;

/// Application-level error.
#[derive(Debug, Error)]
pub enum AppError {
    /// Settings file problems (unreadable, unparseable).
    #[error("configuration error: {0}")]
    Config(String),

    /// File I/O errors outside the executors.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Session persistence errors.
    #[error(transparent)]
    Database(#[from] rusqlite::Error),

    /// A turn failed in the orchestrator.
    #[error(transparent)]
    Turn(#[from] TurnError),

    /// An executor batch was aborted.
    #[error(transparent)]
    Action(#[from] ActionError),
}

/// Result type alias for application errors.
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Create a config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
