//! Inference Boundary Types
//!
//! Request/response types and the backend trait for the local inference
//! daemon. The orchestrator only ever sees `LlmBackend`, so tests can
//! substitute a scripted fake for the HTTP client.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Errors surfaced by the inference boundary.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LlmError {
    /// The daemon is not reachable (e.g. not running).
    #[error("cannot reach model daemon at {url}: {message}")]
    DaemonUnavailable { url: String, message: String },

    /// The daemon does not know the requested model.
    #[error("model not found: {model}")]
    ModelNotFound { model: String },

    /// The daemon answered with a non-success HTTP status.
    #[error("daemon returned status {status}: {message}")]
    Server { status: u16, message: String },

    /// Transport-level failure mid-request or mid-stream.
    #[error("network error: {0}")]
    Network(String),

    /// The daemon's response could not be decoded.
    #[error("malformed daemon response: {0}")]
    Parse(String),

    /// The request was cancelled via the turn's cancellation token.
    #[error("request cancelled")]
    Cancelled,
}

/// Result type for inference boundary operations.
pub type LlmResult<T> = Result<T, LlmError>;

/// Sampling and length options for a generation request. Unset fields are
/// omitted from the wire so the daemon applies its own defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repeat_penalty: Option<f32>,
}

/// One streaming generation request against a named model.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub options: GenerateOptions,
}

/// A progress object from the daemon's streaming pull endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PullProgress {
    pub status: String,
    #[serde(default)]
    pub digest: Option<String>,
    #[serde(default)]
    pub completed: Option<u64>,
    #[serde(default)]
    pub total: Option<u64>,
}

impl PullProgress {
    /// Whether this is the terminal object of a pull stream.
    pub fn is_terminal(&self) -> bool {
        self.status == "success"
    }
}

/// Sink for incremental generation text fragments. Unbounded so forwarding
/// never blocks the stream decode loop.
pub type ChunkSink = mpsc::UnboundedSender<String>;

/// Sink for pull progress objects.
pub type PullSink = mpsc::UnboundedSender<PullProgress>;

/// The inference boundary as the orchestrator sees it.
#[async_trait::async_trait]
pub trait LlmBackend: Send + Sync {
    /// Probe whether the daemon has the model locally.
    async fn show(&self, model: &str) -> LlmResult<()>;

    /// Download a model, forwarding newline-delimited progress objects to
    /// `progress` until the terminal `success` status.
    async fn pull(
        &self,
        model: &str,
        progress: Option<PullSink>,
        cancel: &CancellationToken,
    ) -> LlmResult<()>;

    /// Run one streaming generation, forwarding each text fragment to
    /// `chunks` and returning the full accumulated text.
    async fn generate(
        &self,
        request: &GenerateRequest,
        chunks: Option<ChunkSink>,
        cancel: &CancellationToken,
    ) -> LlmResult<String>;

    /// Model identifiers the daemon has available locally.
    async fn list_models(&self) -> LlmResult<Vec<String>>;
}
