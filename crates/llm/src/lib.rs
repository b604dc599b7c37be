//! Draftsmith LLM
//!
//! The inference boundary: a raw HTTP client for the local Ollama-protocol
//! daemon (streaming generate/pull, show, tags), the `LlmBackend` trait the
//! orchestrator consumes, and the lazily-prepared model handle pool that
//! shares one handle per resolved model identifier.

pub mod handle;
pub mod ollama;
pub mod types;

pub use handle::{ModelHandle, ModelPool};
pub use ollama::{OllamaClient, OLLAMA_DEFAULT_URL};
pub use types::{
    ChunkSink, GenerateOptions, GenerateRequest, LlmBackend, LlmError, LlmResult, PullProgress,
    PullSink,
};
