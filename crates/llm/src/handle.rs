//! Model Handles
//!
//! A `ModelHandle` owns one model identifier and lazily prepares it on
//! first use — probe via `show`, pull when missing — caching readiness so
//! repeat use is free. All generation for a given identifier funnels
//! through a single handle: the `ModelPool` hands out the same `Arc` for
//! equal identifiers, and the handle's internal lock keeps at most one
//! request in flight per identifier.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::types::{
    ChunkSink, GenerateOptions, GenerateRequest, LlmBackend, LlmError, LlmResult, PullSink,
};

/// State guarded by the handle's lock. Holding the lock across a whole
/// generation both protects the readiness flag and serializes requests.
#[derive(Debug, Default)]
struct HandleState {
    ready: bool,
}

/// A lazily-prepared, request-serialized handle to one model.
pub struct ModelHandle {
    backend: Arc<dyn LlmBackend>,
    model: String,
    state: Mutex<HandleState>,
}

impl ModelHandle {
    pub fn new(backend: Arc<dyn LlmBackend>, model: impl Into<String>) -> Self {
        Self {
            backend,
            model: model.into(),
            state: Mutex::new(HandleState::default()),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Run one generation against this handle's model.
    ///
    /// The first call probes the daemon and pulls the model if it is
    /// missing; later calls skip straight to generation. The internal lock
    /// is held for the whole call, so two roles sharing a handle can never
    /// have overlapping requests.
    pub async fn generate(
        &self,
        prompt: impl Into<String>,
        options: GenerateOptions,
        chunks: Option<ChunkSink>,
        pull_progress: Option<PullSink>,
        cancel: &CancellationToken,
    ) -> LlmResult<String> {
        let mut state = self.state.lock().await;

        if cancel.is_cancelled() {
            return Err(LlmError::Cancelled);
        }

        if !state.ready {
            match self.backend.show(&self.model).await {
                Ok(()) => {}
                Err(LlmError::ModelNotFound { .. }) => {
                    self.backend
                        .pull(&self.model, pull_progress, cancel)
                        .await?;
                }
                Err(other) => return Err(other),
            }
            state.ready = true;
            tracing::debug!(model = %self.model, "model handle ready");
        }

        let request = GenerateRequest {
            model: self.model.clone(),
            prompt: prompt.into(),
            options,
        };
        self.backend.generate(&request, chunks, cancel).await
    }
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelHandle")
            .field("model", &self.model)
            .finish()
    }
}

/// Pool of model handles keyed by resolved model identifier.
///
/// Two roles whose configuration resolves to the same identifier receive
/// the *same* handle object, so a shared model is loaded once and never
/// serves overlapping requests.
pub struct ModelPool {
    backend: Arc<dyn LlmBackend>,
    handles: StdMutex<HashMap<String, Arc<ModelHandle>>>,
}

impl ModelPool {
    pub fn new(backend: Arc<dyn LlmBackend>) -> Self {
        Self {
            backend,
            handles: StdMutex::new(HashMap::new()),
        }
    }

    /// Fetch the handle for a model identifier, creating it on first use.
    pub fn handle(&self, model: &str) -> Arc<ModelHandle> {
        let mut handles = self.handles.lock().expect("model pool lock poisoned");
        handles
            .entry(model.to_string())
            .or_insert_with(|| {
                Arc::new(ModelHandle::new(Arc::clone(&self.backend), model))
            })
            .clone()
    }

    /// Number of distinct handles created so far.
    pub fn len(&self) -> usize {
        self.handles.lock().expect("model pool lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for ModelPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelPool").field("len", &self.len()).finish()
    }
}
