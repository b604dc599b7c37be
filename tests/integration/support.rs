//! Scripted inference backend shared by the integration tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use tokio_util::sync::CancellationToken;

use draftsmith_llm::{
    ChunkSink, GenerateRequest, LlmBackend, LlmError, LlmResult, PullSink,
};

/// A recorded generation call: which model, and the prompt it received.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub model: String,
    pub prompt: String,
}

/// Backend that replays a scripted queue of responses and records every
/// call. Every model is "known", so no pulls happen unless requested.
#[derive(Default)]
pub struct ScriptedBackend {
    responses: Mutex<VecDeque<String>>,
    pub calls: Mutex<Vec<RecordedCall>>,
    pub shows: AtomicU32,
    pub pulls: AtomicU32,
    in_flight: AtomicU32,
    pub max_in_flight: AtomicU32,
    missing_models: Vec<String>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend that reports the given models as not present, forcing pulls.
    pub fn with_missing_models(models: &[&str]) -> Self {
        Self {
            missing_models: models.iter().map(|m| m.to_string()).collect(),
            ..Self::default()
        }
    }

    /// Queue responses returned by subsequent generate calls, in order.
    pub fn push_responses(&self, responses: &[&str]) {
        let mut queue = self.responses.lock().unwrap();
        for response in responses {
            queue.push_back(response.to_string());
        }
    }

    /// Queue one full pipeline pass: six scripted drafts plus the given
    /// verifier output.
    pub fn push_attempt(&self, verifier_output: &str) {
        self.push_responses(&[
            "scout notes",
            "planner draft",
            "coder draft",
            "reviewer draft",
            "qa draft",
            "safety draft",
        ]);
        self.push_responses(&[verifier_output]);
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn recorded_calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl LlmBackend for ScriptedBackend {
    async fn show(&self, model: &str) -> LlmResult<()> {
        self.shows.fetch_add(1, Ordering::SeqCst);
        if self.missing_models.iter().any(|m| m == model) {
            Err(LlmError::ModelNotFound {
                model: model.to_string(),
            })
        } else {
            Ok(())
        }
    }

    async fn pull(
        &self,
        _model: &str,
        _progress: Option<PullSink>,
        _cancel: &CancellationToken,
    ) -> LlmResult<()> {
        self.pulls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn generate(
        &self,
        request: &GenerateRequest,
        chunks: Option<ChunkSink>,
        cancel: &CancellationToken,
    ) -> LlmResult<String> {
        if cancel.is_cancelled() {
            return Err(LlmError::Cancelled);
        }

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        self.calls.lock().unwrap().push(RecordedCall {
            model: request.model.clone(),
            prompt: request.prompt.clone(),
        });

        let response = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| "unscripted response".to_string());

        // Stream the response in two fragments like a real daemon would.
        if let Some(tx) = &chunks {
            let mid = response.len() / 2;
            let mid = (0..=mid)
                .rev()
                .find(|i| response.is_char_boundary(*i))
                .unwrap_or(0);
            let _ = tx.send(response[..mid].to_string());
            let _ = tx.send(response[mid..].to_string());
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(response)
    }

    async fn list_models(&self) -> LlmResult<Vec<String>> {
        Ok(Vec::new())
    }
}

/// A verifier output that recovers into a complete, well-formed plan.
pub const GOOD_PLAN_JSON: &str = r#"{
    "summary": "create the output directory and seed script",
    "message": "one command and one new file",
    "steps": [{"title": "make the directory"}, {"title": "write the script"}],
    "liveLog": [],
    "qaFindings": [],
    "testResults": [],
    "commandRequests": [{"command": "mkdir out", "description": "make output dir"}],
    "fileActions": [{"type": "create", "path": "out/seed.py", "content": "print(1)\n"}]
}"#;
