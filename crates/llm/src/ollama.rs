//! Ollama Daemon Client
//!
//! Raw HTTP client for the local inference daemon's newline-delimited
//! streaming protocol: `/api/generate` and `/api/pull` stream one JSON
//! object per line, `/api/show` answers the does-this-model-exist probe,
//! and `/api/tags` lists locally available models.

use futures_util::StreamExt;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::types::{
    ChunkSink, GenerateRequest, LlmBackend, LlmError, LlmResult, PullProgress, PullSink,
};

/// Default daemon endpoint.
pub const OLLAMA_DEFAULT_URL: &str = "http://localhost:11434";

/// One line of a `/api/generate` stream.
#[derive(Debug, Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

/// One entry of the `/api/tags` listing.
#[derive(Debug, Deserialize)]
struct ModelEntry {
    name: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelEntry>,
}

/// Client for one daemon instance.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: String,
    client: reqwest::Client,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        let base_url = base_url.trim_end_matches('/').to_string();
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn map_send_error(&self, err: reqwest::Error) -> LlmError {
        if err.is_connect() {
            LlmError::DaemonUnavailable {
                url: self.base_url.clone(),
                message: err.to_string(),
            }
        } else {
            LlmError::Network(err.to_string())
        }
    }

    /// Map a non-success status to an error, reading the body for detail.
    async fn status_error(response: reqwest::Response, model: &str) -> LlmError {
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        if status == 404 {
            LlmError::ModelNotFound {
                model: model.to_string(),
            }
        } else {
            LlmError::Server { status, message }
        }
    }

    /// Drive a newline-delimited response stream, handing each complete
    /// line to `on_line` until it reports the stream is finished or the
    /// cancellation token fires.
    async fn drive_lines<F>(
        response: reqwest::Response,
        cancel: &CancellationToken,
        mut on_line: F,
    ) -> LlmResult<bool>
    where
        F: FnMut(&str) -> LlmResult<bool>,
    {
        let mut stream = response.bytes_stream();
        let mut buffer = String::new();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Err(LlmError::Cancelled),
                chunk = stream.next() => match chunk {
                    Some(Ok(bytes)) => {
                        buffer.push_str(&String::from_utf8_lossy(&bytes));
                        while let Some(line_end) = buffer.find('\n') {
                            let line = buffer[..line_end].trim().to_string();
                            buffer.drain(..=line_end);
                            if line.is_empty() {
                                continue;
                            }
                            if on_line(&line)? {
                                return Ok(true);
                            }
                        }
                    }
                    Some(Err(err)) => return Err(LlmError::Network(err.to_string())),
                    None => {
                        // Flush a final unterminated line before ending.
                        let line = buffer.trim();
                        if !line.is_empty() && on_line(line)? {
                            return Ok(true);
                        }
                        return Ok(false);
                    }
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl LlmBackend for OllamaClient {
    async fn show(&self, model: &str) -> LlmResult<()> {
        let response = self
            .client
            .post(self.endpoint("/api/show"))
            .json(&serde_json::json!({ "model": model }))
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::status_error(response, model).await)
        }
    }

    async fn pull(
        &self,
        model: &str,
        progress: Option<PullSink>,
        cancel: &CancellationToken,
    ) -> LlmResult<()> {
        tracing::info!(model, "pulling model from daemon");

        let response = self
            .client
            .post(self.endpoint("/api/pull"))
            .json(&serde_json::json!({ "model": model, "stream": true }))
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if !response.status().is_success() {
            return Err(Self::status_error(response, model).await);
        }

        let finished = Self::drive_lines(response, cancel, |line| {
            let update: PullProgress = serde_json::from_str(line)
                .map_err(|e| LlmError::Parse(format!("pull progress: {e}")))?;
            let terminal = update.is_terminal();
            if let Some(tx) = &progress {
                let _ = tx.send(update);
            }
            Ok(terminal)
        })
        .await?;

        if finished {
            Ok(())
        } else {
            Err(LlmError::Parse(
                "pull stream ended without terminal success status".to_string(),
            ))
        }
    }

    async fn generate(
        &self,
        request: &GenerateRequest,
        chunks: Option<ChunkSink>,
        cancel: &CancellationToken,
    ) -> LlmResult<String> {
        let body = serde_json::json!({
            "model": request.model,
            "prompt": request.prompt,
            "stream": true,
            "options": request.options,
        });

        let response = self
            .client
            .post(self.endpoint("/api/generate"))
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if !response.status().is_success() {
            return Err(Self::status_error(response, &request.model).await);
        }

        let mut accumulated = String::new();
        Self::drive_lines(response, cancel, |line| {
            let chunk: GenerateChunk = serde_json::from_str(line)
                .map_err(|e| LlmError::Parse(format!("generate chunk: {e}")))?;
            if let Some(message) = chunk.error {
                return Err(LlmError::Server {
                    status: 200,
                    message,
                });
            }
            if !chunk.response.is_empty() {
                accumulated.push_str(&chunk.response);
                if let Some(tx) = &chunks {
                    let _ = tx.send(chunk.response);
                }
            }
            Ok(chunk.done)
        })
        .await?;

        Ok(accumulated)
    }

    async fn list_models(&self) -> LlmResult<Vec<String>> {
        let response = self
            .client
            .get(self.endpoint("/api/tags"))
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if !response.status().is_success() {
            return Err(Self::status_error(response, "").await);
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(format!("tags listing: {e}")))?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }
}
