//! Role Orchestrator
//!
//! Drives one turn through the fixed role sequence. Each role's prompt is
//! built from the request and the upstream role's draft, generation is
//! streamed through the shared model-handle pool, and the verifier's raw
//! output goes to recovery. When recovery rejects an attempt, the raw
//! response (truncated) and a corrective instruction are appended to a
//! per-attempt copy of the history and the whole sequence restarts, up to
//! a bounded number of attempts.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use draftsmith_core::message::{AssistantRequest, ConversationMessage};
use draftsmith_core::plan::Plan;
use draftsmith_core::role::{ResolvedRole, ResolvedRoles, Role};
use draftsmith_core::streaming::StreamEvent;
use draftsmith_llm::{GenerateOptions, LlmBackend, LlmError, ModelPool, PullProgress};
use draftsmith_recovery::recover;

use crate::config::AppConfig;
use crate::prompts::PromptRegistry;

/// Instruction appended to history after a recovery failure.
const CORRECTIVE_INSTRUCTION: &str = "Your previous response could not be parsed into \
the required plan object. Respond with exactly one JSON object with the keys summary, \
message, steps, liveLog, qaFindings, testResults, commandRequests, and fileActions. \
Include every key even when its value is empty, and do not wrap the object in \
markdown fences or add prose.";

/// Steering note appended alongside the context scout's findings.
const SCOUT_STEERING: &str = "Ground the plan in the workspace findings above and do \
not contradict them.";

/// Errors that fail a whole turn.
#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    /// A role produced only whitespace. Not retried.
    #[error("role {role} produced an empty generation")]
    EmptyGeneration { role: Role },

    /// Every attempt's output resisted recovery.
    #[error("no parseable plan after {attempts} attempts")]
    PlanUnrecoverable { attempts: u32 },

    /// The turn's cancellation token fired. Reported as cancelled, never
    /// as an error condition.
    #[error("turn cancelled")]
    Cancelled,

    /// The inference boundary failed.
    #[error(transparent)]
    Llm(LlmError),
}

impl From<LlmError> for TurnError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Cancelled => TurnError::Cancelled,
            other => TurnError::Llm(other),
        }
    }
}

/// Orchestrator tuning, read from the application settings per session.
#[derive(Debug, Clone, Copy)]
pub struct OrchestratorConfig {
    /// Plan-generation attempts before `PlanUnrecoverable`.
    pub max_attempts: u32,
    /// Emit incremental and final role snapshots to the event sink.
    pub live_stream: bool,
    /// Generation length cap forwarded to the daemon.
    pub num_predict: Option<u32>,
    /// Bound on the raw-response excerpt echoed back on retry.
    pub raw_excerpt_limit: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            live_stream: true,
            num_predict: Some(1024),
            raw_excerpt_limit: 2000,
        }
    }
}

impl From<&AppConfig> for OrchestratorConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_attempts: config.max_plan_attempts.max(1),
            live_stream: config.live_stream,
            num_predict: config.num_predict,
            ..Self::default()
        }
    }
}

/// Runs the seven-role sequence for each turn.
pub struct Orchestrator {
    pool: ModelPool,
    prompts: PromptRegistry,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(
        backend: Arc<dyn LlmBackend>,
        prompts: PromptRegistry,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            pool: ModelPool::new(backend),
            prompts,
            config,
        }
    }

    /// Run one turn: the role sequence, recovery, and the bounded retry
    /// loop. `roles` is the inheritance-resolved snapshot for this turn.
    pub async fn run_turn(
        &self,
        request: &AssistantRequest,
        roles: &ResolvedRoles,
        events: &mpsc::Sender<StreamEvent>,
        cancel: &CancellationToken,
    ) -> Result<Plan, TurnError> {
        let mut corrective: Vec<ConversationMessage> = Vec::new();

        for attempt in 1..=self.config.max_attempts {
            let _ = events
                .send(StreamEvent::AttemptStarted {
                    attempt,
                    max_attempts: self.config.max_attempts,
                })
                .await;

            let raw = self
                .run_attempt(request, roles, &corrective, events, cancel)
                .await?;

            match recover(&raw) {
                Ok(plan) => return Ok(plan),
                Err(err) => {
                    tracing::warn!(attempt, "plan recovery failed: {err}");
                    let _ = events
                        .send(StreamEvent::RecoveryFailed {
                            attempt,
                            reason: err.to_string(),
                        })
                        .await;
                    corrective.push(ConversationMessage::assistant(truncate_excerpt(
                        &raw,
                        self.config.raw_excerpt_limit,
                    )));
                    corrective.push(ConversationMessage::system(CORRECTIVE_INSTRUCTION));
                }
            }
        }

        Err(TurnError::PlanUnrecoverable {
            attempts: self.config.max_attempts,
        })
    }

    /// One pass through the role sequence. The history copy is rebuilt per
    /// attempt from the immutable request plus accumulated corrective
    /// feedback; the scout's findings are folded in before the planner.
    async fn run_attempt(
        &self,
        request: &AssistantRequest,
        roles: &ResolvedRoles,
        corrective: &[ConversationMessage],
        events: &mpsc::Sender<StreamEvent>,
        cancel: &CancellationToken,
    ) -> Result<String, TurnError> {
        let mut history = request.history.clone();
        history.extend(corrective.iter().cloned());

        let mut upstream: Option<String> = None;
        for role in Role::ORDER {
            if cancel.is_cancelled() {
                return Err(TurnError::Cancelled);
            }

            let resolved = roles.get(role);
            let prompt = self
                .prompts
                .build(role, request, &history, upstream.as_deref());

            let text = self
                .generate_role(role, resolved, &prompt, events, cancel)
                .await?;
            if text.trim().is_empty() {
                return Err(TurnError::EmptyGeneration { role });
            }

            if role == Role::ContextScout {
                history.push(ConversationMessage::assistant(format!(
                    "Workspace findings:\n{}",
                    text.trim()
                )));
                history.push(ConversationMessage::system(SCOUT_STEERING));
            }
            upstream = Some(text);
        }

        Ok(upstream.unwrap_or_default())
    }

    /// Generate one role's output through its pooled model handle,
    /// forwarding stream chunks and pull progress to the event sink.
    async fn generate_role(
        &self,
        role: Role,
        resolved: &ResolvedRole,
        prompt: &str,
        events: &mpsc::Sender<StreamEvent>,
        cancel: &CancellationToken,
    ) -> Result<String, TurnError> {
        let handle = self.pool.handle(&resolved.model);

        if self.config.live_stream {
            let _ = events
                .send(StreamEvent::RoleStarted {
                    role,
                    model: resolved.model.clone(),
                })
                .await;
        }

        // Chunk forwarding is observational: a separate task drains the
        // unbounded channel so event delivery never backpressures the
        // generation stream.
        let (chunk_tx, chunk_task) = if self.config.live_stream {
            let (tx, mut rx) = mpsc::unbounded_channel::<String>();
            let events = events.clone();
            let task = tokio::spawn(async move {
                while let Some(content) = rx.recv().await {
                    let _ = events.send(StreamEvent::RoleDelta { role, content }).await;
                }
            });
            (Some(tx), Some(task))
        } else {
            (None, None)
        };

        let (pull_tx, mut pull_rx) = mpsc::unbounded_channel::<PullProgress>();
        let pull_task = {
            let events = events.clone();
            let model = resolved.model.clone();
            tokio::spawn(async move {
                while let Some(update) = pull_rx.recv().await {
                    let _ = events
                        .send(StreamEvent::ModelPull {
                            model: model.clone(),
                            status: update.status,
                            completed: update.completed,
                            total: update.total,
                        })
                        .await;
                }
            })
        };

        let options = GenerateOptions {
            num_predict: self.config.num_predict,
            temperature: resolved.sampling.temperature,
            top_p: resolved.sampling.top_p,
            repeat_penalty: resolved.sampling.repeat_penalty,
        };

        let result = handle
            .generate(prompt, options, chunk_tx, Some(pull_tx), cancel)
            .await;

        // Senders were consumed by the generate call; once it returns the
        // forwarder tasks drain and exit.
        if let Some(task) = chunk_task {
            let _ = task.await;
        }
        let _ = pull_task.await;

        let text = result?;

        if self.config.live_stream {
            let _ = events
                .send(StreamEvent::RoleCompleted {
                    role,
                    content: text.clone(),
                })
                .await;
        }
        Ok(text)
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.config)
            .finish()
    }
}

/// Truncate a raw response for the corrective history entry, keeping a
/// character boundary.
fn truncate_excerpt(raw: &str, limit: usize) -> String {
    if raw.len() <= limit {
        return raw.to_string();
    }
    let mut cut = limit;
    while !raw.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…", &raw[..cut])
}
