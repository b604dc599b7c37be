//! Session State
//!
//! One session per process: the configuration snapshot, the persistent
//! stores, and the turn counter. Explicitly passed into the orchestrator
//! and executors — there is no ambient global state.

use uuid::Uuid;

use draftsmith_core::message::{AssistantRequest, ConversationMessage};
use draftsmith_core::plan::Plan;

use crate::config::AppConfig;
use crate::error::AppResult;
use crate::storage::{ConversationStore, KnownModelsStore};

/// The long-lived state of one user session.
pub struct Session {
    config: AppConfig,
    conversation: ConversationStore,
    known_models: KnownModelsStore,
    turns: u32,
}

impl Session {
    pub fn new(
        config: AppConfig,
        conversation: ConversationStore,
        known_models: KnownModelsStore,
    ) -> Self {
        Self {
            config,
            conversation,
            known_models,
            turns: 0,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Build the read-only request for the next turn: the prompt, the
    /// pre-rendered context, and a copy of recent history.
    pub fn next_request(
        &mut self,
        prompt: impl Into<String>,
        context: impl Into<String>,
    ) -> AppResult<AssistantRequest> {
        self.turns += 1;
        let turn_id = Uuid::new_v4();
        tracing::info!(turn = self.turns, %turn_id, "starting turn");

        let history = self.conversation.recent(self.config.history_limit)?;
        Ok(AssistantRequest::new(prompt, context).with_history(history))
    }

    /// Persist the completed turn into session memory.
    pub fn record_turn(&self, prompt: &str, plan: &Plan) -> AppResult<()> {
        self.conversation
            .append(&ConversationMessage::user(prompt))?;
        let reply = if plan.message.is_empty() {
            plan.summary.clone()
        } else {
            format!("{}\n{}", plan.summary, plan.message)
        };
        self.conversation
            .append(&ConversationMessage::assistant(reply))?;
        Ok(())
    }

    /// Refresh the known-model set from a daemon listing.
    pub fn refresh_known_models(&self, models: &[String]) -> AppResult<()> {
        self.known_models.record_all(models)
    }

    /// Known model identifiers for selection menus.
    pub fn known_models(&self) -> AppResult<Vec<String>> {
        self.known_models.all()
    }

    pub fn turn_count(&self) -> u32 {
        self.turns
    }
}
