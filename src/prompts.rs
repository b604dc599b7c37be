//! Prompt Construction Registry
//!
//! Each role builds its prompt from the turn request, the (possibly
//! augmented) history, and the upstream role's draft. Construction is a
//! per-role trait object behind a registry rather than one branching
//! function, so the application can swap a role's strategy without
//! touching the orchestrator.

use std::collections::HashMap;

use draftsmith_core::message::{AssistantRequest, ConversationMessage};
use draftsmith_core::role::Role;

/// Builds the prompt for one role invocation.
pub trait PromptBuilder: Send + Sync {
    fn build(
        &self,
        request: &AssistantRequest,
        history: &[ConversationMessage],
        upstream: Option<&str>,
    ) -> String;
}

/// Default builder: a fixed role instruction followed by the rendered
/// context, history, upstream draft, and request.
struct InstructionPrompt {
    instruction: &'static str,
}

impl InstructionPrompt {
    fn new(instruction: &'static str) -> Box<Self> {
        Box::new(Self { instruction })
    }
}

impl PromptBuilder for InstructionPrompt {
    fn build(
        &self,
        request: &AssistantRequest,
        history: &[ConversationMessage],
        upstream: Option<&str>,
    ) -> String {
        let mut prompt = String::from(self.instruction);

        if !request.context.is_empty() {
            prompt.push_str("\n\n## Project context\n");
            prompt.push_str(&request.context);
        }

        if !history.is_empty() {
            prompt.push_str("\n\n## Conversation so far\n");
            for message in history {
                prompt.push_str(&format!("{}: {}\n", message.role, message.content));
            }
        }

        if let Some(draft) = upstream {
            prompt.push_str("\n\n## Draft from the previous stage\n");
            prompt.push_str(draft);
        }

        prompt.push_str("\n\n## Request\n");
        prompt.push_str(&request.prompt);
        prompt
    }
}

const CONTEXT_SCOUT_INSTRUCTION: &str = "You survey the project context for a coding \
assistant. List the files, conventions, and constraints relevant to the request as \
short factual notes. Do not propose changes.";

const PLANNER_INSTRUCTION: &str = "You are the planning stage of a coding assistant. \
Draft an action plan for the request: a one-line summary, an explanation for the \
user, ordered steps, any shell commands to run, and any file creates, edits, or \
deletes with full file content.";

const CODER_INSTRUCTION: &str = "You are the coding stage. Take the draft plan and \
fill in concrete file contents and exact shell commands. Keep the plan's structure; \
improve only its code and commands.";

const REVIEWER_INSTRUCTION: &str = "You are the review stage. Check the draft plan \
for mistakes: wrong paths, broken code, missing steps. Return the corrected plan in \
full, not a commentary.";

const QA_INSTRUCTION: &str = "You are the QA stage. Probe the draft plan for gaps \
and risks, record findings, and return the full plan with a qaFindings list.";

const SAFETY_INSTRUCTION: &str = "You are the safety stage. Remove or flag any \
destructive or out-of-workspace operations in the draft plan, and return the full \
plan.";

const VERIFIER_INSTRUCTION: &str = "You are the final verification stage. Return the \
plan as a single JSON object with exactly these top-level keys: summary, message, \
steps, liveLog, qaFindings, testResults, commandRequests, fileActions. Include every \
key even when its value is empty. Output only the JSON object — no markdown fences, \
no commentary.";

/// Role-keyed registry of prompt builders.
pub struct PromptRegistry {
    builders: HashMap<Role, Box<dyn PromptBuilder>>,
}

impl PromptRegistry {
    /// Registry with the default instruction strategy for all seven roles.
    pub fn with_defaults() -> Self {
        let mut builders: HashMap<Role, Box<dyn PromptBuilder>> = HashMap::new();
        builders.insert(
            Role::ContextScout,
            InstructionPrompt::new(CONTEXT_SCOUT_INSTRUCTION),
        );
        builders.insert(Role::Planner, InstructionPrompt::new(PLANNER_INSTRUCTION));
        builders.insert(Role::Coder, InstructionPrompt::new(CODER_INSTRUCTION));
        builders.insert(Role::Reviewer, InstructionPrompt::new(REVIEWER_INSTRUCTION));
        builders.insert(Role::Qa, InstructionPrompt::new(QA_INSTRUCTION));
        builders.insert(Role::Safety, InstructionPrompt::new(SAFETY_INSTRUCTION));
        builders.insert(Role::Verifier, InstructionPrompt::new(VERIFIER_INSTRUCTION));
        Self { builders }
    }

    /// Replace the strategy for one role.
    pub fn register(&mut self, role: Role, builder: Box<dyn PromptBuilder>) {
        self.builders.insert(role, builder);
    }

    /// Build the prompt for a role invocation.
    pub fn build(
        &self,
        role: Role,
        request: &AssistantRequest,
        history: &[ConversationMessage],
        upstream: Option<&str>,
    ) -> String {
        match self.builders.get(&role) {
            Some(builder) => builder.build(request, history, upstream),
            // Unregistered roles degrade to the bare request.
            None => request.prompt.clone(),
        }
    }
}

impl std::fmt::Debug for PromptRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptRegistry")
            .field("roles", &self.builders.len())
            .finish()
    }
}
