//! Draftsmith Core
//!
//! Foundational types for the Draftsmith workspace: the canonical plan
//! schema, conversation/request types, role definitions with their model
//! inheritance graph, and the unified stream event enum. This crate has
//! zero dependencies on application-level code (HTTP client, database,
//! executors).
//!
//! ## Module Organization
//!
//! - `plan` - Canonical plan schema (`Plan`, `Step`, `CommandRequest`, `FileAction`)
//! - `message` - Conversation types (`ConversationMessage`, `AssistantRequest`)
//! - `role` - The seven pipeline roles and model inheritance resolution
//! - `streaming` - Observational stream events for one turn

pub mod message;
pub mod plan;
pub mod role;
pub mod streaming;

// ── Plan Schema ────────────────────────────────────────────────────────
pub use plan::{CommandRequest, FileAction, FileActionKind, Plan, Step};

// ── Conversation Types ─────────────────────────────────────────────────
pub use message::{AssistantRequest, ChatRole, ConversationMessage};

// ── Roles & Inheritance ────────────────────────────────────────────────
pub use role::{
    ModelChoice, ResolvedRole, ResolvedRoles, Role, RoleSettings, RolesConfig, Sampling,
};

// ── Streaming Types ────────────────────────────────────────────────────
pub use streaming::StreamEvent;
