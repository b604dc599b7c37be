//! Integration Tests Module
//!
//! Cross-crate scenario tests for Draftsmith: the full role pipeline
//! against a scripted inference backend, plan recovery end to end, and
//! plan application against a real temporary workspace.

// Shared scripted inference backend
mod support;

// Role pipeline, retry loop, and model-handle sharing tests
mod pipeline_test;

// Plan recovery end-to-end tests
mod recovery_test;

// Plan application (file + command executor) tests
mod actions_test;
