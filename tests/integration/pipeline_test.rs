//! Role pipeline integration tests against the scripted backend.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use draftsmith::orchestrator::{Orchestrator, OrchestratorConfig, TurnError};
use draftsmith::prompts::PromptRegistry;
use draftsmith_core::message::AssistantRequest;
use draftsmith_core::role::{Role, RoleSettings, RolesConfig, Sampling};
use draftsmith_core::streaming::StreamEvent;

use super::support::{ScriptedBackend, GOOD_PLAN_JSON};

fn orchestrator(backend: Arc<ScriptedBackend>, max_attempts: u32) -> Orchestrator {
    Orchestrator::new(
        backend,
        PromptRegistry::with_defaults(),
        OrchestratorConfig {
            max_attempts,
            ..OrchestratorConfig::default()
        },
    )
}

fn events() -> (mpsc::Sender<StreamEvent>, tokio::task::JoinHandle<Vec<StreamEvent>>) {
    let (tx, mut rx) = mpsc::channel(1024);
    let collector = tokio::spawn(async move {
        let mut seen = Vec::new();
        while let Some(event) = rx.recv().await {
            seen.push(event);
        }
        seen
    });
    (tx, collector)
}

fn resolved_default() -> draftsmith_core::role::ResolvedRoles {
    RolesConfig::default().resolve("test-model", Sampling::default())
}

#[tokio::test]
async fn test_happy_path_runs_all_seven_roles_in_order() {
    let backend = Arc::new(ScriptedBackend::new());
    backend.push_attempt(GOOD_PLAN_JSON);

    let orch = orchestrator(Arc::clone(&backend), 3);
    let request = AssistantRequest::new("seed the project", "ctx");
    let (tx, collector) = events();
    let cancel = CancellationToken::new();

    let plan = orch
        .run_turn(&request, &resolved_default(), &tx, &cancel)
        .await
        .unwrap();
    drop(tx);

    assert_eq!(plan.summary, "create the output directory and seed script");
    assert_eq!(plan.command_requests.len(), 1);
    assert_eq!(plan.file_actions.len(), 1);

    // Exactly one generation per role, strictly sequential.
    assert_eq!(backend.call_count(), 7);
    assert_eq!(backend.max_in_flight.load(std::sync::atomic::Ordering::SeqCst), 1);

    // Each role saw its upstream's draft, and the scout's findings were
    // folded into the planner's history.
    let calls = backend.recorded_calls();
    assert!(calls[1].prompt.contains("scout notes"));
    assert!(calls[2].prompt.contains("planner draft"));
    assert!(calls[6].prompt.contains("safety draft"));

    let seen = collector.await.unwrap();
    let deltas = seen
        .iter()
        .filter(|e| matches!(e, StreamEvent::RoleDelta { .. }))
        .count();
    assert!(deltas > 0, "live streaming must emit role deltas");
    let completions = seen
        .iter()
        .filter(|e| matches!(e, StreamEvent::RoleCompleted { .. }))
        .count();
    assert_eq!(completions, 7);
}

#[tokio::test]
async fn test_recovery_failure_retries_with_corrective_feedback() {
    let backend = Arc::new(ScriptedBackend::new());
    backend.push_attempt("this is not json at all");
    backend.push_attempt(GOOD_PLAN_JSON);

    let orch = orchestrator(Arc::clone(&backend), 3);
    let request = AssistantRequest::new("seed the project", "");
    let (tx, _collector) = events();
    let cancel = CancellationToken::new();

    let plan = orch
        .run_turn(&request, &resolved_default(), &tx, &cancel)
        .await
        .unwrap();
    drop(tx);

    assert_eq!(plan.command_requests[0].command, "mkdir out");
    assert_eq!(backend.call_count(), 14);

    // The second attempt's prompts carry the corrective instruction and an
    // excerpt of the rejected response.
    let calls = backend.recorded_calls();
    let second_attempt_planner = &calls[8].prompt;
    assert!(second_attempt_planner.contains("could not be parsed"));
    assert!(second_attempt_planner.contains("this is not json at all"));
}

#[tokio::test]
async fn test_attempts_are_bounded() {
    let backend = Arc::new(ScriptedBackend::new());
    backend.push_attempt("garbage one");
    backend.push_attempt("garbage two");

    let orch = orchestrator(Arc::clone(&backend), 2);
    let request = AssistantRequest::new("x", "");
    let (tx, _collector) = events();
    let cancel = CancellationToken::new();

    let err = orch
        .run_turn(&request, &resolved_default(), &tx, &cancel)
        .await
        .unwrap_err();
    drop(tx);

    assert!(matches!(err, TurnError::PlanUnrecoverable { attempts: 2 }));
    assert_eq!(backend.call_count(), 14);
}

#[tokio::test]
async fn test_empty_generation_fails_the_turn_without_retry() {
    let backend = Arc::new(ScriptedBackend::new());
    backend.push_responses(&["scout notes", "   \n  "]);

    let orch = orchestrator(Arc::clone(&backend), 3);
    let request = AssistantRequest::new("x", "");
    let (tx, _collector) = events();
    let cancel = CancellationToken::new();

    let err = orch
        .run_turn(&request, &resolved_default(), &tx, &cancel)
        .await
        .unwrap_err();
    drop(tx);

    assert!(matches!(
        err,
        TurnError::EmptyGeneration {
            role: Role::Planner
        }
    ));
    assert_eq!(backend.call_count(), 2);
}

#[tokio::test]
async fn test_cancelled_turn_is_distinct_and_stops_roles() {
    let backend = Arc::new(ScriptedBackend::new());
    backend.push_attempt(GOOD_PLAN_JSON);

    let orch = orchestrator(Arc::clone(&backend), 3);
    let request = AssistantRequest::new("x", "");
    let (tx, _collector) = events();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = orch
        .run_turn(&request, &resolved_default(), &tx, &cancel)
        .await
        .unwrap_err();
    drop(tx);

    assert!(matches!(err, TurnError::Cancelled));
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn test_roles_sharing_a_model_share_one_handle_and_one_load() {
    let backend = Arc::new(ScriptedBackend::with_missing_models(&["shared-model"]));
    backend.push_attempt(GOOD_PLAN_JSON);

    let orch = orchestrator(Arc::clone(&backend), 3);
    let request = AssistantRequest::new("x", "");
    let (tx, _collector) = events();
    let cancel = CancellationToken::new();

    let resolved = RolesConfig::default().resolve("shared-model", Sampling::default());
    orch.run_turn(&request, &resolved, &tx, &cancel)
        .await
        .unwrap();
    drop(tx);

    // All seven roles resolve to one identifier: one probe, one pull.
    assert_eq!(backend.shows.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert_eq!(backend.pulls.load(std::sync::atomic::Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_pinned_roles_route_to_their_own_models() {
    let backend = Arc::new(ScriptedBackend::new());
    backend.push_attempt(GOOD_PLAN_JSON);

    let orch = orchestrator(Arc::clone(&backend), 3);
    let request = AssistantRequest::new("x", "");
    let (tx, _collector) = events();
    let cancel = CancellationToken::new();

    let mut roles = RolesConfig::default();
    roles.planner = RoleSettings::pinned("modelA");
    roles.coder = RoleSettings::pinned("modelB");
    let resolved = roles.resolve("fallback", Sampling::default());

    orch.run_turn(&request, &resolved, &tx, &cancel)
        .await
        .unwrap();
    drop(tx);

    let calls = backend.recorded_calls();
    // Invocation order: scout, planner, coder, reviewer, qa, safety, verifier.
    assert_eq!(calls[0].model, "modelA"); // scout inherits planner
    assert_eq!(calls[1].model, "modelA");
    assert_eq!(calls[2].model, "modelB"); // pinned coder
    assert_eq!(calls[3].model, "modelA"); // reviewer inherits planner
    assert_eq!(calls[4].model, "modelB"); // qa inherits coder
    assert_eq!(calls[6].model, "modelB"); // verifier inherits down the chain
}
