//! Plan recovery end-to-end tests.
//!
//! Exercises the documented malformed variants a local model actually
//! produces: fenced JSON, reasoning-trace prefixes, comment-laden objects,
//! trailing commas, synonym keys, and bullet-string items.

use draftsmith_core::plan::{FileAction, FileActionKind, Plan};
use draftsmith_recovery::{recover, RecoveryError};

#[test]
fn test_idempotent_recovery_round_trip() {
    let plan = Plan {
        summary: "wire up the config loader".to_string(),
        message: "two edits and a test run".to_string(),
        steps: vec![
            draftsmith_core::plan::Step::titled("edit loader"),
            draftsmith_core::plan::Step::titled("run tests"),
        ],
        command_requests: vec![draftsmith_core::plan::CommandRequest {
            command: "cargo test".to_string(),
            description: None,
        }],
        ..Default::default()
    };
    let recovered = recover(&serde_json::to_string(&plan).unwrap()).unwrap();
    assert_eq!(recovered, plan);
}

#[test]
fn test_fenced_response_with_prose() {
    let raw = concat!(
        "Of course! Here is the structured plan you asked for.\n\n",
        "```json\n",
        "{\"summary\": \"rename the module\", \"message\": \"one edit\"}\n",
        "```\n\n",
        "Would you like me to proceed?"
    );
    let plan = recover(raw).unwrap();
    assert_eq!(plan.summary, "rename the module");
}

#[test]
fn test_reasoning_trace_then_fenced_json() {
    let raw = concat!(
        "<think>They want JSON. I should not add commentary.</think>\n",
        "```\n",
        "{\"summary\": \"s\", \"message\": \"m\", \"steps\": [\"- only step\"]}\n",
        "```"
    );
    let plan = recover(raw).unwrap();
    assert_eq!(plan.steps[0].title, "only step");
}

#[test]
fn test_comment_laden_object_with_trailing_commas() {
    let raw = r#"{
        "summary": "tidy the workspace", // short
        /* narrative */
        "message": "remove the scratch files",
        "fileActions": [
            {"type": "delete", "path": "scratch/a.tmp"},
            {"type": "delete", "path": "scratch/b.tmp"},
        ],
    }"#;
    let plan = recover(raw).unwrap();
    assert_eq!(plan.file_actions.len(), 2);
    assert_eq!(plan.file_actions[1].kind, FileActionKind::Delete);
}

#[test]
fn test_bullet_string_commands_and_actions() {
    let raw = r#"{
        "summary": "bootstrap",
        "message": "",
        "commandRequests": ["- mkdir out - make output dir", "cargo init"],
        "fileActions": ["- create `out/README.md` - project notes"]
    }"#;
    let plan = recover(raw).unwrap();
    assert_eq!(plan.command_requests[0].command, "mkdir out");
    assert_eq!(
        plan.command_requests[0].description.as_deref(),
        Some("make output dir")
    );
    assert_eq!(plan.command_requests[1].command, "cargo init");
    assert_eq!(
        plan.file_actions[0],
        FileAction {
            kind: FileActionKind::Create,
            path: "out/README.md".to_string(),
            content: None,
            description: Some("project notes".to_string()),
        }
    );
}

#[test]
fn test_synonym_keys_and_line_array_content() {
    let raw = r#"{"summary":"ok","message":"m","fileActions":[{"type":"CREATE_FILE","file":"a.py","contents":["print(1)",""]}]}"#;
    let plan = recover(raw).unwrap();
    assert_eq!(plan.file_actions[0].path, "a.py");
    assert_eq!(plan.file_actions[0].content.as_deref(), Some("print(1)\n"));
}

#[test]
fn test_unrecoverable_input_names_the_failure() {
    let err = recover("The model refused to answer.").unwrap_err();
    let RecoveryError::UnrecoverableFormat(reason) = err;
    assert!(reason.contains("no candidate"));
}

#[test]
fn test_malformed_peers_never_poison_wellformed_items() {
    let raw = r#"{
        "summary": "mixed bag",
        "message": "",
        "steps": ["good", {"note": "bad"}, {"title": "also good"}],
        "commandRequests": [{"command": "ls"}, {"cmd": ""}, 12],
        "fileActions": [
            {"type": "edit", "path": "src/lib.rs", "content": "x"},
            {"type": "edit"},
            {"path": "orphan.txt"}
        ]
    }"#;
    let plan = recover(raw).unwrap();
    assert_eq!(plan.steps.len(), 2);
    assert_eq!(plan.command_requests.len(), 1);
    assert_eq!(plan.file_actions.len(), 1);
}
