//! Plan application tests: recovered plans against a real temporary
//! workspace, through the file and command executors.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use draftsmith_core::streaming::StreamEvent;
use draftsmith_recovery::recover;
use draftsmith_tools::{
    ApplyOptions, ApproveAll, CommandExecutor, FileActionExecutor, WorkspaceRoots,
};
use tempfile::TempDir;

fn workspace(dir: &TempDir) -> WorkspaceRoots {
    WorkspaceRoots::new(vec![dir.path().to_path_buf()]).unwrap()
}

fn event_sink() -> mpsc::Sender<StreamEvent> {
    let (tx, mut rx) = mpsc::channel(256);
    tokio::spawn(async move { while rx.recv().await.is_some() {} });
    tx
}

const AUTO: ApplyOptions = ApplyOptions {
    require_approval: false,
};

#[tokio::test]
async fn test_recovered_plan_applies_end_to_end() {
    let dir = TempDir::new().unwrap();
    let raw = r##"{
        "summary": "seed the project",
        "message": "",
        "commandRequests": [{"command": "mkdir -p out"}],
        "fileActions": [
            {"type": "create", "path": "out/seed.py", "content": "print(1)\n"},
            {"type": "create", "path": "notes.md", "contents": ["# notes", ""]}
        ]
    }"##;
    let plan = recover(raw).unwrap();

    let ws = workspace(&dir);
    let cancel = CancellationToken::new();
    let events = event_sink();

    let commands = CommandExecutor::new(ws.clone(), Arc::new(ApproveAll), events.clone());
    let report = commands
        .run_all(&plan.command_requests, AUTO, &cancel)
        .await
        .unwrap();
    assert_eq!(report.applied, 1);

    let files = FileActionExecutor::new(ws, Arc::new(ApproveAll), events);
    let report = files.apply(&plan.file_actions, AUTO, &cancel).await.unwrap();
    assert_eq!(report.applied, 2);

    assert_eq!(
        std::fs::read_to_string(dir.path().join("out/seed.py")).unwrap(),
        "print(1)\n"
    );
    assert_eq!(
        std::fs::read_to_string(dir.path().join("notes.md")).unwrap(),
        "# notes\n"
    );
}

#[tokio::test]
async fn test_escaping_actions_are_skipped_but_contained_ones_apply() {
    let dir = TempDir::new().unwrap();
    let raw = r#"{
        "summary": "mixed containment",
        "message": "",
        "fileActions": [
            {"type": "create", "path": "../outside.txt", "content": "nope"},
            {"type": "create", "path": "/etc/draftsmith-test.txt", "content": "nope"},
            {"type": "create", "path": "inside.txt", "content": "yes"}
        ]
    }"#;
    let plan = recover(raw).unwrap();

    let ws = workspace(&dir);
    let cancel = CancellationToken::new();
    let files = FileActionExecutor::new(ws, Arc::new(ApproveAll), event_sink());
    let report = files.apply(&plan.file_actions, AUTO, &cancel).await.unwrap();

    assert_eq!(report.skipped, 2);
    assert_eq!(report.applied, 1);
    assert!(dir.path().join("inside.txt").exists());
    assert!(!dir.path().parent().unwrap().join("outside.txt").exists());
}

#[tokio::test]
async fn test_command_failure_keeps_the_batch_going() {
    let dir = TempDir::new().unwrap();
    let raw = r#"{
        "summary": "fail then succeed",
        "message": "",
        "commandRequests": ["false", "echo done > marker.txt"]
    }"#;
    let plan = recover(raw).unwrap();

    let ws = workspace(&dir);
    let cancel = CancellationToken::new();
    let commands = CommandExecutor::new(ws, Arc::new(ApproveAll), event_sink());
    let report = commands
        .run_all(&plan.command_requests, AUTO, &cancel)
        .await
        .unwrap();

    assert_eq!(report.failed, 1);
    assert_eq!(report.applied, 1);
    assert!(dir.path().join("marker.txt").exists());
}

#[tokio::test]
async fn test_cancelled_batch_reports_cancelled_not_failed() {
    let dir = TempDir::new().unwrap();
    let raw = r#"{
        "summary": "will be cancelled",
        "message": "",
        "fileActions": [{"type": "create", "path": "never.txt", "content": "x"}]
    }"#;
    let plan = recover(raw).unwrap();

    let ws = workspace(&dir);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let files = FileActionExecutor::new(ws, Arc::new(ApproveAll), event_sink());
    let err = files
        .apply(&plan.file_actions, AUTO, &cancel)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "cancelled");
    assert!(!dir.path().join("never.txt").exists());
}
