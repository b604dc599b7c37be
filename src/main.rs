//! Draftsmith - Headless Session Driver
//!
//! Stands in for the out-of-scope UI: reads requests from stdin, runs each
//! turn through the orchestrator (Ctrl-C cancels), renders the recovered
//! plan, and walks its commands and file actions through the executors
//! with a terminal approval prompt.

use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use draftsmith::config::AppConfig;
use draftsmith::orchestrator::{Orchestrator, OrchestratorConfig, TurnError};
use draftsmith::prompts::PromptRegistry;
use draftsmith::session::Session;
use draftsmith::storage;
use draftsmith_core::plan::Plan;
use draftsmith_core::streaming::StreamEvent;
use draftsmith_llm::{LlmBackend, OllamaClient};
use draftsmith_tools::{
    ApplyOptions, ApprovalDecision, ApprovalGate, ApprovalRequest, CommandExecutor,
    FileActionExecutor, WorkspaceRoots,
};

/// Terminal approval gate: prints the action and reads a y/N answer.
struct StdinApprovalGate;

#[async_trait]
impl ApprovalGate for StdinApprovalGate {
    async fn confirm(&self, request: ApprovalRequest) -> ApprovalDecision {
        println!();
        match &request.description {
            Some(description) => {
                println!("  {} {} — {description}", request.action, request.subject)
            }
            None => println!("  {} {}", request.action, request.subject),
        }
        if let Some(preview) = &request.preview {
            println!("  --- preview ---");
            for line in preview.lines() {
                println!("  {line}");
            }
            println!("  ---------------");
        }
        print!("  approve? [y/N] ");
        let _ = std::io::stdout().flush();

        let answer = read_stdin_line().await.unwrap_or_default();
        if matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes") {
            ApprovalDecision::Approved
        } else {
            ApprovalDecision::Rejected
        }
    }
}

/// Read one line from stdin without blocking the runtime.
async fn read_stdin_line() -> Option<String> {
    tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        match std::io::stdin().read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(line),
            Err(_) => None,
        }
    })
    .await
    .ok()
    .flatten()
}

/// Render turn events to the terminal.
async fn print_events(mut events: mpsc::Receiver<StreamEvent>, live_stream: bool) {
    while let Some(event) = events.recv().await {
        match event {
            StreamEvent::RoleStarted { role, model } => {
                if live_stream {
                    println!("\n── {role} ({model}) ──");
                }
            }
            StreamEvent::RoleDelta { content, .. } => {
                if live_stream {
                    print!("{content}");
                    let _ = std::io::stdout().flush();
                }
            }
            StreamEvent::RoleCompleted { .. } => {
                if live_stream {
                    println!();
                }
            }
            StreamEvent::ModelPull {
                model,
                status,
                completed,
                total,
            } => match (completed, total) {
                (Some(done), Some(total)) if total > 0 => {
                    println!("pulling {model}: {status} ({done}/{total} bytes)")
                }
                _ => println!("pulling {model}: {status}"),
            },
            StreamEvent::AttemptStarted {
                attempt,
                max_attempts,
            } => {
                if attempt > 1 {
                    println!("retrying plan generation (attempt {attempt}/{max_attempts})");
                }
            }
            StreamEvent::RecoveryFailed { reason, .. } => {
                println!("response was not a usable plan: {reason}");
            }
            StreamEvent::CommandOutput { line, stderr } => {
                if stderr {
                    eprintln!("{line}");
                } else {
                    println!("{line}");
                }
            }
            StreamEvent::CommandStarted { command } => println!("$ {command}"),
            StreamEvent::CommandExited { code, .. } => {
                if code != 0 {
                    println!("(exit code {code})");
                }
            }
            StreamEvent::ActionRejected { description } => {
                println!("rejected: {description}");
            }
            StreamEvent::ActionSkipped {
                description,
                reason,
            } => println!("skipped {description}: {reason}"),
            StreamEvent::ActionLog { message } => println!("{message}"),
            StreamEvent::FileReady { path } => println!("wrote {path}"),
        }
    }
}

fn render_plan(plan: &Plan) {
    println!("\n{}", plan.summary);
    if !plan.message.is_empty() {
        println!("\n{}", plan.message);
    }
    if !plan.steps.is_empty() {
        println!();
        for (i, step) in plan.steps.iter().enumerate() {
            match &step.detail {
                Some(detail) => println!("{}. {} — {detail}", i + 1, step.title),
                None => println!("{}. {}", i + 1, step.title),
            }
        }
    }
    for finding in &plan.qa_findings {
        println!("qa: {finding}");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let roots: Vec<PathBuf> = {
        let args: Vec<String> = std::env::args().skip(1).collect();
        if args.is_empty() {
            vec![std::env::current_dir().context("cannot determine working directory")?]
        } else {
            args.into_iter().map(PathBuf::from).collect()
        }
    };
    let workspace = WorkspaceRoots::new(roots).context("no workspace roots")?;

    let config = AppConfig::load().context("loading configuration")?;

    let db_path = dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("draftsmith")
        .join("session.db");
    let db = storage::open_database(&db_path).context("opening session database")?;
    let mut session = Session::new(
        config.clone(),
        storage::ConversationStore::new(db.clone(), config.history_limit * 2),
        storage::KnownModelsStore::new(db),
    );

    let backend: Arc<dyn LlmBackend> = Arc::new(OllamaClient::new(&config.daemon_url));
    match backend.list_models().await {
        Ok(models) => {
            session.refresh_known_models(&models)?;
            println!(
                "daemon at {} serves {} model(s)",
                config.daemon_url,
                models.len()
            );
        }
        Err(err) => {
            tracing::warn!("model daemon not reachable yet: {err}");
            println!("warning: {err}");
        }
    }

    let orchestrator = Orchestrator::new(
        Arc::clone(&backend),
        PromptRegistry::with_defaults(),
        OrchestratorConfig::from(&config),
    );

    let gate: Arc<dyn ApprovalGate> = Arc::new(StdinApprovalGate);
    let (events_tx, events_rx) = mpsc::channel::<StreamEvent>(256);
    let printer = tokio::spawn(print_events(events_rx, config.live_stream));

    println!("workspace: {}", workspace.active().display());
    println!("type a request, or 'exit' to quit\n");

    loop {
        print!("you ▸ ");
        let _ = std::io::stdout().flush();
        let Some(line) = read_stdin_line().await else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("exit") {
            break;
        }

        // Context assembly is an external concern; the headless driver
        // passes the workspace roots as an inert summary string.
        let context = workspace
            .roots()
            .iter()
            .map(|r| r.display().to_string())
            .collect::<Vec<_>>()
            .join("\n");
        let request = session.next_request(input, format!("Open workspace roots:\n{context}"))?;

        // Inheritance is re-resolved on every configuration read.
        let resolved = session.config().resolve_roles();

        let cancel = CancellationToken::new();
        let watcher = tokio::spawn({
            let cancel = cancel.clone();
            async move {
                let _ = tokio::signal::ctrl_c().await;
                cancel.cancel();
            }
        });

        let result = orchestrator
            .run_turn(&request, &resolved, &events_tx, &cancel)
            .await;
        watcher.abort();

        match result {
            Ok(plan) => {
                session.record_turn(input, &plan)?;
                render_plan(&plan);

                let options = ApplyOptions {
                    require_approval: session.config().require_approval,
                };

                if !plan.command_requests.is_empty() {
                    let commands =
                        CommandExecutor::new(workspace.clone(), Arc::clone(&gate), events_tx.clone());
                    match commands
                        .run_all(&plan.command_requests, options, &cancel)
                        .await
                    {
                        Ok(report) => tracing::info!(?report, "commands finished"),
                        Err(_) => {
                            println!("cancelled");
                            continue;
                        }
                    }
                }

                if !plan.file_actions.is_empty() {
                    let files =
                        FileActionExecutor::new(workspace.clone(), Arc::clone(&gate), events_tx.clone());
                    match files.apply(&plan.file_actions, options, &cancel).await {
                        Ok(report) => tracing::info!(?report, "file actions finished"),
                        Err(_) => {
                            println!("cancelled");
                            continue;
                        }
                    }
                }
            }
            Err(TurnError::Cancelled) => println!("\ncancelled"),
            Err(err) => println!("\nturn failed: {err}"),
        }
    }

    drop(events_tx);
    let _ = printer.await;
    Ok(())
}
