mod bootstrap;
mod ports;
mod sync;
mod webhook;


use anyhow::Context;
use clap::{Parser, Subcommand};
use common::entities::{repository_connections, sync_events};
use common::settings::Settings;
use migration::{Migrator, MigratorTrait};
use std::path::PathBuf;
use sync::{cancel_pair, SyncOutcome, SyncRequest, SyncService};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use webhook::{evaluate_push, PushDecision, PushEvent, PushPolicy};

#[derive(Parser)]
#[command(name = "sync-worker", version, about = "Two-way sync between a prompt library and its GitHub repository")]
struct Cli {
    /// Extra TOML config file, layered over the standard locations.
    #[arg(long, global = true, env = "PROMPTSYNC_CONFIG_PATH")]
    config: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply pending schema migrations
    Migrate,
    /// Run one sync for a project
    Sync {
        #[arg(long)]
        project_id: i32,
        /// Defaults to the connection's default branch
        #[arg(long)]
        branch: Option<String>,
    },
    /// Show the sync lock, last result and recent sync events of a project
    Status {
        #[arg(long)]
        project_id: i32,
        #[arg(long, default_value_t = 10)]
        limit: u64,
    },
    /// Evaluate a push webhook payload and sync when it qualifies
    Push {
        #[arg(long)]
        project_id: i32,
        #[arg(long)]
        payload: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if dotenv::dotenv().is_err() {
        if let Ok(cwd) = std::env::current_dir() {
            let candidates = [cwd.join(".env"), cwd.join("../.env"), cwd.join("../../.env")];
            for p in candidates {
                if p.exists() && dotenv::from_path(&p).is_ok() {
                    break;
                }
            }
        }
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "sync_worker=debug,common=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let ctx = bootstrap::build_worker_context(settings).await?;

    match cli.command {
        Command::Migrate => {
            tracing::info!("Running migrations...");
            Migrator::up(ctx.db.as_ref(), None).await?;
            tracing::info!("Migrations applied.");
        }
        Command::Sync { project_id, branch } => {
            let service = ctx.sync_service()?;
            let outcome = run_sync(&service, SyncRequest { project_id, branch }).await?;
            print_outcome(&outcome);
        }
        Command::Status { project_id, limit } => {
            let connections = &ctx.repos.connection_repo;
            let connection = connections
                .find_by_project(project_id)
                .await?
                .ok_or(sync::SyncError::NotConnected(project_id))?;
            let events = connections.recent_events(project_id, limit).await?;
            for line in status_lines(&connection, &events) {
                println!("{line}");
            }
        }
        Command::Push {
            project_id,
            payload,
        } => {
            let raw = tokio::fs::read_to_string(&payload)
                .await
                .with_context(|| format!("Failed to read {}", payload.display()))?;
            let event: PushEvent = serde_json::from_str(&raw).context("Invalid push payload")?;
            let connection = ctx
                .repos
                .connection_repo
                .find_by_project(project_id)
                .await?
                .ok_or(sync::SyncError::NotConnected(project_id))?;

            let pull_requests = &ctx.settings.sync.pull_requests;
            let policy = PushPolicy {
                repository: format!("{}/{}", connection.owner, connection.repo_name),
                default_branch: connection.default_branch,
                sync_branch: pull_requests.enabled.then(|| pull_requests.branch.clone()),
                bot_login: ctx.settings.github.bot_login.clone(),
                skip_marker: ctx.settings.sync.skip_marker.clone(),
            };
            match evaluate_push(&event, &policy) {
                PushDecision::Ignore { reason } => {
                    tracing::info!(project_id, reason = %reason, "Push ignored");
                }
                PushDecision::Sync {
                    branch,
                    is_main_branch,
                } => {
                    tracing::info!(project_id, branch = %branch, is_main_branch, "Push triggers sync");
                    let service = ctx.sync_service()?;
                    let request = SyncRequest {
                        project_id,
                        branch: Some(branch),
                    };
                    let outcome = run_sync(&service, request).await?;
                    print_outcome(&outcome);
                }
            }
        }
    }

    Ok(())
}

/// Ctrl-C cancels the run; the service still releases its lock.
async fn run_sync(service: &SyncService, request: SyncRequest) -> anyhow::Result<SyncOutcome> {
    let (handle, signal) = cancel_pair();
    let run = service.run(request, &signal);
    tokio::pin!(run);

    let outcome = tokio::select! {
        result = &mut run => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted, cancelling sync");
            handle.cancel();
            run.await
        }
    };
    Ok(outcome?)
}

fn status_lines(
    connection: &repository_connections::Model,
    events: &[sync_events::Model],
) -> Vec<String> {
    let mut lines = vec![format!(
        "{}/{} ({}) {}, last result {} at {}",
        connection.owner,
        connection.repo_name,
        connection.default_branch,
        if connection.sync_in_progress {
            "syncing"
        } else {
            "idle"
        },
        connection.last_sync_status.as_deref().unwrap_or("none"),
        connection
            .last_synced_at
            .map(|at| at.and_utc().to_rfc3339())
            .unwrap_or_else(|| "never".to_string()),
    )];
    for event in events {
        lines.push(format!(
            "  {} {} {}",
            event.created_at.and_utc().to_rfc3339(),
            event.event_type,
            event.details.as_deref().unwrap_or(""),
        ));
    }
    lines
}

fn print_outcome(outcome: &SyncOutcome) {
    println!("{:?} on {}", outcome.status, outcome.branch);
    for change in &outcome.changes {
        println!("  {:?} {:?} {}", change.target, change.op, change.path);
    }
    for failure in &outcome.failures {
        println!("  failed {} ({:?}): {}", failure.path, failure.kind, failure.reason);
    }
    for conflict in &outcome.conflicts {
        println!("  conflict {} resolved {:?}", conflict.path, conflict.resolution);
    }
    if let Some(pull) = &outcome.pull_request {
        println!("  pull request #{} {}", pull.number, pull.html_url);
    }
}
