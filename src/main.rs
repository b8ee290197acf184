use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use circleci_feedback::config::AppConfig;
use circleci_feedback::error::AppError;
use circleci_feedback::orchestration::state::OrchestrationState;
use circleci_feedback::orchestration::Orchestrator;
use circleci_feedback::platform::github::GitHubPlatform;
use circleci_feedback::scheduler::{LocalScheduler, RetryPolicy};
use circleci_feedback::server::{create_router, AppState};
use circleci_feedback::shutdown::{graceful_shutdown, wait_for_shutdown};

/// Exit status for a step that should be retried later (EX_TEMPFAIL).
const EXIT_RETRY: u8 = 75;

#[derive(Parser)]
#[command(
    name = "circleci-feedback",
    about = "Comments failing CircleCI job output on GitHub pull requests"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the webhook server with the in-process scheduler (default)
    Serve,
    /// Run one pipeline lookup on an orchestration record
    FindPipeline {
        /// Read the record from this file instead of stdin
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
    /// Run one job poll on an orchestration record
    WaitForJobs {
        /// Read the record from this file instead of stdin
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // stdout carries the record in step mode; logs go to stderr.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    let config = AppConfig::load(cli.config.as_deref())?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            serve(config).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::FindPipeline { input } => {
            let orchestrator = orchestrator(&config).await?;
            let mut state = read_state(input.as_deref())?;
            let result = orchestrator.find_pipeline(&mut state).await.map(|_| ());
            finish_step(&state, result)
        }
        Command::WaitForJobs { input } => {
            let orchestrator = orchestrator(&config).await?;
            let mut state = read_state(input.as_deref())?;
            let result = orchestrator.wait_for_jobs(&mut state).await.map(|_| ());
            finish_step(&state, result)
        }
    }
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    tracing::info!(
        host = %config.server.host,
        port = %config.server.port,
        "Starting circleci-feedback server"
    );

    let platform = Arc::new(GitHubPlatform::new(&config.github).await?);
    let orchestrator = Arc::new(Orchestrator::from_config(&config, platform.clone())?);
    let scheduler = Arc::new(LocalScheduler::new(
        orchestrator,
        RetryPolicy::from(&config.scheduler),
    ));

    let state = Arc::new(AppState::new(
        config.clone(),
        platform,
        scheduler.clone(),
    ));
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(format!(
        "{}:{}",
        config.server.host, config.server.port
    ))
    .await?;

    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown())
        .await?;

    graceful_shutdown(&scheduler).await;

    Ok(())
}

async fn orchestrator(config: &AppConfig) -> anyhow::Result<Orchestrator> {
    let platform = Arc::new(GitHubPlatform::new(&config.github).await?);
    Ok(Orchestrator::from_config(config, platform)?)
}

fn read_state(input: Option<&Path>) -> anyhow::Result<OrchestrationState> {
    let raw = match input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut raw = String::new();
            std::io::stdin()
                .read_to_string(&mut raw)
                .context("Failed to read orchestration record from stdin")?;
            raw
        }
    };
    serde_json::from_str(&raw).context("Invalid orchestration record")
}

/// Print the record, then map the step outcome to an exit status.
///
/// The record is printed on failure too; it carries the backoff counters.
fn finish_step(
    state: &OrchestrationState,
    result: Result<(), AppError>,
) -> anyhow::Result<ExitCode> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer(&mut stdout, state)?;
    writeln!(stdout)?;
    stdout.flush()?;

    match result {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) if e.is_retryable() => {
            tracing::warn!(key = %state.key(), error = %e, "Step will need to be retried");
            Ok(ExitCode::from(EXIT_RETRY))
        }
        Err(e) => {
            tracing::error!(key = %state.key(), error = %e, "Step failed");
            Ok(ExitCode::FAILURE)
        }
    }
}
