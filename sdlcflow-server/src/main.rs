//! Sdlcflow server and command line.
//!
//! `serve` exposes the agent pipeline over HTTP, `run` processes one request
//! read from stdin, and `check` reports configuration problems.

mod routes;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use routes::{router, AppState};
use sdlcflow::config::SdlcConfig;
use sdlcflow::core::RunStatus;
use sdlcflow::events::LoggingEventSink;
use sdlcflow::observability::{init_tracing, LogFormat};
use sdlcflow::providers::ChatCompletionsProvider;
use sdlcflow::store::OutputStore;
use sdlcflow::tracker::JiraClient;
use sdlcflow::workflow::SdlcWorkflow;
use std::io::Read;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

#[derive(Parser)]
#[command(author, version, about = "Requirements to design documents and Jira backlog")]
struct Cli {
    /// Log output format (plain or json).
    #[arg(long, global = true, default_value = "plain")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP API.
    Serve {
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
        #[arg(short, long, default_value_t = 8000)]
        port: u16,
    },
    /// Process requirements read from stdin and print a report.
    Run {
        /// Jira project key; defaults to JIRA_PROJECT_KEY.
        #[arg(long)]
        project_key: Option<String>,
    },
    /// Validate the environment configuration.
    Check,
}

fn build_workflow(config: &SdlcConfig) -> anyhow::Result<SdlcWorkflow> {
    let provider = ChatCompletionsProvider::new(config.llm.clone())?;
    let tracker = JiraClient::new(config.tracker.clone())?;
    Ok(SdlcWorkflow::new(Arc::new(provider), Arc::new(tracker), config)?
        .with_event_sink(Arc::new(LoggingEventSink::debug())))
}

async fn serve(config: SdlcConfig, host: &str, port: u16) -> anyhow::Result<()> {
    let store = OutputStore::new(&config.output_dir);
    let state = match build_workflow(&config) {
        Ok(workflow) => AppState::new(workflow, store),
        Err(e) => {
            warn!(error = %e, "Agent pipeline unavailable; serving read-only routes");
            AppState::without_workflow(store)
        }
    };

    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .with_context(|| format!("invalid listen address {host}:{port}"))?;
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "Listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn run(config: SdlcConfig, project_key: Option<String>) -> anyhow::Result<()> {
    let validation = config.validate();
    if !validation.valid {
        bail!(
            "missing environment variables: {}",
            validation.missing_keys.join(", ")
        );
    }

    let mut requirements = String::new();
    std::io::stdin()
        .read_to_string(&mut requirements)
        .context("failed to read requirements from stdin")?;

    let workflow = build_workflow(&config)?;
    let artifact = workflow
        .process(&requirements, project_key.as_deref())
        .await?;
    OutputStore::new(&config.output_dir).persist(&artifact).await?;

    println!("Status: {}", artifact.status);
    println!("{}", artifact.jira_artifacts.summary);
    for item in &artifact.jira_artifacts.created {
        println!(
            "  {} {} -> {}",
            item.draft.kind, item.draft.title, item.external_id
        );
    }
    println!("Diagrams: {}", artifact.diagrams.len());
    for diagnostic in &artifact.diagnostics {
        println!("Warning: {diagnostic}");
    }
    println!("Outputs written to {}", config.output_dir.display());

    if artifact.status != RunStatus::Completed {
        bail!("pipeline {}", artifact.status);
    }
    Ok(())
}

fn check(config: &SdlcConfig) -> anyhow::Result<()> {
    let validation = config.validate();
    for key in &validation.missing_keys {
        println!("Missing: {key}");
    }
    for warning in &validation.warnings {
        println!("Warning: {warning}");
    }
    if !validation.valid {
        bail!("configuration invalid");
    }
    println!("Configuration OK");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let config = SdlcConfig::from_env();
    match cli.command {
        Command::Serve { host, port } => serve(config, &host, port).await,
        Command::Run { project_key } => run(config, project_key).await,
        Command::Check => check(&config),
    }
}
