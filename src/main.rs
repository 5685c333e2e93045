use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use procurex::backend::ProcurexClient;
use procurex::cli::{Cli, Command, ProfileArgs};
use procurex::config::ProcurexConfig;
use procurex::controller::JobController;
use procurex::state_machine::{CancelHandle, TrackerSettings};
use procurex::submitter::{Document, SubmissionPayload};
use procurex::ui::{self, JobProgress};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = ProcurexConfig::load().context("failed to load procurex.toml")?;
    cli.apply_to(&mut config);
    config.validate()?;
    debug!(api_url = %config.api_url, poll_interval_ms = config.poll_interval_ms, "configuration loaded");

    match cli.command {
        Command::Health => health(&config).await.map(|()| ExitCode::SUCCESS),
        Command::Analyze {
            file,
            profile,
            json,
        } => analyze(&config, &file, &profile, json).await,
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "procurex=debug" } else { "procurex=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn health(config: &ProcurexConfig) -> Result<()> {
    let client = ProcurexClient::from_config(config);
    let health = client
        .health()
        .await
        .with_context(|| format!("backend at {} is not reachable", client.base_url()))?;

    println!("Backend:        {}", client.base_url());
    println!("Status:         {}", health.status);
    println!("Google API key: {}", if health.google_api_key_set { "set" } else { "missing" });
    Ok(())
}

async fn analyze(
    config: &ProcurexConfig,
    path: &std::path::Path,
    overrides: &ProfileArgs,
    json: bool,
) -> Result<ExitCode> {
    let document = Document::load(path, config.max_document_bytes)
        .with_context(|| format!("cannot use {}", path.display()))?;
    let mut profile = config.company.clone();
    overrides.apply_to(&mut profile);
    let payload = SubmissionPayload { document, profile };

    let mut controller = JobController::new(
        ProcurexClient::from_config(config),
        TrackerSettings::from_config(config),
    );
    let mut rx = controller.subscribe();

    let job_id = match controller.submit(&payload).await {
        Ok(id) => id,
        Err(err) => {
            ui::print_submission_failure(&err);
            return Ok(ExitCode::FAILURE);
        }
    };
    info!(job_id = %job_id, "tracking job");

    let (handle, cancel) = CancelHandle::pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.cancel();
        }
    });

    let progress = JobProgress::start(&job_id);
    let view = {
        let track = controller.track(cancel);
        tokio::pin!(track);
        loop {
            tokio::select! {
                view = &mut track => break view,
                Ok(()) = rx.changed() => progress.update(&rx.borrow_and_update()),
            }
        }
    };
    progress.finish(&view);

    // Cancelled: the job was discarded locally, exit like an interrupted command.
    if !view.is_terminal() {
        controller.reset();
        return Ok(ExitCode::from(130));
    }
    // The failure line is already on screen; only the remedy is left to print.
    if let Some(Err(err)) = controller.outcome() {
        debug!(job_id = %job_id, kind = %err.kind(), "job ended without a result");
        progress.print_hint(err.kind());
        return Ok(ExitCode::FAILURE);
    }

    if let Some(bundle) = view.result() {
        if json {
            println!("{}", serde_json::to_string_pretty(bundle)?);
        } else {
            progress.print_report(bundle);
        }
    }
    Ok(ExitCode::SUCCESS)
}
