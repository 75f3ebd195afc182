//! Main Entrypoint for the Countdown Client
//!
//! Loads configuration, parses the command line, runs one session and logs
//! how it ended.

use anyhow::Context;
use clap::Parser;
use countdown_client::{cli::Cli, config::Config, runner::execute};
use countdown_core::log_sink::TracingLog;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();

    // --- 3. Resolve and Run the Session ---
    let plan = cli
        .into_plan(&config)
        .context("Failed to resolve the socket address")?;
    info!(url = %plan.url, kind = ?plan.kind, "Session planned.");

    let outcome = execute(plan, Arc::new(TracingLog)).await;

    info!(
        messages = outcome.summary.messages,
        closed_by = ?outcome.summary.closed_by,
        farewell_sent = outcome.summary.farewell_sent,
        "Session finished."
    );
    Ok(())
}
