//! Main Entrypoint for the Countdown Peer
//!
//! Serves the `/ws` endpoint the countdown clients connect to.

use anyhow::Context;
use countdown_peer::{
    config::Config,
    server::{PeerState, serve},
};
use std::sync::Arc;
use tracing::info;

/// Listens for the `Ctrl+C` signal to gracefully shut down the server.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        return;
    }
    info!("Received shutdown signal. Shutting down gracefully...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();

    // --- 3. Start Server ---
    let listener = tokio::net::TcpListener::bind(config.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_address))?;
    info!(
        bind_address = %config.bind_address,
        linger = ?config.linger,
        "Peer is now listening."
    );

    serve(listener, Arc::new(PeerState::new(config.linger)), shutdown_signal()).await?;

    info!("Server has shut down.");
    Ok(())
}
