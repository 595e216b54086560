//! Plogger application binary - composition root.
//!
//! 1. Load `.env`, the TOML config, env overrides and CLI flags
//! 2. Build the LLM transport, tourism client and orchestrator
//! 3. Restore the default conversation if a history file is configured
//! 4. Serve the axum API until Ctrl-C, then save the default conversation

mod cli;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use plogger_api::routes;
use plogger_api::state::AppState;
use plogger_chat::{ChatGateway, HttpTransport, PloggingOrchestrator};
use plogger_core::config::PloggerConfig;
use plogger_tour::TourApiClient;

use crate::cli::CliArgs;

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        return;
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let args = CliArgs::parse();

    // Config: file, then env, then CLI.
    let config_file = args.resolve_config_path();
    let mut config = PloggerConfig::load_or_default(&config_file);
    config.apply_env_overrides();
    args.apply_to(&mut config);

    // Tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.general.log_level)),
        )
        .init();

    tracing::info!("Starting plogger v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration resolved");

    let missing = config.missing_settings();
    if !missing.is_empty() {
        tracing::warn!(missing = ?missing, "Some credentials or prompt hashes are not set");
    }

    // Services.
    let transport = Arc::new(HttpTransport::new(config.laas.clone()));
    let places = Arc::new(TourApiClient::new(config.tour.clone()));
    let orchestrator =
        PloggingOrchestrator::new(ChatGateway::new(transport), places, config.hashes.clone());

    let state = AppState::new(config.clone(), orchestrator);

    // Restore the default conversation.
    let history_file = config.persistence.history_file.as_ref().map(PathBuf::from);
    if let Some(ref path) = history_file {
        let session = state.sessions.default_session();
        let mut conversation = session.lock().await;
        match conversation.restore(path) {
            Ok(count) => tracing::info!(path = %path.display(), messages = count, "History restored"),
            Err(e) => tracing::warn!(error = %e, "Starting with an empty history"),
        }
    }

    routes::start_server(&config, state.clone(), shutdown_signal()).await?;

    // Save the default conversation.
    if let Some(ref path) = history_file {
        let session = state.sessions.default_session();
        let conversation = session.lock().await;
        if let Err(e) = conversation.persist(path) {
            tracing::error!(error = %e, "Failed to save history");
        }
    }

    tracing::info!("Plogger stopped");
    Ok(())
}
