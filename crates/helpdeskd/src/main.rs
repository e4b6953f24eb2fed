//! Helpdesk Daemon - bulk ticket service
//!
//! Accepts spreadsheet uploads, previews the resolved tickets and submits
//! them to the ticketing API one row at a time.

use anyhow::{Context, Result};
use helpdesk_common::{Config, HttpTicketingClient, VERSION};
use helpdeskd::server::{self, AppState};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional; real deployments set the environment directly
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("helpdeskd v{} starting", VERSION);

    let config = Config::load(None).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;
    info!("Ticketing endpoint: {}", config.ticketing.endpoint);

    let client = HttpTicketingClient::new(&config.ticketing)
        .context("Failed to build ticketing client")?;

    let state = AppState::new(config, Arc::new(client));
    server::run(state).await
}
