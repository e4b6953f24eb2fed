//! HTTP server for helpdeskd

use crate::routes;
use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::Router;
use helpdesk_common::{BulkOrchestrator, Config, SessionCache, SessionId, TicketingClient};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Application state shared across handlers
pub struct AppState {
    pub sessions: Arc<SessionCache>,
    pub client: Arc<dyn TicketingClient>,
    pub config: Config,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: Config, client: Arc<dyn TicketingClient>) -> Self {
        let ttl = Duration::from_secs(config.sessions.ttl_secs);
        Self {
            sessions: Arc::new(SessionCache::new(ttl)),
            client,
            config,
            start_time: Instant::now(),
        }
    }

    /// Orchestrator bound to one session's row store.
    pub fn orchestrator(&self, id: SessionId) -> BulkOrchestrator {
        BulkOrchestrator::new(Arc::new(self.sessions.slot(id)), Arc::clone(&self.client))
            .with_call_timeout(Duration::from_secs(self.config.ticketing.timeout_secs))
    }
}

/// Build the router with all routes and layers.
pub fn app(state: Arc<AppState>) -> Router {
    let max_upload = state.config.server.max_upload_bytes;

    Router::new()
        .merge(routes::health_routes())
        .merge(routes::session_routes())
        .merge(routes::ticket_routes())
        .with_state(state)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload))
        .layer(TraceLayer::new_for_http())
}

/// Periodically drop expired upload sessions.
pub fn spawn_session_sweeper(sessions: Arc<SessionCache>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            sessions.purge_expired().await;
        }
    })
}

/// Run the HTTP server until Ctrl-C
pub async fn run(state: AppState) -> Result<()> {
    let bind = state.config.server.bind.clone();
    let sweep_every = Duration::from_secs(state.config.sessions.sweep_interval_secs);
    let state = Arc::new(state);

    let sweeper = spawn_session_sweeper(Arc::clone(&state.sessions), sweep_every);

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;
    info!("Listening on http://{}", bind);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    info!("Shutting down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
