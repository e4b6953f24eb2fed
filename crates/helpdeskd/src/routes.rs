//! API routes for helpdeskd
//!
//! Upload flow: create a session, upload the spreadsheet into it, preview the
//! resolved tickets, then submit. A submission clears the session's rows.

use crate::server::AppState;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use helpdesk_common::{
    ingest_into, is_valid_email, BulkRequest, IngestError, Preview, PreviewRequest,
    ProcessingResult, SessionId, SheetSource, TicketDraft, VERSION,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

type AppStateArc = Arc<AppState>;
type ApiError = (StatusCode, String);

fn parse_session(id: &str) -> Result<SessionId, ApiError> {
    SessionId::parse_str(id)
        .map_err(|_| (StatusCode::BAD_REQUEST, format!("Invalid session id '{}'", id)))
}

fn check_requester(requester: &str) -> Result<(), ApiError> {
    if is_valid_email(requester) {
        Ok(())
    } else {
        Err((
            StatusCode::BAD_REQUEST,
            format!("Invalid requester e-mail '{}'", requester),
        ))
    }
}

// ============================================================================
// Health Routes
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub active_sessions: usize,
}

pub fn health_routes() -> Router<AppStateArc> {
    Router::new().route("/v1/health", get(health))
}

async fn health(State(state): State<AppStateArc>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: VERSION.to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        active_sessions: state.sessions.active().await,
    })
}

// ============================================================================
// Session Routes
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionCreated {
    pub session_id: SessionId,
}

#[derive(Debug, Deserialize)]
pub struct UploadParams {
    pub filename: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub rows_ingested: usize,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub requester: String,
    #[serde(flatten)]
    pub bulk: BulkRequest,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    #[serde(flatten)]
    pub result: ProcessingResult,
    pub summary: String,
}

pub fn session_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/v1/sessions", post(create_session))
        .route("/v1/sessions/:id", delete(delete_session))
        .route("/v1/sessions/:id/sheet", post(upload_sheet))
        .route("/v1/sessions/:id/preview", post(preview))
        .route("/v1/sessions/:id/submit", post(submit))
}

async fn create_session(State(state): State<AppStateArc>) -> (StatusCode, Json<SessionCreated>) {
    let session_id = state.sessions.create().await;
    info!("Session {} opened", session_id);
    (StatusCode::CREATED, Json(SessionCreated { session_id }))
}

async fn delete_session(
    State(state): State<AppStateArc>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_session(&id)?;
    state.sessions.remove(id).await;
    Ok(StatusCode::NO_CONTENT)
}

async fn upload_sheet(
    State(state): State<AppStateArc>,
    Path(id): Path<String>,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> Result<Json<UploadResponse>, ApiError> {
    let id = parse_session(&id)?;

    if let Some(name) = params.filename.as_deref() {
        if !name.to_ascii_lowercase().ends_with(".xlsx") {
            return Err((
                StatusCode::BAD_REQUEST,
                "Only .xlsx files are supported".to_string(),
            ));
        }
    }
    if body.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Empty upload".to_string()));
    }

    let slot = state.sessions.slot(id);
    let rows = ingest_into(&slot, SheetSource::Bytes(body.to_vec()))
        .await
        .map_err(|e| match e {
            IngestError::Open(_) | IngestError::NoWorksheet => {
                warn!("Session {}: unreadable spreadsheet: {}", id, e);
                (
                    StatusCode::BAD_REQUEST,
                    format!("Could not read spreadsheet: {}", e),
                )
            }
            other => {
                error!("Session {}: ingestion failed: {}", id, other);
                (StatusCode::INTERNAL_SERVER_ERROR, other.to_string())
            }
        })?;

    if rows == 0 {
        return Err((
            StatusCode::BAD_REQUEST,
            "No rows found in spreadsheet".to_string(),
        ));
    }

    Ok(Json(UploadResponse {
        rows_ingested: rows,
        message: format!("Spreadsheet loaded: {} row(s) processed.", rows),
    }))
}

async fn preview(
    State(state): State<AppStateArc>,
    Path(id): Path<String>,
    Json(mut req): Json<PreviewRequest>,
) -> Result<Json<Preview>, ApiError> {
    let id = parse_session(&id)?;
    req.count.get_or_insert(state.config.bulk.default_preview_count);
    state
        .orchestrator(id)
        .preview(&req)
        .await
        .map(Json)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))
}

async fn submit(
    State(state): State<AppStateArc>,
    Path(id): Path<String>,
    Json(req): Json<SubmitRequest>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let id = parse_session(&id)?;
    check_requester(&req.requester)?;

    let result = state.orchestrator(id).submit(&req.requester, &req.bulk).await;
    let summary = result.summary();
    info!("Session {} submitted: {}", id, summary);

    Ok(Json(SubmitResponse { result, summary }))
}

// ============================================================================
// Single Ticket Routes
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct TicketRequest {
    pub requester: String,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TicketResponse {
    pub message: String,
    pub data: serde_json::Value,
}

pub fn ticket_routes() -> Router<AppStateArc> {
    Router::new().route("/v1/tickets", post(create_ticket))
}

async fn create_ticket(
    State(state): State<AppStateArc>,
    Json(req): Json<TicketRequest>,
) -> Result<(StatusCode, Json<TicketResponse>), ApiError> {
    check_requester(&req.requester)?;

    let draft = TicketDraft::new(req.requester, req.title, req.description);
    let receipt = state.client.create_ticket(&draft).await.map_err(|e| {
        error!("Ticket creation failed: {}", e);
        (StatusCode::BAD_GATEWAY, format!("Failed to create ticket: {}", e))
    })?;

    Ok((
        StatusCode::CREATED,
        Json(TicketResponse {
            message: "ticket created".to_string(),
            data: receipt.data,
        }),
    ))
}
