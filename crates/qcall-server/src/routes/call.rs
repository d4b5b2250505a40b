//! Call Routes - Call/recall requests and sequencer administration
//!
//! HTTP handlers that delegate to CallSequencer.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};

use super::error_response;
use crate::models::{
    ClearedResponse, EnqueueCallRequest, EnqueueCallResponse, QueueStatusResponse,
    SequencerStateResponse,
};
use crate::AppState;
use qcall::{CallKind, DomainError};

async fn enqueue(
    state: &AppState,
    payload: EnqueueCallRequest,
    kind: CallKind,
) -> Result<Json<EnqueueCallResponse>, (StatusCode, String)> {
    let ticket = state
        .tickets
        .find_by_id(payload.ticket_id)
        .await
        .map_err(error_response)?
        .ok_or_else(|| error_response(DomainError::not_found("Ticket", payload.ticket_id)))?;

    let counter = state
        .counters
        .find_by_id(payload.counter_id)
        .await
        .map_err(error_response)?
        .ok_or_else(|| error_response(DomainError::not_found("Counter", payload.counter_id)))?;

    let source_label = payload
        .source_label
        .unwrap_or_else(|| format!("counter-{}", counter.counter_number));

    let outcome = state
        .sequencer
        .enqueue(&ticket, &counter, kind, source_label)
        .await
        .map_err(error_response)?;

    Ok(Json(outcome.into()))
}

/// Call a ticket to a counter
#[utoipa::path(
    post,
    path = "/api/calls",
    request_body = EnqueueCallRequest,
    responses(
        (status = 200, description = "Call queued, already queued, or suppressed as a duplicate", body = EnqueueCallResponse),
        (status = 404, description = "Ticket or counter not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Call"
)]
pub async fn call_ticket(
    State(state): State<AppState>,
    Json(payload): Json<EnqueueCallRequest>,
) -> Result<Json<EnqueueCallResponse>, (StatusCode, String)> {
    enqueue(&state, payload, CallKind::Call).await
}

/// Recall a ticket to a counter
#[utoipa::path(
    post,
    path = "/api/calls/recall",
    request_body = EnqueueCallRequest,
    responses(
        (status = 200, description = "Recall queued", body = EnqueueCallResponse),
        (status = 404, description = "Ticket or counter not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Call"
)]
pub async fn recall_ticket(
    State(state): State<AppState>,
    Json(payload): Json<EnqueueCallRequest>,
) -> Result<Json<EnqueueCallResponse>, (StatusCode, String)> {
    enqueue(&state, payload, CallKind::Recall).await
}

/// Sequencer diagnostics
#[utoipa::path(
    get,
    path = "/api/calls/status",
    responses(
        (status = 200, description = "Sequencer status", body = QueueStatusResponse),
        (status = 500, description = "Internal server error")
    ),
    tag = "Call"
)]
pub async fn get_status(
    State(state): State<AppState>,
) -> Result<Json<QueueStatusResponse>, (StatusCode, String)> {
    let status = state.sequencer.status().await.map_err(error_response)?;
    Ok(Json(status.into()))
}

/// Start the sequencer (also resets the failure breaker)
#[utoipa::path(
    post,
    path = "/api/calls/start",
    responses(
        (status = 200, description = "Sequencer running", body = SequencerStateResponse)
    ),
    tag = "Call"
)]
pub async fn start_sequencer(State(state): State<AppState>) -> Json<SequencerStateResponse> {
    let changed = state.sequencer.start();
    Json(SequencerStateResponse {
        running: state.sequencer.is_running(),
        changed,
    })
}

/// Stop the sequencer after the in-flight call
#[utoipa::path(
    post,
    path = "/api/calls/stop",
    responses(
        (status = 200, description = "Sequencer stopped", body = SequencerStateResponse)
    ),
    tag = "Call"
)]
pub async fn stop_sequencer(State(state): State<AppState>) -> Json<SequencerStateResponse> {
    let changed = state.sequencer.is_running();
    state.sequencer.stop();
    Json(SequencerStateResponse {
        running: state.sequencer.is_running(),
        changed,
    })
}

/// Forget dispatched first calls so tickets can be called again
#[utoipa::path(
    delete,
    path = "/api/calls/history",
    responses(
        (status = 200, description = "History cleared", body = ClearedResponse)
    ),
    tag = "Call"
)]
pub async fn clear_history(State(state): State<AppState>) -> Json<ClearedResponse> {
    Json(ClearedResponse {
        cleared: state.sequencer.clear_first_call_history(),
    })
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/calls", post(call_ticket))
        .route("/api/calls/recall", post(recall_ticket))
        .route("/api/calls/status", get(get_status))
        .route("/api/calls/start", post(start_sequencer))
        .route("/api/calls/stop", post(stop_sequencer))
        .route("/api/calls/history", delete(clear_history))
}
