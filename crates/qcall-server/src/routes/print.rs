//! Print Routes - Ticket slip jobs
//!
//! Printing is best effort: a queued job is never reported back as failed.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Local;

use crate::models::{ClearedResponse, CreatePrintJobRequest, PrintJobResponse, PrintStatusResponse};
use crate::AppState;
use qcall::PrintPayload;

/// Queue a ticket slip
#[utoipa::path(
    post,
    path = "/api/print/jobs",
    request_body = CreatePrintJobRequest,
    responses(
        (status = 202, description = "Slip queued for printing", body = PrintJobResponse),
        (status = 400, description = "Missing ticket number")
    ),
    tag = "Print"
)]
pub async fn create_print_job(
    State(state): State<AppState>,
    Json(payload): Json<CreatePrintJobRequest>,
) -> Result<(StatusCode, Json<PrintJobResponse>), (StatusCode, String)> {
    if payload.ticket_number.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "ticketNumber is required".to_string(),
        ));
    }

    let now = Local::now();
    let job_id = state.print_dispatcher.enqueue(PrintPayload {
        ticket_number: payload.ticket_number,
        department_name: payload.department_name,
        department_code: payload.department_code,
        date: payload
            .date
            .unwrap_or_else(|| now.format("%d/%m/%Y").to_string()),
        time: payload
            .time
            .unwrap_or_else(|| now.format("%I:%M %p").to_string()),
    });

    Ok((StatusCode::ACCEPTED, Json(PrintJobResponse { job_id })))
}

/// Print queue diagnostics
#[utoipa::path(
    get,
    path = "/api/print/status",
    responses(
        (status = 200, description = "Print queue status", body = PrintStatusResponse)
    ),
    tag = "Print"
)]
pub async fn get_print_status(State(state): State<AppState>) -> Json<PrintStatusResponse> {
    Json(state.print_dispatcher.status().into())
}

/// Drop every queued slip
#[utoipa::path(
    delete,
    path = "/api/print/jobs",
    responses(
        (status = 200, description = "Print queue cleared", body = ClearedResponse)
    ),
    tag = "Print"
)]
pub async fn clear_print_queue(State(state): State<AppState>) -> Json<ClearedResponse> {
    Json(ClearedResponse {
        cleared: state.print_dispatcher.clear_queue(),
    })
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/print/jobs", post(create_print_job).delete(clear_print_queue))
        .route("/api/print/status", get(get_print_status))
}
