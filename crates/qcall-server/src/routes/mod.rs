//! qcall API Routes
//!
//! - /api/calls - Call and recall requests, sequencer administration
//! - /api/print - Ticket slip printing
//! - /events - Server-Sent Events for displays and counter screens

pub mod call;
pub mod events;
pub mod print;
pub mod swagger;

use axum::http::StatusCode;
use qcall::DomainError;

/// Map a domain error onto an HTTP error response
pub(crate) fn error_response(error: DomainError) -> (StatusCode, String) {
    let status = match &error {
        DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
        DomainError::Validation(_) => StatusCode::BAD_REQUEST,
        DomainError::Conflict(_) => StatusCode::CONFLICT,
        DomainError::Repository(_) | DomainError::ExternalService(_) | DomainError::Timeout(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, error.to_string())
}
