//! Print - Ticket slip jobs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::PrintQueueStatus;

/// Slip to print. Date and time default to the server clock.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePrintJobRequest {
    pub ticket_number: String,
    pub department_name: String,
    #[serde(default)]
    pub department_code: String,
    pub date: Option<String>,
    pub time: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrintJobResponse {
    pub job_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrintStatusResponse {
    pub total: usize,
    pub pending: usize,
    pub processing: usize,
    pub failed: usize,
    pub is_processing: bool,
    pub is_running: bool,
}

impl From<PrintQueueStatus> for PrintStatusResponse {
    fn from(status: PrintQueueStatus) -> Self {
        Self {
            total: status.total,
            pending: status.pending,
            processing: status.processing,
            failed: status.failed,
            is_processing: status.is_processing,
            is_running: status.is_running,
        }
    }
}
