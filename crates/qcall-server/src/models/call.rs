//! Call - Call/recall requests and sequencer administration

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::{EnqueueOutcome, QueueStatus};

/// Call or recall a ticket at a counter
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueCallRequest {
    pub ticket_id: Uuid,
    pub counter_id: Uuid,
    /// Which counter screen or interface issued the call
    pub source_label: Option<String>,
}

/// A persisted call request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CallRequestView {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub counter_id: Uuid,
    pub ticket_number: String,
    pub counter_number: i32,
    pub is_recall: bool,
    pub priority: String,
    pub status: String,
    pub requested_at: DateTime<Utc>,
    pub source_label: String,
}

impl From<qcall::CallRequest> for CallRequestView {
    fn from(request: qcall::CallRequest) -> Self {
        Self {
            id: request.id,
            ticket_id: request.ticket_id,
            counter_id: request.counter_id,
            ticket_number: request.ticket_number,
            counter_number: request.counter_number,
            is_recall: request.is_recall,
            priority: request.priority.to_string(),
            status: request.status.to_string(),
            requested_at: request.requested_at,
            source_label: request.source_label,
        }
    }
}

/// What happened to an enqueue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EnqueueResult {
    Queued,
    AlreadyQueued,
    Duplicate,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueCallResponse {
    pub result: EnqueueResult,
    /// The new or already waiting request; absent for duplicates
    pub request: Option<CallRequestView>,
}

impl From<EnqueueOutcome> for EnqueueCallResponse {
    fn from(outcome: EnqueueOutcome) -> Self {
        match outcome {
            EnqueueOutcome::Queued(request) => Self {
                result: EnqueueResult::Queued,
                request: Some(request.into()),
            },
            EnqueueOutcome::AlreadyQueued(request) => Self {
                result: EnqueueResult::AlreadyQueued,
                request: Some(request.into()),
            },
            EnqueueOutcome::Duplicate => Self {
                result: EnqueueResult::Duplicate,
                request: None,
            },
        }
    }
}

/// Sequencer diagnostics
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueueStatusResponse {
    pub pending: u64,
    pub processing: u64,
    pub failed: u64,
    pub is_running: bool,
    pub is_processing: bool,
    pub consecutive_failures: u32,
    pub first_call_records: usize,
}

impl From<QueueStatus> for QueueStatusResponse {
    fn from(status: QueueStatus) -> Self {
        Self {
            pending: status.pending,
            processing: status.processing,
            failed: status.failed,
            is_running: status.is_running,
            is_processing: status.is_processing,
            consecutive_failures: status.consecutive_failures,
            first_call_records: status.first_call_records,
        }
    }
}

/// Result of start/stop
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SequencerStateResponse {
    pub running: bool,
    /// Whether the call changed anything
    pub changed: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ClearedResponse {
    pub cleared: usize,
}
