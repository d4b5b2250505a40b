//! CallRequest - Pending announcement of a ticket at a counter
//!
//! Pure domain entity without infrastructure dependencies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Counter, Ticket};
use crate::domain::value_objects::{CallKind, Priority, RequestStatus};

/// CallRequest - one call or recall waiting for the sequencer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallRequest {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub counter_id: Uuid,
    /// Snapshot of the ticket number at enqueue time
    pub ticket_number: String,
    /// Snapshot of the counter number at enqueue time
    pub counter_number: i32,
    pub department_id: Option<Uuid>,
    pub kind: CallKind,
    /// Mirrors `kind` for fast filtering
    pub is_recall: bool,
    pub priority: Priority,
    pub status: RequestStatus,
    pub requested_at: DateTime<Utc>,
    pub processing_started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    /// Which counter or interface issued the request (diagnostics only)
    pub source_label: String,
}

impl CallRequest {
    /// Create a new pending request, inheriting the ticket's priority
    pub fn new(ticket: &Ticket, counter: &Counter, kind: CallKind, source_label: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            ticket_id: ticket.id,
            counter_id: counter.id,
            ticket_number: ticket.ticket_number.clone(),
            counter_number: counter.counter_number,
            department_id: Some(ticket.department_id),
            kind,
            is_recall: kind.is_recall(),
            priority: ticket.priority,
            status: RequestStatus::Pending,
            requested_at: Utc::now(),
            processing_started_at: None,
            completed_at: None,
            error: None,
            source_label,
        }
    }

    /// Mark request as taken by the sequencer
    pub fn start_processing(&mut self, at: DateTime<Utc>) {
        self.status = RequestStatus::Processing;
        self.processing_started_at = Some(at);
    }

    /// Put a request left in `processing` back in line
    pub fn requeue(&mut self) {
        self.status = RequestStatus::Pending;
        self.processing_started_at = None;
    }

    /// Whether this request still stands in for a new first call of its
    /// ticket. A `processing` request that started before
    /// `processing_since` is orphaned and no longer counts.
    pub fn is_active_since(&self, processing_since: DateTime<Utc>) -> bool {
        match self.status {
            RequestStatus::Pending => true,
            RequestStatus::Processing => self
                .processing_started_at
                .is_some_and(|started| started >= processing_since),
            RequestStatus::Failed => false,
        }
    }

    /// Mark request as failed
    pub fn fail(&mut self, error: String) {
        self.status = RequestStatus::Failed;
        self.error = Some(error);
        self.completed_at = Some(Utc::now());
    }

    /// Room for counter-scoped broadcasts
    pub fn counter_room(&self) -> crate::domain::events::Room {
        crate::domain::events::Room::Counter(self.counter_number)
    }
}

/// Counts of requests by status
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueueCounts {
    pub pending: u64,
    pub processing: u64,
    pub failed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_request_inherits_ticket_priority() {
        let department = Uuid::new_v4();
        let ticket = Ticket::new("E007", Priority::Emergency, department);
        let counter = Counter::new(4, department);

        let request = CallRequest::new(&ticket, &counter, CallKind::Recall, "counter-4".into());

        assert_eq!(request.priority, Priority::Emergency);
        assert_eq!(request.status, RequestStatus::Pending);
        assert!(request.is_recall);
        assert_eq!(request.ticket_number, "E007");
        assert_eq!(request.counter_number, 4);
    }

    #[test]
    fn test_fail_records_error() {
        let department = Uuid::new_v4();
        let ticket = Ticket::new("A001", Priority::Normal, department);
        let counter = Counter::new(1, department);
        let mut request = CallRequest::new(&ticket, &counter, CallKind::Call, "test".into());

        request.start_processing(Utc::now());
        assert_eq!(request.status, RequestStatus::Processing);

        request.fail("store unreachable".into());
        assert_eq!(request.status, RequestStatus::Failed);
        assert_eq!(request.error.as_deref(), Some("store unreachable"));
        assert!(request.completed_at.is_some());
    }

    #[test]
    fn test_orphaned_processing_request_is_not_active() {
        let department = Uuid::new_v4();
        let ticket = Ticket::new("A002", Priority::Normal, department);
        let counter = Counter::new(1, department);
        let mut request = CallRequest::new(&ticket, &counter, CallKind::Call, "test".into());
        let cutoff = Utc::now() - chrono::Duration::minutes(1);

        assert!(request.is_active_since(cutoff));

        request.start_processing(Utc::now());
        assert!(request.is_active_since(cutoff));

        request.start_processing(cutoff - chrono::Duration::seconds(1));
        assert!(!request.is_active_since(cutoff));

        request.requeue();
        assert_eq!(request.status, RequestStatus::Pending);
        assert!(request.processing_started_at.is_none());
        assert!(request.is_active_since(cutoff));
    }
}
