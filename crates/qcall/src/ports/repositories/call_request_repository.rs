//! CallRequest Repository Port
//!
//! Abstract interface for the persistent request store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{errors::DomainError, CallKind, CallRequest, QueueCounts};

/// Repository interface for CallRequest entities
#[async_trait]
pub trait CallRequestRepository: Send + Sync {
    /// Insert a new request
    async fn insert(&self, request: &CallRequest) -> Result<CallRequest, DomainError>;

    /// Find a pending request for this ticket and kind, or a processing one
    /// started at or after `processing_since`
    async fn find_active(
        &self,
        ticket_id: Uuid,
        kind: CallKind,
        processing_since: DateTime<Utc>,
    ) -> Result<Option<CallRequest>, DomainError>;

    /// Next pending request: highest priority first, then oldest `requested_at`
    async fn find_next_pending(&self) -> Result<Option<CallRequest>, DomainError>;

    /// Persist status, timestamps and error of an existing request
    async fn update(&self, request: &CallRequest) -> Result<CallRequest, DomainError>;

    /// Return every processing request to pending. Returns how many moved.
    async fn reset_processing(&self) -> Result<u64, DomainError>;

    /// Delete a request by ID
    async fn delete(&self, id: Uuid) -> Result<bool, DomainError>;

    /// Count requests by status
    async fn count_by_status(&self) -> Result<QueueCounts, DomainError>;

    /// Delete every request requested before `cutoff`, whatever its status
    async fn purge_requested_before(&self, cutoff: DateTime<Utc>) -> Result<u64, DomainError>;
}
