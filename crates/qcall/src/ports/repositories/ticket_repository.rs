//! Ticket and Counter Repository Ports
//!
//! Tickets and counters belong to the CRUD store. The calling core reads
//! them and writes only the fields touched by a call.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{errors::DomainError, Counter, Ticket};

/// Repository interface for Ticket entities
#[async_trait]
pub trait TicketRepository: Send + Sync {
    /// Find a Ticket by ID
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Ticket>, DomainError>;

    /// Set status `called`, the assigned counter and `called_at`
    async fn mark_called(
        &self,
        ticket_id: Uuid,
        counter_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Ticket, DomainError>;
}

/// Repository interface for Counter entities
#[async_trait]
pub trait CounterRepository: Send + Sync {
    /// Find a Counter by ID
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Counter>, DomainError>;

    /// Set status `busy`, the current ticket and `last_activity`
    async fn assign_ticket(
        &self,
        counter_id: Uuid,
        ticket_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Counter, DomainError>;

    /// Update `last_activity` only
    async fn touch(&self, counter_id: Uuid, at: DateTime<Utc>) -> Result<(), DomainError>;
}
