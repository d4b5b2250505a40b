//! Ticket and Counter
//!
//! Owned by the ticket/department CRUD store; this core only reads them
//! and applies the call state transition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::{CounterStatus, Priority, TicketStatus};

/// Ticket - a patient's place in a department queue
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ticket {
    pub id: Uuid,
    pub ticket_number: String,
    pub priority: Priority,
    pub status: TicketStatus,
    pub department_id: Uuid,
    pub assigned_counter: Option<Uuid>,
    pub called_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Counter - a service desk inside a department
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Counter {
    pub id: Uuid,
    pub counter_number: i32,
    pub department_id: Uuid,
    pub status: CounterStatus,
    pub current_ticket: Option<Uuid>,
    pub last_activity: Option<DateTime<Utc>>,
}

impl Ticket {
    /// Create a waiting ticket
    pub fn new(ticket_number: impl Into<String>, priority: Priority, department_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            ticket_number: ticket_number.into(),
            priority,
            status: TicketStatus::Waiting,
            department_id,
            assigned_counter: None,
            called_at: None,
            created_at: Utc::now(),
        }
    }

    /// First-call transition
    pub fn mark_called(&mut self, counter_id: Uuid, at: DateTime<Utc>) {
        self.status = TicketStatus::Called;
        self.assigned_counter = Some(counter_id);
        self.called_at = Some(at);
    }
}

impl Counter {
    /// Create an available counter
    pub fn new(counter_number: i32, department_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            counter_number,
            department_id,
            status: CounterStatus::Available,
            current_ticket: None,
            last_activity: None,
        }
    }

    /// Counter takes the called ticket
    pub fn assign(&mut self, ticket_id: Uuid, at: DateTime<Utc>) {
        self.status = CounterStatus::Busy;
        self.current_ticket = Some(ticket_id);
        self.last_activity = Some(at);
    }

    pub fn touch(&mut self, at: DateTime<Utc>) {
        self.last_activity = Some(at);
    }
}
