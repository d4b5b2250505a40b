//! In-memory Ticket and Counter store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use qcall::{Counter, CounterRepository, DomainError, Ticket, TicketRepository};

#[derive(Default)]
pub struct InMemoryTicketStore {
    tickets: Mutex<HashMap<Uuid, Ticket>>,
    counters: Mutex<HashMap<Uuid, Counter>>,
}

impl InMemoryTicketStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_ticket(&self, ticket: Ticket) -> Ticket {
        self.tickets
            .lock()
            .unwrap()
            .insert(ticket.id, ticket.clone());
        ticket
    }

    pub fn add_counter(&self, counter: Counter) -> Counter {
        self.counters
            .lock()
            .unwrap()
            .insert(counter.id, counter.clone());
        counter
    }

    pub fn ticket(&self, id: Uuid) -> Option<Ticket> {
        self.tickets.lock().unwrap().get(&id).cloned()
    }

    pub fn counter(&self, id: Uuid) -> Option<Counter> {
        self.counters.lock().unwrap().get(&id).cloned()
    }
}

#[async_trait]
impl TicketRepository for InMemoryTicketStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Ticket>, DomainError> {
        Ok(self.ticket(id))
    }

    async fn mark_called(
        &self,
        ticket_id: Uuid,
        counter_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Ticket, DomainError> {
        let mut tickets = self.tickets.lock().unwrap();
        let ticket = tickets
            .get_mut(&ticket_id)
            .ok_or_else(|| DomainError::not_found("Ticket", ticket_id))?;
        ticket.mark_called(counter_id, at);
        Ok(ticket.clone())
    }
}

#[async_trait]
impl CounterRepository for InMemoryTicketStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Counter>, DomainError> {
        Ok(self.counter(id))
    }

    async fn assign_ticket(
        &self,
        counter_id: Uuid,
        ticket_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Counter, DomainError> {
        let mut counters = self.counters.lock().unwrap();
        let counter = counters
            .get_mut(&counter_id)
            .ok_or_else(|| DomainError::not_found("Counter", counter_id))?;
        counter.assign(ticket_id, at);
        Ok(counter.clone())
    }

    async fn touch(&self, counter_id: Uuid, at: DateTime<Utc>) -> Result<(), DomainError> {
        let mut counters = self.counters.lock().unwrap();
        let counter = counters
            .get_mut(&counter_id)
            .ok_or_else(|| DomainError::not_found("Counter", counter_id))?;
        counter.touch(at);
        Ok(())
    }
}
