//! PostgreSQL implementations of TicketRepository and CounterRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use qcall::{
    Counter, CounterRepository, CounterStatus, DomainError, Ticket, TicketRepository, TicketStatus,
};

/// PostgreSQL implementation of TicketRepository
pub struct PgTicketRepository {
    pool: PgPool,
}

impl PgTicketRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// PostgreSQL implementation of CounterRepository
pub struct PgCounterRepository {
    pool: PgPool,
}

impl PgCounterRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct TicketRow {
    id: Uuid,
    ticket_number: String,
    priority: String,
    status: String,
    department_id: Uuid,
    assigned_counter: Option<Uuid>,
    called_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<TicketRow> for Ticket {
    type Error = DomainError;

    fn try_from(row: TicketRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            ticket_number: row.ticket_number,
            priority: row.priority.parse().map_err(DomainError::Repository)?,
            status: row.status.parse().map_err(DomainError::Repository)?,
            department_id: row.department_id,
            assigned_counter: row.assigned_counter,
            called_at: row.called_at,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CounterRow {
    id: Uuid,
    counter_number: i32,
    department_id: Uuid,
    status: String,
    current_ticket: Option<Uuid>,
    last_activity: Option<DateTime<Utc>>,
}

impl TryFrom<CounterRow> for Counter {
    type Error = DomainError;

    fn try_from(row: CounterRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            counter_number: row.counter_number,
            department_id: row.department_id,
            status: row.status.parse().map_err(DomainError::Repository)?,
            current_ticket: row.current_ticket,
            last_activity: row.last_activity,
        })
    }
}

#[async_trait]
impl TicketRepository for PgTicketRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Ticket>, DomainError> {
        let row = sqlx::query_as::<_, TicketRow>("SELECT * FROM tickets WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::Repository(e.to_string()))?;

        row.map(TryInto::try_into).transpose()
    }

    async fn mark_called(
        &self,
        ticket_id: Uuid,
        counter_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Ticket, DomainError> {
        let row = sqlx::query_as::<_, TicketRow>(
            r#"
            UPDATE tickets
            SET status = $2, assigned_counter = $3, called_at = $4
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(ticket_id)
        .bind(TicketStatus::Called.as_str())
        .bind(counter_id)
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::Repository(e.to_string()))?
        .ok_or_else(|| DomainError::not_found("Ticket", ticket_id))?;

        row.try_into()
    }
}

#[async_trait]
impl CounterRepository for PgCounterRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Counter>, DomainError> {
        let row = sqlx::query_as::<_, CounterRow>("SELECT * FROM counters WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::Repository(e.to_string()))?;

        row.map(TryInto::try_into).transpose()
    }

    async fn assign_ticket(
        &self,
        counter_id: Uuid,
        ticket_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Counter, DomainError> {
        let row = sqlx::query_as::<_, CounterRow>(
            r#"
            UPDATE counters
            SET status = $2, current_ticket = $3, last_activity = $4
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(counter_id)
        .bind(CounterStatus::Busy.as_str())
        .bind(ticket_id)
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::Repository(e.to_string()))?
        .ok_or_else(|| DomainError::not_found("Counter", counter_id))?;

        row.try_into()
    }

    async fn touch(&self, counter_id: Uuid, at: DateTime<Utc>) -> Result<(), DomainError> {
        let result = sqlx::query("UPDATE counters SET last_activity = $2 WHERE id = $1")
            .bind(counter_id)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::Repository(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("Counter", counter_id));
        }
        Ok(())
    }
}
