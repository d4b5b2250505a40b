//! PostgreSQL implementation of CallRequestRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use qcall::{CallKind, CallRequest, CallRequestRepository, DomainError, QueueCounts};

/// PostgreSQL implementation of CallRequestRepository
pub struct PgCallRequestRepository {
    pool: PgPool,
}

impl PgCallRequestRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Internal row type for sqlx mapping
#[derive(sqlx::FromRow)]
struct CallRequestRow {
    id: Uuid,
    ticket_id: Uuid,
    counter_id: Uuid,
    ticket_number: String,
    counter_number: i32,
    department_id: Option<Uuid>,
    kind: String,
    is_recall: bool,
    priority: String,
    status: String,
    requested_at: DateTime<Utc>,
    processing_started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    error: Option<String>,
    source_label: String,
}

impl TryFrom<CallRequestRow> for CallRequest {
    type Error = DomainError;

    fn try_from(row: CallRequestRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            ticket_id: row.ticket_id,
            counter_id: row.counter_id,
            ticket_number: row.ticket_number,
            counter_number: row.counter_number,
            department_id: row.department_id,
            kind: row.kind.parse().map_err(DomainError::Repository)?,
            is_recall: row.is_recall,
            priority: row.priority.parse().map_err(DomainError::Repository)?,
            status: row.status.parse().map_err(DomainError::Repository)?,
            requested_at: row.requested_at,
            processing_started_at: row.processing_started_at,
            completed_at: row.completed_at,
            error: row.error,
            source_label: row.source_label,
        })
    }
}

const COLUMNS: &str = "id, ticket_id, counter_id, ticket_number, counter_number, department_id, \
     kind, is_recall, priority, status, requested_at, processing_started_at, completed_at, \
     error, source_label";

#[async_trait]
impl CallRequestRepository for PgCallRequestRepository {
    async fn insert(&self, request: &CallRequest) -> Result<CallRequest, DomainError> {
        let row = sqlx::query_as::<_, CallRequestRow>(&format!(
            r#"
            INSERT INTO call_requests (
                id, ticket_id, counter_id, ticket_number, counter_number, department_id,
                kind, is_recall, priority, priority_rank, status, requested_at, source_label
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(request.id)
        .bind(request.ticket_id)
        .bind(request.counter_id)
        .bind(&request.ticket_number)
        .bind(request.counter_number)
        .bind(request.department_id)
        .bind(request.kind.as_str())
        .bind(request.is_recall)
        .bind(request.priority.as_str())
        .bind(request.priority.rank())
        .bind(request.status.as_str())
        .bind(request.requested_at)
        .bind(&request.source_label)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::Repository(e.to_string()))?;

        row.try_into()
    }

    async fn find_active(
        &self,
        ticket_id: Uuid,
        kind: CallKind,
        processing_since: DateTime<Utc>,
    ) -> Result<Option<CallRequest>, DomainError> {
        let row = sqlx::query_as::<_, CallRequestRow>(&format!(
            r#"
            SELECT {}
            FROM call_requests
            WHERE ticket_id = $1 AND kind = $2
              AND (status = 'pending'
                   OR (status = 'processing' AND processing_started_at >= $3))
            ORDER BY requested_at ASC
            LIMIT 1
            "#,
            COLUMNS
        ))
        .bind(ticket_id)
        .bind(kind.as_str())
        .bind(processing_since)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::Repository(e.to_string()))?;

        row.map(TryInto::try_into).transpose()
    }

    async fn find_next_pending(&self) -> Result<Option<CallRequest>, DomainError> {
        let row = sqlx::query_as::<_, CallRequestRow>(&format!(
            r#"
            SELECT {}
            FROM call_requests
            WHERE status = 'pending'
            ORDER BY priority_rank DESC, requested_at ASC
            LIMIT 1
            "#,
            COLUMNS
        ))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::Repository(e.to_string()))?;

        row.map(TryInto::try_into).transpose()
    }

    async fn update(&self, request: &CallRequest) -> Result<CallRequest, DomainError> {
        let row = sqlx::query_as::<_, CallRequestRow>(&format!(
            r#"
            UPDATE call_requests
            SET status = $2, processing_started_at = $3, completed_at = $4, error = $5
            WHERE id = $1
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(request.id)
        .bind(request.status.as_str())
        .bind(request.processing_started_at)
        .bind(request.completed_at)
        .bind(&request.error)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::Repository(e.to_string()))?
        .ok_or_else(|| DomainError::not_found("CallRequest", request.id))?;

        row.try_into()
    }

    async fn reset_processing(&self) -> Result<u64, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE call_requests
            SET status = 'pending', processing_started_at = NULL
            WHERE status = 'processing'
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::Repository(e.to_string()))?;

        Ok(result.rows_affected())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        let result = sqlx::query("DELETE FROM call_requests WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::Repository(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_by_status(&self) -> Result<QueueCounts, DomainError> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT status, COUNT(*) FROM call_requests GROUP BY status",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::Repository(e.to_string()))?;

        let mut counts = QueueCounts::default();
        for (status, count) in rows {
            let count = count.max(0) as u64;
            match status.as_str() {
                "pending" => counts.pending = count,
                "processing" => counts.processing = count,
                "failed" => counts.failed = count,
                other => tracing::warn!(status = other, "Unknown call request status in store"),
            }
        }

        Ok(counts)
    }

    async fn purge_requested_before(&self, cutoff: DateTime<Utc>) -> Result<u64, DomainError> {
        let result = sqlx::query("DELETE FROM call_requests WHERE requested_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::Repository(e.to_string()))?;

        Ok(result.rows_affected())
    }
}
