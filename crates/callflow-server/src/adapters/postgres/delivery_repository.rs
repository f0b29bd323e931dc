//! PostgreSQL implementation of DeliveryTaskRepository

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use callflow::{DeliveryStatus, DeliveryTask, DeliveryTaskRepository, DomainError};

/// PostgreSQL implementation of DeliveryTaskRepository
pub struct PgDeliveryTaskRepository {
    pool: PgPool,
}

impl PgDeliveryTaskRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Internal row type for sqlx mapping
#[derive(sqlx::FromRow)]
struct DeliveryTaskRow {
    id: Uuid,
    kind: String,
    payload: serde_json::Value,
    url: String,
    status: String,
    retry_count: i32,
    max_retries: i32,
    next_attempt_at: DateTime<Utc>,
    last_error: Option<String>,
    last_status_code: Option<i32>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<DeliveryTaskRow> for DeliveryTask {
    type Error = DomainError;

    fn try_from(row: DeliveryTaskRow) -> Result<Self, Self::Error> {
        let status: DeliveryStatus = row.status.parse().map_err(DomainError::Repository)?;

        Ok(Self {
            id: row.id,
            kind: row.kind,
            payload: row.payload,
            url: row.url,
            status,
            retry_count: row.retry_count,
            max_retries: row.max_retries,
            next_attempt_at: row.next_attempt_at,
            last_error: row.last_error,
            last_status_code: row.last_status_code,
            created_at: row.created_at,
            updated_at: row.updated_at,
            completed_at: row.completed_at,
        })
    }
}

#[async_trait]
impl DeliveryTaskRepository for PgDeliveryTaskRepository {
    async fn insert(&self, task: &DeliveryTask) -> Result<DeliveryTask, DomainError> {
        let row = sqlx::query_as::<_, DeliveryTaskRow>(
            r#"
            INSERT INTO delivery_tasks (
                id, kind, payload, url, status, retry_count, max_retries, next_attempt_at,
                last_error, last_status_code, created_at, updated_at, completed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            "#,
        )
        .bind(task.id)
        .bind(&task.kind)
        .bind(&task.payload)
        .bind(&task.url)
        .bind(task.status.as_str())
        .bind(task.retry_count)
        .bind(task.max_retries)
        .bind(task.next_attempt_at)
        .bind(&task.last_error)
        .bind(task.last_status_code)
        .bind(task.created_at)
        .bind(task.updated_at)
        .bind(task.completed_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::Repository(e.to_string()))?;

        row.try_into()
    }

    async fn update(&self, task: &DeliveryTask) -> Result<DeliveryTask, DomainError> {
        let row = sqlx::query_as::<_, DeliveryTaskRow>(
            r#"
            UPDATE delivery_tasks
            SET status = $2, retry_count = $3, next_attempt_at = $4, last_error = $5,
                last_status_code = $6, updated_at = $7, completed_at = $8
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(task.id)
        .bind(task.status.as_str())
        .bind(task.retry_count)
        .bind(task.next_attempt_at)
        .bind(&task.last_error)
        .bind(task.last_status_code)
        .bind(task.updated_at)
        .bind(task.completed_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::Repository(e.to_string()))?
        .ok_or_else(|| DomainError::not_found("DeliveryTask", task.id))?;

        row.try_into()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<DeliveryTask>, DomainError> {
        let row =
            sqlx::query_as::<_, DeliveryTaskRow>("SELECT * FROM delivery_tasks WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| DomainError::Repository(e.to_string()))?;

        row.map(TryInto::try_into).transpose()
    }

    async fn find_recent(
        &self,
        status: Option<DeliveryStatus>,
        limit: i64,
    ) -> Result<Vec<DeliveryTask>, DomainError> {
        let rows = sqlx::query_as::<_, DeliveryTaskRow>(
            r#"
            SELECT * FROM delivery_tasks
            WHERE ($1::TEXT IS NULL OR status = $1)
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(status.map(|s| s.as_str()))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::Repository(e.to_string()))?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn claim_due(
        &self,
        now: DateTime<Utc>,
        limit: i64,
        lease: Duration,
    ) -> Result<Vec<DeliveryTask>, DomainError> {
        // Rows locked by a concurrent claimer are skipped, not waited on
        let rows = sqlx::query_as::<_, DeliveryTaskRow>(
            r#"
            UPDATE delivery_tasks
            SET next_attempt_at = $2, updated_at = $1
            WHERE id IN (
                SELECT id FROM delivery_tasks
                WHERE status = 'pending'
                  AND retry_count < max_retries
                  AND next_attempt_at <= $1
                ORDER BY next_attempt_at ASC
                LIMIT $3
                FOR UPDATE SKIP LOCKED
            )
            RETURNING *
            "#,
        )
        .bind(now)
        .bind(now + lease)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::Repository(e.to_string()))?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}
