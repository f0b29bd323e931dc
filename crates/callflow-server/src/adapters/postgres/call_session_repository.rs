//! PostgreSQL implementation of CallSessionRepository
//!
//! Session rows and their events are written in one transaction. Updates
//! only land when the row's `version` still matches the loaded session.

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use callflow::{
    CallEvent, CallEventKind, CallSession, CallSessionRepository, CallStats, CallStatus,
    CollectedInput, DomainError, ScriptFlow,
};

/// PostgreSQL implementation of CallSessionRepository
pub struct PgCallSessionRepository {
    pool: PgPool,
}

impl PgCallSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn repo_err(e: impl std::fmt::Display) -> DomainError {
    DomainError::Repository(e.to_string())
}

/// Internal row type for sqlx mapping
#[derive(sqlx::FromRow)]
struct CallSessionRow {
    call_id: String,
    phone_number: String,
    script_id: Option<Uuid>,
    flow: serde_json::Value,
    language: String,
    voice: String,
    current_step: i32,
    collected: serde_json::Value,
    status: String,
    invalid_attempts: i32,
    recording_enabled: bool,
    recording_url: Option<String>,
    status_callback_url: Option<String>,
    version: i64,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
    ended_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl TryFrom<CallSessionRow> for CallSession {
    type Error = DomainError;

    fn try_from(row: CallSessionRow) -> Result<Self, Self::Error> {
        let flow: ScriptFlow = serde_json::from_value(row.flow).map_err(repo_err)?;
        let collected: Vec<CollectedInput> =
            serde_json::from_value(row.collected).map_err(repo_err)?;
        let status: CallStatus = row.status.parse().map_err(DomainError::Repository)?;

        Ok(Self {
            call_id: row.call_id,
            phone_number: row.phone_number,
            script_id: row.script_id,
            flow,
            language: row.language,
            voice: row.voice,
            current_step: usize::try_from(row.current_step).map_err(repo_err)?,
            collected,
            status,
            invalid_attempts: u32::try_from(row.invalid_attempts).map_err(repo_err)?,
            recording_enabled: row.recording_enabled,
            recording_url: row.recording_url,
            status_callback_url: row.status_callback_url,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
            ended_at: row.ended_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CallEventRow {
    id: Uuid,
    call_id: String,
    kind: String,
    data: serde_json::Value,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<CallEventRow> for CallEvent {
    type Error = DomainError;

    fn try_from(row: CallEventRow) -> Result<Self, Self::Error> {
        let kind: CallEventKind = row.kind.parse().map_err(DomainError::Repository)?;
        Ok(Self {
            id: row.id,
            call_id: row.call_id,
            kind,
            data: row.data,
            created_at: row.created_at,
        })
    }
}

async fn insert_events(conn: &mut PgConnection, events: &[CallEvent]) -> Result<(), DomainError> {
    for event in events {
        sqlx::query(
            "INSERT INTO call_events (id, call_id, kind, data, created_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(event.id)
        .bind(&event.call_id)
        .bind(event.kind.as_str())
        .bind(&event.data)
        .bind(event.created_at)
        .execute(&mut *conn)
        .await
        .map_err(repo_err)?;
    }
    Ok(())
}

#[async_trait]
impl CallSessionRepository for PgCallSessionRepository {
    async fn find_by_call_id(&self, call_id: &str) -> Result<Option<CallSession>, DomainError> {
        let row =
            sqlx::query_as::<_, CallSessionRow>("SELECT * FROM call_sessions WHERE call_id = $1")
                .bind(call_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(repo_err)?;

        row.map(TryInto::try_into).transpose()
    }

    async fn insert(
        &self,
        session: &CallSession,
        events: &[CallEvent],
    ) -> Result<CallSession, DomainError> {
        let flow_json = serde_json::to_value(&session.flow).map_err(repo_err)?;
        let collected_json = serde_json::to_value(&session.collected).map_err(repo_err)?;

        let mut tx = self.pool.begin().await.map_err(repo_err)?;

        let row = sqlx::query_as::<_, CallSessionRow>(
            r#"
            INSERT INTO call_sessions (
                call_id, phone_number, script_id, flow, language, voice, current_step,
                collected, status, invalid_attempts, recording_enabled, recording_url,
                status_callback_url, version, created_at, updated_at, ended_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, 0, $14, $15, $16)
            RETURNING *
            "#,
        )
        .bind(&session.call_id)
        .bind(&session.phone_number)
        .bind(session.script_id)
        .bind(&flow_json)
        .bind(&session.language)
        .bind(&session.voice)
        .bind(session.current_step as i32)
        .bind(&collected_json)
        .bind(session.status.as_str())
        .bind(session.invalid_attempts as i32)
        .bind(session.recording_enabled)
        .bind(&session.recording_url)
        .bind(&session.status_callback_url)
        .bind(session.created_at)
        .bind(session.updated_at)
        .bind(session.ended_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db) = &e {
                if db.is_unique_violation() {
                    return DomainError::Conflict(format!(
                        "call {} already exists",
                        session.call_id
                    ));
                }
            }
            repo_err(e)
        })?;

        insert_events(&mut tx, events).await?;
        tx.commit().await.map_err(repo_err)?;

        row.try_into()
    }

    async fn update(
        &self,
        session: &CallSession,
        events: &[CallEvent],
    ) -> Result<CallSession, DomainError> {
        let collected_json = serde_json::to_value(&session.collected).map_err(repo_err)?;

        let mut tx = self.pool.begin().await.map_err(repo_err)?;

        let row = sqlx::query_as::<_, CallSessionRow>(
            r#"
            UPDATE call_sessions
            SET current_step = $3, collected = $4, status = $5, invalid_attempts = $6,
                recording_enabled = $7, recording_url = $8, updated_at = $9, ended_at = $10,
                version = version + 1
            WHERE call_id = $1 AND version = $2
            RETURNING *
            "#,
        )
        .bind(&session.call_id)
        .bind(session.version)
        .bind(session.current_step as i32)
        .bind(&collected_json)
        .bind(session.status.as_str())
        .bind(session.invalid_attempts as i32)
        .bind(session.recording_enabled)
        .bind(&session.recording_url)
        .bind(session.updated_at)
        .bind(session.ended_at)
        .fetch_optional(&mut *tx)
        .await
        .map_err(repo_err)?;

        // Dropping the transaction rolls it back
        let row = row.ok_or_else(|| DomainError::stale_session(&session.call_id, session.version))?;

        insert_events(&mut tx, events).await?;
        tx.commit().await.map_err(repo_err)?;

        row.try_into()
    }

    async fn append_events(&self, events: &[CallEvent]) -> Result<(), DomainError> {
        if events.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await.map_err(repo_err)?;
        insert_events(&mut tx, events).await?;
        tx.commit().await.map_err(repo_err)
    }

    async fn find_recent(
        &self,
        status: Option<CallStatus>,
        limit: i64,
    ) -> Result<Vec<CallSession>, DomainError> {
        let rows = sqlx::query_as::<_, CallSessionRow>(
            r#"
            SELECT * FROM call_sessions
            WHERE ($1::TEXT IS NULL OR status = $1)
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(status.map(|s| s.as_str()))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(repo_err)?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn find_events(&self, call_id: &str) -> Result<Vec<CallEvent>, DomainError> {
        let rows = sqlx::query_as::<_, CallEventRow>(
            "SELECT * FROM call_events WHERE call_id = $1 ORDER BY created_at ASC",
        )
        .bind(call_id)
        .fetch_all(&self.pool)
        .await
        .map_err(repo_err)?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn stats(&self) -> Result<CallStats, DomainError> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT status, COUNT(*) FROM call_sessions GROUP BY status",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(repo_err)?;

        let counts = rows
            .into_iter()
            .filter_map(|(status, count)| match status.parse::<CallStatus>() {
                Ok(status) => Some((status, count)),
                Err(e) => {
                    tracing::warn!("Skipping calls with {}", e);
                    None
                }
            });

        Ok(CallStats::from_counts(counts))
    }
}
