//! PostgreSQL implementation of ScriptRepository

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use callflow::{DomainError, Script, ScriptFlow, ScriptRepository};

/// PostgreSQL implementation of ScriptRepository
pub struct PgScriptRepository {
    pool: PgPool,
}

impl PgScriptRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Internal row type for sqlx mapping
#[derive(sqlx::FromRow)]
struct ScriptRow {
    id: Uuid,
    name: String,
    flow: serde_json::Value,
    language: String,
    voice: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<ScriptRow> for Script {
    type Error = DomainError;

    fn try_from(row: ScriptRow) -> Result<Self, Self::Error> {
        let flow: ScriptFlow = serde_json::from_value(row.flow).map_err(|e| {
            DomainError::Repository(format!("script {} has a malformed flow: {}", row.id, e))
        })?;

        Ok(Self {
            id: row.id,
            name: row.name,
            flow,
            language: row.language,
            voice: row.voice,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl ScriptRepository for PgScriptRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Script>, DomainError> {
        let row = sqlx::query_as::<_, ScriptRow>("SELECT * FROM scripts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::Repository(e.to_string()))?;

        row.map(TryInto::try_into).transpose()
    }

    async fn find_all(&self) -> Result<Vec<Script>, DomainError> {
        let rows = sqlx::query_as::<_, ScriptRow>("SELECT * FROM scripts ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::Repository(e.to_string()))?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn save(&self, script: &Script) -> Result<Script, DomainError> {
        let flow_json = serde_json::to_value(&script.flow)
            .map_err(|e| DomainError::Repository(e.to_string()))?;

        let row = sqlx::query_as::<_, ScriptRow>(
            r#"
            INSERT INTO scripts (id, name, flow, language, voice, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE
            SET name = EXCLUDED.name, flow = EXCLUDED.flow,
                language = EXCLUDED.language, voice = EXCLUDED.voice
            RETURNING *
            "#,
        )
        .bind(script.id)
        .bind(&script.name)
        .bind(&flow_json)
        .bind(&script.language)
        .bind(&script.voice)
        .bind(script.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::Repository(e.to_string()))?;

        row.try_into()
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        let result = sqlx::query("DELETE FROM scripts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::Repository(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}
