//! Script DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use callflow::{Script, ScriptFlow};

/// Request to save a script
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateScriptRequest {
    pub name: String,
    /// `{ steps: [{ message, expectedDigits, timeout, validation?, onInvalid? }], finalMessage }`
    #[schema(value_type = Object)]
    pub flow: ScriptFlow,
    /// Speech language tag (default: en-US)
    pub language: Option<String>,
    /// Speech voice name (default: Joey)
    pub voice: Option<String>,
}

/// Script response
#[derive(Debug, Serialize, ToSchema)]
pub struct ScriptResponse {
    pub id: Uuid,
    pub name: String,
    #[schema(value_type = Object)]
    pub flow: ScriptFlow,
    pub step_count: usize,
    pub language: String,
    pub voice: String,
    pub created_at: DateTime<Utc>,
}

impl ScriptResponse {
    pub fn from_domain(script: Script) -> Self {
        Self {
            id: script.id,
            name: script.name,
            step_count: script.flow.len(),
            flow: script.flow,
            language: script.language,
            voice: script.voice,
            created_at: script.created_at,
        }
    }
}
