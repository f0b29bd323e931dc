//! Call DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use callflow::{CallEvent, CallSession, CallStats, ScriptFlow};

use crate::application::InitiateCall;

/// Request to place a scripted call
///
/// Exactly one of `script_id` and `flow` must be given.
#[derive(Debug, Deserialize, ToSchema)]
pub struct InitiateCallRequest {
    /// Number to dial (E.164 without the plus works with Vonage)
    pub phone_number: String,
    /// Saved script to run
    pub script_id: Option<Uuid>,
    /// Inline flow to run instead of a saved script
    #[schema(value_type = Option<Object>)]
    pub flow: Option<ScriptFlow>,
    pub language: Option<String>,
    pub voice: Option<String>,
    #[serde(default)]
    pub recording_enabled: bool,
    /// Receives a notification when the call ends or is escalated
    pub status_callback_url: Option<String>,
}

impl InitiateCallRequest {
    pub fn into_command(self) -> InitiateCall {
        InitiateCall {
            phone_number: self.phone_number,
            script_id: self.script_id,
            flow: self.flow,
            language: self.language,
            voice: self.voice,
            recording_enabled: self.recording_enabled,
            status_callback_url: self.status_callback_url,
        }
    }
}

/// Query parameters for listing calls
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListCallsQuery {
    /// Filter by status (ringing, in-progress, awaiting-input, completed, failed, escalated, hung-up)
    pub status: Option<String>,
    /// Maximum results (default: 50)
    pub limit: Option<i64>,
}

/// Digits accepted for one step
#[derive(Debug, Serialize, ToSchema)]
pub struct CollectedInputResponse {
    pub step: usize,
    pub digits: String,
    pub received_at: DateTime<Utc>,
}

/// Call session response
#[derive(Debug, Serialize, ToSchema)]
pub struct CallResponse {
    pub call_id: String,
    pub phone_number: String,
    pub script_id: Option<Uuid>,
    pub status: String,
    pub current_step: usize,
    pub total_steps: usize,
    pub collected: Vec<CollectedInputResponse>,
    pub invalid_attempts: u32,
    pub recording_enabled: bool,
    pub recording_url: Option<String>,
    pub status_callback_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl CallResponse {
    pub fn from_domain(session: CallSession) -> Self {
        Self {
            status: session.status.to_string(),
            total_steps: session.flow.len(),
            collected: session
                .collected
                .into_iter()
                .map(|c| CollectedInputResponse {
                    step: c.step,
                    digits: c.digits,
                    received_at: c.received_at,
                })
                .collect(),
            call_id: session.call_id,
            phone_number: session.phone_number,
            script_id: session.script_id,
            current_step: session.current_step,
            invalid_attempts: session.invalid_attempts,
            recording_enabled: session.recording_enabled,
            recording_url: session.recording_url,
            status_callback_url: session.status_callback_url,
            created_at: session.created_at,
            updated_at: session.updated_at,
            ended_at: session.ended_at,
        }
    }
}

/// Audit event
#[derive(Debug, Serialize, ToSchema)]
pub struct CallEventResponse {
    pub id: Uuid,
    pub kind: String,
    pub data: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl CallEventResponse {
    pub fn from_domain(event: CallEvent) -> Self {
        Self {
            id: event.id,
            kind: event.kind.as_str().to_string(),
            data: event.data,
            created_at: event.created_at,
        }
    }
}

/// Session with its audit trail
#[derive(Debug, Serialize, ToSchema)]
pub struct CallDetailResponse {
    pub call: CallResponse,
    pub events: Vec<CallEventResponse>,
}

/// Call outcome counts
#[derive(Debug, Serialize, ToSchema)]
pub struct StatsResponse {
    pub total: i64,
    pub active: i64,
    pub completed: i64,
    pub failed: i64,
    pub hung_up: i64,
    pub escalated: i64,
    /// Completed share of all calls, in percent
    pub success_rate: f64,
}

impl StatsResponse {
    pub fn from_domain(stats: CallStats) -> Self {
        Self {
            success_rate: stats.success_rate(),
            total: stats.total,
            active: stats.active,
            completed: stats.completed,
            failed: stats.failed,
            hung_up: stats.hung_up,
            escalated: stats.escalated,
        }
    }
}
