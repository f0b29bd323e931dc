//! CallSession - Durable per-call state
//!
//! Keyed by the identifier the telephony provider assigns when the call is
//! created. The session embeds a snapshot of its script flow, so a live call
//! never depends on the script still existing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::script::{Script, ScriptFlow, ScriptStep};
use crate::domain::value_objects::CallStatus;

/// Digits accepted for one step
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CollectedInput {
    pub step: usize,
    pub digits: String,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallSession {
    pub call_id: String,
    pub phone_number: String,
    pub script_id: Option<Uuid>,
    pub flow: ScriptFlow,
    pub language: String,
    pub voice: String,
    /// 0-based index into `flow.steps`
    pub current_step: usize,
    pub collected: Vec<CollectedInput>,
    pub status: CallStatus,
    /// Rejected entries for the current step
    pub invalid_attempts: u32,
    pub recording_enabled: bool,
    pub recording_url: Option<String>,
    /// Where lifecycle notifications are delivered, if anywhere
    pub status_callback_url: Option<String>,
    /// Optimistic concurrency token, bumped on every persisted change
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl CallSession {
    /// Create a new ringing session
    pub fn new(
        call_id: String,
        phone_number: String,
        flow: ScriptFlow,
        language: String,
        voice: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            call_id,
            phone_number,
            script_id: None,
            flow,
            language,
            voice,
            current_step: 0,
            collected: Vec::new(),
            status: CallStatus::Ringing,
            invalid_attempts: 0,
            recording_enabled: false,
            recording_url: None,
            status_callback_url: None,
            version: 0,
            created_at: now,
            updated_at: now,
            ended_at: None,
        }
    }

    /// Create a session driven by a saved script
    pub fn from_script(call_id: String, phone_number: String, script: &Script) -> Self {
        let mut session = Self::new(
            call_id,
            phone_number,
            script.flow.clone(),
            script.language.clone(),
            script.voice.clone(),
        );
        session.script_id = Some(script.id);
        session
    }

    pub fn with_recording(mut self, enabled: bool) -> Self {
        self.recording_enabled = enabled;
        self
    }

    pub fn with_status_callback(mut self, url: Option<String>) -> Self {
        self.status_callback_url = url.filter(|u| !u.trim().is_empty());
        self
    }

    pub fn current_step(&self) -> Option<&ScriptStep> {
        self.flow.step(self.current_step)
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Move to `status`, stamping the end time on terminal statuses
    pub fn transition_to(&mut self, status: CallStatus, now: DateTime<Utc>) {
        self.status = status;
        self.updated_at = now;
        if status.is_terminal() && self.ended_at.is_none() {
            self.ended_at = Some(now);
        }
    }

    /// Record accepted digits for the current step and move to the next one
    pub fn accept_digits(&mut self, digits: &str, now: DateTime<Utc>) {
        self.collected.push(CollectedInput {
            step: self.current_step,
            digits: digits.to_string(),
            received_at: now,
        });
        self.current_step += 1;
        self.invalid_attempts = 0;
        self.updated_at = now;
    }

    /// Whether every step has been answered
    pub fn script_finished(&self) -> bool {
        self.current_step >= self.flow.len()
    }

    /// Body of a lifecycle notification for this session
    pub fn notification_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "call_id": self.call_id,
            "status": self.status,
            "phone_number": self.phone_number,
            "script_id": self.script_id,
            "collected": self.collected,
            "recording_url": self.recording_url,
            "ended_at": self.ended_at,
        })
    }
}
