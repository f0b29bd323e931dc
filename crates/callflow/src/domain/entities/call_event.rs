//! CallEvent - Audit trail entry for a call

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kinds of events recorded against a call
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CallEventKind {
    Initiated,
    Answered,
    DigitsAccepted,
    DigitsRejected,
    NoInput,
    Completed,
    ProviderStatus,
    RecordingReady,
    RecordingStarted,
    Escalated,
    HungUp,
    InvalidAttemptsExhausted,
}

impl CallEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initiated => "initiated",
            Self::Answered => "answered",
            Self::DigitsAccepted => "digits_accepted",
            Self::DigitsRejected => "digits_rejected",
            Self::NoInput => "no_input",
            Self::Completed => "completed",
            Self::ProviderStatus => "provider_status",
            Self::RecordingReady => "recording_ready",
            Self::RecordingStarted => "recording_started",
            Self::Escalated => "escalated",
            Self::HungUp => "hung_up",
            Self::InvalidAttemptsExhausted => "invalid_attempts_exhausted",
        }
    }
}

impl std::fmt::Display for CallEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CallEventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initiated" => Ok(Self::Initiated),
            "answered" => Ok(Self::Answered),
            "digits_accepted" => Ok(Self::DigitsAccepted),
            "digits_rejected" => Ok(Self::DigitsRejected),
            "no_input" => Ok(Self::NoInput),
            "completed" => Ok(Self::Completed),
            "provider_status" => Ok(Self::ProviderStatus),
            "recording_ready" => Ok(Self::RecordingReady),
            "recording_started" => Ok(Self::RecordingStarted),
            "escalated" => Ok(Self::Escalated),
            "hung_up" => Ok(Self::HungUp),
            "invalid_attempts_exhausted" => Ok(Self::InvalidAttemptsExhausted),
            _ => Err(format!("Unknown call event: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallEvent {
    pub id: Uuid,
    pub call_id: String,
    pub kind: CallEventKind,
    pub data: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl CallEvent {
    pub fn new(
        call_id: &str,
        kind: CallEventKind,
        data: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            call_id: call_id.to_string(),
            kind,
            data,
            created_at: now,
        }
    }
}
