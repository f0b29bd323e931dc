//! Instruction - Provider-neutral telephony instructions
//!
//! The state machine answers every webhook with a list of these. They are
//! serialized into the provider's wire format only at the adapter boundary.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Instruction {
    /// Speak text to the callee
    Speak {
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        voice: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        language: Option<String>,
    },
    /// Collect up to `max_digits` keys within `timeout_seconds`
    CollectInput {
        max_digits: u32,
        timeout_seconds: u32,
        callback_url: String,
    },
    /// Record the call, reporting the recording to `callback_url`
    Record { callback_url: String },
    /// Connect the live call to another phone number
    Transfer { number: String },
}

impl Instruction {
    /// Speak with the provider's default voice
    pub fn speak(text: impl Into<String>) -> Self {
        Self::Speak {
            text: text.into(),
            voice: None,
            language: None,
        }
    }

    pub fn speak_as(text: impl Into<String>, voice: &str, language: &str) -> Self {
        Self::Speak {
            text: text.into(),
            voice: Some(voice.to_string()),
            language: Some(language.to_string()),
        }
    }

    pub fn is_input_request(&self) -> bool {
        matches!(self, Self::CollectInput { .. })
    }
}

/// Callback URLs handed to the provider
///
/// Every URL carries the call identifier where the provider needs it, so a
/// later webhook can be resolved against durable state alone.
#[derive(Debug, Clone)]
pub struct WebhookUrls {
    base_url: String,
}

impl WebhookUrls {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn answer(&self) -> String {
        format!("{}/api/advanced-calls/answer", self.base_url)
    }

    pub fn dtmf(&self, call_id: &str) -> String {
        format!("{}/api/advanced-calls/dtmf-handler/{}", self.base_url, call_id)
    }

    pub fn recording(&self) -> String {
        format!("{}/webhooks/recording", self.base_url)
    }

    pub fn event(&self) -> String {
        format!("{}/webhooks/event", self.base_url)
    }
}
