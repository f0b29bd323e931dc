//! Telephony Provider Port
//!
//! Outbound control of live calls. Inbound webhooks are not part of this
//! port; they arrive through the server's routes.

use async_trait::async_trait;

use crate::domain::{errors::DomainError, Instruction, WebhookUrls};

/// Request to place an outbound call
#[derive(Debug, Clone)]
pub struct OutboundCall {
    pub to: String,
    pub answer_url: String,
    pub event_url: String,
}

impl OutboundCall {
    pub fn new(to: impl Into<String>, urls: &WebhookUrls) -> Self {
        Self {
            to: to.into(),
            answer_url: urls.answer(),
            event_url: urls.event(),
        }
    }
}

#[async_trait]
pub trait TelephonyProvider: Send + Sync {
    /// Place a call, returning the provider's call id
    async fn create_call(&self, call: &OutboundCall) -> Result<String, DomainError>;

    /// End a live call
    async fn hang_up(&self, call_id: &str) -> Result<(), DomainError>;

    /// Replace the live call's flow with `instructions`
    async fn transfer(&self, call_id: &str, instructions: &[Instruction])
        -> Result<(), DomainError>;

    /// Begin recording a live call
    async fn start_recording(&self, call_id: &str) -> Result<(), DomainError>;
}
