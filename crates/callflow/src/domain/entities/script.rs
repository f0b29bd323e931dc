//! Script - Declarative multi-step call flow
//!
//! Pure domain entity without infrastructure dependencies. A script is never
//! edited in place; saving changes creates a new script.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::value_objects::ValidationRule;

pub const DEFAULT_LANGUAGE: &str = "en-US";
pub const DEFAULT_VOICE: &str = "Joey";
const DEFAULT_FINAL_MESSAGE: &str = "Thank you. Goodbye.";

fn default_expected_digits() -> u32 {
    1
}

fn default_timeout() -> u32 {
    10
}

fn default_final_message() -> String {
    DEFAULT_FINAL_MESSAGE.to_string()
}

/// Message replayed when a step's input fails validation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InvalidPrompt {
    pub message: String,
}

/// One prompt + keypad collection step
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScriptStep {
    /// Prompt spoken before input is collected
    pub message: String,
    /// Maximum number of keys requested from the provider
    #[serde(default = "default_expected_digits")]
    pub expected_digits: u32,
    /// Seconds the provider waits for input
    #[serde(default = "default_timeout")]
    pub timeout: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_invalid: Option<InvalidPrompt>,
}

impl ScriptStep {
    pub fn new(message: impl Into<String>, expected_digits: u32, timeout: u32) -> Self {
        Self {
            message: message.into(),
            expected_digits,
            timeout,
            validation: None,
            on_invalid: None,
        }
    }

    pub fn with_validation(mut self, rule: ValidationRule) -> Self {
        self.validation = Some(rule);
        self
    }

    pub fn with_on_invalid(mut self, message: impl Into<String>) -> Self {
        self.on_invalid = Some(InvalidPrompt {
            message: message.into(),
        });
        self
    }

    /// Whether `digits` is acceptable input for this step
    ///
    /// Input must be non-empty decimal digits; steps without a rule accept any
    /// such input.
    pub fn accepts(&self, digits: &str) -> Result<bool, DomainError> {
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Ok(false);
        }
        match &self.validation {
            Some(rule) => rule.matches(digits),
            None => Ok(true),
        }
    }

    fn validate(&self, position: usize) -> Result<(), DomainError> {
        if self.message.trim().is_empty() {
            return Err(DomainError::Validation(format!(
                "step {} has an empty message",
                position
            )));
        }
        if self.expected_digits == 0 {
            return Err(DomainError::Validation(format!(
                "step {} must expect at least one digit",
                position
            )));
        }
        if self.timeout == 0 {
            return Err(DomainError::Validation(format!(
                "step {} needs a positive timeout",
                position
            )));
        }
        if let Some(rule) = &self.validation {
            rule.validate()?;
        }
        Ok(())
    }
}

/// Ordered steps plus the message spoken after the last one
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScriptFlow {
    pub steps: Vec<ScriptStep>,
    #[serde(default = "default_final_message")]
    pub final_message: String,
}

impl ScriptFlow {
    pub fn new(steps: Vec<ScriptStep>, final_message: impl Into<String>) -> Self {
        Self {
            steps,
            final_message: final_message.into(),
        }
    }

    pub fn step(&self, index: usize) -> Option<&ScriptStep> {
        self.steps.get(index)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.steps.is_empty() {
            return Err(DomainError::Validation(
                "a script needs at least one step".to_string(),
            ));
        }
        for (position, step) in self.steps.iter().enumerate() {
            step.validate(position)?;
        }
        if self.final_message.trim().is_empty() {
            return Err(DomainError::Validation(
                "final message must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Script - saved, reusable call flow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Script {
    pub id: Uuid,
    pub name: String,
    pub flow: ScriptFlow,
    pub language: String,
    pub voice: String,
    pub created_at: DateTime<Utc>,
}

impl Script {
    /// Create a new validated script
    pub fn new(
        name: String,
        flow: ScriptFlow,
        language: Option<String>,
        voice: Option<String>,
    ) -> Result<Self, DomainError> {
        if name.trim().is_empty() {
            return Err(DomainError::Validation(
                "script name must not be empty".to_string(),
            ));
        }
        flow.validate()?;

        Ok(Self {
            id: Uuid::new_v4(),
            name,
            flow,
            language: language.unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            voice: voice.unwrap_or_else(|| DEFAULT_VOICE.to_string()),
            created_at: Utc::now(),
        })
    }
}
