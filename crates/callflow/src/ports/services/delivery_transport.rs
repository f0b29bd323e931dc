//! Delivery Transport Port
//!
//! Performs exactly one delivery attempt. Retry bookkeeping belongs to the
//! queue, not the transport.

use async_trait::async_trait;

use crate::domain::DeliveryTask;

/// Result of a single attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Endpoint answered 2xx
    Delivered { status_code: u16 },
    /// Endpoint answered with a non-2xx status
    Rejected { status_code: u16, body: String },
    /// No response: connection error or timeout
    Unreachable(String),
}

impl DeliveryOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }

    pub fn status_code(&self) -> Option<i32> {
        match self {
            Self::Delivered { status_code } | Self::Rejected { status_code, .. } => {
                Some(i32::from(*status_code))
            }
            Self::Unreachable(_) => None,
        }
    }

    /// Error text recorded on the task for a failed attempt
    pub fn error_message(&self) -> Option<String> {
        match self {
            Self::Delivered { .. } => None,
            Self::Rejected { status_code, body } if body.is_empty() => {
                Some(format!("HTTP {}", status_code))
            }
            Self::Rejected { status_code, body } => {
                Some(format!("HTTP {}: {}", status_code, body))
            }
            Self::Unreachable(reason) => Some(reason.clone()),
        }
    }
}

#[async_trait]
pub trait DeliveryTransport: Send + Sync {
    /// Attempt delivery of `task` once
    async fn deliver(&self, task: &DeliveryTask) -> DeliveryOutcome;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_error_messages() {
        assert_eq!(
            DeliveryOutcome::Delivered { status_code: 204 }.error_message(),
            None
        );
        assert_eq!(
            DeliveryOutcome::Rejected {
                status_code: 503,
                body: String::new()
            }
            .error_message()
            .as_deref(),
            Some("HTTP 503")
        );
        assert_eq!(
            DeliveryOutcome::Unreachable("timed out".to_string()).status_code(),
            None
        );
    }
}
