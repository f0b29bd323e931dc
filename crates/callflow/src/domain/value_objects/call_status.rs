//! CallStatus - Lifecycle of a call session

use serde::{Deserialize, Serialize};

/// Lifecycle status of a call session
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum CallStatus {
    Ringing,
    InProgress,
    AwaitingInput,
    Completed,
    Failed,
    Escalated,
    HungUp,
}

impl CallStatus {
    /// Terminal sessions admit no further state transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::HungUp)
    }

    /// Statuses in which the script is being driven and digits are accepted
    pub fn accepts_input(&self) -> bool {
        matches!(self, Self::InProgress | Self::AwaitingInput)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ringing => "ringing",
            Self::InProgress => "in-progress",
            Self::AwaitingInput => "awaiting-input",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Escalated => "escalated",
            Self::HungUp => "hung-up",
        }
    }
}

impl std::fmt::Display for CallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CallStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "ringing" => Ok(Self::Ringing),
            "in-progress" => Ok(Self::InProgress),
            "awaiting-input" => Ok(Self::AwaitingInput),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "escalated" => Ok(Self::Escalated),
            "hung-up" => Ok(Self::HungUp),
            _ => Err(format!("Unknown call status: {}", s)),
        }
    }
}

/// Call status as reported by the telephony provider's event webhook
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderStatus {
    Started,
    Ringing,
    Answered,
    Machine,
    Completed,
    Busy,
    Cancelled,
    Failed,
    Rejected,
    Timeout,
    Unanswered,
    Other(String),
}

impl ProviderStatus {
    /// Session status this provider status forces, if any
    pub fn session_status(&self) -> Option<CallStatus> {
        match self {
            Self::Busy
            | Self::Cancelled
            | Self::Failed
            | Self::Rejected
            | Self::Timeout
            | Self::Unanswered => Some(CallStatus::Failed),
            Self::Completed => Some(CallStatus::HungUp),
            Self::Started | Self::Ringing | Self::Answered | Self::Machine | Self::Other(_) => None,
        }
    }
}

impl From<&str> for ProviderStatus {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "started" => Self::Started,
            "ringing" => Self::Ringing,
            "answered" => Self::Answered,
            "machine" => Self::Machine,
            "completed" => Self::Completed,
            "busy" => Self::Busy,
            "cancelled" => Self::Cancelled,
            "failed" => Self::Failed,
            "rejected" => Self::Rejected,
            "timeout" => Self::Timeout,
            "unanswered" => Self::Unanswered,
            other => Self::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for ProviderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Started => write!(f, "started"),
            Self::Ringing => write!(f, "ringing"),
            Self::Answered => write!(f, "answered"),
            Self::Machine => write!(f, "machine"),
            Self::Completed => write!(f, "completed"),
            Self::Busy => write!(f, "busy"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Failed => write!(f, "failed"),
            Self::Rejected => write!(f, "rejected"),
            Self::Timeout => write!(f, "timeout"),
            Self::Unanswered => write!(f, "unanswered"),
            Self::Other(s) => write!(f, "{}", s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        assert!(CallStatus::Completed.is_terminal());
        assert!(CallStatus::Failed.is_terminal());
        assert!(CallStatus::HungUp.is_terminal());
        assert!(!CallStatus::Escalated.is_terminal());
        assert!(!CallStatus::Ringing.is_terminal());
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [
            CallStatus::Ringing,
            CallStatus::InProgress,
            CallStatus::AwaitingInput,
            CallStatus::Completed,
            CallStatus::Failed,
            CallStatus::Escalated,
            CallStatus::HungUp,
        ] {
            assert_eq!(status.as_str().parse::<CallStatus>().unwrap(), status);
        }
        assert_eq!("in_progress".parse::<CallStatus>().unwrap(), CallStatus::InProgress);
        assert!("dialing".parse::<CallStatus>().is_err());
    }

    #[test]
    fn test_status_serializes_kebab_case() {
        let json = serde_json::to_string(&CallStatus::AwaitingInput).unwrap();
        assert_eq!(json, "\"awaiting-input\"");
    }

    #[test]
    fn test_provider_status_mapping() {
        assert_eq!(
            ProviderStatus::from("busy").session_status(),
            Some(CallStatus::Failed)
        );
        assert_eq!(
            ProviderStatus::from("UNANSWERED").session_status(),
            Some(CallStatus::Failed)
        );
        assert_eq!(
            ProviderStatus::from("completed").session_status(),
            Some(CallStatus::HungUp)
        );
        assert_eq!(ProviderStatus::from("answered").session_status(), None);
        assert_eq!(
            ProviderStatus::from("transfer"),
            ProviderStatus::Other("transfer".to_string())
        );
    }
}
