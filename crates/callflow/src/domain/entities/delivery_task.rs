//! DeliveryTask - Durable outbound notification
//!
//! One notification owed to a third party, tracked until it is delivered or
//! its retries are exhausted. Tasks are never deleted; they double as the
//! audit trail of what the system tried to tell the outside world.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::value_objects::DeliveryStatus;

pub const DEFAULT_MAX_RETRIES: i32 = 3;

/// Delay before the next attempt after the `failures`-th failed attempt
///
/// 2^failures whole minutes: 2, 4, 8, ...
pub fn backoff_delay(failures: i32) -> Duration {
    let exponent = failures.clamp(0, 20) as u32;
    Duration::minutes(2_i64.pow(exponent))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryTask {
    pub id: Uuid,
    /// Free-form tag, e.g. `call.completed`
    pub kind: String,
    pub payload: serde_json::Value,
    pub url: String,
    pub status: DeliveryStatus,
    pub retry_count: i32,
    pub max_retries: i32,
    pub next_attempt_at: DateTime<Utc>,
    pub last_error: Option<String>,
    pub last_status_code: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl DeliveryTask {
    /// Create a pending task eligible for delivery immediately
    pub fn new(
        kind: String,
        payload: serde_json::Value,
        url: String,
        max_retries: i32,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if kind.trim().is_empty() {
            return Err(DomainError::Validation(
                "delivery kind must not be empty".to_string(),
            ));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(DomainError::Validation(format!(
                "delivery url must be http(s): {}",
                url
            )));
        }
        if max_retries < 1 {
            return Err(DomainError::Validation(
                "max_retries must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            kind,
            payload,
            url,
            status: DeliveryStatus::Pending,
            retry_count: 0,
            max_retries,
            next_attempt_at: now,
            last_error: None,
            last_status_code: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        })
    }

    /// Whether the scheduler may attempt this task at `now`
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == DeliveryStatus::Pending
            && self.retry_count < self.max_retries
            && self.next_attempt_at <= now
    }

    /// Reserve the task for an in-flight attempt
    pub fn claim(&mut self, now: DateTime<Utc>, lease: Duration) {
        self.next_attempt_at = now + lease;
        self.updated_at = now;
    }

    /// Mark as delivered
    pub fn mark_delivered(&mut self, status_code: Option<i32>, now: DateTime<Utc>) {
        self.status = DeliveryStatus::Completed;
        self.last_status_code = status_code;
        self.last_error = None;
        self.updated_at = now;
        self.completed_at = Some(now);
    }

    /// Record a failed attempt, scheduling a retry or giving up
    pub fn mark_attempt_failed(
        &mut self,
        status_code: Option<i32>,
        error: String,
        now: DateTime<Utc>,
    ) {
        self.retry_count += 1;
        self.last_status_code = status_code;
        self.last_error = Some(error);
        self.updated_at = now;

        if self.retry_count >= self.max_retries {
            self.status = DeliveryStatus::Failed;
            self.completed_at = Some(now);
        } else {
            self.next_attempt_at = now + backoff_delay(self.retry_count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(max_retries: i32, now: DateTime<Utc>) -> DeliveryTask {
        DeliveryTask::new(
            "call.completed".to_string(),
            serde_json::json!({"call_id": "abc"}),
            "https://hooks.example.com/calls".to_string(),
            max_retries,
            now,
        )
        .unwrap()
    }

    #[test]
    fn test_backoff_doubles_in_minutes() {
        assert_eq!(backoff_delay(1), Duration::minutes(2));
        assert_eq!(backoff_delay(2), Duration::minutes(4));
        assert_eq!(backoff_delay(3), Duration::minutes(8));
    }

    #[test]
    fn test_new_task_is_due_immediately() {
        let now = Utc::now();
        let t = task(3, now);
        assert_eq!(t.status, DeliveryStatus::Pending);
        assert_eq!(t.retry_count, 0);
        assert!(t.is_due(now));
    }

    #[test]
    fn test_failure_schedules_backoff() {
        let now = Utc::now();
        let mut t = task(5, now);

        t.mark_attempt_failed(Some(500), "server error".to_string(), now);
        assert_eq!(t.retry_count, 1);
        assert_eq!(t.status, DeliveryStatus::Pending);
        assert_eq!(t.next_attempt_at, now + Duration::minutes(2));
        assert!(!t.is_due(now + Duration::seconds(119)));
        assert!(t.is_due(now + Duration::minutes(2)));

        let second = now + Duration::minutes(2);
        t.mark_attempt_failed(None, "connection refused".to_string(), second);
        assert_eq!(t.next_attempt_at, second + Duration::minutes(4));

        let third = second + Duration::minutes(4);
        t.mark_attempt_failed(None, "timed out".to_string(), third);
        assert_eq!(t.next_attempt_at, third + Duration::minutes(8));
    }

    #[test]
    fn test_exhaustion_is_terminal() {
        let now = Utc::now();
        let mut t = task(2, now);
        t.mark_attempt_failed(Some(503), "unavailable".to_string(), now);
        t.mark_attempt_failed(Some(503), "unavailable".to_string(), now);
        assert_eq!(t.status, DeliveryStatus::Failed);
        assert_eq!(t.retry_count, 2);
        assert!(t.completed_at.is_some());
        assert!(!t.is_due(now + Duration::days(1)));
    }

    #[test]
    fn test_rejects_bad_input() {
        let now = Utc::now();
        let payload = serde_json::json!({});
        assert!(DeliveryTask::new("k".into(), payload.clone(), "ftp://x".into(), 3, now).is_err());
        assert!(
            DeliveryTask::new("k".into(), payload.clone(), "https://x".into(), 0, now).is_err()
        );
        assert!(DeliveryTask::new(" ".into(), payload, "https://x".into(), 3, now).is_err());
    }
}
