//! CallSession Repository Port
//!
//! Sessions are written together with the audit events the transition
//! produced. Updates are conditional on the session's `version`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{errors::DomainError, CallEvent, CallSession, CallStatus};

/// Aggregate call counts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallStats {
    pub total: i64,
    pub active: i64,
    pub completed: i64,
    pub failed: i64,
    pub hung_up: i64,
    pub escalated: i64,
}

impl CallStats {
    /// Build from per-status counts
    pub fn from_counts(counts: impl IntoIterator<Item = (CallStatus, i64)>) -> Self {
        let mut stats = Self::default();
        for (status, count) in counts {
            stats.total += count;
            match status {
                CallStatus::Completed => stats.completed += count,
                CallStatus::Failed => stats.failed += count,
                CallStatus::HungUp => stats.hung_up += count,
                CallStatus::Escalated => stats.escalated += count,
                CallStatus::Ringing | CallStatus::InProgress | CallStatus::AwaitingInput => {
                    stats.active += count
                }
            }
        }
        stats
    }

    /// Share of calls that ran the script to completion, in percent
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.completed as f64 * 100.0 / self.total as f64
    }
}

/// Repository interface for CallSession entities
#[async_trait]
pub trait CallSessionRepository: Send + Sync {
    /// Find a session by provider call id
    async fn find_by_call_id(&self, call_id: &str) -> Result<Option<CallSession>, DomainError>;

    /// Insert a new session with its initial events
    async fn insert(
        &self,
        session: &CallSession,
        events: &[CallEvent],
    ) -> Result<CallSession, DomainError>;

    /// Persist a changed session and its events atomically
    ///
    /// `session.version` is the version that was loaded. Fails with
    /// `DomainError::Conflict` when the stored row has moved on; otherwise
    /// returns the session carrying its new version.
    async fn update(
        &self,
        session: &CallSession,
        events: &[CallEvent],
    ) -> Result<CallSession, DomainError>;

    /// Append events without touching the session row
    async fn append_events(&self, events: &[CallEvent]) -> Result<(), DomainError>;

    /// Most recently created sessions, optionally filtered by status
    async fn find_recent(
        &self,
        status: Option<CallStatus>,
        limit: i64,
    ) -> Result<Vec<CallSession>, DomainError>;

    /// Audit trail of a call, oldest first
    async fn find_events(&self, call_id: &str) -> Result<Vec<CallEvent>, DomainError>;

    /// Counts by status
    async fn stats(&self) -> Result<CallStats, DomainError>;
}
