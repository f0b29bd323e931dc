//! Delivery Queue Application Service
//!
//! Durable outbound notifications. Enqueueing is a single local write; the
//! retry scheduler drives delivery.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

use callflow::{
    DeliveryOutcome, DeliveryStatus, DeliveryTask, DeliveryTaskRepository, DomainError,
    EventPublisher,
};

/// Application service for delivery tasks
pub struct DeliveryQueue<Q: DeliveryTaskRepository> {
    repo: Arc<Q>,
    publisher: Arc<dyn EventPublisher>,
    default_max_retries: i32,
}

impl<Q: DeliveryTaskRepository> DeliveryQueue<Q> {
    pub fn new(repo: Arc<Q>, publisher: Arc<dyn EventPublisher>, default_max_retries: i32) -> Self {
        Self {
            repo,
            publisher,
            default_max_retries,
        }
    }

    /// Queue a notification, eligible for delivery immediately
    pub async fn enqueue(
        &self,
        kind: String,
        payload: serde_json::Value,
        url: String,
        max_retries: Option<i32>,
    ) -> Result<DeliveryTask, DomainError> {
        let task = DeliveryTask::new(
            kind,
            payload,
            url,
            max_retries.unwrap_or(self.default_max_retries),
            Utc::now(),
        )?;
        let saved = self.repo.insert(&task).await?;

        tracing::info!("📬 Queued {} delivery {} -> {}", saved.kind, saved.id, saved.url);
        self.publisher.publish(
            "delivery.queued",
            serde_json::json!({ "id": saved.id, "kind": saved.kind, "url": saved.url }),
        );

        Ok(saved)
    }

    pub async fn get(&self, id: Uuid) -> Result<DeliveryTask, DomainError> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("DeliveryTask", id))
    }

    pub async fn list(
        &self,
        status: Option<DeliveryStatus>,
        limit: i64,
    ) -> Result<Vec<DeliveryTask>, DomainError> {
        self.repo.find_recent(status, limit.clamp(1, 500)).await
    }

    /// Reserve due tasks for an attempt
    pub async fn claim_due(
        &self,
        now: DateTime<Utc>,
        limit: i64,
        lease: Duration,
    ) -> Result<Vec<DeliveryTask>, DomainError> {
        self.repo.claim_due(now, limit, lease).await
    }

    /// Record the outcome of one attempt on a claimed task
    pub async fn record_outcome(
        &self,
        mut task: DeliveryTask,
        outcome: &DeliveryOutcome,
        now: DateTime<Utc>,
    ) -> Result<DeliveryTask, DomainError> {
        match outcome.error_message() {
            None => {
                task.mark_delivered(outcome.status_code(), now);
                tracing::info!("✅ Delivered {} ({})", task.id, task.kind);
            }
            Some(error) => {
                task.mark_attempt_failed(outcome.status_code(), error, now);
                if task.status == DeliveryStatus::Failed {
                    tracing::error!(
                        "❌ Delivery {} to {} exhausted after {} attempts: {}",
                        task.id,
                        task.url,
                        task.retry_count,
                        task.last_error.as_deref().unwrap_or_default()
                    );
                } else {
                    tracing::warn!(
                        "🔁 Delivery {} failed (attempt {}/{}), next at {}",
                        task.id,
                        task.retry_count,
                        task.max_retries,
                        task.next_attempt_at
                    );
                }
            }
        }

        let saved = self.repo.update(&task).await?;
        if saved.status.is_terminal() {
            self.publisher.publish(
                &format!("delivery.{}", saved.status),
                serde_json::json!({ "id": saved.id, "kind": saved.kind, "retry_count": saved.retry_count }),
            );
        }
        Ok(saved)
    }
}
