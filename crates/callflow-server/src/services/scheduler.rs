//! Scheduler Service - Delivery retry scheduler
//!
//! Attempts due delivery tasks at a fixed interval. Each cycle claims a
//! bounded batch, so a slow endpoint never holds up more than one cycle.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::sync::Arc;
use tokio::time::{interval, MissedTickBehavior};

use callflow::{DeliveryOutcome, DeliveryStatus, DeliveryTaskRepository, DeliveryTransport, DomainError};

use crate::application::DeliveryQueue;
use crate::config::SchedulerConfig;

/// Claimed tasks stay invisible to other cycles at least this long
const MIN_LEASE_SECS: i64 = 60;

/// What one cycle did
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickSummary {
    pub attempted: usize,
    pub delivered: usize,
    pub rescheduled: usize,
    pub exhausted: usize,
}

/// Delivery retry scheduler
pub struct RetryScheduler<Q: DeliveryTaskRepository + 'static> {
    queue: Arc<DeliveryQueue<Q>>,
    transport: Arc<dyn DeliveryTransport>,
    config: SchedulerConfig,
}

impl<Q: DeliveryTaskRepository + 'static> RetryScheduler<Q> {
    pub fn new(
        queue: Arc<DeliveryQueue<Q>>,
        transport: Arc<dyn DeliveryTransport>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            queue,
            transport,
            config,
        }
    }

    /// Start the scheduler (runs in background)
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    /// Run the scheduler loop
    async fn run(self) {
        tracing::info!(
            "📅 Retry scheduler started (interval: {:?}, batch: {})",
            self.config.interval,
            self.config.batch_size
        );

        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // Skip the first immediate tick
        ticker.tick().await;

        loop {
            ticker.tick().await;

            match self.tick_at(Utc::now()).await {
                Ok(summary) if summary.attempted == 0 => {
                    tracing::debug!("📅 Retry cycle: nothing due");
                }
                Ok(summary) => {
                    tracing::info!(
                        "🔄 Retry cycle completed ({} attempted, {} delivered, {} rescheduled, {} exhausted)",
                        summary.attempted,
                        summary.delivered,
                        summary.rescheduled,
                        summary.exhausted
                    );
                }
                Err(e) => {
                    tracing::error!("❌ Retry cycle failed: {}", e);
                }
            }
        }
    }

    /// Attempt every task due at `now`, up to one batch
    pub async fn tick_at(&self, now: DateTime<Utc>) -> Result<TickSummary, DomainError> {
        let lease = chrono::Duration::seconds(
            MIN_LEASE_SECS.max(2 * self.config.attempt_timeout.as_secs() as i64),
        );
        let tasks = self
            .queue
            .claim_due(now, self.config.batch_size, lease)
            .await?;

        let mut summary = TickSummary {
            attempted: tasks.len(),
            ..TickSummary::default()
        };
        if tasks.is_empty() {
            return Ok(summary);
        }

        let attempts = tasks.into_iter().map(|task| async move {
            let outcome = self.attempt(&task).await;
            self.queue.record_outcome(task, &outcome, now).await
        });

        for result in join_all(attempts).await {
            match result {
                Ok(task) => match task.status {
                    DeliveryStatus::Completed => summary.delivered += 1,
                    DeliveryStatus::Failed => summary.exhausted += 1,
                    DeliveryStatus::Pending => summary.rescheduled += 1,
                },
                // The lease expires and the task is picked up again
                Err(e) => tracing::warn!("  ❌ Failed to record delivery outcome: {}", e),
            }
        }

        Ok(summary)
    }

    async fn attempt(&self, task: &callflow::DeliveryTask) -> DeliveryOutcome {
        let timeout = self.config.attempt_timeout;
        match tokio::time::timeout(timeout, self.transport.deliver(task)).await {
            Ok(outcome) => outcome,
            Err(_) => DeliveryOutcome::Unreachable(format!(
                "attempt timed out after {}s",
                timeout.as_secs()
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::{
        HangingTransport, InMemoryDeliveries, RecordingPublisher, StaticTransport,
    };
    use chrono::Duration;

    struct Fixture {
        queue: Arc<DeliveryQueue<InMemoryDeliveries>>,
        repo: Arc<InMemoryDeliveries>,
    }

    async fn fixture(max_retries: i32) -> Fixture {
        let repo = Arc::new(InMemoryDeliveries::default());
        let queue = Arc::new(DeliveryQueue::new(
            repo.clone(),
            Arc::new(RecordingPublisher::default()),
            3,
        ));
        queue
            .enqueue(
                "call.completed".to_string(),
                serde_json::json!({ "call_id": "X" }),
                "https://hooks.example.com/calls".to_string(),
                Some(max_retries),
            )
            .await
            .unwrap();
        Fixture { queue, repo }
    }

    fn scheduler(
        fixture: &Fixture,
        transport: Arc<dyn DeliveryTransport>,
    ) -> RetryScheduler<InMemoryDeliveries> {
        RetryScheduler::new(fixture.queue.clone(), transport, SchedulerConfig::default())
    }

    #[tokio::test]
    async fn test_failing_endpoint_exhausts_retries() {
        let fixture = fixture(2).await;
        let transport = Arc::new(StaticTransport::new(DeliveryOutcome::Rejected {
            status_code: 503,
            body: "unavailable".to_string(),
        }));
        let scheduler = scheduler(&fixture, transport.clone());
        let t0 = Utc::now() + Duration::seconds(1);

        let first = scheduler.tick_at(t0).await.unwrap();
        assert_eq!(first.rescheduled, 1);

        // Backoff after the first failure is two minutes
        let early = scheduler.tick_at(t0 + Duration::minutes(1)).await.unwrap();
        assert_eq!(early.attempted, 0);

        let second = scheduler.tick_at(t0 + Duration::minutes(2)).await.unwrap();
        assert_eq!(second.exhausted, 1);

        let tasks = fixture.repo.all();
        let task = &tasks[0];
        assert_eq!(task.status, DeliveryStatus::Failed);
        assert_eq!(task.retry_count, 2);
        assert_eq!(task.last_status_code, Some(503));
        assert_eq!(task.last_error.as_deref(), Some("HTTP 503: unavailable"));

        let after = scheduler.tick_at(t0 + Duration::hours(1)).await.unwrap();
        assert_eq!(after.attempted, 0);
        assert_eq!(transport.attempts(), 2);
    }

    #[tokio::test]
    async fn test_successful_delivery_completes_task() {
        let fixture = fixture(3).await;
        let transport = Arc::new(StaticTransport::new(DeliveryOutcome::Delivered {
            status_code: 200,
        }));
        let scheduler = scheduler(&fixture, transport);

        let summary = scheduler
            .tick_at(Utc::now() + Duration::seconds(1))
            .await
            .unwrap();
        assert_eq!(summary.delivered, 1);

        let tasks = fixture.repo.all();
        let task = &tasks[0];
        assert_eq!(task.status, DeliveryStatus::Completed);
        assert_eq!(task.retry_count, 0);
        assert!(task.completed_at.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_endpoint_counts_as_failed_attempt() {
        let fixture = fixture(3).await;
        let scheduler = scheduler(&fixture, Arc::new(HangingTransport));

        let summary = scheduler
            .tick_at(Utc::now() + Duration::seconds(1))
            .await
            .unwrap();
        assert_eq!(summary.rescheduled, 1);

        let tasks = fixture.repo.all();
        let task = &tasks[0];
        assert_eq!(task.retry_count, 1);
        assert_eq!(task.status, DeliveryStatus::Pending);
        assert!(task
            .last_error
            .as_deref()
            .unwrap_or_default()
            .contains("timed out"));
    }
}
