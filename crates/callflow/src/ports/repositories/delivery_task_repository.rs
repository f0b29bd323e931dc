//! DeliveryTask Repository Port

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::domain::{errors::DomainError, DeliveryStatus, DeliveryTask};

/// Repository interface for DeliveryTask entities
#[async_trait]
pub trait DeliveryTaskRepository: Send + Sync {
    /// Insert a new task
    async fn insert(&self, task: &DeliveryTask) -> Result<DeliveryTask, DomainError>;

    /// Persist the outcome of an attempt
    async fn update(&self, task: &DeliveryTask) -> Result<DeliveryTask, DomainError>;

    /// Find a task by ID
    async fn find_by_id(&self, id: Uuid) -> Result<Option<DeliveryTask>, DomainError>;

    /// Most recent tasks, optionally filtered by status
    async fn find_recent(
        &self,
        status: Option<DeliveryStatus>,
        limit: i64,
    ) -> Result<Vec<DeliveryTask>, DomainError>;

    /// Reserve up to `limit` due tasks
    ///
    /// Claimed tasks have their next attempt pushed to `now + lease`, so no
    /// other claimer sees them until the lease runs out.
    async fn claim_due(
        &self,
        now: DateTime<Utc>,
        limit: i64,
        lease: Duration,
    ) -> Result<Vec<DeliveryTask>, DomainError>;
}
