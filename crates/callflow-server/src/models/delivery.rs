//! Delivery DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use callflow::DeliveryTask;

/// Request to queue an outbound notification
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateDeliveryRequest {
    /// Free-form tag sent as `X-Callflow-Event`
    pub kind: String,
    pub payload: serde_json::Value,
    /// Target URL (http or https)
    pub url: String,
    /// Attempts before giving up (default: DELIVERY_MAX_RETRIES)
    pub max_retries: Option<i32>,
}

/// Query parameters for listing deliveries
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListDeliveriesQuery {
    /// Filter by status (pending, completed, failed)
    pub status: Option<String>,
    /// Maximum results (default: 50)
    pub limit: Option<i64>,
}

/// Delivery task response
#[derive(Debug, Serialize, ToSchema)]
pub struct DeliveryResponse {
    pub id: Uuid,
    pub kind: String,
    pub payload: serde_json::Value,
    pub url: String,
    pub status: String,
    pub retry_count: i32,
    pub max_retries: i32,
    pub next_attempt_at: DateTime<Utc>,
    pub last_error: Option<String>,
    pub last_status_code: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl DeliveryResponse {
    pub fn from_domain(task: DeliveryTask) -> Self {
        Self {
            id: task.id,
            kind: task.kind,
            payload: task.payload,
            url: task.url,
            status: task.status.to_string(),
            retry_count: task.retry_count,
            max_retries: task.max_retries,
            next_attempt_at: task.next_attempt_at,
            last_error: task.last_error,
            last_status_code: task.last_status_code,
            created_at: task.created_at,
            updated_at: task.updated_at,
            completed_at: task.completed_at,
        }
    }
}
