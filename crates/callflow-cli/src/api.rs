//! Callflow API Client

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

/// API Client for Callflow
pub struct CallflowClient {
    client: Client,
    base_url: String,
    api_key: String,
}

// ============================================
// API Response Types
// ============================================

#[derive(Debug, Deserialize)]
pub struct ScriptResponse {
    pub id: Uuid,
    pub name: String,
    pub flow: serde_json::Value,
    pub step_count: usize,
    pub language: String,
    pub voice: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CollectedInput {
    pub step: usize,
    pub digits: String,
}

#[derive(Debug, Deserialize)]
pub struct CallResponse {
    pub call_id: String,
    pub phone_number: String,
    pub script_id: Option<Uuid>,
    pub status: String,
    pub current_step: usize,
    pub total_steps: usize,
    pub collected: Vec<CollectedInput>,
    pub invalid_attempts: u32,
    pub recording_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct CallEventResponse {
    pub kind: String,
    pub data: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CallDetailResponse {
    pub call: CallResponse,
    pub events: Vec<CallEventResponse>,
}

#[derive(Debug, Deserialize)]
pub struct StatsResponse {
    pub total: i64,
    pub active: i64,
    pub completed: i64,
    pub failed: i64,
    pub hung_up: i64,
    pub escalated: i64,
    pub success_rate: f64,
}

#[derive(Debug, Deserialize)]
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
}

// ============================================
// API Request Types
// ============================================

#[derive(Debug, Serialize)]
pub struct CreateScriptRequest {
    pub name: String,
    pub flow: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct InitiateCallRequest {
    pub phone_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow: Option<serde_json::Value>,
    pub recording_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_callback_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateDeliveryRequest {
    pub kind: String,
    pub payload: serde_json::Value,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<i32>,
}

/// `?status=…&limit=…`, skipping unset parameters
fn list_query(status: Option<&str>, limit: Option<i64>) -> String {
    let mut params = Vec::new();
    if let Some(status) = status {
        params.push(format!("status={}", urlencoding::encode(status)));
    }
    if let Some(limit) = limit {
        params.push(format!("limit={}", limit));
    }
    if params.is_empty() {
        String::new()
    } else {
        format!("?{}", params.join("&"))
    }
}

impl CallflowClient {
    /// Create a new API client
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Test connection with health check
    pub async fn health(&self) -> Result<bool> {
        let url = format!("{}/health", self.base_url);
        let resp = self.client.get(&url).send().await?;
        Ok(resp.status().is_success())
    }

    /// Test that the API key is accepted
    pub async fn check_auth(&self) -> Result<()> {
        self.list_calls(None, Some(1)).await.map(|_| ())
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.api_key)
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.api_key)
    }

    async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T> {
        let resp = request
            .send()
            .await
            .context("Failed to connect to Callflow API")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!("API error ({}): {}", status, body);
        }

        resp.json().await.context("Failed to parse response")
    }

    // --- Scripts ---

    pub async fn list_scripts(&self) -> Result<Vec<ScriptResponse>> {
        Self::send(self.get("/api/scripts")).await
    }

    pub async fn get_script(&self, id: Uuid) -> Result<ScriptResponse> {
        Self::send(self.get(&format!("/api/scripts/{}", id))).await
    }

    pub async fn create_script(&self, request: &CreateScriptRequest) -> Result<ScriptResponse> {
        Self::send(self.post("/api/scripts").json(request)).await
    }

    pub async fn delete_script(&self, id: Uuid) -> Result<()> {
        let resp = self
            .client
            .delete(format!("{}/api/scripts/{}", self.base_url, id))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .context("Failed to connect to Callflow API")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!("API error ({}): {}", status, body);
        }
        Ok(())
    }

    // --- Calls ---

    pub async fn list_calls(
        &self,
        status: Option<&str>,
        limit: Option<i64>,
    ) -> Result<Vec<CallResponse>> {
        Self::send(self.get(&format!("/api/calls{}", list_query(status, limit)))).await
    }

    pub async fn get_call(&self, call_id: &str) -> Result<CallDetailResponse> {
        let path = format!("/api/calls/{}", urlencoding::encode(call_id));
        Self::send(self.get(&path)).await
    }

    pub async fn initiate_call(&self, request: &InitiateCallRequest) -> Result<CallResponse> {
        Self::send(self.post("/api/calls").json(request)).await
    }

    /// `escalate`, `hangup` or `record`
    pub async fn call_action(&self, call_id: &str, action: &str) -> Result<CallResponse> {
        let path = format!("/api/calls/{}/{}", urlencoding::encode(call_id), action);
        Self::send(self.post(&path)).await
    }

    pub async fn stats(&self) -> Result<StatsResponse> {
        Self::send(self.get("/api/calls/stats")).await
    }

    // --- Deliveries ---

    pub async fn list_deliveries(
        &self,
        status: Option<&str>,
        limit: Option<i64>,
    ) -> Result<Vec<DeliveryResponse>> {
        Self::send(self.get(&format!("/api/deliveries{}", list_query(status, limit)))).await
    }

    pub async fn get_delivery(&self, id: Uuid) -> Result<DeliveryResponse> {
        Self::send(self.get(&format!("/api/deliveries/{}", id))).await
    }

    pub async fn create_delivery(
        &self,
        request: &CreateDeliveryRequest,
    ) -> Result<DeliveryResponse> {
        Self::send(self.post("/api/deliveries").json(request)).await
    }
}
