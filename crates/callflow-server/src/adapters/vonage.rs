//! Vonage Voice API client
//!
//! Outbound half of the telephony integration: placing calls and modifying
//! live ones. Authenticates with an application JWT supplied by config.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use callflow::{DomainError, Instruction, OutboundCall, TelephonyProvider};

use super::formatters::to_ncco;
use crate::config::VonageConfig;

/// Vonage implementation of TelephonyProvider
pub struct VonageClient {
    client: Client,
    config: VonageConfig,
}

#[derive(Debug, Deserialize)]
struct CreateCallResponse {
    uuid: String,
    #[serde(default)]
    status: Option<String>,
}

impl VonageClient {
    pub fn new(config: VonageConfig) -> Result<Self, DomainError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| DomainError::ExternalService(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    fn calls_url(&self) -> String {
        format!("{}/v1/calls", self.config.api_url.trim_end_matches('/'))
    }

    /// `PUT /v1/calls/:uuid` with a modify action
    async fn modify(&self, call_id: &str, body: Value) -> Result<(), DomainError> {
        let action = body["action"].as_str().unwrap_or("modify").to_string();
        let resp = self
            .client
            .put(format!("{}/{}", self.calls_url(), call_id))
            .bearer_auth(&self.config.api_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| DomainError::ExternalService(format!("Vonage {action} failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(DomainError::ExternalService(format!(
                "Vonage {action} returned {status}: {text}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl TelephonyProvider for VonageClient {
    async fn create_call(&self, call: &OutboundCall) -> Result<String, DomainError> {
        let body = json!({
            "to": [{ "type": "phone", "number": call.to }],
            "from": { "type": "phone", "number": self.config.from_number },
            "answer_url": [call.answer_url],
            "event_url": [call.event_url],
        });

        let resp = self
            .client
            .post(self.calls_url())
            .bearer_auth(&self.config.api_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| DomainError::ExternalService(format!("Vonage create call failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(DomainError::ExternalService(format!(
                "Vonage create call returned {status}: {text}"
            )));
        }

        let created: CreateCallResponse = resp.json().await.map_err(|e| {
            DomainError::ExternalService(format!("Unexpected Vonage response: {e}"))
        })?;

        tracing::info!(
            "📞 Call {} placed to {} ({})",
            created.uuid,
            call.to,
            created.status.as_deref().unwrap_or("unknown")
        );
        Ok(created.uuid)
    }

    async fn hang_up(&self, call_id: &str) -> Result<(), DomainError> {
        self.modify(call_id, json!({ "action": "hangup" })).await
    }

    async fn transfer(
        &self,
        call_id: &str,
        instructions: &[Instruction],
    ) -> Result<(), DomainError> {
        self.modify(
            call_id,
            json!({
                "action": "transfer",
                "destination": { "type": "ncco", "ncco": to_ncco(instructions) },
            }),
        )
        .await
    }

    async fn start_recording(&self, call_id: &str) -> Result<(), DomainError> {
        self.modify(call_id, json!({ "action": "start_recording" }))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::Path,
        http::{HeaderMap, StatusCode},
        routing::{post, put},
        Json, Router,
    };

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client(api_url: String) -> VonageClient {
        VonageClient::new(VonageConfig {
            api_url,
            api_token: "jwt-token".to_string(),
            from_number: "15550100".to_string(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_call_returns_uuid() {
        let router = Router::new().route(
            "/v1/calls",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                let authorized = headers
                    .get("authorization")
                    .and_then(|h| h.to_str().ok())
                    == Some("Bearer jwt-token");
                if !authorized || body["answer_url"][0] != "https://calls.example.com/api/advanced-calls/answer" {
                    return (StatusCode::BAD_REQUEST, Json(json!({})));
                }
                (
                    StatusCode::CREATED,
                    Json(json!({ "uuid": "call-123", "status": "started" })),
                )
            }),
        );
        let base = serve(router).await;

        let urls = callflow::WebhookUrls::new("https://calls.example.com");
        let call_id = client(base)
            .create_call(&OutboundCall::new("15550111", &urls))
            .await
            .unwrap();
        assert_eq!(call_id, "call-123");
    }

    #[tokio::test]
    async fn test_modify_failure_is_external_error() {
        let router = Router::new().route(
            "/v1/calls/:uuid",
            put(|Path(uuid): Path<String>| async move {
                (StatusCode::NOT_FOUND, format!("no call {}", uuid))
            }),
        );
        let base = serve(router).await;

        let err = client(base).hang_up("gone").await.unwrap_err();
        assert!(matches!(err, DomainError::ExternalService(msg) if msg.contains("no call gone")));
    }
}
