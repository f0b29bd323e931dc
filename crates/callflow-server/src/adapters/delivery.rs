//! HTTP Delivery Implementation
//!
//! Posts queued notifications to their endpoints using reqwest. One call is
//! one attempt; the queue owns retries.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::{header::CONTENT_TYPE, Client};
use sha2::Sha256;
use std::time::Duration;

use callflow::{DeliveryOutcome, DeliveryTask, DeliveryTransport, DomainError};

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "X-Callflow-Signature";

/// Longest response body kept on a failed task
const MAX_ERROR_BODY: usize = 512;

/// HTTP implementation of DeliveryTransport
pub struct HttpDelivery {
    client: Client,
    signing_secret: Option<String>,
}

impl HttpDelivery {
    pub fn new(timeout: Duration, signing_secret: Option<String>) -> Result<Self, DomainError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("Callflow-Delivery/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DomainError::ExternalService(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            signing_secret,
        })
    }

    /// HMAC-SHA256 of `payload`, as `sha256=<hex>`
    pub fn sign_payload(secret: &str, payload: &[u8]) -> Result<String, DomainError> {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| DomainError::Validation(format!("Invalid signing key: {e}")))?;
        mac.update(payload);
        Ok(format!("sha256={}", hex::encode(mac.finalize().into_bytes())))
    }
}

#[async_trait]
impl DeliveryTransport for HttpDelivery {
    async fn deliver(&self, task: &DeliveryTask) -> DeliveryOutcome {
        let body = task.payload.to_string().into_bytes();

        let mut request = self
            .client
            .post(&task.url)
            .header(CONTENT_TYPE, "application/json")
            .header("X-Callflow-Event", &task.kind)
            .header("X-Callflow-Delivery", task.id.to_string());

        if let Some(secret) = &self.signing_secret {
            match Self::sign_payload(secret, &body) {
                Ok(signature) => request = request.header(SIGNATURE_HEADER, signature),
                Err(e) => return DeliveryOutcome::Unreachable(e.to_string()),
            }
        }

        match request.body(body).send().await {
            Ok(resp) => {
                let status_code = resp.status().as_u16();
                if resp.status().is_success() {
                    return DeliveryOutcome::Delivered { status_code };
                }
                let mut body = resp.text().await.unwrap_or_default();
                if body.len() > MAX_ERROR_BODY {
                    let mut end = MAX_ERROR_BODY;
                    while !body.is_char_boundary(end) {
                        end -= 1;
                    }
                    body.truncate(end);
                }
                DeliveryOutcome::Rejected { status_code, body }
            }
            Err(e) if e.is_timeout() => DeliveryOutcome::Unreachable(format!("timed out: {e}")),
            Err(e) => DeliveryOutcome::Unreachable(e.to_string()),
        }
    }
}
