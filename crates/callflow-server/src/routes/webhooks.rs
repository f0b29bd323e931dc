//! Provider Webhooks
//!
//! Unauthenticated. Call-control endpoints always answer 200 with an NCCO
//! list and callbacks always answer 204, so the provider never sees a failure
//! it would retry against a half-updated call. Bodies are parsed leniently:
//! a malformed body is treated as an empty one.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;

use crate::adapters::formatters::to_ncco;
use crate::AppState;

/// Identifies the call on an answer webhook without a path id
#[derive(Debug, Default, Deserialize)]
pub struct AnswerQuery {
    pub uuid: Option<String>,
    pub conversation_uuid: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DtmfBody {
    dtmf: Option<DtmfDigits>,
}

#[derive(Debug, Deserialize)]
struct DtmfDigits {
    digits: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RecordingBody {
    recording_url: Option<String>,
    conversation_uuid: Option<String>,
}

/// Call id from the query string, falling back to the JSON body
fn answer_call_id(query: AnswerQuery, body: &[u8]) -> Option<String> {
    let from_body = || {
        let value: Value = serde_json::from_slice(body).ok()?;
        ["uuid", "conversation_uuid"]
            .iter()
            .find_map(|key| value.get(key).and_then(|v| v.as_str()).map(String::from))
    };
    query
        .uuid
        .or(query.conversation_uuid)
        .filter(|id| !id.is_empty())
        .or_else(from_body)
}

/// Digits from a `{ "dtmf": { "digits": "…" } }` body
fn dtmf_digits(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<DtmfBody>(body)
        .ok()?
        .dtmf?
        .digits
        .filter(|d| !d.is_empty())
}

/// Answer webhook addressed by path
pub async fn answer(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
) -> Json<Vec<Value>> {
    tracing::info!("📞 Call answered: {}", call_id);
    Json(to_ncco(&state.call_service.handle_answered(&call_id).await))
}

/// Answer webhook addressed by query string or body
pub async fn answer_by_query(
    State(state): State<AppState>,
    Query(query): Query<AnswerQuery>,
    body: Bytes,
) -> Json<Vec<Value>> {
    let instructions = match answer_call_id(query, &body) {
        Some(call_id) => {
            tracing::info!("📞 Call answered: {}", call_id);
            state.call_service.handle_answered(&call_id).await
        }
        None => {
            tracing::warn!("⚠️  Answer webhook without a call id");
            state.call_service.goodbye()
        }
    };
    Json(to_ncco(&instructions))
}

/// Keypad input for a call
pub async fn dtmf_handler(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
    body: Bytes,
) -> Json<Vec<Value>> {
    let digits = dtmf_digits(&body);
    tracing::info!(
        "🔢 DTMF for {}: {}",
        call_id,
        digits.as_deref().unwrap_or("<none>")
    );
    let instructions = state
        .call_service
        .handle_digits(&call_id, digits.as_deref())
        .await;
    Json(to_ncco(&instructions))
}

/// Finished recording
pub async fn recording(State(state): State<AppState>, body: Bytes) -> StatusCode {
    match serde_json::from_slice::<RecordingBody>(&body) {
        Ok(RecordingBody {
            recording_url: Some(url),
            conversation_uuid: Some(call_id),
        }) => state.call_service.handle_recording(&call_id, &url).await,
        _ => tracing::warn!("⚠️  Recording webhook without recording_url/conversation_uuid"),
    }
    StatusCode::NO_CONTENT
}

/// Generic provider event
pub async fn event(State(state): State<AppState>, body: Bytes) -> StatusCode {
    match serde_json::from_slice::<Value>(&body) {
        Ok(event) => state.call_service.handle_provider_event(&event).await,
        Err(e) => tracing::warn!("⚠️  Unreadable provider event: {}", e),
    }
    StatusCode::NO_CONTENT
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/advanced-calls/answer",
            get(answer_by_query).post(answer_by_query),
        )
        .route("/api/advanced-calls/answer/:call_id", get(answer).post(answer))
        .route("/api/advanced-calls/dtmf-handler/:call_id", post(dtmf_handler))
        .route("/webhooks/recording", post(recording))
        .route("/webhooks/event", post(event))
}
