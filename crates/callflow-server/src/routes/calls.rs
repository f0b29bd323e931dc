//! Call Routes - Sessions and operator actions
//!
//! HTTP handlers that delegate to CallFlowService.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use callflow::CallStatus;

use super::error_response;
use crate::models::{
    CallDetailResponse, CallEventResponse, CallResponse, InitiateCallRequest, ListCallsQuery,
    StatsResponse,
};
use crate::AppState;

/// List recent calls
#[utoipa::path(
    get,
    path = "/api/calls",
    params(ListCallsQuery),
    responses(
        (status = 200, description = "Recent calls, newest first", body = Vec<CallResponse>),
        (status = 400, description = "Unknown status filter"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Calls"
)]
pub async fn list_calls(
    State(state): State<AppState>,
    Query(query): Query<ListCallsQuery>,
) -> Result<Json<Vec<CallResponse>>, (StatusCode, String)> {
    let status = query
        .status
        .map(|s| s.parse::<CallStatus>())
        .transpose()
        .map_err(|e| (StatusCode::BAD_REQUEST, e))?;

    let calls = state
        .call_service
        .list_calls(status, query.limit.unwrap_or(50))
        .await
        .map_err(error_response)?;

    Ok(Json(calls.into_iter().map(CallResponse::from_domain).collect()))
}

/// Place a scripted call
#[utoipa::path(
    post,
    path = "/api/calls",
    request_body = InitiateCallRequest,
    responses(
        (status = 200, description = "Call placed", body = CallResponse),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Script not found"),
        (status = 502, description = "Telephony provider failed or is not configured")
    ),
    tag = "Calls"
)]
pub async fn initiate_call(
    State(state): State<AppState>,
    Json(payload): Json<InitiateCallRequest>,
) -> Result<Json<CallResponse>, (StatusCode, String)> {
    let session = state
        .call_service
        .initiate_call(payload.into_command())
        .await
        .map_err(error_response)?;

    Ok(Json(CallResponse::from_domain(session)))
}

/// Call outcome statistics
#[utoipa::path(
    get,
    path = "/api/calls/stats",
    responses(
        (status = 200, description = "Call counts by outcome", body = StatsResponse),
        (status = 500, description = "Internal server error")
    ),
    tag = "Calls"
)]
pub async fn call_stats(
    State(state): State<AppState>,
) -> Result<Json<StatsResponse>, (StatusCode, String)> {
    let stats = state.call_service.stats().await.map_err(error_response)?;
    Ok(Json(StatsResponse::from_domain(stats)))
}

/// Get a call with its audit trail
#[utoipa::path(
    get,
    path = "/api/calls/{call_id}",
    params(
        ("call_id" = String, Path, description = "Provider call id")
    ),
    responses(
        (status = 200, description = "Call found", body = CallDetailResponse),
        (status = 404, description = "Call not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Calls"
)]
pub async fn get_call(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
) -> Result<Json<CallDetailResponse>, (StatusCode, String)> {
    let (session, events) = state
        .call_service
        .get_call(&call_id)
        .await
        .map_err(error_response)?;

    Ok(Json(CallDetailResponse {
        call: CallResponse::from_domain(session),
        events: events
            .into_iter()
            .map(CallEventResponse::from_domain)
            .collect(),
    }))
}

/// Transfer a live call to the operator phone
#[utoipa::path(
    post,
    path = "/api/calls/{call_id}/escalate",
    params(
        ("call_id" = String, Path, description = "Provider call id")
    ),
    responses(
        (status = 200, description = "Call escalated", body = CallResponse),
        (status = 400, description = "No operator phone configured"),
        (status = 404, description = "Call not found"),
        (status = 409, description = "Call already ended"),
        (status = 502, description = "Telephony provider failed")
    ),
    tag = "Calls"
)]
pub async fn escalate_call(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
) -> Result<Json<CallResponse>, (StatusCode, String)> {
    let session = state
        .call_service
        .escalate(&call_id)
        .await
        .map_err(error_response)?;

    Ok(Json(CallResponse::from_domain(session)))
}

/// End a live call
#[utoipa::path(
    post,
    path = "/api/calls/{call_id}/hangup",
    params(
        ("call_id" = String, Path, description = "Provider call id")
    ),
    responses(
        (status = 200, description = "Call hung up", body = CallResponse),
        (status = 404, description = "Call not found"),
        (status = 409, description = "Call already ended"),
        (status = 502, description = "Telephony provider failed")
    ),
    tag = "Calls"
)]
pub async fn hang_up_call(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
) -> Result<Json<CallResponse>, (StatusCode, String)> {
    let session = state
        .call_service
        .hang_up(&call_id)
        .await
        .map_err(error_response)?;

    Ok(Json(CallResponse::from_domain(session)))
}

/// Start recording a live call
#[utoipa::path(
    post,
    path = "/api/calls/{call_id}/record",
    params(
        ("call_id" = String, Path, description = "Provider call id")
    ),
    responses(
        (status = 200, description = "Recording started", body = CallResponse),
        (status = 404, description = "Call not found"),
        (status = 409, description = "Call already ended"),
        (status = 502, description = "Telephony provider failed")
    ),
    tag = "Calls"
)]
pub async fn record_call(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
) -> Result<Json<CallResponse>, (StatusCode, String)> {
    let session = state
        .call_service
        .start_recording(&call_id)
        .await
        .map_err(error_response)?;

    Ok(Json(CallResponse::from_domain(session)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/calls", get(list_calls).post(initiate_call))
        .route("/api/calls/stats", get(call_stats))
        .route("/api/calls/:call_id", get(get_call))
        .route("/api/calls/:call_id/escalate", post(escalate_call))
        .route("/api/calls/:call_id/hangup", post(hang_up_call))
        .route("/api/calls/:call_id/record", post(record_call))
}
