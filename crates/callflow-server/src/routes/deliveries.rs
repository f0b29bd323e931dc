//! Delivery Routes - Outbound notification queue

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use callflow::DeliveryStatus;
use uuid::Uuid;

use super::error_response;
use crate::models::{CreateDeliveryRequest, DeliveryResponse, ListDeliveriesQuery};
use crate::AppState;

/// List delivery tasks
#[utoipa::path(
    get,
    path = "/api/deliveries",
    params(ListDeliveriesQuery),
    responses(
        (status = 200, description = "Delivery tasks, newest first", body = Vec<DeliveryResponse>),
        (status = 400, description = "Unknown status filter"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Deliveries"
)]
pub async fn list_deliveries(
    State(state): State<AppState>,
    Query(query): Query<ListDeliveriesQuery>,
) -> Result<Json<Vec<DeliveryResponse>>, (StatusCode, String)> {
    let status = query
        .status
        .map(|s| s.parse::<DeliveryStatus>())
        .transpose()
        .map_err(|e| (StatusCode::BAD_REQUEST, e))?;

    let tasks = state
        .delivery_queue
        .list(status, query.limit.unwrap_or(50))
        .await
        .map_err(error_response)?;

    Ok(Json(
        tasks.into_iter().map(DeliveryResponse::from_domain).collect(),
    ))
}

/// Queue an outbound notification
#[utoipa::path(
    post,
    path = "/api/deliveries",
    request_body = CreateDeliveryRequest,
    responses(
        (status = 200, description = "Delivery queued", body = DeliveryResponse),
        (status = 400, description = "Invalid request"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Deliveries"
)]
pub async fn create_delivery(
    State(state): State<AppState>,
    Json(payload): Json<CreateDeliveryRequest>,
) -> Result<Json<DeliveryResponse>, (StatusCode, String)> {
    let task = state
        .delivery_queue
        .enqueue(payload.kind, payload.payload, payload.url, payload.max_retries)
        .await
        .map_err(error_response)?;

    Ok(Json(DeliveryResponse::from_domain(task)))
}

/// Get delivery task by ID
#[utoipa::path(
    get,
    path = "/api/deliveries/{id}",
    params(
        ("id" = Uuid, Path, description = "Delivery task ID")
    ),
    responses(
        (status = 200, description = "Delivery task found", body = DeliveryResponse),
        (status = 404, description = "Delivery task not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Deliveries"
)]
pub async fn get_delivery(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeliveryResponse>, (StatusCode, String)> {
    let task = state
        .delivery_queue
        .get(id)
        .await
        .map_err(error_response)?;

    Ok(Json(DeliveryResponse::from_domain(task)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/deliveries", get(list_deliveries).post(create_delivery))
        .route("/api/deliveries/:id", get(get_delivery))
}
