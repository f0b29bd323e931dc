//! Script Routes - Saved call flows
//!
//! HTTP handlers that delegate to ScriptService for business logic.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use super::error_response;
use crate::models::{CreateScriptRequest, ScriptResponse};
use crate::AppState;

/// List all scripts
#[utoipa::path(
    get,
    path = "/api/scripts",
    responses(
        (status = 200, description = "List of saved scripts", body = Vec<ScriptResponse>),
        (status = 500, description = "Internal server error")
    ),
    tag = "Scripts"
)]
pub async fn list_scripts(
    State(state): State<AppState>,
) -> Result<Json<Vec<ScriptResponse>>, (StatusCode, String)> {
    let scripts = state
        .script_service
        .list_all()
        .await
        .map_err(error_response)?;

    Ok(Json(
        scripts.into_iter().map(ScriptResponse::from_domain).collect(),
    ))
}

/// Save a new script
#[utoipa::path(
    post,
    path = "/api/scripts",
    request_body = CreateScriptRequest,
    responses(
        (status = 200, description = "Script created", body = ScriptResponse),
        (status = 400, description = "Invalid flow"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Scripts"
)]
pub async fn create_script(
    State(state): State<AppState>,
    Json(payload): Json<CreateScriptRequest>,
) -> Result<Json<ScriptResponse>, (StatusCode, String)> {
    let script = state
        .script_service
        .create(payload.name, payload.flow, payload.language, payload.voice)
        .await
        .map_err(error_response)?;

    Ok(Json(ScriptResponse::from_domain(script)))
}

/// Get script by ID
#[utoipa::path(
    get,
    path = "/api/scripts/{id}",
    params(
        ("id" = Uuid, Path, description = "Script ID")
    ),
    responses(
        (status = 200, description = "Script found", body = ScriptResponse),
        (status = 404, description = "Script not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Scripts"
)]
pub async fn get_script(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ScriptResponse>, (StatusCode, String)> {
    let script = state
        .script_service
        .get_by_id(id)
        .await
        .map_err(error_response)?;

    Ok(Json(ScriptResponse::from_domain(script)))
}

/// Delete a script
#[utoipa::path(
    delete,
    path = "/api/scripts/{id}",
    params(
        ("id" = Uuid, Path, description = "Script ID")
    ),
    responses(
        (status = 204, description = "Script deleted"),
        (status = 404, description = "Script not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Scripts"
)]
pub async fn delete_script(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    state
        .script_service
        .delete(id)
        .await
        .map_err(error_response)?;

    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/scripts", get(list_scripts).post(create_script))
        .route("/api/scripts/:id", get(get_script).delete(delete_script))
}
