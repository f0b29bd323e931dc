//! Callflow API Routes
//!
//! - /api/advanced-calls/* - Provider call-control webhooks (NCCO)
//! - /webhooks/* - Provider recording and event callbacks
//! - /api/scripts - Saved call scripts
//! - /api/calls - Call sessions and operator actions
//! - /api/deliveries - Outbound notification queue
//! - /api/live - Live event stream (websocket)

pub mod calls;
pub mod deliveries;
pub mod live;
pub mod scripts;
pub mod swagger;
pub mod webhooks;

use axum::http::StatusCode;
use callflow::DomainError;

/// Map a domain error onto an operator API response
pub fn error_response(e: DomainError) -> (StatusCode, String) {
    let status = match &e {
        DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
        DomainError::Validation(_) => StatusCode::BAD_REQUEST,
        DomainError::Conflict(_) => StatusCode::CONFLICT,
        DomainError::ExternalService(_) => StatusCode::BAD_GATEWAY,
        DomainError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::error!("❌ {}", e);
    }
    (status, e.to_string())
}
