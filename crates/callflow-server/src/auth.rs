//! Operator API authentication (Bearer API key)
//!
//! Provider webhooks are mounted outside this layer.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};

/// Configured operator key; `None` disables authentication
#[derive(Clone, Default)]
pub struct ApiKey(Option<Arc<str>>);

impl ApiKey {
    pub fn new(key: Option<String>) -> Self {
        Self(key.filter(|k| !k.is_empty()).map(Arc::from))
    }

    pub fn is_enabled(&self) -> bool {
        self.0.is_some()
    }

    fn accepts(&self, authorization: Option<&str>) -> Result<(), &'static str> {
        let Some(expected) = self.0.as_deref() else {
            return Ok(());
        };
        match authorization.map(|h| h.strip_prefix("Bearer ")) {
            Some(Some(token)) if token == expected => Ok(()),
            Some(Some(_)) => Err("Invalid API key attempted"),
            Some(None) => Err("Invalid Authorization header format"),
            None => Err("Missing Authorization header"),
        }
    }
}

/// Rejects requests without the operator's Bearer token
pub async fn auth_middleware(
    State(api_key): State<ApiKey>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    match api_key.accepts(authorization) {
        Ok(()) => Ok(next.run(request).await),
        Err(reason) => {
            tracing::warn!("{} ({} {})", reason, request.method(), request.uri().path());
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}
