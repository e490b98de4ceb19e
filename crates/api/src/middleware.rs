use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::app::errors::json_error;

pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Clone, Default)]
pub struct ApiKeyState {
    /// `None` disables the check.
    pub api_key: Option<Arc<str>>,
}

impl ApiKeyState {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.is_empty()).map(Arc::from),
        }
    }
}

pub async fn api_key_middleware(
    State(state): State<ApiKeyState>,
    req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let Some(expected) = state.api_key.as_deref() else {
        return next.run(req).await;
    };

    match extract_api_key(req.headers()) {
        Some(presented) if presented == expected => next.run(req).await,
        _ => json_error(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "missing or invalid API key",
        ),
    }
}

fn extract_api_key(headers: &HeaderMap) -> Option<&str> {
    let key = headers.get(API_KEY_HEADER)?.to_str().ok()?.trim();
    (!key.is_empty()).then_some(key)
}
