//! HTTP API application wiring (Axum router + shared state).
//!
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use autofilm_infra::ExecutionCoordinator;

use crate::middleware::{self, ApiKeyState};

pub mod dto;
pub mod errors;
pub mod routes;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
///
/// Task routes require `X-API-Key` when `api_key` is set; health and version
/// are always public.
pub fn build_app(coordinator: ExecutionCoordinator, api_key: Option<String>) -> Router {
    let protected = routes::router().layer(
        ServiceBuilder::new()
            .layer(axum::middleware::from_fn_with_state(
                ApiKeyState::new(api_key),
                middleware::api_key_middleware,
            ))
            .layer(Extension(coordinator)),
    );

    Router::new()
        .route("/api/health", get(routes::system::health))
        .route("/api/version", get(routes::system::version))
        .merge(protected)
}
