use axum::Json;
use chrono::Utc;

use crate::app::dto::{HealthResponse, VersionResponse};

pub const APP_NAME: &str = "autofilm";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: VERSION,
        timestamp: Utc::now(),
    })
}

pub async fn version() -> Json<VersionResponse> {
    Json(VersionResponse {
        version: VERSION,
        app_name: APP_NAME,
    })
}
