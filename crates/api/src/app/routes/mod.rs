use axum::Router;

pub mod alist2strm;
pub mod system;
pub mod tasks;

/// Router for all key-protected endpoints.
pub fn router() -> Router {
    Router::new()
        .merge(tasks::router())
        .merge(alist2strm::router())
}
