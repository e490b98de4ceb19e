use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use autofilm_core::TaskError;

pub fn task_error_to_response(err: TaskError) -> axum::response::Response {
    let message = err.to_string();
    match err {
        TaskError::NotFound(_) => json_error(StatusCode::NOT_FOUND, "not_found", message),
        TaskError::AlreadyRunning(_) => json_error(StatusCode::CONFLICT, "already_running", message),
        TaskError::NotRunning(_) => json_error(StatusCode::CONFLICT, "not_running", message),
        TaskError::UnsupportedKind { .. } => {
            json_error(StatusCode::BAD_REQUEST, "unsupported_kind", message)
        }
        TaskError::UnknownKind(_) => json_error(StatusCode::BAD_REQUEST, "invalid_task_type", message),
        TaskError::InvalidIdentity(_) => json_error(StatusCode::BAD_REQUEST, "invalid_task_id", message),
        TaskError::DuplicateIdentity(_)
        | TaskError::InvalidTransition { .. }
        | TaskError::Executor(_) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
