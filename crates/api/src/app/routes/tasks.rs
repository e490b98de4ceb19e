//! Registered task endpoints: listing, triggering, status, history, cancel.

use std::collections::BTreeMap;
use std::str::FromStr;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::de::DeserializeOwned;

use autofilm_core::{JobConfig, JobId, JobKind};
use autofilm_infra::ExecutionCoordinator;

use crate::app::dto::{
    CancelResponse, HistoryQuery, JobView, StatusResponse, TriggerRequest, TriggerResponse,
};
use crate::app::errors::{self, task_error_to_response};

/// Records returned by the history endpoint when no `limit` is given.
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

pub fn router() -> Router {
    Router::new()
        .route("/api/tasks", get(list_tasks))
        .route("/api/tasks/:task_id", get(get_task))
        .route("/api/tasks/:task_id/status", get(get_task_status))
        .route("/api/tasks/:task_id/history", get(get_task_history))
        .route("/api/tasks/:task_id/cancel", post(cancel_task))
        .route("/api/tasks/trigger/:task_type/:task_id", post(trigger_task))
        .route("/api/tasks/adhoc/:task_type", post(trigger_ad_hoc))
}

/// GET /api/tasks
pub async fn list_tasks(
    Extension(coordinator): Extension<ExecutionCoordinator>,
) -> Json<BTreeMap<JobId, JobView>> {
    let tasks = coordinator
        .registry()
        .list_all()
        .iter()
        .map(|(id, entry)| (id.clone(), JobView::from(entry)))
        .collect();
    Json(tasks)
}

/// GET /api/tasks/:task_id
pub async fn get_task(
    Extension(coordinator): Extension<ExecutionCoordinator>,
    Path(task_id): Path<String>,
) -> Response {
    let result = parse_id(&task_id).and_then(|id| coordinator.get(&id));
    match result {
        Ok(entry) => Json(JobView::from(&entry)).into_response(),
        Err(e) => task_error_to_response(e),
    }
}

/// POST /api/tasks/trigger/:task_type/:task_id
///
/// Body (optional): `{"override_config": {...}}`. Responds 202 as soon as the
/// run is accepted; the outcome shows up in status and history.
pub async fn trigger_task(
    Extension(coordinator): Extension<ExecutionCoordinator>,
    Path((task_type, task_id)): Path<(String, String)>,
    body: Bytes,
) -> Response {
    let request: TriggerRequest = match parse_optional_body(&body) {
        Ok(r) => r,
        Err(resp) => return resp,
    };

    let kind = match JobKind::from_str(&task_type) {
        Ok(k) => k,
        Err(e) => return task_error_to_response(e),
    };
    let id = match parse_id(&task_id) {
        Ok(id) => id,
        Err(e) => return task_error_to_response(e),
    };
    let entry = match coordinator.get(&id) {
        Ok(entry) => entry,
        Err(e) => return task_error_to_response(e),
    };
    if entry.kind != kind {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "kind_mismatch",
            format!("task {id} is a {} task, not {kind}", entry.kind),
        );
    }

    match coordinator.trigger(&id, request.override_config.as_ref()) {
        Ok(handle) => (
            StatusCode::ACCEPTED,
            Json(TriggerResponse::from(handle.into_ticket())),
        )
            .into_response(),
        Err(e) => task_error_to_response(e),
    }
}

/// GET /api/tasks/:task_id/status
pub async fn get_task_status(
    Extension(coordinator): Extension<ExecutionCoordinator>,
    Path(task_id): Path<String>,
) -> Response {
    let result = parse_id(&task_id)
        .and_then(|id| coordinator.status(&id).map(|status| (id, status)));
    match result {
        Ok((task_id, status)) => Json(StatusResponse { task_id, status }).into_response(),
        Err(e) => task_error_to_response(e),
    }
}

/// GET /api/tasks/:task_id/history?limit=10
///
/// Most recent records, oldest first. Unknown identities yield an empty list.
pub async fn get_task_history(
    Extension(coordinator): Extension<ExecutionCoordinator>,
    Path(task_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Response {
    let id = match parse_id(&task_id) {
        Ok(id) => id,
        Err(e) => return task_error_to_response(e),
    };
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    Json(coordinator.history(Some(&id), limit)).into_response()
}

/// POST /api/tasks/:task_id/cancel
pub async fn cancel_task(
    Extension(coordinator): Extension<ExecutionCoordinator>,
    Path(task_id): Path<String>,
) -> Response {
    let result = parse_id(&task_id).and_then(|id| coordinator.cancel(&id).map(|()| id));
    match result {
        Ok(task_id) => (
            StatusCode::ACCEPTED,
            Json(CancelResponse {
                message: format!("Cancellation requested for task {task_id}"),
                task_id,
            }),
        )
            .into_response(),
        Err(e) => task_error_to_response(e),
    }
}

/// POST /api/tasks/adhoc/:task_type
///
/// Body is the full job configuration. Runs to completion before responding.
pub async fn trigger_ad_hoc(
    Extension(coordinator): Extension<ExecutionCoordinator>,
    Path(task_type): Path<String>,
    Json(config): Json<JobConfig>,
) -> Response {
    match JobKind::from_str(&task_type) {
        Ok(kind) => Json(coordinator.trigger_ad_hoc(kind, config).await).into_response(),
        Err(e) => task_error_to_response(e),
    }
}

pub(crate) fn parse_id(raw: &str) -> Result<JobId, autofilm_core::TaskError> {
    JobId::from_str(raw)
}

/// An empty body is the default request; anything else must be valid JSON.
pub(crate) fn parse_optional_body<T: DeserializeOwned + Default>(
    body: &Bytes,
) -> Result<T, Response> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| errors::json_error(StatusCode::BAD_REQUEST, "invalid_body", e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_body_is_default_request() {
        let request: TriggerRequest = parse_optional_body(&Bytes::from_static(b"  ")).unwrap();
        assert!(request.override_config.is_none());

        let request: TriggerRequest =
            parse_optional_body(&Bytes::from_static(br#"{"override_config":{"subtitle":true}}"#))
                .unwrap();
        assert_eq!(request.override_config.unwrap().get_bool("subtitle"), Some(true));
    }

    #[test]
    fn malformed_body_is_bad_request() {
        let err = parse_optional_body::<TriggerRequest>(&Bytes::from_static(b"{nope"))
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
