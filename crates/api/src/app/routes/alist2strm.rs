//! Bulk-sync specific endpoints: directory-scoped runs and quick runs.

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};

use autofilm_core::{JobConfig, JobKind};
use autofilm_infra::ExecutionCoordinator;
use autofilm_infra::tasks::RunOptions;

use crate::app::dto::{
    DirectoriesTriggerRequest, DirectoriesTriggerResponse, DirectoryTriggerRequest,
    DirectoryTriggerResponse,
};
use crate::app::errors::task_error_to_response;
use crate::app::routes::tasks::parse_id;

pub fn router() -> Router {
    Router::new()
        .route("/api/alist2strm/quick", post(quick_run))
        .route("/api/alist2strm/:task_id/directory", post(trigger_directory))
        .route("/api/alist2strm/:task_id/directories", post(trigger_directories))
}

/// POST /api/alist2strm/:task_id/directory
pub async fn trigger_directory(
    Extension(coordinator): Extension<ExecutionCoordinator>,
    Path(task_id): Path<String>,
    Json(request): Json<DirectoryTriggerRequest>,
) -> Response {
    let options = RunOptions::new(request.sync_mode, request.overwrite);
    let result = parse_id(&task_id)
        .and_then(|id| coordinator.trigger_scoped(&id, &request.directory, options));

    match result {
        Ok(handle) => {
            let ticket = handle.into_ticket();
            (
                StatusCode::ACCEPTED,
                Json(DirectoryTriggerResponse {
                    status: "success",
                    message: ticket.message,
                    task_id: ticket.task_id,
                    directory: request.directory,
                    started_at: ticket.started_at,
                    execution_id: ticket.execution_id,
                }),
            )
                .into_response()
        }
        Err(e) => task_error_to_response(e),
    }
}

/// POST /api/alist2strm/:task_id/directories
///
/// Always answers with one `started` / `failed` outcome per directory, even
/// when the task is unknown or not a bulk-sync task. Only a blank identity is
/// rejected outright.
pub async fn trigger_directories(
    Extension(coordinator): Extension<ExecutionCoordinator>,
    Path(task_id): Path<String>,
    Json(request): Json<DirectoriesTriggerRequest>,
) -> Response {
    let id = match parse_id(&task_id) {
        Ok(id) => id,
        Err(e) => return task_error_to_response(e),
    };

    let options = RunOptions::new(request.sync_mode, request.overwrite);
    let results = coordinator.trigger_scoped_batch(&id, &request.directories, options);

    Json(DirectoriesTriggerResponse {
        status: "success",
        task_id: id,
        results,
    })
    .into_response()
}

/// POST /api/alist2strm/quick
///
/// Body is a complete bulk-sync configuration; nothing is registered.
pub async fn quick_run(
    Extension(coordinator): Extension<ExecutionCoordinator>,
    Json(config): Json<JobConfig>,
) -> Response {
    Json(coordinator.trigger_ad_hoc(JobKind::BulkSync, config).await).into_response()
}
