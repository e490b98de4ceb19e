use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{Value, json};
use tokio::sync::Semaphore;

use autofilm_core::{ExecutorError, JobConfig, JobId, JobKind};
use autofilm_infra::tasks::{ExecutorFactory, HistoryLog, JobExecutor, RunOptions, TaskRegistry};
use autofilm_infra::ExecutionCoordinator;

/// Executors pick their behaviour from the `mode` config key; `gated` runs
/// block until the test releases a permit.
struct GatedFactory {
    gate: Arc<Semaphore>,
}

struct GatedExecutor {
    mode: String,
    gate: Arc<Semaphore>,
    options: RunOptions,
}

#[async_trait]
impl JobExecutor for GatedExecutor {
    async fn run(&self, scope: Option<&str>) -> Result<Value, ExecutorError> {
        match self.mode.as_str() {
            "fail" => Err(ExecutorError::failed("alist unreachable")),
            "gated" => {
                self.gate
                    .acquire()
                    .await
                    .map_err(|e| ExecutorError::Aborted(e.to_string()))?
                    .forget();
                Ok(json!({ "scope": scope, "overwrite": self.options.overwrite }))
            }
            _ => Ok(json!({ "scope": scope, "overwrite": self.options.overwrite })),
        }
    }
}

impl ExecutorFactory for GatedFactory {
    fn build(
        &self,
        _kind: JobKind,
        config: &JobConfig,
        options: &RunOptions,
    ) -> Result<Box<dyn JobExecutor>, ExecutorError> {
        Ok(Box::new(GatedExecutor {
            mode: config.get_str("mode").unwrap_or("ok").to_string(),
            gate: self.gate.clone(),
            options: *options,
        }))
    }
}

struct TestServer {
    base_url: String,
    gate: Arc<Semaphore>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(api_key: Option<&str>) -> Self {
        let registry = TaskRegistry::arc();
        registry
            .register(
                JobId::new("media1"),
                JobKind::BulkSync,
                JobConfig::new()
                    .with("id", "media1")
                    .with("cron", "0 * * * *")
                    .with("source_dir", "/x")
                    .with("mode", "gated"),
            )
            .unwrap();
        registry
            .register(
                JobId::new("anime"),
                JobKind::CatalogMirror,
                JobConfig::new().with("description", "Anime catalog"),
            )
            .unwrap();
        registry
            .register(
                JobId::new("posters"),
                JobKind::MetadataRefresh,
                JobConfig::new().with("mode", "fail"),
            )
            .unwrap();

        let gate = Arc::new(Semaphore::new(0));
        let coordinator = ExecutionCoordinator::new(
            registry,
            Arc::new(HistoryLog::new()),
            Arc::new(GatedFactory { gate: gate.clone() }),
        );

        // Same router as prod, bound to an ephemeral port.
        let app = autofilm_api::build_app(coordinator, api_key.map(str::to_string));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            gate,
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn release(&self) {
        self.gate.add_permits(1);
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn status_eventually(
    client: &reqwest::Client,
    srv: &TestServer,
    id: &str,
    expected: &str,
) -> Value {
    // Execution outcomes are recorded asynchronously; poll briefly.
    for _ in 0..100 {
        let body: Value = client
            .get(srv.url(&format!("/api/tasks/{id}/status")))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        if body["status"] == expected {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("task {id} did not reach {expected} within timeout");
}

#[tokio::test]
async fn health_and_version_are_public() {
    let srv = TestServer::spawn(Some("secret")).await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/api/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "healthy");

    let res = client.get(srv.url("/api/version")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["app_name"], "autofilm");
}

#[tokio::test]
async fn api_key_required_when_configured() {
    let srv = TestServer::spawn(Some("secret")).await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/api/tasks")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .get(srv.url("/api/tasks"))
        .header("X-API-Key", "wrong")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .get(srv.url("/api/tasks"))
        .header("X-API-Key", "secret")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn list_and_get_project_registry_entries() {
    let srv = TestServer::spawn(None).await;
    let client = reqwest::Client::new();

    let body: Value = client
        .get(srv.url("/api/tasks"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let tasks = body.as_object().unwrap();
    assert_eq!(tasks.len(), 3);
    assert_eq!(tasks["media1"]["task_type"], "alist2strm");
    assert_eq!(tasks["media1"]["cron"], "0 * * * *");
    assert_eq!(tasks["media1"]["status"], "idle");
    assert_eq!(tasks["media1"]["last_run"], Value::Null);
    assert_eq!(tasks["anime"]["description"], "Anime catalog");
    assert_eq!(tasks["anime"]["cron"], Value::Null);

    let res = client.get(srv.url("/api/tasks/posters")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["task_type"], "libraryposter");
    assert_eq!(body["description"], "posters");

    let res = client.get(srv.url("/api/tasks/ghost")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn trigger_lifecycle_accept_reject_complete() {
    let srv = TestServer::spawn(None).await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/api/tasks/trigger/alist2strm/media1"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::ACCEPTED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "running");
    assert_eq!(body["message"], "Task media1 started");
    assert_eq!(body["task_type"], "alist2strm");

    let res = client
        .post(srv.url("/api/tasks/trigger/alist2strm/media1"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "already_running");

    srv.release();
    status_eventually(&client, &srv, "media1", "completed").await;

    let history: Value = client
        .get(srv.url("/api/tasks/media1/history?limit=10"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let records = history.as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["status"], "completed");
    assert_eq!(records[0]["task_id"], "media1");

    let task: Value = client
        .get(srv.url("/api/tasks/media1"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(task["last_run"].is_string());
}

#[tokio::test]
async fn trigger_rejections() {
    let srv = TestServer::spawn(None).await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/api/tasks/trigger/alist2strm/ghost"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .post(srv.url("/api/tasks/trigger/emby/media1"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(srv.url("/api/tasks/trigger/ani2alist/media1"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "kind_mismatch");

    let res = client
        .post(srv.url("/api/tasks/trigger/alist2strm/media1"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // None of the rejections produced history.
    let history: Value = client
        .get(srv.url("/api/tasks/media1/history"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(history.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn executor_failure_surfaces_through_status_and_history() {
    let srv = TestServer::spawn(None).await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/api/tasks/trigger/libraryposter/posters"))
        .json(&json!({ "override_config": { "dry_run": true } }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::ACCEPTED);

    status_eventually(&client, &srv, "posters", "failed").await;

    let history: Value = client
        .get(srv.url("/api/tasks/posters/history"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(history[0]["status"], "failed");
    assert_eq!(history[0]["error"], "alist unreachable");
}

#[tokio::test]
async fn directory_trigger_scopes_a_bulk_sync_run() {
    let srv = TestServer::spawn(None).await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/api/alist2strm/anime/directory"))
        .json(&json!({ "directory": "/movies" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(srv.url("/api/alist2strm/media1/directory"))
        .json(&json!({ "directory": "/movies", "overwrite": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::ACCEPTED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "success");
    assert_eq!(body["message"], "Processing directory /movies");
    assert_eq!(body["directory"], "/movies");

    srv.release();
    status_eventually(&client, &srv, "media1", "completed").await;

    let history: Value = client
        .get(srv.url("/api/tasks/media1/history"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(history[0]["scope"], "/movies");
    assert_eq!(history[0]["result"], json!({ "scope": "/movies", "overwrite": true }));
}

#[tokio::test]
async fn directories_batch_reports_each_directory() {
    let srv = TestServer::spawn(None).await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/api/alist2strm/media1/directories"))
        .json(&json!({ "directories": ["/movies", "/shows"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["task_id"], "media1");
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["directory"], "/movies");
    assert_eq!(results[0]["status"], "started");
    assert_eq!(results[1]["directory"], "/shows");
    assert_eq!(results[1]["status"], "failed");

    srv.release();
}

#[tokio::test]
async fn directories_batch_reports_unknown_or_unscoped_tasks_per_directory() {
    let srv = TestServer::spawn(None).await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/api/alist2strm/ghost/directories"))
        .json(&json!({ "directories": ["/movies", "/shows"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "success");
    assert_eq!(body["task_id"], "ghost");
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    for (result, directory) in results.iter().zip(["/movies", "/shows"]) {
        assert_eq!(result["directory"], directory);
        assert_eq!(result["status"], "failed");
        assert_eq!(result["message"], "task ghost not found");
    }

    let res = client
        .post(srv.url("/api/alist2strm/anime/directories"))
        .json(&json!({ "directories": ["/movies"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["results"][0]["status"], "failed");
    assert_eq!(
        body["results"][0]["message"],
        "task anime is a ani2alist task; scoped execution requires alist2strm"
    );
}

#[tokio::test]
async fn quick_and_ad_hoc_runs_respond_inline() {
    let srv = TestServer::spawn(None).await;
    let client = reqwest::Client::new();

    // Occupy the registered bulk-sync job; ad-hoc runs must not care.
    let res = client
        .post(srv.url("/api/tasks/trigger/alist2strm/media1"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::ACCEPTED);

    let res = client
        .post(srv.url("/api/alist2strm/quick"))
        .json(&json!({ "source_dir": "/quick" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "success");

    let res = client
        .post(srv.url("/api/tasks/adhoc/ani2alist"))
        .json(&json!({ "mode": "fail" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "error");
    assert_eq!(body["message"], "alist unreachable");

    let res = client
        .post(srv.url("/api/tasks/adhoc/emby"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let status: Value = client
        .get(srv.url("/api/tasks/media1/status"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["status"], "running");

    srv.release();
}

#[tokio::test]
async fn cancel_running_task() {
    let srv = TestServer::spawn(None).await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/api/tasks/media1/cancel"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = client
        .post(srv.url("/api/tasks/trigger/alist2strm/media1"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::ACCEPTED);

    let res = client
        .post(srv.url("/api/tasks/media1/cancel"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::ACCEPTED);

    status_eventually(&client, &srv, "media1", "cancelled").await;

    // Cancelled accepts the next trigger.
    let res = client
        .post(srv.url("/api/tasks/trigger/alist2strm/media1"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::ACCEPTED);
    srv.release();
}
