use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use autofilm_core::{JobConfig, JobId, JobKind, LifecycleState};
use autofilm_infra::tasks::{
    ExecutionId, ExecutionTicket, InFlightExecution, RegistryEntry, ScopeOutcome,
};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Default, Deserialize)]
pub struct TriggerRequest {
    /// Top-level keys replacing the job's configuration for this run only.
    pub override_config: Option<JobConfig>,
}

#[derive(Debug, Deserialize)]
pub struct DirectoryTriggerRequest {
    pub directory: String,
    pub sync_mode: Option<bool>,
    #[serde(default)]
    pub overwrite: bool,
}

#[derive(Debug, Deserialize)]
pub struct DirectoriesTriggerRequest {
    pub directories: Vec<String>,
    pub sync_mode: Option<bool>,
    #[serde(default)]
    pub overwrite: bool,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

// -------------------------
// Response DTOs
// -------------------------

/// Projection of one registry entry.
#[derive(Debug, Serialize)]
pub struct JobView {
    pub task_id: JobId,
    pub task_type: JobKind,
    pub description: String,
    pub cron: Option<String>,
    pub status: LifecycleState,
    pub last_run: Option<DateTime<Utc>>,
    pub config: JobConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub running: Option<InFlightExecution>,
}

impl From<&RegistryEntry> for JobView {
    fn from(entry: &RegistryEntry) -> Self {
        Self {
            task_id: entry.id.clone(),
            task_type: entry.kind,
            description: entry.description(),
            cron: entry.schedule().map(str::to_string),
            status: entry.state,
            last_run: entry.last_run,
            config: (*entry.config).clone(),
            running: entry.in_flight.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TriggerResponse {
    pub task_id: JobId,
    pub task_type: JobKind,
    pub status: LifecycleState,
    pub message: String,
    pub started_at: DateTime<Utc>,
    pub execution_id: ExecutionId,
}

impl From<ExecutionTicket> for TriggerResponse {
    fn from(ticket: ExecutionTicket) -> Self {
        Self {
            task_id: ticket.task_id,
            task_type: ticket.task_type,
            status: ticket.status,
            message: ticket.message,
            started_at: ticket.started_at,
            execution_id: ticket.execution_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub task_id: JobId,
    pub status: LifecycleState,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub task_id: JobId,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct DirectoryTriggerResponse {
    pub status: &'static str,
    pub message: String,
    pub task_id: JobId,
    pub directory: String,
    pub started_at: DateTime<Utc>,
    pub execution_id: ExecutionId,
}

#[derive(Debug, Serialize)]
pub struct DirectoriesTriggerResponse {
    pub status: &'static str,
    pub task_id: JobId,
    pub results: Vec<ScopeOutcome>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub version: &'static str,
    pub app_name: &'static str,
}
