//! Registry snapshots, history records and execution tickets.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use autofilm_core::{JobConfig, JobId, JobKind, LifecycleState};

/// Unique identifier of one accepted execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionId(pub Uuid);

impl ExecutionId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ExecutionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Point-in-time copy of a registry entry.
///
/// Never torn: every field comes from the same locked read.
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    pub id: JobId,
    pub kind: JobKind,
    /// Base configuration as registered (shared, read-only).
    pub config: Arc<JobConfig>,
    pub state: LifecycleState,
    pub last_run: Option<DateTime<Utc>>,
    /// Present while `state == Running`.
    pub in_flight: Option<InFlightExecution>,
}

impl RegistryEntry {
    /// `config.description`, then `config.id`, then the identity.
    pub fn description(&self) -> String {
        self.config
            .get_str("description")
            .or_else(|| self.config.get_str("id"))
            .map(str::to_string)
            .unwrap_or_else(|| self.id.to_string())
    }

    /// Cron expression the job is scheduled with, if any.
    pub fn schedule(&self) -> Option<&str> {
        self.config.get_str("cron").filter(|c| !c.trim().is_empty())
    }
}

/// Reference to the execution currently holding a job in `Running`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InFlightExecution {
    pub execution_id: ExecutionId,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// Immutable record of one finished execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub execution_id: ExecutionId,
    pub task_id: JobId,
    pub task_type: JobKind,
    /// Completed, Failed or Cancelled.
    pub status: LifecycleState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HistoryRecord {
    pub fn duration_ms(&self) -> u64 {
        (self.completed_at - self.started_at).num_milliseconds().max(0) as u64
    }
}

/// Acknowledgement returned to the caller when a trigger is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionTicket {
    pub execution_id: ExecutionId,
    pub task_id: JobId,
    pub task_type: JobKind,
    /// Always `Running` at acceptance time.
    pub status: LifecycleState,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    pub started_at: DateTime<Utc>,
}

/// Outcome of one scope in a batched scoped trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScopeOutcome {
    pub directory: String,
    pub status: ScopeStatus,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeStatus {
    Started,
    Failed,
}

/// Result of a synchronous ad-hoc run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdHocOutcome {
    pub status: AdHocStatus,
    pub message: String,
    pub result: Option<JsonValue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdHocStatus {
    Success,
    Error,
}
