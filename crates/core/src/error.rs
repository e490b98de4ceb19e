//! Orchestration error model.

use thiserror::Error;

use crate::id::JobId;
use crate::kind::JobKind;
use crate::state::LifecycleState;

/// Result type used across the orchestration layer.
pub type TaskResult<T> = Result<T, TaskError>;

/// Errors surfaced by the registry and the execution coordinator.
///
/// Everything except `Executor` is an immediate rejection of a request; none
/// of them is a fault of the orchestrator itself.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// Unknown job identity (client error).
    #[error("task {0} not found")]
    NotFound(JobId),

    /// A trigger arrived while the job was running (conflict, retry later).
    #[error("task {0} is already running")]
    AlreadyRunning(JobId),

    /// Cancellation requested for a job that is not running.
    #[error("task {0} is not running")]
    NotRunning(JobId),

    /// Scoped execution requested for a kind that has no notion of scope.
    #[error("task {id} is a {kind} task; scoped execution requires alist2strm")]
    UnsupportedKind { id: JobId, kind: JobKind },

    /// Two configured jobs share an identity (fatal at startup).
    #[error("duplicate task identity: {0}")]
    DuplicateIdentity(JobId),

    /// The registry refused a transition that is not an edge of the state machine.
    #[error("invalid transition for task {id}: {from} -> {to}")]
    InvalidTransition {
        id: JobId,
        from: LifecycleState,
        to: LifecycleState,
    },

    #[error("invalid task identity: {0:?}")]
    InvalidIdentity(String),

    #[error("unknown task kind: {0}")]
    UnknownKind(String),

    /// The job's own work failed.
    #[error("executor failure: {0}")]
    Executor(#[from] ExecutorError),
}

/// Errors produced by a job executor capability.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecutorError {
    /// The derived configuration cannot parameterize the executor.
    #[error("invalid executor configuration: {0}")]
    InvalidConfig(String),

    /// The executor could not be started.
    #[error("failed to start executor: {0}")]
    Spawn(String),

    /// The executor ran and reported failure.
    #[error("{0}")]
    Failed(String),

    /// The executor panicked or was aborted.
    #[error("executor aborted: {0}")]
    Aborted(String),
}

impl ExecutorError {
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}
