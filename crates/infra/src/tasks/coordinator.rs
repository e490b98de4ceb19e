//! Execution coordinator.
//!
//! Accepts or rejects triggers against the registry, launches accepted
//! executions as independent tokio tasks and records their outcome.
//!
//! ## Flow
//!
//! 1. `begin_run` on the registry (the only place exclusivity is decided).
//! 2. Derive the configuration (`base ⊕ overrides`), never touching the base.
//! 3. Spawn the execution unit and hand the caller a ticket immediately.
//! 4. The unit builds a fresh executor, runs it, and records exactly one
//!    outcome: registry `Running -> Completed|Failed|Cancelled` plus one
//!    history record.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use autofilm_core::{
    ExecutorError, JobConfig, JobId, JobKind, LifecycleState, TaskError, TaskResult,
};

use super::executor::{ExecutorFactory, RunOptions};
use super::history::HistoryLog;
use super::registry::TaskRegistry;
use super::types::{
    AdHocOutcome, AdHocStatus, ExecutionId, ExecutionTicket, HistoryRecord, InFlightExecution,
    RegistryEntry, ScopeOutcome, ScopeStatus,
};

/// Accepted execution: the ticket plus a way to await the outcome.
///
/// Dropping the handle detaches from the execution; it keeps running.
#[derive(Debug)]
pub struct ExecutionHandle {
    ticket: ExecutionTicket,
    completion: JoinHandle<HistoryRecord>,
}

impl ExecutionHandle {
    pub fn ticket(&self) -> &ExecutionTicket {
        &self.ticket
    }

    pub fn into_ticket(self) -> ExecutionTicket {
        self.ticket
    }

    /// Wait for the execution to finish and return its history record.
    pub async fn wait(self) -> TaskResult<HistoryRecord> {
        self.completion
            .await
            .map_err(|e| TaskError::Executor(ExecutorError::Aborted(e.to_string())))
    }
}

#[derive(Clone)]
pub struct ExecutionCoordinator {
    registry: Arc<TaskRegistry>,
    history: Arc<HistoryLog>,
    factory: Arc<dyn ExecutorFactory>,
}

impl std::fmt::Debug for ExecutionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionCoordinator")
            .field("jobs", &self.registry.len())
            .field("history", &self.history.len())
            .finish_non_exhaustive()
    }
}

impl ExecutionCoordinator {
    pub fn new(
        registry: Arc<TaskRegistry>,
        history: Arc<HistoryLog>,
        factory: Arc<dyn ExecutorFactory>,
    ) -> Self {
        Self {
            registry,
            history,
            factory,
        }
    }

    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }

    pub fn history_log(&self) -> &Arc<HistoryLog> {
        &self.history
    }

    /// Trigger a full run of `id`, with optional top-level config overrides.
    ///
    /// Returns as soon as the execution is accepted. Must be called from within
    /// a Tokio runtime.
    pub fn trigger(&self, id: &JobId, overrides: Option<&JobConfig>) -> TaskResult<ExecutionHandle> {
        self.launch(id, overrides, None, RunOptions::default())
    }

    /// Trigger a run of a bulk-sync job limited to one directory.
    pub fn trigger_scoped(
        &self,
        id: &JobId,
        scope: &str,
        options: RunOptions,
    ) -> TaskResult<ExecutionHandle> {
        let entry = self
            .registry
            .get(id)
            .ok_or_else(|| TaskError::NotFound(id.clone()))?;
        if !entry.kind.supports_scope() {
            debug!(job_id = %id, kind = %entry.kind, "scoped trigger rejected: unsupported kind");
            return Err(TaskError::UnsupportedKind {
                id: id.clone(),
                kind: entry.kind,
            });
        }
        self.launch(id, None, Some(scope.to_string()), options)
    }

    /// Issue one scoped trigger per directory, in order.
    ///
    /// Every directory gets an outcome; a rejection never stops the batch.
    pub fn trigger_scoped_batch<S: AsRef<str>>(
        &self,
        id: &JobId,
        scopes: &[S],
        options: RunOptions,
    ) -> Vec<ScopeOutcome> {
        scopes
            .iter()
            .map(|scope| {
                let directory = scope.as_ref().to_string();
                match self.trigger_scoped(id, &directory, options) {
                    Ok(handle) => ScopeOutcome {
                        directory,
                        status: ScopeStatus::Started,
                        message: handle.into_ticket().message,
                    },
                    Err(err) => ScopeOutcome {
                        directory,
                        status: ScopeStatus::Failed,
                        message: err.to_string(),
                    },
                }
            })
            .collect()
    }

    /// Request cancellation of the running execution of `id`.
    ///
    /// Returns once the signal is delivered. A natural completion racing the
    /// signal may still win; the recorded outcome tells which one did.
    pub fn cancel(&self, id: &JobId) -> TaskResult<()> {
        let token = self.registry.cancel_token(id)?;
        token.cancel();
        info!(job_id = %id, "cancellation requested");
        Ok(())
    }

    /// Run an unregistered job to completion and return its outcome inline.
    ///
    /// Touches neither the registry nor the history log.
    pub async fn trigger_ad_hoc(&self, kind: JobKind, config: JobConfig) -> AdHocOutcome {
        let factory = self.factory.clone();
        let joined = tokio::spawn(async move {
            let executor = factory.build(kind, &config, &RunOptions::default())?;
            executor.run(None).await
        })
        .await;

        let outcome = match joined {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(err)) => Err(err),
            Err(join) => Err(ExecutorError::Aborted(join.to_string())),
        };

        match outcome {
            Ok(result) => {
                info!(kind = %kind, "ad-hoc run completed");
                AdHocOutcome {
                    status: AdHocStatus::Success,
                    message: format!("Ad-hoc {kind} run completed"),
                    result: Some(result),
                }
            }
            Err(err) => {
                error!(kind = %kind, error = %err, "ad-hoc run failed");
                AdHocOutcome {
                    status: AdHocStatus::Error,
                    message: err.to_string(),
                    result: None,
                }
            }
        }
    }

    pub fn get(&self, id: &JobId) -> TaskResult<RegistryEntry> {
        self.registry
            .get(id)
            .ok_or_else(|| TaskError::NotFound(id.clone()))
    }

    pub fn status(&self, id: &JobId) -> TaskResult<LifecycleState> {
        self.registry
            .state(id)
            .ok_or_else(|| TaskError::NotFound(id.clone()))
    }

    /// Most recent `limit` history records, optionally for one job.
    pub fn history(&self, id: Option<&JobId>, limit: usize) -> Vec<HistoryRecord> {
        self.history.query(id, limit)
    }

    fn launch(
        &self,
        id: &JobId,
        overrides: Option<&JobConfig>,
        scope: Option<String>,
        options: RunOptions,
    ) -> TaskResult<ExecutionHandle> {
        let execution_id = ExecutionId::new();
        let started_at = Utc::now();
        let cancel = CancellationToken::new();

        let entry = self
            .registry
            .begin_run(
                id,
                InFlightExecution {
                    execution_id,
                    started_at,
                    scope: scope.clone(),
                },
                cancel.clone(),
            )
            .inspect_err(|err| warn!(job_id = %id, error = %err, "trigger rejected"))?;

        let config = entry.config.merged(overrides);
        let message = match &scope {
            Some(dir) => format!("Processing directory {dir}"),
            None => format!("Task {id} started"),
        };

        info!(
            job_id = %id,
            kind = %entry.kind,
            execution_id = %execution_id,
            scope = scope.as_deref().unwrap_or("-"),
            "trigger accepted"
        );

        let ticket = ExecutionTicket {
            execution_id,
            task_id: id.clone(),
            task_type: entry.kind,
            status: LifecycleState::Running,
            message,
            scope: scope.clone(),
            started_at,
        };

        let guard = CompletionGuard {
            registry: self.registry.clone(),
            history: self.history.clone(),
            execution_id,
            task_id: id.clone(),
            task_type: entry.kind,
            scope: scope.clone(),
            started_at,
            recorded: false,
        };

        let factory = self.factory.clone();
        let kind = entry.kind;
        let completion = tokio::spawn(async move {
            let outcome = execute(factory, kind, config, options, scope, cancel).await;
            guard.finish(outcome)
        });

        Ok(ExecutionHandle { ticket, completion })
    }
}

#[derive(Debug)]
enum Outcome {
    Completed(JsonValue),
    Failed(ExecutorError),
    Cancelled,
}

async fn execute(
    factory: Arc<dyn ExecutorFactory>,
    kind: JobKind,
    config: JobConfig,
    options: RunOptions,
    scope: Option<String>,
    cancel: CancellationToken,
) -> Outcome {
    let executor = match factory.build(kind, &config, &options) {
        Ok(executor) => executor,
        Err(err) => return Outcome::Failed(err),
    };

    let mut work = tokio::spawn(async move { executor.run(scope.as_deref()).await });

    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            work.abort();
            Outcome::Cancelled
        }
        joined = &mut work => match joined {
            Ok(Ok(result)) => Outcome::Completed(result),
            Ok(Err(err)) => Outcome::Failed(err),
            Err(join) if join.is_panic() => {
                Outcome::Failed(ExecutorError::Aborted("executor panicked".to_string()))
            }
            Err(join) => Outcome::Failed(ExecutorError::Aborted(join.to_string())),
        },
    }
}

/// Records the outcome of one execution exactly once.
///
/// If the execution unit is dropped before recording (runtime shutdown,
/// aborted task), the drop records a failure so the entry never stays
/// `Running`.
struct CompletionGuard {
    registry: Arc<TaskRegistry>,
    history: Arc<HistoryLog>,
    execution_id: ExecutionId,
    task_id: JobId,
    task_type: JobKind,
    scope: Option<String>,
    started_at: DateTime<Utc>,
    recorded: bool,
}

impl CompletionGuard {
    fn finish(mut self, outcome: Outcome) -> HistoryRecord {
        self.recorded = true;
        self.record(outcome)
    }

    fn record(&self, outcome: Outcome) -> HistoryRecord {
        let (status, result, error) = match outcome {
            Outcome::Completed(result) => (LifecycleState::Completed, Some(result), None),
            Outcome::Failed(err) => (LifecycleState::Failed, None, Some(err.to_string())),
            Outcome::Cancelled => (
                LifecycleState::Cancelled,
                None,
                Some("cancelled by request".to_string()),
            ),
        };

        let record = HistoryRecord {
            execution_id: self.execution_id,
            task_id: self.task_id.clone(),
            task_type: self.task_type,
            status,
            scope: self.scope.clone(),
            started_at: self.started_at,
            completed_at: Utc::now(),
            result,
            error,
        };
        // History first: once the entry leaves Running, its record is queryable.
        self.history.append(record.clone());
        if !self
            .registry
            .finish_run(&self.task_id, self.execution_id, status)
        {
            debug!(
                job_id = %self.task_id,
                execution_id = %self.execution_id,
                "registry entry no longer held by this execution"
            );
        }

        let duration_ms = record.duration_ms();
        match status {
            LifecycleState::Completed => info!(
                job_id = %self.task_id,
                execution_id = %self.execution_id,
                duration_ms,
                "execution completed"
            ),
            LifecycleState::Cancelled => warn!(
                job_id = %self.task_id,
                execution_id = %self.execution_id,
                duration_ms,
                "execution cancelled"
            ),
            _ => error!(
                job_id = %self.task_id,
                execution_id = %self.execution_id,
                duration_ms,
                error = record.error.as_deref().unwrap_or_default(),
                "execution failed"
            ),
        }

        record
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        if !self.recorded {
            self.recorded = true;
            self.record(Outcome::Failed(ExecutorError::Aborted(
                "execution dropped before completion".to_string(),
            )));
        }
    }
}
