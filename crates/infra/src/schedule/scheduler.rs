//! Cron trigger loop.
//!
//! One tokio task per scheduled job. Each task sleeps until the next fire time
//! and then goes through `ExecutionCoordinator::trigger`, the same entry point
//! as on-demand triggers, so a scheduled run never overlaps a running one.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use autofilm_core::{JobId, TaskError};

use super::cron::{CronError, CronSchedule};
use crate::tasks::{ExecutionCoordinator, TaskRegistry};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("task {id} has an invalid cron expression: {source}")]
pub struct ScheduleError {
    pub id: JobId,
    #[source]
    pub source: CronError,
}

/// A job identity bound to its schedule.
#[derive(Debug, Clone)]
pub struct ScheduledJob {
    pub id: JobId,
    pub schedule: CronSchedule,
}

#[derive(Debug, Clone, Default)]
pub struct CronScheduler {
    jobs: Vec<ScheduledJob>,
}

impl CronScheduler {
    /// One binding per registered job that carries a `cron` expression.
    pub fn from_registry(registry: &TaskRegistry) -> Result<Self, ScheduleError> {
        let mut jobs = Vec::new();
        for (id, entry) in registry.list_all() {
            let Some(expr) = entry.schedule() else {
                continue;
            };
            let schedule = CronSchedule::parse(expr).map_err(|source| ScheduleError {
                id: id.clone(),
                source,
            })?;
            jobs.push(ScheduledJob { id, schedule });
        }
        Ok(Self { jobs })
    }

    pub fn jobs(&self) -> &[ScheduledJob] {
        &self.jobs
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Start one trigger loop per binding. Loops stop when `shutdown` fires.
    pub fn spawn(
        self,
        coordinator: ExecutionCoordinator,
        shutdown: CancellationToken,
    ) -> SchedulerHandle {
        let tasks = self
            .jobs
            .into_iter()
            .map(|job| {
                info!(job_id = %job.id, cron = %job.schedule, "scheduling task");
                tokio::spawn(run_schedule(job, coordinator.clone(), shutdown.clone()))
            })
            .collect();

        SchedulerHandle { shutdown, tasks }
    }
}

/// Handle to the running trigger loops.
#[derive(Debug)]
pub struct SchedulerHandle {
    shutdown: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Stop every loop and wait for them to exit.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        for task in self.tasks {
            let _ = task.await;
        }
    }
}

/// Next fire time after both `now` and the previous fire.
fn next_fire(
    schedule: &CronSchedule,
    now: DateTime<Utc>,
    last: Option<DateTime<Utc>>,
) -> Option<DateTime<Utc>> {
    let from = last.map_or(now, |last| last.max(now));
    schedule.next_after(&from)
}

async fn run_schedule(
    job: ScheduledJob,
    coordinator: ExecutionCoordinator,
    shutdown: CancellationToken,
) {
    let mut last = None;
    loop {
        let now = Utc::now();
        let Some(fire_at) = next_fire(&job.schedule, now, last) else {
            warn!(job_id = %job.id, cron = %job.schedule, "schedule has no future fire time");
            return;
        };
        let delay = (fire_at - now).to_std().unwrap_or_default();

        tokio::select! {
            _ = shutdown.cancelled() => return,
            _ = tokio::time::sleep(delay) => {}
        }
        last = Some(fire_at);

        debug!(job_id = %job.id, fire_at = %fire_at, "schedule fired");
        match coordinator.trigger(&job.id, None) {
            Ok(_) => {}
            Err(TaskError::AlreadyRunning(_)) => {
                warn!(job_id = %job.id, "previous run still in progress, skipping scheduled run");
            }
            Err(err) => {
                error!(job_id = %job.id, error = %err, "scheduled trigger failed");
            }
        }
    }
}
