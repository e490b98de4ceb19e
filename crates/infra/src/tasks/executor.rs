//! Executor capability seam.
//!
//! The coordinator never knows how a job does its work. It asks an
//! [`ExecutorFactory`] for a fresh [`JobExecutor`] per execution, parameterized
//! by the derived configuration and run options, and awaits it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use autofilm_core::{ExecutorError, JobConfig, JobKind};

/// Per-run options for scoped executions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOptions {
    /// Replaces the job's persisted sync flag for this run only.
    pub sync_mode: Option<bool>,
    /// Force overwrite of existing outputs for this run only.
    pub overwrite: bool,
}

impl RunOptions {
    pub fn new(sync_mode: Option<bool>, overwrite: bool) -> Self {
        Self {
            sync_mode,
            overwrite,
        }
    }
}

/// One execution of a job. Instances are never shared between executions.
#[async_trait]
pub trait JobExecutor: Send + Sync {
    /// Run to completion, optionally limited to `scope` (a sub-directory).
    async fn run(&self, scope: Option<&str>) -> Result<JsonValue, ExecutorError>;
}

/// Builds executor instances for a job kind.
pub trait ExecutorFactory: Send + Sync {
    fn build(
        &self,
        kind: JobKind,
        config: &JobConfig,
        options: &RunOptions,
    ) -> Result<Box<dyn JobExecutor>, ExecutorError>;
}
