//! Task orchestration engine.
//!
//! ## Components
//!
//! - `TaskRegistry`: job definitions and lifecycle state, mutated only through
//!   atomic transitions
//! - `HistoryLog`: append-only record of finished executions
//! - `ExecutionCoordinator`: trigger acceptance, execution launch, outcome
//!   recording and cancellation
//! - `ExecutorFactory` / `JobExecutor`: the seam to the code doing the work

pub mod coordinator;
pub mod executor;
pub mod history;
pub mod registry;
pub mod types;

pub use coordinator::{ExecutionCoordinator, ExecutionHandle};
pub use executor::{ExecutorFactory, JobExecutor, RunOptions};
pub use history::{DEFAULT_RETENTION, HistoryLog};
pub use registry::TaskRegistry;
pub use types::{
    AdHocOutcome, AdHocStatus, ExecutionId, ExecutionTicket, HistoryRecord, InFlightExecution,
    RegistryEntry, ScopeOutcome, ScopeStatus,
};
