//! Task orchestration building blocks for `autofilm-core`.
//!
//! This crate contains **pure** types (no runtime, no I/O): job identities,
//! job kinds, job configuration with override merging, the lifecycle state
//! machine and the error taxonomy shared by the orchestration engine and the
//! transport layer.

pub mod config;
pub mod error;
pub mod id;
pub mod kind;
pub mod state;

pub use config::JobConfig;
pub use error::{ExecutorError, TaskError, TaskResult};
pub use id::JobId;
pub use kind::JobKind;
pub use state::LifecycleState;
