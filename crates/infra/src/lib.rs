//! Orchestration runtime: registry, history, execution coordinator,
//! executors, cron scheduling and configuration.

pub mod config;
pub mod executors;
pub mod schedule;
pub mod tasks;

pub use config::{AppConfig, ConfigError};
pub use tasks::{ExecutionCoordinator, ExecutionHandle, HistoryLog, TaskRegistry};
