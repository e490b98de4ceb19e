//! Executor implementations.

pub mod command;

pub use command::{CommandExecutor, CommandExecutorFactory, CommandSpec};
