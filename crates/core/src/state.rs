//! Job lifecycle state machine.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a registered job. Exactly one per registry entry.
///
/// ```text
/// Idle ------trigger-----> Running
/// Completed -trigger-----> Running
/// Failed ----trigger-----> Running
/// Cancelled -trigger-----> Running
/// Running ---success-----> Completed
/// Running ---error-------> Failed
/// Running ---cancel------> Cancelled
/// ```
///
/// No state is terminal; every state except `Running` accepts a trigger.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Idle,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Idle => "idle",
            LifecycleState::Running => "running",
            LifecycleState::Completed => "completed",
            LifecycleState::Failed => "failed",
            LifecycleState::Cancelled => "cancelled",
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, LifecycleState::Running)
    }

    /// Whether a trigger may move this state to `Running`.
    pub fn accepts_trigger(&self) -> bool {
        !self.is_running()
    }

    /// Outcome states an execution can finish in.
    pub fn is_outcome(&self) -> bool {
        matches!(
            self,
            LifecycleState::Completed | LifecycleState::Failed | LifecycleState::Cancelled
        )
    }

    /// Whether `self -> to` is an edge of the state machine.
    pub fn can_transition_to(&self, to: LifecycleState) -> bool {
        match (self, to) {
            (LifecycleState::Running, next) => next.is_outcome(),
            (_, LifecycleState::Running) => true,
            _ => false,
        }
    }
}

impl core::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
