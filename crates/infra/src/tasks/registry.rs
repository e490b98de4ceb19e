//! Task registry: one entry per configured job identity.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;

use autofilm_core::{JobConfig, JobId, JobKind, LifecycleState, TaskError, TaskResult};

use super::types::{ExecutionId, InFlightExecution, RegistryEntry};

#[derive(Debug)]
struct Slot {
    kind: JobKind,
    config: Arc<JobConfig>,
    state: LifecycleState,
    last_run: Option<DateTime<Utc>>,
    in_flight: Option<InFlight>,
}

#[derive(Debug)]
struct InFlight {
    execution: InFlightExecution,
    cancel: CancellationToken,
}

impl Slot {
    fn snapshot(&self, id: &JobId) -> RegistryEntry {
        RegistryEntry {
            id: id.clone(),
            kind: self.kind,
            config: self.config.clone(),
            state: self.state,
            last_run: self.last_run,
            in_flight: self.in_flight.as_ref().map(|f| f.execution.clone()),
        }
    }

    fn set_state(&mut self, to: LifecycleState) {
        self.state = to;
        if !to.is_running() {
            self.in_flight = None;
        }
    }
}

/// In-memory registry of job definitions and their lifecycle state.
///
/// Populated once at startup. All state changes go through compare-and-set
/// style methods under a single write lock, so two racing triggers for the
/// same identity can never both observe a non-running state.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    slots: RwLock<HashMap<JobId, Slot>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Add a job in the `Idle` state.
    pub fn register(&self, id: JobId, kind: JobKind, config: JobConfig) -> TaskResult<()> {
        let mut slots = self.slots.write();
        if slots.contains_key(&id) {
            return Err(TaskError::DuplicateIdentity(id));
        }
        slots.insert(
            id,
            Slot {
                kind,
                config: Arc::new(config),
                state: LifecycleState::Idle,
                last_run: None,
                in_flight: None,
            },
        );
        Ok(())
    }

    pub fn get(&self, id: &JobId) -> Option<RegistryEntry> {
        self.slots.read().get(id).map(|slot| slot.snapshot(id))
    }

    /// Snapshot of every entry, ordered by identity.
    pub fn list_all(&self) -> BTreeMap<JobId, RegistryEntry> {
        self.slots
            .read()
            .iter()
            .map(|(id, slot)| (id.clone(), slot.snapshot(id)))
            .collect()
    }

    pub fn state(&self, id: &JobId) -> Option<LifecycleState> {
        self.slots.read().get(id).map(|slot| slot.state)
    }

    pub fn contains(&self, id: &JobId) -> bool {
        self.slots.read().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }

    /// Atomic compare-and-set on the lifecycle state.
    ///
    /// Returns `Ok(false)` without mutating anything when the current state is
    /// not `expected_from`.
    pub fn transition(
        &self,
        id: &JobId,
        expected_from: LifecycleState,
        to: LifecycleState,
    ) -> TaskResult<bool> {
        if !expected_from.can_transition_to(to) {
            return Err(TaskError::InvalidTransition {
                id: id.clone(),
                from: expected_from,
                to,
            });
        }

        let mut slots = self.slots.write();
        let slot = slots
            .get_mut(id)
            .ok_or_else(|| TaskError::NotFound(id.clone()))?;

        if slot.state != expected_from {
            return Ok(false);
        }
        slot.set_state(to);
        Ok(true)
    }

    /// Move any non-running entry to `Running`, stamping `last_run` and the
    /// in-flight execution in the same critical section.
    pub(crate) fn begin_run(
        &self,
        id: &JobId,
        execution: InFlightExecution,
        cancel: CancellationToken,
    ) -> TaskResult<RegistryEntry> {
        let mut slots = self.slots.write();
        let slot = slots
            .get_mut(id)
            .ok_or_else(|| TaskError::NotFound(id.clone()))?;

        if !slot.state.accepts_trigger() {
            return Err(TaskError::AlreadyRunning(id.clone()));
        }

        slot.state = LifecycleState::Running;
        slot.last_run = Some(execution.started_at);
        slot.in_flight = Some(InFlight { execution, cancel });
        Ok(slot.snapshot(id))
    }

    /// `Running -> outcome`, but only for the execution that owns the entry.
    ///
    /// Returns `false` if the entry is no longer held by `execution_id`.
    pub(crate) fn finish_run(
        &self,
        id: &JobId,
        execution_id: ExecutionId,
        outcome: LifecycleState,
    ) -> bool {
        debug_assert!(outcome.is_outcome());

        let mut slots = self.slots.write();
        let Some(slot) = slots.get_mut(id) else {
            return false;
        };
        let owned = slot.state.is_running()
            && slot
                .in_flight
                .as_ref()
                .is_some_and(|f| f.execution.execution_id == execution_id);
        if !owned {
            return false;
        }
        slot.set_state(outcome);
        true
    }

    /// Cancellation token of the running execution.
    pub(crate) fn cancel_token(&self, id: &JobId) -> TaskResult<CancellationToken> {
        let slots = self.slots.read();
        let slot = slots.get(id).ok_or_else(|| TaskError::NotFound(id.clone()))?;
        slot.in_flight
            .as_ref()
            .filter(|_| slot.state.is_running())
            .map(|f| f.cancel.clone())
            .ok_or_else(|| TaskError::NotRunning(id.clone()))
    }
}
