//! Job configuration and execution-scoped override merging.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Named parameters that fully parameterize one execution of a job.
///
/// The registry keeps one base configuration per job; it is never mutated
/// after registration. Overrides produce a new, derived configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobConfig(Map<String, JsonValue>);

impl JobConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(JsonValue::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.0.get(key).and_then(JsonValue::as_bool)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<JsonValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Shallow merge: top-level keys in `overrides` replace the same keys in
    /// `self`, everything else is kept. `self` is left untouched.
    pub fn merged(&self, overrides: Option<&JobConfig>) -> JobConfig {
        let mut derived = self.clone();
        if let Some(overrides) = overrides {
            for (key, value) in &overrides.0 {
                derived.0.insert(key.clone(), value.clone());
            }
        }
        derived
    }
}
