//! Job identity.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::TaskError;

/// Externally assigned identity of a registered job.
///
/// Opaque to the engine; only uniqueness within a registry matters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for JobId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for JobId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl FromStr for JobId {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(TaskError::InvalidIdentity(s.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_trims_and_rejects_blank() {
        assert_eq!("  media1 ".parse::<JobId>().unwrap(), JobId::new("media1"));
        assert!(matches!(
            "   ".parse::<JobId>(),
            Err(TaskError::InvalidIdentity(_))
        ));
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = JobId::new("media1");
        assert_eq!(serde_json::to_value(&id).unwrap(), serde_json::json!("media1"));
    }
}
