//! Executor variants.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::TaskError;

/// Closed set of job kinds. Determines which executor gets constructed.
///
/// The serialized names are the ones used on the wire and in configuration.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum JobKind {
    /// Directory tree → media link (`.strm`) generation.
    #[serde(rename = "alist2strm")]
    BulkSync,
    /// Remote catalog mirroring.
    #[serde(rename = "ani2alist")]
    CatalogMirror,
    /// Poster / library metadata refresh.
    #[serde(rename = "libraryposter")]
    MetadataRefresh,
}

impl JobKind {
    pub const ALL: [JobKind; 3] = [
        JobKind::BulkSync,
        JobKind::CatalogMirror,
        JobKind::MetadataRefresh,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::BulkSync => "alist2strm",
            JobKind::CatalogMirror => "ani2alist",
            JobKind::MetadataRefresh => "libraryposter",
        }
    }

    /// Only bulk sync jobs can be restricted to a single directory.
    pub fn supports_scope(&self) -> bool {
        matches!(self, JobKind::BulkSync)
    }
}

impl core::fmt::Display for JobKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobKind {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "alist2strm" | "bulk_sync" => Ok(JobKind::BulkSync),
            "ani2alist" | "catalog_mirror" => Ok(JobKind::CatalogMirror),
            "libraryposter" | "metadata_refresh" => Ok(JobKind::MetadataRefresh),
            other => Err(TaskError::UnknownKind(other.to_string())),
        }
    }
}
