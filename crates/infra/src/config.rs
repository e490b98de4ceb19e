//! Configuration loading and representation.
//!
//! One TOML file describes the whole deployment: logging, the HTTP surface,
//! history retention, the program behind each job kind, and the job lists.
//!
//! ```toml
//! [api]
//! port = 8000
//! api_key = "secret"
//!
//! [executors.alist2strm]
//! program = "/usr/local/bin/alist2strm"
//!
//! [[bulk_sync]]
//! id = "media1"
//! cron = "0 * * * *"
//! source_dir = "/movies"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use autofilm_core::{JobConfig, JobId, JobKind, TaskError};

use crate::executors::{CommandExecutorFactory, CommandSpec};
use crate::schedule::{CronScheduler, ScheduleError};
use crate::tasks::{DEFAULT_RETENTION, HistoryLog, TaskRegistry};

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "AUTOFILM_CONFIG";

pub const DEFAULT_CONFIG_PATH: &str = "config/autofilm.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error(transparent)]
    Registry(#[from] TaskError),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter directive; `RUST_LOG` wins when set.
    pub level: String,
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    /// When set, task routes require a matching `X-API-Key` header.
    pub api_key: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "0.0.0.0".to_string(),
            port: 8000,
            api_key: None,
        }
    }
}

impl ApiConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum number of records kept in memory.
    pub retention: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            retention: DEFAULT_RETENTION,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub log: LogConfig,
    pub api: ApiConfig,
    pub history: HistoryConfig,
    /// Keyed by job kind name (`alist2strm`, `bulk_sync`, ...).
    pub executors: BTreeMap<String, CommandSpec>,
    #[serde(alias = "AlistServerList")]
    pub bulk_sync: Vec<JobConfig>,
    #[serde(alias = "Ani2AlistList")]
    pub catalog_mirror: Vec<JobConfig>,
    #[serde(alias = "LibraryPosterList")]
    pub metadata_refresh: Vec<JobConfig>,
}

impl AppConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Read `path`, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&contents)?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Explicit path, else `$AUTOFILM_CONFIG`, else `config/autofilm.toml`.
    pub fn resolve_path(explicit: Option<PathBuf>) -> PathBuf {
        explicit
            .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    /// `AUTOFILM_API_KEY`, `AUTOFILM_PORT` and `AUTOFILM_LOG_LEVEL` override
    /// the file.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("AUTOFILM_API_KEY") {
            self.api.api_key = Some(key).filter(|k| !k.is_empty());
        }
        if let Some(port) = lookup("AUTOFILM_PORT") {
            self.api.port = port
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("AUTOFILM_PORT={port:?} is not a port")))?;
        }
        if let Some(level) = lookup("AUTOFILM_LOG_LEVEL") {
            self.log.level = level;
        }
        Ok(())
    }

    pub fn job_count(&self) -> usize {
        self.bulk_sync.len() + self.catalog_mirror.len() + self.metadata_refresh.len()
    }

    /// Every configured job with its identity.
    ///
    /// Identity is the table's `id`, or `<kind>_<n>` with `n` the number of
    /// jobs defined before it.
    pub fn job_definitions(&self) -> Result<Vec<(JobId, JobKind, JobConfig)>, ConfigError> {
        let lists = [
            (JobKind::BulkSync, &self.bulk_sync),
            (JobKind::CatalogMirror, &self.catalog_mirror),
            (JobKind::MetadataRefresh, &self.metadata_refresh),
        ];

        let mut definitions = Vec::with_capacity(self.job_count());
        for (kind, jobs) in lists {
            for job in jobs {
                let id = match job.get("id") {
                    None => JobId::new(format!("{kind}_{}", definitions.len())),
                    Some(value) => {
                        let raw = value.as_str().ok_or_else(|| {
                            ConfigError::Invalid(format!("{kind} job id must be a string, got {value}"))
                        })?;
                        JobId::from_str(raw)?
                    }
                };
                definitions.push((id, kind, job.clone()));
            }
        }
        Ok(definitions)
    }

    /// Populate a registry with every configured job, all `Idle`.
    pub fn build_registry(&self) -> Result<TaskRegistry, ConfigError> {
        let registry = TaskRegistry::new();
        for (id, kind, config) in self.job_definitions()? {
            debug!(job_id = %id, kind = %kind, "registering task");
            registry.register(id, kind, config)?;
        }
        Ok(registry)
    }

    pub fn history_log(&self) -> HistoryLog {
        HistoryLog::with_retention(self.history.retention)
    }

    pub fn executor_factory(&self) -> Result<CommandExecutorFactory, ConfigError> {
        self.executors
            .iter()
            .map(|(name, spec)| {
                let kind = JobKind::from_str(name).map_err(|_| {
                    ConfigError::Invalid(format!("[executors.{name}] names an unknown task kind"))
                })?;
                Ok((kind, spec.clone()))
            })
            .collect()
    }

    /// Bind every scheduled job of `registry`; fails on the first bad cron.
    pub fn scheduler(&self, registry: &TaskRegistry) -> Result<CronScheduler, ConfigError> {
        Ok(CronScheduler::from_registry(registry)?)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.executor_factory()?;
        for (name, spec) in &self.executors {
            if spec.program.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "[executors.{name}] program must not be empty"
                )));
            }
        }
        Ok(())
    }
}
