//! Engine configuration.
//!
//! Loaded from YAML, optionally overridden from the environment, and shared
//! through [`Settings`]. Every operation reads the settings when it starts, so
//! a change made between steps applies to the next step.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::logging::LogConfig;
use crate::result::{SteadfastError, SteadfastResult};
use crate::wait::{
    PollingPolicy, DEFAULT_MAX_POLL_INTERVAL_MS, DEFAULT_POLL_INTERVAL_MS, DEFAULT_TIMEOUT_MS,
};

/// Overrides `timeout_ms`
pub const ENV_TIMEOUT_MS: &str = "STEADFAST_TIMEOUT_MS";
/// Overrides `poll_interval_ms`
pub const ENV_POLL_INTERVAL_MS: &str = "STEADFAST_POLL_INTERVAL_MS";
/// Overrides `upload_dir`
pub const ENV_UPLOAD_DIR: &str = "STEADFAST_UPLOAD_DIR";

/// Process-wide engine settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Default budget for every wait, in milliseconds
    pub timeout_ms: u64,
    /// First pause between polling attempts
    pub poll_interval_ms: u64,
    /// Cap for the backoff pause
    pub max_poll_interval_ms: u64,
    /// Run the first attempt without pausing
    pub poll_immediately: bool,
    /// Directory `UPLOAD-` placeholders resolve against
    pub upload_dir: PathBuf,
    /// Values served to `PROPERTY-` placeholders
    pub properties: BTreeMap<String, String>,
    /// Log output
    pub log: LogConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            max_poll_interval_ms: DEFAULT_MAX_POLL_INTERVAL_MS,
            poll_immediately: true,
            upload_dir: PathBuf::from("."),
            properties: BTreeMap::new(),
            log: LogConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Create default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default timeout
    #[must_use]
    pub const fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set the first polling pause
    #[must_use]
    pub const fn with_poll_interval_ms(mut self, interval_ms: u64) -> Self {
        self.poll_interval_ms = interval_ms;
        self
    }

    /// Set the backoff cap
    #[must_use]
    pub const fn with_max_poll_interval_ms(mut self, interval_ms: u64) -> Self {
        self.max_poll_interval_ms = interval_ms;
        self
    }

    /// Set the upload root
    #[must_use]
    pub fn with_upload_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.upload_dir = dir.into();
        self
    }

    /// Add a property
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let _ = self.properties.insert(name.into(), value.into());
        self
    }

    /// Set log output
    #[must_use]
    pub const fn with_log(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }

    /// Parse YAML
    pub fn from_yaml_str(yaml: &str) -> SteadfastResult<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML file
    pub fn from_path(path: impl AsRef<Path>) -> SteadfastResult<Self> {
        let yaml = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&yaml)
    }

    /// Apply `STEADFAST_*` environment overrides
    pub fn with_env_overrides(self) -> SteadfastResult<Self> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from any variable source
    pub fn apply_overrides<F>(mut self, lookup: F) -> SteadfastResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_TIMEOUT_MS) {
            self.timeout_ms = parse_millis(ENV_TIMEOUT_MS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_POLL_INTERVAL_MS) {
            self.poll_interval_ms = parse_millis(ENV_POLL_INTERVAL_MS, &raw)?;
        }
        if let Some(dir) = lookup(ENV_UPLOAD_DIR) {
            self.upload_dir = PathBuf::from(dir);
        }
        self.validate()?;
        Ok(self)
    }

    /// Reject settings that cannot drive a polling loop
    pub fn validate(&self) -> SteadfastResult<()> {
        if self.max_poll_interval_ms < self.poll_interval_ms {
            return Err(SteadfastError::config(format!(
                "max_poll_interval_ms ({}) is below poll_interval_ms ({})",
                self.max_poll_interval_ms, self.poll_interval_ms
            )));
        }
        Ok(())
    }

    /// Polling policy with the default timeout
    #[must_use]
    pub fn policy(&self) -> PollingPolicy {
        PollingPolicy::new()
            .with_timeout_ms(self.timeout_ms)
            .with_poll_immediately(self.poll_immediately)
            .with_interval(Duration::from_millis(self.poll_interval_ms))
            .with_max_interval(Duration::from_millis(self.max_poll_interval_ms))
    }
}

fn parse_millis(name: &str, raw: &str) -> SteadfastResult<u64> {
    raw.trim()
        .parse()
        .map_err(|_| SteadfastError::config(format!("{name} must be a number of milliseconds, got '{raw}'")))
}

/// Shared handle to the live configuration
#[derive(Debug, Clone, Default)]
pub struct Settings {
    inner: Arc<RwLock<EngineConfig>>,
}

impl Settings {
    /// Share `config`
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    /// Copy of the current configuration
    #[must_use]
    pub fn snapshot(&self) -> EngineConfig {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Current polling policy
    #[must_use]
    pub fn policy(&self) -> PollingPolicy {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .policy()
    }

    /// Change the configuration in place
    pub fn update<F>(&self, change: F) -> SteadfastResult<()>
    where
        F: FnOnce(&mut EngineConfig),
    {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = guard.clone();
        change(&mut next);
        next.validate()?;
        *guard = next;
        Ok(())
    }
}
