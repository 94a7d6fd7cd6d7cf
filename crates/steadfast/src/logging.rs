//! Log output for the engine.
//!
//! The engine only emits `tracing` events. [`init`] is a convenience for test
//! binaries that do not install a subscriber of their own.

use serde::{Deserialize, Serialize};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use crate::result::{SteadfastError, SteadfastResult};

/// Environment variable that overrides the configured verbosity
pub const LOG_ENV_VAR: &str = "STEADFAST_LOG";

/// Verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    /// Retry warnings and failures only
    Quiet,
    /// Swallowed best-effort failures as well
    #[default]
    Normal,
    /// Resolution and interaction progress
    Verbose,
    /// Every polling attempt
    Debug,
}

impl Verbosity {
    /// Check if quiet mode
    #[must_use]
    pub const fn is_quiet(self) -> bool {
        matches!(self, Self::Quiet)
    }

    /// Check if verbose or higher
    #[must_use]
    pub const fn is_verbose(self) -> bool {
        matches!(self, Self::Verbose | Self::Debug)
    }

    /// Filter directive for this level
    #[must_use]
    pub const fn directive(self) -> &'static str {
        match self {
            Self::Quiet => "steadfast=warn",
            Self::Normal => "steadfast=info",
            Self::Verbose => "steadfast=debug",
            Self::Debug => "steadfast=trace",
        }
    }
}

/// Log output settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Verbosity when [`LOG_ENV_VAR`] is unset
    pub verbosity: Verbosity,
    /// Emit JSON lines instead of human-readable text
    pub json: bool,
}

impl LogConfig {
    /// Create default settings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set verbosity
    #[must_use]
    pub const fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set JSON output
    #[must_use]
    pub const fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    /// Build the filter: the environment wins, else the configured verbosity
    pub fn filter(&self) -> SteadfastResult<EnvFilter> {
        match std::env::var(LOG_ENV_VAR) {
            Ok(directives) if !directives.trim().is_empty() => EnvFilter::try_new(directives)
                .map_err(|e| SteadfastError::config(format!("invalid {LOG_ENV_VAR}: {e}"))),
            _ => EnvFilter::try_new(self.verbosity.directive())
                .map_err(|e| SteadfastError::config(e.to_string())),
        }
    }
}

/// Install a global subscriber.
///
/// Returns `Ok(false)` when one was already installed, so repeated calls from
/// several test binaries are harmless.
///
/// # Errors
///
/// Returns a configuration error if the filter directives do not parse.
pub fn init(config: &LogConfig) -> SteadfastResult<bool> {
    let filter = config.filter()?;
    let layer = if config.json {
        fmt::layer().json().with_target(true).boxed()
    } else {
        fmt::layer().with_target(false).boxed()
    };

    Ok(tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .try_init()
        .is_ok())
}
