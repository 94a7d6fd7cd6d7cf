//! Result and error types for Steadfast.
//!
//! Errors fall into two families. Transient errors (driver capability
//! failures such as stale handles or intercepted clicks) are retried inside
//! the current polling budget and never reach a step directly. Everything
//! else is fatal and propagates to the calling step.

use std::fmt;

use thiserror::Error;

/// Result type for Steadfast operations
pub type SteadfastResult<T> = Result<T, SteadfastError>;

/// Kinds of driver capability failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverErrorKind {
    /// The handle no longer refers to a live element
    StaleElement,
    /// The element could not be found in the current document
    NoSuchElement,
    /// Another element would receive the click
    ClickIntercepted,
    /// The element exists but cannot be interacted with yet
    NotInteractable,
    /// The element is in a state that rejects the command
    InvalidElementState,
    /// A script executed in the session failed
    ScriptError,
    /// The driver reported something it could not classify
    Unknown,
    /// The session is gone; nothing will recover by retrying
    SessionClosed,
}

impl DriverErrorKind {
    /// Short name used in logs
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::StaleElement => "stale element",
            Self::NoSuchElement => "no such element",
            Self::ClickIntercepted => "click intercepted",
            Self::NotInteractable => "element not interactable",
            Self::InvalidElementState => "invalid element state",
            Self::ScriptError => "script error",
            Self::Unknown => "unknown driver error",
            Self::SessionClosed => "session closed",
        }
    }

    /// Whether a retry may succeed
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        !matches!(self, Self::SessionClosed)
    }

    /// Whether the failure means the element is no longer in the document
    #[must_use]
    pub const fn means_gone(&self) -> bool {
        matches!(self, Self::StaleElement | Self::NoSuchElement)
    }
}

impl fmt::Display for DriverErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed capability call on a driver or element handle
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct DriverError {
    /// Classification of the failure
    pub kind: DriverErrorKind,
    /// Driver-supplied detail
    pub message: String,
}

impl DriverError {
    /// Create a driver error
    #[must_use]
    pub fn new(kind: DriverErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Stale element reference
    #[must_use]
    pub fn stale(message: impl Into<String>) -> Self {
        Self::new(DriverErrorKind::StaleElement, message)
    }

    /// Element not found
    #[must_use]
    pub fn no_such_element(message: impl Into<String>) -> Self {
        Self::new(DriverErrorKind::NoSuchElement, message)
    }

    /// Click landed on another element
    #[must_use]
    pub fn click_intercepted(message: impl Into<String>) -> Self {
        Self::new(DriverErrorKind::ClickIntercepted, message)
    }

    /// Element cannot be interacted with
    #[must_use]
    pub fn not_interactable(message: impl Into<String>) -> Self {
        Self::new(DriverErrorKind::NotInteractable, message)
    }

    /// Session has ended
    #[must_use]
    pub fn session_closed(message: impl Into<String>) -> Self {
        Self::new(DriverErrorKind::SessionClosed, message)
    }
}

/// A named page, field or component is missing or has the wrong shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    /// No page with that name
    #[error("no such page '{page}' (available: {})", available.join(", "))]
    NoSuchPage {
        /// Requested page name, after normalization
        page: String,
        /// Registered page names
        available: Vec<String>,
    },

    /// No field with that name on the current node
    #[error("no such field '{field}' on '{page}' (available: {})", available.join(", "))]
    NoSuchField {
        /// Page or component path that was searched
        page: String,
        /// Requested field name, after normalization
        field: String,
        /// Field names present on the node
        available: Vec<String>,
    },

    /// The field exists but is not the kind the caller asked for
    #[error("field '{field}' is a {actual}, expected {expected}")]
    WrongKind {
        /// Field name
        field: String,
        /// Kind that was requested
        expected: &'static str,
        /// Kind that was found
        actual: &'static str,
    },

    /// An index outside a list's bounds
    #[error("index {index} out of range for '{field}' ({len} items)")]
    IndexOutOfRange {
        /// List field name
        field: String,
        /// Requested index
        index: usize,
        /// List length
        len: usize,
    },

    /// A page was registered twice
    #[error("page '{page}' is already registered")]
    DuplicatePage {
        /// Page name
        page: String,
    },

    /// A component was used as an element but has no root element
    #[error("component '{component}' has no root element")]
    MissingRoot {
        /// Component name
        component: String,
    },
}

/// Tagged discriminant of an error, used to decide when a retry warrants a new
/// log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Driver capability failure of the given kind
    Driver(DriverErrorKind),
    /// Repository misconfiguration
    Repository,
    /// Collection scan exhausted
    NotFound,
    /// Polling budget exhausted
    Timeout,
    /// Wrapped interaction failure
    Interaction,
    /// Post-action assertion
    Verification,
    /// Placeholder expansion
    Context,
    /// Session registry
    Session,
    /// Configuration
    Config,
    /// I/O, YAML or JSON
    Io,
}

/// Errors that can occur in Steadfast
#[derive(Debug, Error)]
pub enum SteadfastError {
    /// Driver capability failure
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// Repository misconfiguration
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// A collection scan exhausted its timeout without a match
    #[error("No element matching {criterion} among {collection_size} items")]
    NotFound {
        /// Rendered criterion
        criterion: String,
        /// Number of items in the last scanned snapshot
        collection_size: usize,
    },

    /// A polling loop exhausted its timeout
    #[error("Timed out after {elapsed_ms}ms ({attempts} attempts) waiting for {what}{}", last_error_suffix(last_error.as_deref()))]
    Timeout {
        /// What was being waited for
        what: String,
        /// Elapsed time in milliseconds
        elapsed_ms: u64,
        /// Number of attempts made
        attempts: u32,
        /// Last transient error seen, if any
        last_error: Option<Box<SteadfastError>>,
    },

    /// An interaction could not be completed
    #[error("Failed to {action}: {source}")]
    Interaction {
        /// Action description
        action: String,
        /// Underlying cause
        #[source]
        source: Box<SteadfastError>,
    },

    /// A post-action assertion failed
    #[error("Verification failed: expected '{expected}', found '{actual}'")]
    Verification {
        /// Intended value
        expected: String,
        /// Observed value
        actual: String,
    },

    /// Placeholder expansion failed
    #[error("Context error: {message}")]
    Context {
        /// Error message
        message: String,
    },

    /// Session registry misuse
    #[error("Session error: {message}")]
    Session {
        /// Error message
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn last_error_suffix(last: Option<&SteadfastError>) -> String {
    last.map(|e| format!(" (last error: {e})")).unwrap_or_default()
}

impl SteadfastError {
    /// Whether a polling loop should swallow this error and retry
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Driver(e) => e.kind.is_transient(),
            _ => false,
        }
    }

    /// Discriminant used for log deduplication
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Driver(e) => ErrorClass::Driver(e.kind),
            Self::Repository(_) => ErrorClass::Repository,
            Self::NotFound { .. } => ErrorClass::NotFound,
            Self::Timeout { .. } => ErrorClass::Timeout,
            Self::Interaction { .. } => ErrorClass::Interaction,
            Self::Verification { .. } => ErrorClass::Verification,
            Self::Context { .. } => ErrorClass::Context,
            Self::Session { .. } => ErrorClass::Session,
            Self::Config { .. } => ErrorClass::Config,
            Self::Io(_) | Self::Yaml(_) | Self::Json(_) => ErrorClass::Io,
        }
    }

    /// Create a context error
    #[must_use]
    pub fn context(message: impl Into<String>) -> Self {
        Self::Context {
            message: message.into(),
        }
    }

    /// Create a session error
    #[must_use]
    pub fn session(message: impl Into<String>) -> Self {
        Self::Session {
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Wrap an error as the cause of a failed interaction
    #[must_use]
    pub fn interaction(action: impl Into<String>, source: Self) -> Self {
        Self::Interaction {
            action: action.into(),
            source: Box::new(source),
        }
    }
}
