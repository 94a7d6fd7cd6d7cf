//! Steadfast: resilient interaction engine for BDD UI step libraries
//!
//! Step phrases ("When I click the submit button on the login page") are thin
//! glue. Steadfast is the layer underneath them: it finds the named element,
//! waits until the element is ready, and performs the action while absorbing
//! the transient failures that live browser and mobile sessions produce.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │                        STEADFAST Architecture                      │
//! ├────────────────────────────────────────────────────────────────────┤
//! │  step ──► Engine ──► Resolver ──► CollectionMatcher (optional)     │
//! │                          │                                         │
//! │                          ▼                                         │
//! │                    Interactions ──► StateEvaluator ──► Poller      │
//! │                          │                                         │
//! │                          ▼                                         │
//! │                 Session (Mutex<dyn Driver>) ──► ElementHandle      │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything runs on the calling thread. Every wait is bounded by the
//! configured timeout, and the phases of one interaction share a single
//! [`Deadline`].
//!
//! # Example
//!
//! ```
//! use steadfast::mock::{FakeDriver, FakeElement};
//! use steadfast::{Engine, EngineConfig, Platform, Repository, Session};
//!
//! let submit = FakeElement::new("submit").shared();
//! let repository = Repository::builder()
//!     .page("LoginPage", |page| page.element("submitButton", submit.clone()))
//!     .build()?;
//! let engine = Engine::new(EngineConfig::new().with_timeout_ms(500), repository)
//!     .with_session(Session::new(Platform::Web, FakeDriver::new()))?;
//!
//! engine.click("LoginPage", &["submitButton".into()])?;
//! assert_eq!(submit.successful_clicks(), 1);
//! # Ok::<(), steadfast::SteadfastError>(())
//! ```

#![warn(missing_docs)]

#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
pub mod config;
pub mod context;
pub mod driver;
pub mod engine;
pub mod interaction;
pub mod logging;
pub mod matcher;
#[allow(clippy::must_use_candidate, clippy::missing_panics_doc)]
pub mod mock;
pub mod repository;
mod result;
pub mod session;
pub mod state;
pub mod wait;

pub use config::{EngineConfig, Settings};
pub use context::ContextStore;
pub use driver::{By, Driver, DriverResult, Element, ElementHandle, WindowHandle};
pub use engine::Engine;
pub use interaction::{ClickOptions, FillOptions, Interactions};
pub use logging::{LogConfig, Verbosity};
pub use matcher::{CollectionMatcher, MatchCriterion};
pub use repository::{
    normalize_name, Component, ComponentBuilder, FieldAccessor, IntoNode, PageObject, Repository,
    RepositoryBuilder, RepositoryNode, Resolved, Resolver,
};
pub use result::{
    DriverError, DriverErrorKind, ErrorClass, RepositoryError, SteadfastError, SteadfastResult,
};
pub use session::{Platform, Session, SessionRegistry};
pub use state::{ElementState, StateEvaluator};
pub use wait::{Deadline, Poller, PollingPolicy};

#[cfg(feature = "derive")]
pub use steadfast_derive::PageObject;
