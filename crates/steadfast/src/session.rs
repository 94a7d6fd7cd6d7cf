//! Live driver sessions.
//!
//! A [`Session`] owns one driver behind a mutex, so session-level calls from
//! different steps never interleave. Frame and window focus is session state:
//! [`Session::within_frame`] and [`Session::within_window`] restore it when
//! the closure returns, whether or not the closure failed.
//!
//! [`SessionRegistry`] holds at most one session per [`Platform`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::driver::{By, Driver, Element, ElementHandle, WindowHandle};
use crate::result::{SteadfastError, SteadfastResult};
use crate::wait::{Poller, PollingPolicy};

/// Kind of UI a session drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Desktop or mobile browser
    Web,
    /// Native mobile app
    Mobile,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Web => f.write_str("web"),
            Self::Mobile => f.write_str("mobile"),
        }
    }
}

/// One live driver session
pub struct Session {
    platform: Platform,
    driver: Mutex<Box<dyn Driver>>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("platform", &self.platform)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Wrap a connected driver
    #[must_use]
    pub fn new(platform: Platform, driver: impl Driver + 'static) -> Self {
        Self {
            platform,
            driver: Mutex::new(Box::new(driver)),
        }
    }

    /// Platform this session drives
    #[must_use]
    pub const fn platform(&self) -> Platform {
        self.platform
    }

    fn lock(&self) -> MutexGuard<'_, Box<dyn Driver>> {
        self.driver.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` with exclusive access to the driver
    pub fn with_driver<T>(&self, f: impl FnOnce(&mut dyn Driver) -> T) -> T {
        let mut driver = self.lock();
        f(driver.as_mut())
    }

    /// Run a script with element arguments
    pub fn execute_script(
        &self,
        script: &str,
        args: &[&dyn ElementHandle],
    ) -> SteadfastResult<serde_json::Value> {
        Ok(self.lock().execute_script(script, args)?)
    }

    /// Move the pointer over an element
    pub fn hover(&self, element: &dyn ElementHandle) -> SteadfastResult<()> {
        Ok(self.lock().hover(element)?)
    }

    /// Drag `source` onto `target`
    pub fn drag_and_drop(
        &self,
        source: &dyn ElementHandle,
        target: &dyn ElementHandle,
    ) -> SteadfastResult<()> {
        Ok(self.lock().drag_and_drop(source, target)?)
    }

    /// Find an element, polling until it appears
    pub fn find_element(&self, by: &By, policy: PollingPolicy) -> SteadfastResult<Element> {
        let what = format!("element {by}");
        Poller::new(policy).retry(&what, |_| Ok(self.lock().find_element(by)?))
    }

    /// Find every element matching `by`, polling until at least one appears
    pub fn find_elements(&self, by: &By, policy: PollingPolicy) -> SteadfastResult<Vec<Element>> {
        let what = format!("elements {by}");
        Poller::new(policy).until(&what, |_| {
            let found = self.lock().find_elements(by)?;
            Ok((!found.is_empty()).then_some(found))
        })
    }

    /// Run `f` with `frame` focused, then return to the top-level document
    pub fn within_frame<T>(
        &self,
        frame: &dyn ElementHandle,
        f: impl FnOnce(&Self) -> SteadfastResult<T>,
    ) -> SteadfastResult<T> {
        self.lock().switch_to_frame(frame)?;
        debug!(frame = %frame.describe(), "switched to frame");
        let result = f(self);
        let restored = self.lock().switch_to_default_content();
        finish_scope(result, restored.map_err(SteadfastError::from), "default content")
    }

    /// Run `f` with `window` focused, then refocus the window that was
    /// current before
    pub fn within_window<T>(
        &self,
        window: &WindowHandle,
        f: impl FnOnce(&Self) -> SteadfastResult<T>,
    ) -> SteadfastResult<T> {
        let previous = {
            let mut driver = self.lock();
            let previous = driver.current_window()?;
            driver.switch_to_window(window)?;
            previous
        };
        debug!(%window, %previous, "switched window");
        let result = f(self);
        let restored = self.lock().switch_to_window(&previous);
        finish_scope(result, restored.map_err(SteadfastError::from), "previous window")
    }

    /// Open windows, in opening order
    pub fn windows(&self) -> SteadfastResult<Vec<WindowHandle>> {
        Ok(self.lock().window_handles()?)
    }

    /// The most recently opened window other than the current one
    pub fn newest_window(&self) -> SteadfastResult<WindowHandle> {
        let mut driver = self.lock();
        let current = driver.current_window()?;
        driver
            .window_handles()?
            .into_iter()
            .rev()
            .find(|w| *w != current)
            .ok_or_else(|| SteadfastError::session("no other window is open"))
    }
}

/// Combine a scoped closure's result with the focus restore that followed it.
/// The closure's own error wins; a failed restore is reported when the closure
/// succeeded.
fn finish_scope<T>(
    result: SteadfastResult<T>,
    restored: SteadfastResult<()>,
    target: &str,
) -> SteadfastResult<T> {
    match (result, restored) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(err)) => Err(err),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(restore)) => {
            warn!(target, error = %restore, "could not restore focus");
            Err(err)
        }
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

/// At most one live session per platform
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: BTreeMap<Platform, Arc<Session>>,
}

impl SessionRegistry {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session for its platform.
    ///
    /// # Errors
    ///
    /// [`SteadfastError::Session`] when the platform already has one.
    pub fn register(&mut self, session: Session) -> SteadfastResult<Arc<Session>> {
        let platform = session.platform();
        if self.sessions.contains_key(&platform) {
            return Err(SteadfastError::session(format!(
                "a {platform} session is already registered"
            )));
        }
        let session = Arc::new(session);
        let _ = self.sessions.insert(platform, Arc::clone(&session));
        debug!(%platform, "session registered");
        Ok(session)
    }

    /// Session for `platform`
    pub fn get(&self, platform: Platform) -> SteadfastResult<&Arc<Session>> {
        self.sessions
            .get(&platform)
            .ok_or_else(|| SteadfastError::session(format!("no {platform} session")))
    }

    /// Remove and return the session for `platform`
    pub fn remove(&mut self, platform: Platform) -> Option<Arc<Session>> {
        self.sessions.remove(&platform)
    }

    /// Platforms with a live session
    #[must_use]
    pub fn platforms(&self) -> Vec<Platform> {
        self.sessions.keys().copied().collect()
    }
}
