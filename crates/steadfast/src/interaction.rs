//! UI-mutating operations.
//!
//! Each operation checks readiness through the [`StateEvaluator`] before it
//! touches the UI, then performs the action under the [`Poller`]. All phases
//! of one operation draw from a single [`Deadline`]: a click whose enabled
//! check took 8s of a 10s budget has 2s left for the click itself.
//!
//! Failures surface as [`SteadfastError::Interaction`] naming the action,
//! except a failed post-fill check, which is a
//! [`SteadfastError::Verification`].

use tracing::{debug, info};

use crate::driver::ElementHandle;
use crate::result::{SteadfastError, SteadfastResult};
use crate::session::Session;
use crate::state::{ElementState, StateEvaluator};
use crate::wait::{Deadline, Poller, PollingPolicy};

/// Script that centers its first argument in the viewport
pub const SCROLL_INTO_VIEW_SCRIPT: &str =
    "arguments[0].scrollIntoView({block: 'center', inline: 'center'});";

/// Options for [`Interactions::click`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClickOptions {
    /// Scroll the element to the center of the viewport first
    pub scroll: bool,
}

impl ClickOptions {
    /// Default options
    #[must_use]
    pub const fn new() -> Self {
        Self { scroll: false }
    }

    /// Scroll before clicking
    #[must_use]
    pub const fn with_scroll(mut self, scroll: bool) -> Self {
        self.scroll = scroll;
        self
    }
}

/// Options for [`Interactions::fill`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillOptions {
    /// Clear existing content first
    pub clear: bool,
    /// Read the value back and compare
    pub verify: bool,
}

impl Default for FillOptions {
    fn default() -> Self {
        Self {
            clear: true,
            verify: false,
        }
    }
}

impl FillOptions {
    /// Default options
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set clearing
    #[must_use]
    pub const fn with_clear(mut self, clear: bool) -> Self {
        self.clear = clear;
        self
    }

    /// Set verification
    #[must_use]
    pub const fn with_verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }
}

/// Interaction operations bound to a session and a policy
#[derive(Debug, Clone, Copy)]
pub struct Interactions<'s> {
    session: &'s Session,
    policy: PollingPolicy,
}

impl<'s> Interactions<'s> {
    /// Operations on `session` using `policy`'s timeout as the per-operation
    /// budget
    #[must_use]
    pub const fn new(session: &'s Session, policy: PollingPolicy) -> Self {
        Self { session, policy }
    }

    /// Policy in use
    #[must_use]
    pub const fn policy(&self) -> &PollingPolicy {
        &self.policy
    }

    fn deadline(&self) -> Deadline {
        Deadline::after(self.policy.timeout)
    }

    fn ready(
        &self,
        element: &dyn ElementHandle,
        state: ElementState,
        deadline: &Deadline,
    ) -> SteadfastResult<()> {
        StateEvaluator::new(self.policy.within(deadline)).expect_state(element, state)
    }

    fn poller(&self, deadline: &Deadline) -> Poller {
        Poller::new(self.policy.within(deadline))
    }

    /// Click once the element is enabled.
    ///
    /// # Errors
    ///
    /// [`SteadfastError::Interaction`] wrapping the timeout or fatal error.
    pub fn click(&self, element: &dyn ElementHandle, options: ClickOptions) -> SteadfastResult<()> {
        let action = format!("click {}", element.describe());
        let deadline = self.deadline();
        let run = || -> SteadfastResult<()> {
            self.ready(element, ElementState::Enabled, &deadline)?;
            if options.scroll {
                self.scroll_within(element, &deadline)?;
            }
            self.poller(&deadline)
                .retry(&action, |_| Ok(element.click()?))
        };
        run().map_err(|e| SteadfastError::interaction(action.clone(), e))?;
        debug!(element = %element.describe(), "clicked");
        Ok(())
    }

    /// Click if the element becomes clickable within the budget.
    ///
    /// Never fails: the reason for a skipped click is logged.
    pub fn click_if_present(&self, element: &dyn ElementHandle) -> bool {
        match self.click(element, ClickOptions::default()) {
            Ok(()) => true,
            Err(err) => {
                info!(element = %element.describe(), error = %err, "optional click skipped");
                false
            }
        }
    }

    /// Type `text` once the element is displayed.
    ///
    /// # Errors
    ///
    /// [`SteadfastError::Interaction`] when typing fails, or
    /// [`SteadfastError::Verification`] when `verify` is set and the element
    /// holds something else afterwards.
    pub fn fill(
        &self,
        element: &dyn ElementHandle,
        text: &str,
        options: FillOptions,
    ) -> SteadfastResult<()> {
        let action = format!("fill {}", element.describe());
        let deadline = self.deadline();
        let run = || -> SteadfastResult<()> {
            self.ready(element, ElementState::Displayed, &deadline)?;
            self.poller(&deadline).retry(&action, |_| {
                if options.clear {
                    element.clear()?;
                }
                Ok(element.send_keys(text)?)
            })
        };
        run().map_err(|e| SteadfastError::interaction(action.clone(), e))?;

        if options.verify {
            let actual = self
                .poller(&deadline)
                .retry(&action, |_| current_value(element))
                .map_err(|e| SteadfastError::interaction(action.clone(), e))?;
            if actual != text {
                return Err(SteadfastError::Verification {
                    expected: text.to_string(),
                    actual,
                });
            }
        }
        debug!(element = %element.describe(), chars = text.chars().count(), "filled");
        Ok(())
    }

    /// Move the pointer over the element once it is displayed
    pub fn hover(&self, element: &dyn ElementHandle) -> SteadfastResult<()> {
        let action = format!("hover over {}", element.describe());
        let deadline = self.deadline();
        let run = || -> SteadfastResult<()> {
            self.ready(element, ElementState::Displayed, &deadline)?;
            self.poller(&deadline)
                .retry(&action, |_| self.session.hover(element))
        };
        run().map_err(|e| SteadfastError::interaction(action.clone(), e))
    }

    /// Drag `source` onto `target` once both are displayed
    pub fn drag_and_drop(
        &self,
        source: &dyn ElementHandle,
        target: &dyn ElementHandle,
    ) -> SteadfastResult<()> {
        let action = format!("drag {} onto {}", source.describe(), target.describe());
        let deadline = self.deadline();
        let run = || -> SteadfastResult<()> {
            self.ready(source, ElementState::Displayed, &deadline)?;
            self.ready(target, ElementState::Displayed, &deadline)?;
            self.poller(&deadline)
                .retry(&action, |_| self.session.drag_and_drop(source, target))
        };
        run().map_err(|e| SteadfastError::interaction(action.clone(), e))
    }

    /// Center the element in the viewport
    pub fn scroll_into_view(&self, element: &dyn ElementHandle) -> SteadfastResult<()> {
        let deadline = self.deadline();
        self.scroll_within(element, &deadline).map_err(|e| {
            SteadfastError::interaction(format!("scroll to {}", element.describe()), e)
        })
    }

    fn scroll_within(&self, element: &dyn ElementHandle, deadline: &Deadline) -> SteadfastResult<()> {
        let what = format!("scroll {} into view", element.describe());
        self.poller(deadline).retry(&what, |_| {
            self.session
                .execute_script(SCROLL_INTO_VIEW_SCRIPT, &[element])
                .map(drop)
        })
    }

    /// Click until the element reports selected; no click when it already is
    pub fn select(&self, element: &dyn ElementHandle) -> SteadfastResult<()> {
        let action = format!("select {}", element.describe());
        let deadline = self.deadline();
        let run = || -> SteadfastResult<()> {
            self.ready(element, ElementState::Enabled, &deadline)?;
            self.poller(&deadline).until(&action, |_| {
                if element.is_selected()? {
                    return Ok(Some(()));
                }
                element.click()?;
                Ok(element.is_selected()?.then_some(()))
            })
        };
        run().map_err(|e| SteadfastError::interaction(action.clone(), e))
    }
}

/// `value` attribute, falling back to visible text
fn current_value(element: &dyn ElementHandle) -> SteadfastResult<String> {
    match element.attribute("value")? {
        Some(value) => Ok(value),
        None => Ok(element.text()?),
    }
}
