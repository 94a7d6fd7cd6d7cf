//! Element state evaluation.
//!
//! Answers "is this handle in state S?" by polling the matching capability.
//! Positive states succeed on the first `true` reading. Negative states
//! (`disabled`, `unselected`, `absent`) need the negated condition on
//! [`NEGATIVE_CONFIRMATIONS`] consecutive attempts: a transient driver
//! failure can look exactly like "not enabled right now", and reporting a
//! false absence is worse than waiting one more interval.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::driver::{DriverResult, ElementHandle};
use crate::result::{SteadfastError, SteadfastResult};
use crate::wait::{Poller, PollingPolicy};

/// Consecutive negative readings required before a negative state holds
pub const NEGATIVE_CONFIRMATIONS: u32 = 2;

/// States an element can be checked against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementState {
    /// Accepts input
    Enabled,
    /// Rendered and visible
    Displayed,
    /// Checked/selected
    Selected,
    /// Not enabled
    Disabled,
    /// Not selected
    Unselected,
    /// Not displayed, or no longer in the document
    Absent,
}

impl ElementState {
    /// Every state
    pub const ALL: [Self; 6] = [
        Self::Enabled,
        Self::Displayed,
        Self::Selected,
        Self::Disabled,
        Self::Unselected,
        Self::Absent,
    ];

    /// Whether this state is the negation of a capability
    #[must_use]
    pub const fn is_negative(self) -> bool {
        matches!(self, Self::Disabled | Self::Unselected | Self::Absent)
    }

    /// The opposite state
    #[must_use]
    pub const fn negate(self) -> Self {
        match self {
            Self::Enabled => Self::Disabled,
            Self::Displayed => Self::Absent,
            Self::Selected => Self::Unselected,
            Self::Disabled => Self::Enabled,
            Self::Absent => Self::Displayed,
            Self::Unselected => Self::Selected,
        }
    }

    /// Name used in step phrases
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Enabled => "enabled",
            Self::Displayed => "displayed",
            Self::Selected => "selected",
            Self::Disabled => "disabled",
            Self::Unselected => "unselected",
            Self::Absent => "absent",
        }
    }

    /// One capability reading: whether the element looks like it is in this
    /// state right now.
    fn observe(self, element: &dyn ElementHandle) -> DriverResult<bool> {
        match self {
            Self::Enabled => element.is_enabled(),
            Self::Displayed => element.is_displayed(),
            Self::Selected => element.is_selected(),
            Self::Disabled => element.is_enabled().map(|v| !v),
            Self::Unselected => element.is_selected().map(|v| !v),
            Self::Absent => match element.is_displayed() {
                Ok(displayed) => Ok(!displayed),
                Err(e) if e.kind.means_gone() => Ok(true),
                Err(e) => Err(e),
            },
        }
    }
}

impl fmt::Display for ElementState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElementState {
    type Err = SteadfastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        let state = match normalized.as_str() {
            "enabled" | "clickable" => Self::Enabled,
            "displayed" | "visible" | "present" => Self::Displayed,
            "selected" | "checked" => Self::Selected,
            "disabled" | "not enabled" => Self::Disabled,
            "unselected" | "not selected" | "unchecked" => Self::Unselected,
            "absent" | "not displayed" | "hidden" | "invisible" | "not present" => Self::Absent,
            _ => {
                return Err(SteadfastError::config(format!(
                    "unknown element state '{s}'"
                )))
            }
        };
        Ok(state)
    }
}

/// Polls an element until it reaches a state
#[derive(Debug, Clone, Copy, Default)]
pub struct StateEvaluator {
    policy: PollingPolicy,
}

impl StateEvaluator {
    /// Evaluator with the given policy
    #[must_use]
    pub const fn new(policy: PollingPolicy) -> Self {
        Self { policy }
    }

    /// Whether `element` reaches `state` within the budget.
    ///
    /// Never fails: an exhausted budget or a fatal driver error reads as
    /// `false`, and the caller decides whether to escalate.
    pub fn is_in_state(&self, element: &dyn ElementHandle, state: ElementState) -> bool {
        match self.expect_state(element, state) {
            Ok(()) => true,
            Err(err) => {
                debug!(element = %element.describe(), %state, error = %err, "state not reached");
                false
            }
        }
    }

    /// Wait for `element` to reach `state`.
    ///
    /// # Errors
    ///
    /// [`SteadfastError::Timeout`] when the budget runs out, or a fatal driver
    /// error.
    pub fn expect_state(
        &self,
        element: &dyn ElementHandle,
        state: ElementState,
    ) -> SteadfastResult<()> {
        let what = format!("{} to be {}", element.describe(), state);
        let mut streak: u32 = 0;

        Poller::new(self.policy).until(&what, |_| match state.observe(element) {
            Ok(true) if !state.is_negative() => Ok(Some(())),
            Ok(true) => {
                streak += 1;
                Ok((streak >= NEGATIVE_CONFIRMATIONS).then_some(()))
            }
            Ok(false) => {
                streak = 0;
                Ok(None)
            }
            Err(err) => {
                streak = 0;
                Err(err.into())
            }
        })
    }
}
