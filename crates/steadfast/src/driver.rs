//! Driver seam - the capability interfaces the engine consumes.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  Driver (session level)          ElementHandle (per element) │
//! │  ─ find_element(s)               ─ is_enabled / displayed /  │
//! │  ─ execute_script                  selected                  │
//! │  ─ hover / drag_and_drop         ─ text / attribute / css    │
//! │  ─ frame + window focus          ─ click / send_keys / clear │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Session bootstrapping lives outside this crate. Anything that can answer
//! these calls (WebDriver, Appium, a CDP bridge, the [`crate::mock`] fakes)
//! plugs in here. Handles may go stale between calls, so every capability
//! returns a [`DriverResult`].

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::result::DriverError;

/// Result of a single capability call
pub type DriverResult<T> = Result<T, DriverError>;

/// Shared, cheaply clonable element reference
pub type Element = Arc<dyn ElementHandle>;

/// Attributes consulted, in order, when computing an accessible name.
pub const ACCESSIBLE_NAME_ATTRIBUTES: &[&str] =
    &["aria-label", "content-desc", "accessibility-id", "name"];

/// Opaque reference to one UI element in a live session.
pub trait ElementHandle: Send + Sync {
    /// Human-readable identity for logs and errors
    fn describe(&self) -> String;

    /// Whether the element accepts input
    fn is_enabled(&self) -> DriverResult<bool>;

    /// Whether the element is rendered and visible
    fn is_displayed(&self) -> DriverResult<bool>;

    /// Whether a checkbox/option/radio is selected
    fn is_selected(&self) -> DriverResult<bool>;

    /// Visible text
    fn text(&self) -> DriverResult<String>;

    /// Attribute or property value
    fn attribute(&self, name: &str) -> DriverResult<Option<String>>;

    /// Computed style value
    fn css_value(&self, name: &str) -> DriverResult<String>;

    /// Click the element
    fn click(&self) -> DriverResult<()>;

    /// Type into the element
    fn send_keys(&self, text: &str) -> DriverResult<()>;

    /// Clear editable content
    fn clear(&self) -> DriverResult<()>;

    /// Accessible name: the first non-empty accessibility attribute, falling
    /// back to visible text.
    fn accessible_name(&self) -> DriverResult<String> {
        for name in ACCESSIBLE_NAME_ATTRIBUTES {
            if let Some(value) = self.attribute(name)? {
                if !value.trim().is_empty() {
                    return Ok(value);
                }
            }
        }
        self.text()
    }
}

impl fmt::Debug for dyn ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Element").field(&self.describe()).finish()
    }
}

/// How to locate elements through a driver
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum By {
    /// CSS selector (e.g., "button.primary")
    Css(String),
    /// XPath expression
    XPath(String),
    /// Element id
    Id(String),
    /// Accessibility id (mobile)
    AccessibilityId(String),
    /// Visible text
    Text(String),
}

impl By {
    /// CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// XPath expression
    #[must_use]
    pub fn xpath(expr: impl Into<String>) -> Self {
        Self::XPath(expr.into())
    }

    /// Element id
    #[must_use]
    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }
}

impl fmt::Display for By {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css(s) => write!(f, "css={s}"),
            Self::XPath(s) => write!(f, "xpath={s}"),
            Self::Id(s) => write!(f, "id={s}"),
            Self::AccessibilityId(s) => write!(f, "accessibility-id={s}"),
            Self::Text(s) => write!(f, "text={s}"),
        }
    }
}

/// Window (tab) identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowHandle(pub String);

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Session-level capabilities.
///
/// Focus (current window and frame) is mutable state on the session: it
/// affects every lookup that follows until switched back. Implementations
/// take `&mut self` for anything that touches it.
pub trait Driver: Send {
    /// Find the first element matching `by`
    fn find_element(&mut self, by: &By) -> DriverResult<Element>;

    /// Find every element matching `by`, in document order
    fn find_elements(&mut self, by: &By) -> DriverResult<Vec<Element>>;

    /// Run a script with element arguments
    fn execute_script(
        &mut self,
        script: &str,
        args: &[&dyn ElementHandle],
    ) -> DriverResult<serde_json::Value>;

    /// Move the pointer over an element
    fn hover(&mut self, element: &dyn ElementHandle) -> DriverResult<()>;

    /// Press on `source`, move to `target`, release
    fn drag_and_drop(
        &mut self,
        source: &dyn ElementHandle,
        target: &dyn ElementHandle,
    ) -> DriverResult<()>;

    /// Focus an iframe
    fn switch_to_frame(&mut self, frame: &dyn ElementHandle) -> DriverResult<()>;

    /// Focus the top-level document
    fn switch_to_default_content(&mut self) -> DriverResult<()>;

    /// Focus a window or tab
    fn switch_to_window(&mut self, window: &WindowHandle) -> DriverResult<()>;

    /// Currently focused window
    fn current_window(&mut self) -> DriverResult<WindowHandle>;

    /// All open windows, in opening order
    fn window_handles(&mut self) -> DriverResult<Vec<WindowHandle>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::FakeElement;

    mod accessible_name_tests {
        use super::*;

        #[test]
        fn test_prefers_aria_label() {
            let el = FakeElement::new("btn")
                .with_text("X")
                .with_attribute("aria-label", "Close dialog");
            assert_eq!(el.accessible_name().unwrap(), "Close dialog");
        }

        #[test]
        fn test_uses_content_desc_on_mobile() {
            let el = FakeElement::new("btn").with_attribute("content-desc", "Menu");
            assert_eq!(el.accessible_name().unwrap(), "Menu");
        }

        #[test]
        fn test_skips_blank_attributes() {
            let el = FakeElement::new("btn")
                .with_attribute("aria-label", "  ")
                .with_text("Submit");
            assert_eq!(el.accessible_name().unwrap(), "Submit");
        }
    }

    mod by_tests {
        use super::*;

        #[test]
        fn test_display() {
            assert_eq!(By::css("button.primary").to_string(), "css=button.primary");
            assert_eq!(By::xpath("//a").to_string(), "xpath=//a");
            assert_eq!(By::id("login").to_string(), "id=login");
        }
    }

    mod debug_tests {
        use super::*;

        #[test]
        fn test_element_debug_uses_describe() {
            let el: Element = Arc::new(FakeElement::new("submit"));
            assert!(format!("{el:?}").contains("submit"));
        }
    }
}
