//! Picking one handle out of a collection of look-alikes.
//!
//! Scans run top to bottom under the poller and the first item satisfying the
//! criterion wins. When several items qualify (containment makes "Foo" match
//! both "Foo Bar" and "Foo") the earliest one is returned, every time.
//!
//! A capability error on any item aborts the whole scan attempt: one flaky
//! item means the snapshot is no longer trustworthy, so the next attempt
//! starts again from the top.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::driver::{DriverResult, Element, ElementHandle};
use crate::repository::Component;
use crate::result::{SteadfastError, SteadfastResult};
use crate::wait::{Poller, PollingPolicy};

/// Case-insensitive equality or containment, ignoring surrounding whitespace
#[must_use]
pub fn matches_loosely(actual: &str, expected: &str) -> bool {
    let actual = actual.trim().to_lowercase();
    let expected = expected.trim().to_lowercase();
    actual == expected || actual.contains(&expected)
}

/// Predicate used to pick one handle out of a collection
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchCriterion {
    /// Visible text equals or contains the value
    Text(String),
    /// Attribute equals or contains the value
    Attribute {
        /// Attribute name
        name: String,
        /// Expected value
        value: String,
    },
    /// Accessible name equals or contains the value
    AccessibleName(String),
}

impl MatchCriterion {
    /// Match on visible text
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Match on an attribute
    #[must_use]
    pub fn attribute(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Attribute {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Match on accessible name
    #[must_use]
    pub fn accessible_name(value: impl Into<String>) -> Self {
        Self::AccessibleName(value.into())
    }

    /// Evaluate against one element
    pub fn matches(&self, element: &dyn ElementHandle) -> DriverResult<bool> {
        match self {
            Self::Text(expected) => Ok(matches_loosely(&element.text()?, expected)),
            Self::Attribute { name, value } => Ok(element
                .attribute(name)?
                .is_some_and(|actual| matches_loosely(&actual, value))),
            Self::AccessibleName(expected) => {
                Ok(matches_loosely(&element.accessible_name()?, expected))
            }
        }
    }
}

impl fmt::Display for MatchCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(value) => write!(f, "text ~ {value:?}"),
            Self::Attribute { name, value } => write!(f, "@{name} ~ {value:?}"),
            Self::AccessibleName(value) => write!(f, "accessible name ~ {value:?}"),
        }
    }
}

/// Something a criterion can be evaluated against
pub trait Candidate: Clone {
    /// The element to probe: the item itself, or a named child of it
    fn probe(&self, child: Option<&str>) -> SteadfastResult<Element>;
}

impl Candidate for Element {
    fn probe(&self, child: Option<&str>) -> SteadfastResult<Element> {
        match child {
            None => Ok(self.clone()),
            Some(child) => Err(crate::result::RepositoryError::WrongKind {
                field: child.to_string(),
                expected: "component",
                actual: "element",
            }
            .into()),
        }
    }
}

impl Candidate for Component {
    fn probe(&self, child: Option<&str>) -> SteadfastResult<Element> {
        match child {
            Some(child) => Ok(self.element(child)?),
            None => Ok(self.root_element()?),
        }
    }
}

/// Searches collections under a polling budget
#[derive(Debug, Clone, Copy, Default)]
pub struct CollectionMatcher {
    policy: PollingPolicy,
}

impl CollectionMatcher {
    /// Matcher with the given policy
    #[must_use]
    pub const fn new(policy: PollingPolicy) -> Self {
        Self { policy }
    }

    /// First item matching `criterion`.
    ///
    /// # Errors
    ///
    /// [`SteadfastError::NotFound`] when nothing matches within the budget,
    /// or a repository error when the criterion targets a missing child.
    pub fn find_among<T: Candidate>(
        &self,
        items: &[T],
        criterion: &MatchCriterion,
    ) -> SteadfastResult<T> {
        self.find_among_with(|| Ok(items.to_vec()), None, criterion)
    }

    /// First component whose `child` field matches `criterion`
    pub fn find_among_by_child<T: Candidate>(
        &self,
        items: &[T],
        child: &str,
        criterion: &MatchCriterion,
    ) -> SteadfastResult<T> {
        self.find_among_with(|| Ok(items.to_vec()), Some(child), criterion)
    }

    /// Like [`CollectionMatcher::find_among`], re-fetching the collection
    /// before every scan.
    pub fn find_among_with<T, S>(
        &self,
        mut supplier: S,
        child: Option<&str>,
        criterion: &MatchCriterion,
    ) -> SteadfastResult<T>
    where
        T: Candidate,
        S: FnMut() -> SteadfastResult<Vec<T>>,
    {
        let what = match child {
            Some(child) => format!("item whose '{child}' has {criterion}"),
            None => format!("item with {criterion}"),
        };
        let mut last_size = 0;

        let found = Poller::new(self.policy).until(&what, |_| {
            let items = supplier()?;
            last_size = items.len();
            for item in items {
                let probe = item.probe(child)?;
                if criterion.matches(probe.as_ref())? {
                    return Ok(Some(item));
                }
            }
            Ok(None)
        });

        match found {
            Err(SteadfastError::Timeout { last_error, .. }) => {
                if let Some(last) = last_error {
                    debug!(%criterion, error = %last, "scan gave up after transient failures");
                }
                Err(SteadfastError::NotFound {
                    criterion: criterion.to_string(),
                    collection_size: last_size,
                })
            }
            other => other,
        }
    }
}
