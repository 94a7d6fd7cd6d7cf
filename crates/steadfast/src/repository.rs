//! Object repository: named pages, components and elements.
//!
//! A [`Repository`] is a read-only graph of pages. Each page is a
//! [`Component`]: a map of named fields plus an optional root element. A field
//! holds one of four [`RepositoryNode`] shapes (an element, a list of
//! elements, a nested component, or a list of components).
//!
//! Graphs are built with [`Repository::builder`] or from structs deriving
//! `PageObject`. The [`Resolver`] walks them by name:
//!
//! ```text
//! "LoginPage" ─▶ loginPage ─▶ header ─▶ menuItems[text ~ "Logout"]
//!   (page)        (Field)      (Field)        (Pick)
//! ```
//!
//! Names are compared exactly after two normalization passes: placeholder
//! expansion through the [`ContextStore`], then decapitalization of the first
//! character.

use std::collections::BTreeMap;
use std::fmt;

use tracing::debug;

use crate::context::ContextStore;
use crate::driver::Element;
use crate::matcher::{CollectionMatcher, MatchCriterion};
use crate::result::{RepositoryError, SteadfastResult};

/// Lower-case the first character of a name ("LoginPage" → "loginPage")
#[must_use]
pub fn normalize_name(name: &str) -> String {
    let name = name.trim();
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

// =============================================================================
// NODES
// =============================================================================

/// One field in the graph
#[derive(Debug, Clone)]
pub enum RepositoryNode {
    /// A single element
    Element(Element),
    /// An ordered list of elements
    ElementList(Vec<Element>),
    /// A nested component
    Component(Component),
    /// An ordered list of components
    ComponentList(Vec<Component>),
}

impl RepositoryNode {
    /// Shape name used in errors
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Element(_) => "element",
            Self::ElementList(_) => "element list",
            Self::Component(_) => "component",
            Self::ComponentList(_) => "component list",
        }
    }

    fn wrong_kind(&self, field: &str, expected: &'static str) -> RepositoryError {
        RepositoryError::WrongKind {
            field: field.to_string(),
            expected,
            actual: self.kind(),
        }
    }
}

/// Conversion into a [`RepositoryNode`], used by builders and derived page
/// objects
pub trait IntoNode {
    /// Wrap `self` as a node
    fn into_node(self) -> RepositoryNode;
}

impl IntoNode for RepositoryNode {
    fn into_node(self) -> RepositoryNode {
        self
    }
}

impl IntoNode for Element {
    fn into_node(self) -> RepositoryNode {
        RepositoryNode::Element(self)
    }
}

impl IntoNode for Vec<Element> {
    fn into_node(self) -> RepositoryNode {
        RepositoryNode::ElementList(self)
    }
}

impl IntoNode for Component {
    fn into_node(self) -> RepositoryNode {
        RepositoryNode::Component(self)
    }
}

impl IntoNode for Vec<Component> {
    fn into_node(self) -> RepositoryNode {
        RepositoryNode::ComponentList(self)
    }
}

// =============================================================================
// COMPONENT
// =============================================================================

/// Named group of fields with an optional root element
#[derive(Debug, Clone)]
pub struct Component {
    name: String,
    root: Option<Element>,
    fields: BTreeMap<String, RepositoryNode>,
}

impl Component {
    /// Start building a component
    #[must_use]
    pub fn builder(name: impl Into<String>) -> ComponentBuilder {
        ComponentBuilder::new(name)
    }

    /// Component name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Root element, if any
    #[must_use]
    pub const fn root(&self) -> Option<&Element> {
        self.root.as_ref()
    }

    /// Root element, or an error naming the component
    pub fn root_element(&self) -> Result<Element, RepositoryError> {
        self.root.clone().ok_or_else(|| RepositoryError::MissingRoot {
            component: self.name.clone(),
        })
    }

    /// Field by name (normalized)
    pub fn field(&self, name: &str) -> Result<&RepositoryNode, RepositoryError> {
        let key = normalize_name(name);
        self.fields
            .get(&key)
            .ok_or_else(|| RepositoryError::NoSuchField {
                page: self.name.clone(),
                field: key,
                available: self.field_names(),
            })
    }

    /// Element field by name
    pub fn element(&self, name: &str) -> Result<Element, RepositoryError> {
        match self.field(name)? {
            RepositoryNode::Element(el) => Ok(el.clone()),
            other => Err(other.wrong_kind(name, "element")),
        }
    }

    /// Field names, sorted
    #[must_use]
    pub fn field_names(&self) -> Vec<String> {
        self.fields.keys().cloned().collect()
    }

    /// Number of fields
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the component has no fields
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Builder for [`Component`]
#[derive(Debug)]
pub struct ComponentBuilder {
    component: Component,
}

impl ComponentBuilder {
    /// Builder for a component called `name`
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            component: Component {
                name: name.into(),
                root: None,
                fields: BTreeMap::new(),
            },
        }
    }

    /// Set the root element
    #[must_use]
    pub fn root(mut self, element: Element) -> Self {
        self.component.root = Some(element);
        self
    }

    /// Add any node
    #[must_use]
    pub fn node(mut self, name: &str, node: impl IntoNode) -> Self {
        let _ = self
            .component
            .fields
            .insert(normalize_name(name), node.into_node());
        self
    }

    /// Add an element field
    #[must_use]
    pub fn element(self, name: &str, element: Element) -> Self {
        self.node(name, element)
    }

    /// Add an element list field
    #[must_use]
    pub fn elements(self, name: &str, elements: Vec<Element>) -> Self {
        self.node(name, elements)
    }

    /// Add a nested component field
    #[must_use]
    pub fn component(self, name: &str, component: Component) -> Self {
        self.node(name, component)
    }

    /// Add a component list field
    #[must_use]
    pub fn components(self, name: &str, components: Vec<Component>) -> Self {
        self.node(name, components)
    }

    /// Finish
    #[must_use]
    pub fn build(self) -> Component {
        self.component
    }
}

// =============================================================================
// REPOSITORY
// =============================================================================

/// A struct that can be turned into a repository page.
///
/// Usually derived:
///
/// ```ignore
/// #[derive(PageObject)]
/// struct LoginPage {
///     user_name: Element,
///     submit_button: Element,
///     #[page(components)]
///     error_banners: Vec<Banner>,
/// }
/// ```
pub trait PageObject {
    /// Page name as registered ("loginPage" for `LoginPage`)
    fn page_name() -> &'static str
    where
        Self: Sized;

    /// Consume the struct into a component named [`PageObject::page_name`]
    fn into_component(self) -> Component;
}

/// Registered pages, keyed by normalized name
#[derive(Debug, Clone, Default)]
pub struct Repository {
    pages: BTreeMap<String, Component>,
}

impl Repository {
    /// Start building a repository
    #[must_use]
    pub fn builder() -> RepositoryBuilder {
        RepositoryBuilder::default()
    }

    /// Page by name
    pub fn page(&self, name: &str) -> Result<&Component, RepositoryError> {
        let key = normalize_name(name);
        self.pages.get(&key).ok_or_else(|| RepositoryError::NoSuchPage {
            page: key,
            available: self.page_names(),
        })
    }

    /// Registered page names, sorted
    #[must_use]
    pub fn page_names(&self) -> Vec<String> {
        self.pages.keys().cloned().collect()
    }

    /// Number of pages
    #[must_use]
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Whether no pages are registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

/// Builder for [`Repository`]
#[derive(Debug, Default)]
pub struct RepositoryBuilder {
    pages: Vec<Component>,
}

impl RepositoryBuilder {
    /// Add a page built in a closure
    #[must_use]
    pub fn page<F>(mut self, name: &str, build: F) -> Self
    where
        F: FnOnce(ComponentBuilder) -> ComponentBuilder,
    {
        self.pages
            .push(build(ComponentBuilder::new(normalize_name(name))).build());
        self
    }

    /// Add a page from a [`PageObject`]
    #[must_use]
    pub fn page_object<T: PageObject>(mut self, page: T) -> Self {
        let mut component = page.into_component();
        component.name = normalize_name(&component.name);
        self.pages.push(component);
        self
    }

    /// Finish.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::DuplicatePage`] when two pages share a name.
    pub fn build(self) -> Result<Repository, RepositoryError> {
        let mut pages = BTreeMap::new();
        for page in self.pages {
            let name = page.name.clone();
            if pages.insert(name.clone(), page).is_some() {
                return Err(RepositoryError::DuplicatePage { page: name });
            }
        }
        Ok(Repository { pages })
    }
}

// =============================================================================
// PATHS
// =============================================================================

/// One step of a path through the graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldAccessor {
    /// Named field of the current component
    Field(String),
    /// First item of a list field matching a criterion, optionally evaluated
    /// against a named child of each item
    Pick {
        /// List field
        field: String,
        /// Predicate
        criterion: MatchCriterion,
        /// Child field of each item the predicate is evaluated on
        child: Option<String>,
    },
    /// Item of a list field by position
    Index {
        /// List field
        field: String,
        /// Zero-based position
        index: usize,
    },
}

impl FieldAccessor {
    /// Named field
    #[must_use]
    pub fn field(name: impl Into<String>) -> Self {
        Self::Field(name.into())
    }

    /// First list item matching `criterion`
    #[must_use]
    pub fn pick(field: impl Into<String>, criterion: MatchCriterion) -> Self {
        Self::Pick {
            field: field.into(),
            criterion,
            child: None,
        }
    }

    /// First list item whose `child` matches `criterion`
    #[must_use]
    pub fn pick_by(
        field: impl Into<String>,
        child: impl Into<String>,
        criterion: MatchCriterion,
    ) -> Self {
        Self::Pick {
            field: field.into(),
            criterion,
            child: Some(child.into()),
        }
    }

    /// List item by position
    #[must_use]
    pub fn index(field: impl Into<String>, index: usize) -> Self {
        Self::Index {
            field: field.into(),
            index,
        }
    }

    /// Field this step reads from the current component
    #[must_use]
    pub fn field_name(&self) -> &str {
        match self {
            Self::Field(field) | Self::Pick { field, .. } | Self::Index { field, .. } => field,
        }
    }
}

impl From<&str> for FieldAccessor {
    fn from(name: &str) -> Self {
        Self::Field(name.to_string())
    }
}

impl From<String> for FieldAccessor {
    fn from(name: String) -> Self {
        Self::Field(name)
    }
}

impl fmt::Display for FieldAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(field) => f.write_str(field),
            Self::Pick {
                field,
                criterion,
                child: None,
            } => write!(f, "{field}[{criterion}]"),
            Self::Pick {
                field,
                criterion,
                child: Some(child),
            } => write!(f, "{field}[{child} {criterion}]"),
            Self::Index { field, index } => write!(f, "{field}[{index}]"),
        }
    }
}

// =============================================================================
// RESOLVER
// =============================================================================

/// Result of a resolution: the node plus the path that reached it
#[derive(Debug, Clone)]
pub struct Resolved {
    path: String,
    node: RepositoryNode,
}

impl Resolved {
    /// Dotted path that was walked
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The node
    #[must_use]
    pub const fn node(&self) -> &RepositoryNode {
        &self.node
    }

    /// Expect an element
    pub fn into_element(self) -> Result<Element, RepositoryError> {
        match self.node {
            RepositoryNode::Element(el) => Ok(el),
            other => Err(other.wrong_kind(&self.path, "element")),
        }
    }

    /// Expect an element list
    pub fn into_elements(self) -> Result<Vec<Element>, RepositoryError> {
        match self.node {
            RepositoryNode::ElementList(list) => Ok(list),
            other => Err(other.wrong_kind(&self.path, "element list")),
        }
    }

    /// Expect a component
    pub fn into_component(self) -> Result<Component, RepositoryError> {
        match self.node {
            RepositoryNode::Component(component) => Ok(component),
            other => Err(other.wrong_kind(&self.path, "component")),
        }
    }

    /// Expect a component list
    pub fn into_components(self) -> Result<Vec<Component>, RepositoryError> {
        match self.node {
            RepositoryNode::ComponentList(list) => Ok(list),
            other => Err(other.wrong_kind(&self.path, "component list")),
        }
    }
}

/// Walks a [`Repository`] by name
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    repository: &'a Repository,
    context: &'a ContextStore,
    matcher: CollectionMatcher,
}

impl<'a> Resolver<'a> {
    /// Resolver over `repository`, expanding names through `context`
    #[must_use]
    pub fn new(repository: &'a Repository, context: &'a ContextStore) -> Self {
        Self {
            repository,
            context,
            matcher: CollectionMatcher::default(),
        }
    }

    /// Use `matcher` for [`FieldAccessor::Pick`] steps
    #[must_use]
    pub const fn with_matcher(mut self, matcher: CollectionMatcher) -> Self {
        self.matcher = matcher;
        self
    }

    fn name(&self, raw: &str) -> SteadfastResult<String> {
        Ok(normalize_name(&self.context.expand(raw)?))
    }

    /// Walk from `page` along `path`.
    ///
    /// An empty path yields the page itself.
    ///
    /// # Errors
    ///
    /// Repository errors for unknown names or mismatched shapes, context
    /// errors from placeholder expansion, and [`crate::SteadfastError::NotFound`]
    /// when a pick finds no match.
    pub fn resolve(&self, page: &str, path: &[FieldAccessor]) -> SteadfastResult<Resolved> {
        let page_name = self.name(page)?;
        let mut current = RepositoryNode::Component(self.repository.page(&page_name)?.clone());
        let mut location = page_name;

        for step in path {
            let component = match current {
                RepositoryNode::Component(component) => component,
                other => return Err(other.wrong_kind(&location, "component").into()),
            };
            let field = self.name(step.field_name())?;
            let node = component.field(&field).map_err(|e| match e {
                RepositoryError::NoSuchField {
                    field, available, ..
                } => RepositoryError::NoSuchField {
                    page: location.clone(),
                    field,
                    available,
                },
                other => other,
            })?;
            location = format!("{location}.{field}");

            current = match step {
                FieldAccessor::Field(_) => node.clone(),
                FieldAccessor::Index { index, .. } => index_into(node, &location, *index)?,
                FieldAccessor::Pick {
                    criterion, child, ..
                } => {
                    let child = child.as_deref().map(|c| self.name(c)).transpose()?;
                    let picked = self.pick(node, &location, criterion, child.as_deref())?;
                    location = format!("{location}[{criterion}]");
                    picked
                }
            };
        }

        debug!(path = %location, kind = current.kind(), "resolved");
        Ok(Resolved {
            path: location,
            node: current,
        })
    }

    fn pick(
        &self,
        node: &RepositoryNode,
        location: &str,
        criterion: &MatchCriterion,
        child: Option<&str>,
    ) -> SteadfastResult<RepositoryNode> {
        match (node, child) {
            (RepositoryNode::ElementList(items), None) => Ok(RepositoryNode::Element(
                self.matcher.find_among(items, criterion)?,
            )),
            (RepositoryNode::ElementList(items), Some(child)) => Ok(RepositoryNode::Element(
                self.matcher.find_among_by_child(items, child, criterion)?,
            )),
            (RepositoryNode::ComponentList(items), None) => Ok(RepositoryNode::Component(
                self.matcher.find_among(items, criterion)?,
            )),
            (RepositoryNode::ComponentList(items), Some(child)) => Ok(RepositoryNode::Component(
                self.matcher.find_among_by_child(items, child, criterion)?,
            )),
            (other, _) => Err(other.wrong_kind(location, "list").into()),
        }
    }

    /// Resolve to an element
    pub fn resolve_element(&self, page: &str, path: &[FieldAccessor]) -> SteadfastResult<Element> {
        Ok(self.resolve(page, path)?.into_element()?)
    }

    /// Resolve to an element list
    pub fn resolve_elements(
        &self,
        page: &str,
        path: &[FieldAccessor],
    ) -> SteadfastResult<Vec<Element>> {
        Ok(self.resolve(page, path)?.into_elements()?)
    }

    /// Resolve to a component
    pub fn resolve_component(
        &self,
        page: &str,
        path: &[FieldAccessor],
    ) -> SteadfastResult<Component> {
        Ok(self.resolve(page, path)?.into_component()?)
    }

    /// Resolve to a component list
    pub fn resolve_components(
        &self,
        page: &str,
        path: &[FieldAccessor],
    ) -> SteadfastResult<Vec<Component>> {
        Ok(self.resolve(page, path)?.into_components()?)
    }
}

fn index_into(
    node: &RepositoryNode,
    location: &str,
    index: usize,
) -> Result<RepositoryNode, RepositoryError> {
    let out_of_range = |len| RepositoryError::IndexOutOfRange {
        field: location.to_string(),
        index,
        len,
    };
    match node {
        RepositoryNode::ElementList(items) => items
            .get(index)
            .cloned()
            .map(RepositoryNode::Element)
            .ok_or_else(|| out_of_range(items.len())),
        RepositoryNode::ComponentList(items) => items
            .get(index)
            .cloned()
            .map(RepositoryNode::Component)
            .ok_or_else(|| out_of_range(items.len())),
        other => Err(other.wrong_kind(location, "list")),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::mock::FakeElement;
    use crate::result::SteadfastError;
    use crate::wait::PollingPolicy;

    fn el(name: &str) -> Element {
        Arc::new(FakeElement::new(name).with_text(name))
    }

    fn item(name: &str, label: &str) -> Component {
        Component::builder(name)
            .root(el(name))
            .element("label", el(label))
            .build()
    }

    fn repository() -> Repository {
        Repository::builder()
            .page("LoginPage", |page| {
                page.element("userName", el("user"))
                    .element("submitButton", el("submit"))
                    .component(
                        "header",
                        Component::builder("header")
                            .elements("menuItems", vec![el("Home"), el("Orders"), el("Logout")])
                            .build(),
                    )
            })
            .page("cartPage", |page| {
                page.components(
                    "lines",
                    vec![item("line-1", "Apple"), item("line-2", "Pear")],
                )
                .element("lineA", el("dynamic"))
            })
            .build()
            .unwrap()
    }

    fn fast() -> CollectionMatcher {
        CollectionMatcher::new(
            PollingPolicy::new()
                .with_timeout_ms(30)
                .with_interval(Duration::from_millis(1))
                .with_max_interval(Duration::from_millis(2)),
        )
    }

    mod normalize_tests {
        use super::*;

        #[test]
        fn test_decapitalizes_first_char_only() {
            assert_eq!(normalize_name("LoginPage"), "loginPage");
            assert_eq!(normalize_name("URLField"), "uRLField");
            assert_eq!(normalize_name("already"), "already");
            assert_eq!(normalize_name(""), "");
        }

        #[test]
        fn test_non_ascii() {
            assert_eq!(normalize_name("Ärger"), "ärger");
        }
    }

    mod builder_tests {
        use super::*;

        #[test]
        fn test_registered_names_are_normalized() {
            let repo = repository();
            assert_eq!(repo.page_names(), vec!["cartPage", "loginPage"]);
            let page = repo.page("LoginPage").unwrap();
            assert_eq!(page.field_names(), vec!["header", "submitButton", "userName"]);
        }

        #[test]
        fn test_duplicate_page_rejected() {
            let err = Repository::builder()
                .page("Home", |p| p)
                .page("home", |p| p)
                .build()
                .unwrap_err();
            assert_eq!(err, RepositoryError::DuplicatePage { page: "home".into() });
        }

        #[test]
        fn test_missing_root() {
            let component = Component::builder("bare").build();
            assert!(component.is_empty());
            assert_eq!(
                component.root_element().unwrap_err(),
                RepositoryError::MissingRoot {
                    component: "bare".into()
                }
            );
        }

        #[test]
        fn test_element_accessor_checks_kind() {
            let component = item("row", "Apple");
            assert_eq!(component.element("label").unwrap().describe(), "Apple");
            let nested = Component::builder("outer")
                .component("inner", component)
                .build();
            assert!(matches!(
                nested.element("inner"),
                Err(RepositoryError::WrongKind {
                    expected: "element",
                    actual: "component",
                    ..
                })
            ));
        }
    }

    mod resolve_tests {
        use super::*;

        #[test]
        fn test_round_trip() {
            let repo = repository();
            let context = ContextStore::new();
            let resolver = Resolver::new(&repo, &context);
            let submit = resolver
                .resolve_element("LoginPage", &["submitButton".into()])
                .unwrap();
            assert_eq!(submit.describe(), "submit");
        }

        #[test]
        fn test_capitalized_field_name() {
            let repo = repository();
            let context = ContextStore::new();
            let resolver = Resolver::new(&repo, &context);
            let user = resolver
                .resolve_element("loginPage", &["UserName".into()])
                .unwrap();
            assert_eq!(user.describe(), "user");
        }

        #[test]
        fn test_missing_field_names_it() {
            let repo = repository();
            let context = ContextStore::new();
            let err = Resolver::new(&repo, &context)
                .resolve("LoginPage", &["missingField".into()])
                .unwrap_err();
            match err {
                SteadfastError::Repository(RepositoryError::NoSuchField {
                    page,
                    field,
                    available,
                }) => {
                    assert_eq!(page, "loginPage");
                    assert_eq!(field, "missingField");
                    assert!(available.contains(&"submitButton".to_string()));
                }
                other => panic!("expected NoSuchField, got {other:?}"),
            }
        }

        #[test]
        fn test_missing_page() {
            let repo = repository();
            let context = ContextStore::new();
            let err = Resolver::new(&repo, &context)
                .resolve("ProfilePage", &[])
                .unwrap_err();
            assert!(err.to_string().contains("profilePage"));
        }

        #[test]
        fn test_nested_field_error_reports_path() {
            let repo = repository();
            let context = ContextStore::new();
            let err = Resolver::new(&repo, &context)
                .resolve("LoginPage", &["header".into(), "logo".into()])
                .unwrap_err();
            assert!(err.to_string().contains("loginPage.header"));
        }

        #[test]
        fn test_empty_path_yields_page() {
            let repo = repository();
            let context = ContextStore::new();
            let page = Resolver::new(&repo, &context)
                .resolve_component("CartPage", &[])
                .unwrap();
            assert_eq!(page.name(), "cartPage");
        }

        #[test]
        fn test_wrong_kind_names_path() {
            let repo = repository();
            let context = ContextStore::new();
            let err = Resolver::new(&repo, &context)
                .resolve_element("LoginPage", &["header".into()])
                .unwrap_err();
            assert!(matches!(
                err,
                SteadfastError::Repository(RepositoryError::WrongKind { ref field, .. })
                    if field == "loginPage.header"
            ));
        }

        #[test]
        fn test_walk_through_element_fails() {
            let repo = repository();
            let context = ContextStore::new();
            let err = Resolver::new(&repo, &context)
                .resolve("LoginPage", &["submitButton".into(), "icon".into()])
                .unwrap_err();
            assert!(matches!(
                err,
                SteadfastError::Repository(RepositoryError::WrongKind { .. })
            ));
        }

        #[test]
        fn test_context_placeholder_in_name() {
            let repo = repository();
            let context = ContextStore::new();
            let _ = context.set("slot", "A");
            let found = Resolver::new(&repo, &context)
                .resolve_element("cartPage", &["lineCONTEXT-slot".into()])
                .unwrap();
            assert_eq!(found.describe(), "dynamic");
        }

        #[test]
        fn test_unknown_placeholder_key_is_context_error() {
            let repo = repository();
            let context = ContextStore::new();
            let err = Resolver::new(&repo, &context)
                .resolve("CONTEXT-page", &[])
                .unwrap_err();
            assert!(matches!(err, SteadfastError::Context { .. }));
        }
    }

    mod list_tests {
        use super::*;

        #[test]
        fn test_index() {
            let repo = repository();
            let context = ContextStore::new();
            let line = Resolver::new(&repo, &context)
                .resolve_component("cartPage", &[FieldAccessor::index("lines", 1)])
                .unwrap();
            assert_eq!(line.name(), "line-2");
        }

        #[test]
        fn test_index_out_of_range() {
            let repo = repository();
            let context = ContextStore::new();
            let err = Resolver::new(&repo, &context)
                .resolve("cartPage", &[FieldAccessor::index("lines", 5)])
                .unwrap_err();
            assert!(matches!(
                err,
                SteadfastError::Repository(RepositoryError::IndexOutOfRange { len: 2, .. })
            ));
        }

        #[test]
        fn test_pick_element() {
            let repo = repository();
            let context = ContextStore::new();
            let logout = Resolver::new(&repo, &context)
                .with_matcher(fast())
                .resolve_element(
                    "LoginPage",
                    &[
                        "header".into(),
                        FieldAccessor::pick("menuItems", MatchCriterion::text("logout")),
                    ],
                )
                .unwrap();
            assert_eq!(logout.describe(), "Logout");
        }

        #[test]
        fn test_pick_component_by_child_then_descend() {
            let repo = repository();
            let context = ContextStore::new();
            let label = Resolver::new(&repo, &context)
                .with_matcher(fast())
                .resolve_element(
                    "cartPage",
                    &[
                        FieldAccessor::pick_by("lines", "Label", MatchCriterion::text("pear")),
                        "label".into(),
                    ],
                )
                .unwrap();
            assert_eq!(label.describe(), "Pear");
        }

        #[test]
        fn test_pick_without_match() {
            let repo = repository();
            let context = ContextStore::new();
            let err = Resolver::new(&repo, &context)
                .with_matcher(fast())
                .resolve(
                    "cartPage",
                    &[FieldAccessor::pick_by("lines", "label", MatchCriterion::text("kiwi"))],
                )
                .unwrap_err();
            assert!(matches!(
                err,
                SteadfastError::NotFound {
                    collection_size: 2,
                    ..
                }
            ));
        }

        #[test]
        fn test_pick_on_single_element_is_wrong_kind() {
            let repo = repository();
            let context = ContextStore::new();
            let err = Resolver::new(&repo, &context)
                .resolve(
                    "LoginPage",
                    &[FieldAccessor::pick("submitButton", MatchCriterion::text("x"))],
                )
                .unwrap_err();
            assert!(matches!(
                err,
                SteadfastError::Repository(RepositoryError::WrongKind {
                    expected: "list",
                    ..
                })
            ));
        }

        #[test]
        fn test_accessor_display() {
            assert_eq!(FieldAccessor::index("rows", 2).to_string(), "rows[2]");
            assert_eq!(
                FieldAccessor::pick_by("rows", "name", MatchCriterion::text("a")).to_string(),
                "rows[name text ~ \"a\"]"
            );
        }
    }
}
