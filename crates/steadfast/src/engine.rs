//! Step-facing facade.
//!
//! [`Engine`] ties the pieces together the way a step method uses them:
//! resolve a name to a handle, optionally pick one out of a list, then
//! interact, all under the polling policy the settings hold at that moment.

use std::sync::Arc;

use tracing::debug;

use crate::config::{EngineConfig, Settings};
use crate::context::ContextStore;
use crate::driver::Element;
use crate::interaction::{ClickOptions, FillOptions, Interactions};
use crate::logging;
use crate::matcher::CollectionMatcher;
use crate::repository::{FieldAccessor, Repository, Resolver};
use crate::result::SteadfastResult;
use crate::session::{Platform, Session, SessionRegistry};
use crate::state::{ElementState, StateEvaluator};
use crate::wait::{Poller, PollingPolicy};

/// Everything a step needs: settings, sessions, the repository and the
/// scenario context
#[derive(Debug)]
pub struct Engine {
    settings: Settings,
    sessions: SessionRegistry,
    repository: Repository,
    context: ContextStore,
    active: Platform,
}

impl Engine {
    /// Engine over `repository` with `config`
    #[must_use]
    pub fn new(config: EngineConfig, repository: Repository) -> Self {
        let context = ContextStore::from_config(&config);
        Self {
            settings: Settings::new(config),
            sessions: SessionRegistry::new(),
            repository,
            context,
            active: Platform::Web,
        }
    }

    /// Register a session and make its platform the active one
    pub fn with_session(mut self, session: Session) -> SteadfastResult<Self> {
        let platform = session.platform();
        let _ = self.sessions.register(session)?;
        self.active = platform;
        Ok(self)
    }

    /// Install a global log subscriber from the configured [`logging::LogConfig`]
    pub fn init_logging(&self) -> SteadfastResult<bool> {
        logging::init(&self.settings.snapshot().log)
    }

    /// Shared settings
    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Scenario context
    #[must_use]
    pub const fn context(&self) -> &ContextStore {
        &self.context
    }

    /// Object repository
    #[must_use]
    pub const fn repository(&self) -> &Repository {
        &self.repository
    }

    /// Session registry
    pub fn sessions_mut(&mut self) -> &mut SessionRegistry {
        &mut self.sessions
    }

    /// Platform steps act on
    #[must_use]
    pub const fn active_platform(&self) -> Platform {
        self.active
    }

    /// Act on another platform's session from now on
    pub fn use_platform(&mut self, platform: Platform) -> SteadfastResult<()> {
        let _ = self.sessions.get(platform)?;
        self.active = platform;
        Ok(())
    }

    /// Active session
    pub fn session(&self) -> SteadfastResult<&Arc<Session>> {
        self.sessions.get(self.active)
    }

    /// Policy from the current settings
    #[must_use]
    pub fn policy(&self) -> PollingPolicy {
        self.settings.policy()
    }

    /// Resolver using the current policy for picks
    #[must_use]
    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.repository, &self.context)
            .with_matcher(CollectionMatcher::new(self.policy()))
    }

    /// Interactions on the active session
    pub fn interactions(&self) -> SteadfastResult<Interactions<'_>> {
        Ok(Interactions::new(self.session()?, self.policy()))
    }

    /// Expand placeholders in a step argument
    pub fn expand(&self, text: &str) -> SteadfastResult<String> {
        self.context.expand(text)
    }

    /// Resolve to an element
    pub fn element(&self, page: &str, path: &[FieldAccessor]) -> SteadfastResult<Element> {
        self.resolver().resolve_element(page, path)
    }

    /// Click a named element
    pub fn click(&self, page: &str, path: &[FieldAccessor]) -> SteadfastResult<()> {
        let element = self.element(page, path)?;
        self.interactions()?.click(element.as_ref(), ClickOptions::new())
    }

    /// Scroll a named element into view, then click it
    pub fn scroll_and_click(&self, page: &str, path: &[FieldAccessor]) -> SteadfastResult<()> {
        let element = self.element(page, path)?;
        self.interactions()?
            .click(element.as_ref(), ClickOptions::new().with_scroll(true))
    }

    /// Click a named element if it becomes clickable.
    ///
    /// Resolution errors still fail: a misspelled name is not an absent
    /// element.
    pub fn click_if_present(&self, page: &str, path: &[FieldAccessor]) -> SteadfastResult<bool> {
        let element = self.element(page, path)?;
        Ok(self.interactions()?.click_if_present(element.as_ref()))
    }

    /// Type into a named element after expanding placeholders in `text`
    pub fn fill(
        &self,
        page: &str,
        path: &[FieldAccessor],
        text: &str,
        options: FillOptions,
    ) -> SteadfastResult<()> {
        let text = self.expand(text)?;
        let element = self.element(page, path)?;
        self.interactions()?.fill(element.as_ref(), &text, options)
    }

    /// Move the pointer over a named element
    pub fn hover(&self, page: &str, path: &[FieldAccessor]) -> SteadfastResult<()> {
        let element = self.element(page, path)?;
        self.interactions()?.hover(element.as_ref())
    }

    /// Drag one named element of `page` onto another
    pub fn drag(
        &self,
        page: &str,
        source: &[FieldAccessor],
        target: &[FieldAccessor],
    ) -> SteadfastResult<()> {
        let source = self.element(page, source)?;
        let target = self.element(page, target)?;
        self.interactions()?
            .drag_and_drop(source.as_ref(), target.as_ref())
    }

    /// Select a named checkbox, radio or option
    pub fn select(&self, page: &str, path: &[FieldAccessor]) -> SteadfastResult<()> {
        let element = self.element(page, path)?;
        self.interactions()?.select(element.as_ref())
    }

    /// Whether a named element reaches `state` within the budget
    pub fn is_in_state(
        &self,
        page: &str,
        path: &[FieldAccessor],
        state: ElementState,
    ) -> SteadfastResult<bool> {
        let element = self.element(page, path)?;
        Ok(StateEvaluator::new(self.policy()).is_in_state(element.as_ref(), state))
    }

    /// Wait for a named element to reach `state`
    pub fn expect_state(
        &self,
        page: &str,
        path: &[FieldAccessor],
        state: ElementState,
    ) -> SteadfastResult<()> {
        let element = self.element(page, path)?;
        StateEvaluator::new(self.policy()).expect_state(element.as_ref(), state)
    }

    /// Read a named element's text and store it under `key`
    pub fn store_text(
        &self,
        page: &str,
        path: &[FieldAccessor],
        key: &str,
    ) -> SteadfastResult<String> {
        let element = self.element(page, path)?;
        let what = format!("text of {}", element.describe());
        let text = Poller::new(self.policy()).retry(&what, |_| Ok(element.text()?))?;
        let _ = self.context.set(key, text.clone());
        debug!(key, value = %text, "stored text");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::matcher::MatchCriterion;
    use crate::mock::{FakeDriver, FakeElement};
    use crate::result::{RepositoryError, SteadfastError};

    fn config() -> EngineConfig {
        EngineConfig::new()
            .with_timeout_ms(300)
            .with_poll_interval_ms(1)
            .with_max_poll_interval_ms(2)
    }

    struct Fixture {
        engine: Engine,
        email: Arc<FakeElement>,
        submit: Arc<FakeElement>,
        heading: Arc<FakeElement>,
    }

    fn fixture() -> Fixture {
        let email = FakeElement::new("email").shared();
        let submit = FakeElement::new("submit").shared();
        let heading = FakeElement::new("heading").with_text("Order A-17").shared();
        let repository = Repository::builder()
            .page("SignupPage", |page| {
                page.element("email", email.clone())
                    .element("submitButton", submit.clone())
                    .element("heading", heading.clone())
                    .elements(
                        "plans",
                        vec![
                            FakeElement::new("basic").with_text("Basic").shared(),
                            FakeElement::new("pro").with_text("Pro").shared(),
                        ],
                    )
            })
            .build()
            .unwrap();
        let engine = Engine::new(config(), repository)
            .with_session(Session::new(Platform::Web, FakeDriver::new()))
            .unwrap();
        Fixture {
            engine,
            email,
            submit,
            heading,
        }
    }

    mod facade_tests {
        use super::*;

        #[test]
        fn test_click_by_name() {
            let f = fixture();
            f.engine.click("SignupPage", &["SubmitButton".into()]).unwrap();
            assert_eq!(f.submit.successful_clicks(), 1);
        }

        #[test]
        fn test_fill_expands_placeholders() {
            let f = fixture();
            let _ = f.engine.context().set("user", "ada");
            f.engine
                .fill(
                    "SignupPage",
                    &["email".into()],
                    "CONTEXT-user@example.test",
                    FillOptions::new().with_verify(true),
                )
                .unwrap();
            assert_eq!(f.email.value().as_deref(), Some("ada@example.test"));
        }

        #[test]
        fn test_store_text_then_reuse() {
            let f = fixture();
            let text = f
                .engine
                .store_text("SignupPage", &["heading".into()], "title")
                .unwrap();
            assert_eq!(text, "Order A-17");
            assert_eq!(f.engine.expand("CONTEXT-title").unwrap(), "Order A-17");
            assert_eq!(f.heading.calls().text, 1);
        }

        #[test]
        fn test_pick_from_list() {
            let f = fixture();
            let plan = f
                .engine
                .element(
                    "SignupPage",
                    &[FieldAccessor::pick("plans", MatchCriterion::text("pro"))],
                )
                .unwrap();
            assert_eq!(plan.describe(), "pro");
        }

        #[test]
        fn test_click_if_present_still_fails_on_bad_name() {
            let f = fixture();
            let err = f
                .engine
                .click_if_present("SignupPage", &["cancelButton".into()])
                .unwrap_err();
            assert!(matches!(
                err,
                SteadfastError::Repository(RepositoryError::NoSuchField { .. })
            ));
        }

        #[test]
        fn test_states() {
            let f = fixture();
            assert!(f
                .engine
                .is_in_state("SignupPage", &["email".into()], ElementState::Displayed)
                .unwrap());
            assert!(f
                .engine
                .expect_state("SignupPage", &["email".into()], ElementState::Absent)
                .is_err());
        }
    }

    mod settings_tests {
        use super::*;

        #[test]
        fn test_policy_read_at_call_time() {
            let f = fixture();
            f.engine.settings().update(|c| c.timeout_ms = 5).unwrap();
            assert_eq!(f.engine.policy().timeout, Duration::from_millis(5));
        }

        #[test]
        fn test_platform_switch_requires_session() {
            let mut f = fixture();
            assert_eq!(f.engine.active_platform(), Platform::Web);
            assert!(f.engine.use_platform(Platform::Mobile).is_err());
            let _ = f
                .engine
                .sessions_mut()
                .register(Session::new(Platform::Mobile, FakeDriver::new()))
                .unwrap();
            f.engine.use_platform(Platform::Mobile).unwrap();
            assert_eq!(f.engine.session().unwrap().platform(), Platform::Mobile);
        }

        #[test]
        fn test_missing_session() {
            let engine = Engine::new(config(), Repository::default());
            assert!(matches!(
                engine.interactions(),
                Err(SteadfastError::Session { .. })
            ));
        }
    }
}
