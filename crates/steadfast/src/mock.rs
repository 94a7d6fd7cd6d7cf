//! Scripted fakes for testing code built on the engine.
//!
//! [`FakeElement`] answers capability calls from queued readings and then a
//! steady value, and counts every call. [`FakeDriver`] records session-level
//! calls into a shared [`Journal`]. [`WarningCounter`] is a `tracing` layer
//! that counts warnings emitted while a closure runs.

use std::collections::{HashMap, VecDeque};
use std::fmt::{self, Write as _};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

use crate::driver::{By, Driver, DriverResult, Element, ElementHandle, WindowHandle};
use crate::result::DriverError;

// =============================================================================
// SCRIPTED READINGS
// =============================================================================

/// Queued readings followed by a steady value
#[derive(Debug, Clone)]
struct Script<T: Clone> {
    queued: VecDeque<DriverResult<T>>,
    steady: T,
}

impl<T: Clone> Script<T> {
    fn steady(value: T) -> Self {
        Self {
            queued: VecDeque::new(),
            steady: value,
        }
    }

    fn next(&mut self) -> DriverResult<T> {
        self.queued
            .pop_front()
            .unwrap_or_else(|| Ok(self.steady.clone()))
    }
}

/// Call counters for a [`FakeElement`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    /// `is_enabled` calls
    pub enabled: usize,
    /// `is_displayed` calls
    pub displayed: usize,
    /// `is_selected` calls
    pub selected: usize,
    /// `text` calls
    pub text: usize,
    /// `attribute` calls
    pub attribute: usize,
    /// `click` calls, failed ones included
    pub click: usize,
    /// `send_keys` calls
    pub send_keys: usize,
    /// `clear` calls
    pub clear: usize,
}

#[derive(Debug)]
struct FakeState {
    enabled: Script<bool>,
    displayed: Script<bool>,
    selected: Script<bool>,
    text: Script<String>,
    attributes: HashMap<String, String>,
    css: HashMap<String, String>,
    click_failures: VecDeque<DriverError>,
    click_toggles_selected: bool,
    max_length: Option<usize>,
    successful_clicks: usize,
    calls: CallCounts,
}

// =============================================================================
// FAKE ELEMENT
// =============================================================================

/// Element handle driven by a script
#[derive(Debug)]
pub struct FakeElement {
    name: String,
    state: Mutex<FakeState>,
}

impl FakeElement {
    /// Enabled, displayed, unselected element with empty text
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(FakeState {
                enabled: Script::steady(true),
                displayed: Script::steady(true),
                selected: Script::steady(false),
                text: Script::steady(String::new()),
                attributes: HashMap::new(),
                css: HashMap::new(),
                click_failures: VecDeque::new(),
                click_toggles_selected: false,
                max_length: None,
                successful_clicks: 0,
                calls: CallCounts::default(),
            }),
        }
    }

    /// Share as an [`Element`]
    #[must_use]
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Steady visible text
    #[must_use]
    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.lock().text.steady = text.into();
        self
    }

    /// Set an attribute
    #[must_use]
    pub fn with_attribute(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let _ = self.lock().attributes.insert(name.into(), value.into());
        self
    }

    /// Set a computed style value
    #[must_use]
    pub fn with_css(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let _ = self.lock().css.insert(name.into(), value.into());
        self
    }

    /// Steady `is_enabled` reading
    #[must_use]
    pub fn enabled(self, value: bool) -> Self {
        self.lock().enabled.steady = value;
        self
    }

    /// Steady `is_displayed` reading
    #[must_use]
    pub fn displayed(self, value: bool) -> Self {
        self.lock().displayed.steady = value;
        self
    }

    /// Steady `is_selected` reading
    #[must_use]
    pub fn selected(self, value: bool) -> Self {
        self.lock().selected.steady = value;
        self
    }

    /// Queue `is_enabled` readings ahead of the steady value
    #[must_use]
    pub fn enabled_readings(self, readings: impl IntoIterator<Item = DriverResult<bool>>) -> Self {
        self.lock().enabled.queued.extend(readings);
        self
    }

    /// Queue `is_displayed` readings ahead of the steady value
    #[must_use]
    pub fn displayed_readings(
        self,
        readings: impl IntoIterator<Item = DriverResult<bool>>,
    ) -> Self {
        self.lock().displayed.queued.extend(readings);
        self
    }

    /// Queue `is_selected` readings ahead of the steady value
    #[must_use]
    pub fn selected_readings(self, readings: impl IntoIterator<Item = DriverResult<bool>>) -> Self {
        self.lock().selected.queued.extend(readings);
        self
    }

    /// Queue `text` readings ahead of the steady value
    #[must_use]
    pub fn text_readings(self, readings: impl IntoIterator<Item = DriverResult<String>>) -> Self {
        self.lock().text.queued.extend(readings);
        self
    }

    /// Fail the next clicks with these errors, in order
    #[must_use]
    pub fn failing_clicks(self, errors: impl IntoIterator<Item = DriverError>) -> Self {
        self.lock().click_failures.extend(errors);
        self
    }

    /// Successful clicks flip `is_selected`
    #[must_use]
    pub fn click_toggles_selected(self) -> Self {
        self.lock().click_toggles_selected = true;
        self
    }

    /// Truncate typed input like an `<input maxlength>`
    #[must_use]
    pub fn with_max_length(self, max: usize) -> Self {
        self.lock().max_length = Some(max);
        self
    }

    /// Calls made so far
    #[must_use]
    pub fn calls(&self) -> CallCounts {
        self.lock().calls
    }

    /// Clicks that went through
    #[must_use]
    pub fn successful_clicks(&self) -> usize {
        self.lock().successful_clicks
    }

    /// Current `value` attribute
    #[must_use]
    pub fn value(&self) -> Option<String> {
        self.lock().attributes.get("value").cloned()
    }
}

impl ElementHandle for FakeElement {
    fn describe(&self) -> String {
        self.name.clone()
    }

    fn is_enabled(&self) -> DriverResult<bool> {
        let mut state = self.lock();
        state.calls.enabled += 1;
        state.enabled.next()
    }

    fn is_displayed(&self) -> DriverResult<bool> {
        let mut state = self.lock();
        state.calls.displayed += 1;
        state.displayed.next()
    }

    fn is_selected(&self) -> DriverResult<bool> {
        let mut state = self.lock();
        state.calls.selected += 1;
        state.selected.next()
    }

    fn text(&self) -> DriverResult<String> {
        let mut state = self.lock();
        state.calls.text += 1;
        state.text.next()
    }

    fn attribute(&self, name: &str) -> DriverResult<Option<String>> {
        let mut state = self.lock();
        state.calls.attribute += 1;
        Ok(state.attributes.get(name).cloned())
    }

    fn css_value(&self, name: &str) -> DriverResult<String> {
        Ok(self.lock().css.get(name).cloned().unwrap_or_default())
    }

    fn click(&self) -> DriverResult<()> {
        let mut state = self.lock();
        state.calls.click += 1;
        if let Some(err) = state.click_failures.pop_front() {
            return Err(err);
        }
        state.successful_clicks += 1;
        if state.click_toggles_selected {
            state.selected.steady = !state.selected.steady;
        }
        Ok(())
    }

    fn send_keys(&self, text: &str) -> DriverResult<()> {
        let mut state = self.lock();
        state.calls.send_keys += 1;
        let mut value = state.attributes.get("value").cloned().unwrap_or_default();
        value.push_str(text);
        if let Some(max) = state.max_length {
            value = value.chars().take(max).collect();
        }
        let _ = state.attributes.insert("value".into(), value);
        Ok(())
    }

    fn clear(&self) -> DriverResult<()> {
        let mut state = self.lock();
        state.calls.clear += 1;
        let _ = state.attributes.insert("value".into(), String::new());
        Ok(())
    }
}

// =============================================================================
// FAKE DRIVER
// =============================================================================

/// Shared record of driver calls
#[derive(Debug, Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    fn push(&self, entry: String) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }

    /// Entries so far, oldest first
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Driver that serves registered elements and records every call
#[derive(Debug, Default)]
pub struct FakeDriver {
    journal: Journal,
    elements: HashMap<By, Vec<Element>>,
    find_misses: HashMap<By, usize>,
    script_failures: VecDeque<DriverError>,
    windows: Vec<WindowHandle>,
    current_window: usize,
}

impl FakeDriver {
    /// Driver with one window named "main"
    #[must_use]
    pub fn new() -> Self {
        Self {
            windows: vec![WindowHandle("main".into())],
            ..Self::default()
        }
    }

    /// Handle to the call record, usable after the driver moves into a session
    #[must_use]
    pub fn journal(&self) -> Journal {
        self.journal.clone()
    }

    /// Serve `elements` for `by`
    #[must_use]
    pub fn with_elements(mut self, by: By, elements: Vec<Element>) -> Self {
        let _ = self.elements.insert(by, elements);
        self
    }

    /// Answer `NoSuchElement` for the first `misses` lookups of `by`
    #[must_use]
    pub fn missing_for(mut self, by: By, misses: usize) -> Self {
        let _ = self.find_misses.insert(by, misses);
        self
    }

    /// Fail the next scripts with these errors, in order
    #[must_use]
    pub fn failing_scripts(mut self, errors: impl IntoIterator<Item = DriverError>) -> Self {
        self.script_failures.extend(errors);
        self
    }

    /// Add another open window
    #[must_use]
    pub fn with_window(mut self, name: impl Into<String>) -> Self {
        self.windows.push(WindowHandle(name.into()));
        self
    }

    fn take_miss(&mut self, by: &By) -> bool {
        match self.find_misses.get_mut(by) {
            Some(misses) if *misses > 0 => {
                *misses -= 1;
                true
            }
            _ => false,
        }
    }
}

impl Driver for FakeDriver {
    fn find_element(&mut self, by: &By) -> DriverResult<Element> {
        self.journal.push(format!("find {by}"));
        if self.take_miss(by) {
            return Err(DriverError::no_such_element(by.to_string()));
        }
        self.elements
            .get(by)
            .and_then(|found| found.first().cloned())
            .ok_or_else(|| DriverError::no_such_element(by.to_string()))
    }

    fn find_elements(&mut self, by: &By) -> DriverResult<Vec<Element>> {
        self.journal.push(format!("find all {by}"));
        if self.take_miss(by) {
            return Ok(Vec::new());
        }
        Ok(self.elements.get(by).cloned().unwrap_or_default())
    }

    fn execute_script(
        &mut self,
        script: &str,
        args: &[&dyn ElementHandle],
    ) -> DriverResult<serde_json::Value> {
        let names: Vec<String> = args.iter().map(|el| el.describe()).collect();
        self.journal
            .push(format!("script {} [{}]", script, names.join(", ")));
        if let Some(err) = self.script_failures.pop_front() {
            return Err(err);
        }
        Ok(serde_json::Value::Null)
    }

    fn hover(&mut self, element: &dyn ElementHandle) -> DriverResult<()> {
        self.journal.push(format!("hover {}", element.describe()));
        Ok(())
    }

    fn drag_and_drop(
        &mut self,
        source: &dyn ElementHandle,
        target: &dyn ElementHandle,
    ) -> DriverResult<()> {
        self.journal.push(format!(
            "drag {} -> {}",
            source.describe(),
            target.describe()
        ));
        Ok(())
    }

    fn switch_to_frame(&mut self, frame: &dyn ElementHandle) -> DriverResult<()> {
        self.journal.push(format!("frame {}", frame.describe()));
        Ok(())
    }

    fn switch_to_default_content(&mut self) -> DriverResult<()> {
        self.journal.push("default content".into());
        Ok(())
    }

    fn switch_to_window(&mut self, window: &WindowHandle) -> DriverResult<()> {
        self.journal.push(format!("window {window}"));
        let index = self
            .windows
            .iter()
            .position(|w| w == window)
            .ok_or_else(|| DriverError::no_such_element(format!("window {window}")))?;
        self.current_window = index;
        Ok(())
    }

    fn current_window(&mut self) -> DriverResult<WindowHandle> {
        self.windows
            .get(self.current_window)
            .cloned()
            .ok_or_else(|| DriverError::session_closed("no open windows"))
    }

    fn window_handles(&mut self) -> DriverResult<Vec<WindowHandle>> {
        Ok(self.windows.clone())
    }
}

// =============================================================================
// WARNING COUNTER
// =============================================================================

/// `tracing` layer counting WARN events
#[derive(Debug, Clone, Default)]
pub struct WarningCounter {
    count: Arc<AtomicUsize>,
    lines: Arc<Mutex<Vec<String>>>,
}

impl WarningCounter {
    /// Empty counter
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` with this layer as the thread's subscriber
    pub fn capture<R>(&self, f: impl FnOnce() -> R) -> R {
        let subscriber = tracing_subscriber::registry().with(self.clone());
        tracing::subscriber::with_default(subscriber, f)
    }

    /// Warnings seen
    #[must_use]
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Rendered fields of each warning
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

struct FieldWriter(String);

impl Visit for FieldWriter {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let _ = write!(self.0, "{}={:?} ", field.name(), value);
    }
}

impl<S: Subscriber> Layer<S> for WarningCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() != Level::WARN {
            return;
        }
        let mut writer = FieldWriter(String::new());
        event.record(&mut writer);
        let _ = self.count.fetch_add(1, Ordering::SeqCst);
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(writer.0);
    }
}
