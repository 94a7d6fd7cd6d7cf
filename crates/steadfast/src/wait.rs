//! Polling executor.
//!
//! Every wait in the engine is a sequential retry loop on the calling thread,
//! bounded by wall-clock time. The loop backs off between attempts (doubling
//! up to a cap) and never sleeps past its deadline, so a call with timeout `t`
//! returns within `t` plus one attempt's cost.
//!
//! Transient failures are swallowed and retried. A warning is logged only when
//! the failure's [`ErrorClass`] differs from the previous one, which keeps a
//! long retry against the same stale handle down to a single log line.

use std::time::{Duration, Instant};

use tracing::{trace, warn};

use crate::result::{ErrorClass, SteadfastError, SteadfastResult};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default timeout for polling loops (10 seconds)
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Default first pause between attempts (50ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Default cap for the backoff pause (500ms)
pub const DEFAULT_MAX_POLL_INTERVAL_MS: u64 = 500;

// =============================================================================
// POLLING POLICY
// =============================================================================

/// Timeout and pacing for one polling loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingPolicy {
    /// Budget measured from loop start
    pub timeout: Duration,
    /// Run the first attempt without pausing
    pub poll_immediately: bool,
    /// First pause between attempts
    pub interval: Duration,
    /// Upper bound for the doubling pause
    pub max_interval: Duration,
}

impl Default for PollingPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            poll_immediately: true,
            interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            max_interval: Duration::from_millis(DEFAULT_MAX_POLL_INTERVAL_MS),
        }
    }
}

impl PollingPolicy {
    /// Create a policy with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout = Duration::from_millis(timeout_ms);
        self
    }

    /// Whether the first attempt runs immediately
    #[must_use]
    pub const fn with_poll_immediately(mut self, poll_immediately: bool) -> Self {
        self.poll_immediately = poll_immediately;
        self
    }

    /// Set first pause between attempts
    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the backoff cap
    #[must_use]
    pub const fn with_max_interval(mut self, max_interval: Duration) -> Self {
        self.max_interval = max_interval;
        self
    }

    /// Shrink the timeout to what is left of a shared budget
    #[must_use]
    pub fn within(mut self, deadline: &Deadline) -> Self {
        self.timeout = self.timeout.min(deadline.remaining());
        self
    }

    /// Pause that follows `current` in the backoff sequence
    #[must_use]
    pub fn next_interval(&self, current: Duration) -> Duration {
        current.saturating_mul(2).min(self.max_interval)
    }
}

// =============================================================================
// DEADLINE
// =============================================================================

/// A time budget shared by the steps of one composed operation
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    start: Instant,
    budget: Duration,
}

impl Deadline {
    /// Budget starting now
    #[must_use]
    pub fn after(budget: Duration) -> Self {
        Self {
            start: Instant::now(),
            budget,
        }
    }

    /// Time since the budget started
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Time left, zero once expired
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.budget.saturating_sub(self.start.elapsed())
    }

    /// Whether the budget is used up
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.start.elapsed() >= self.budget
    }
}

// =============================================================================
// RETRY LOG
// =============================================================================

/// Logs transient failures once per change of error class
#[derive(Debug)]
pub struct RetryLog<'a> {
    what: &'a str,
    last_class: Option<ErrorClass>,
    lines: usize,
}

impl<'a> RetryLog<'a> {
    /// Log for a loop waiting on `what`
    #[must_use]
    pub const fn new(what: &'a str) -> Self {
        Self {
            what,
            last_class: None,
            lines: 0,
        }
    }

    /// Record a failure; returns whether a line was written
    pub fn observe(&mut self, error: &SteadfastError) -> bool {
        let class = error.class();
        if self.last_class == Some(class) {
            return false;
        }
        self.last_class = Some(class);
        self.lines += 1;
        warn!(what = %self.what, class = ?class, error = %error, "transient failure, retrying");
        true
    }

    /// Lines written so far
    #[must_use]
    pub const fn lines(&self) -> usize {
        self.lines
    }
}

// =============================================================================
// POLLER
// =============================================================================

/// Timeout-bounded retry loop
#[derive(Debug, Clone, Copy, Default)]
pub struct Poller {
    policy: PollingPolicy,
}

impl Poller {
    /// Poller with the given policy
    #[must_use]
    pub const fn new(policy: PollingPolicy) -> Self {
        Self { policy }
    }

    /// Policy in use
    #[must_use]
    pub const fn policy(&self) -> &PollingPolicy {
        &self.policy
    }

    /// Poll until `op` yields a value.
    ///
    /// `op` receives the 1-based attempt number and returns `Ok(Some(v))` when
    /// done, `Ok(None)` when the condition does not hold yet, or an error.
    /// Transient errors are retried; any other error returns immediately.
    ///
    /// # Errors
    ///
    /// [`SteadfastError::Timeout`] carrying the last transient error when the
    /// budget runs out, or the first fatal error from `op`.
    pub fn until<T, F>(&self, what: &str, mut op: F) -> SteadfastResult<T>
    where
        F: FnMut(u32) -> SteadfastResult<Option<T>>,
    {
        let deadline = Deadline::after(self.policy.timeout);
        let mut interval = self.policy.interval;
        let mut log = RetryLog::new(what);
        let mut last_error: Option<SteadfastError> = None;
        let mut attempts: u32 = 0;

        if !self.policy.poll_immediately {
            pause(&deadline, interval);
        }

        loop {
            attempts = attempts.saturating_add(1);
            match op(attempts) {
                Ok(Some(value)) => {
                    trace!(what, attempts, "condition met");
                    return Ok(value);
                }
                Ok(None) => {}
                Err(error) if error.is_transient() => {
                    let _ = log.observe(&error);
                    last_error = Some(error);
                }
                Err(error) => return Err(error),
            }

            if deadline.is_expired() {
                return Err(SteadfastError::Timeout {
                    what: what.to_string(),
                    elapsed_ms: deadline.elapsed().as_millis() as u64,
                    attempts,
                    last_error: last_error.map(Box::new),
                });
            }

            pause(&deadline, interval);
            interval = self.policy.next_interval(interval);
        }
    }

    /// Retry `op` until it succeeds.
    ///
    /// # Errors
    ///
    /// Same as [`Poller::until`].
    pub fn retry<T, F>(&self, what: &str, mut op: F) -> SteadfastResult<T>
    where
        F: FnMut(u32) -> SteadfastResult<T>,
    {
        self.until(what, |attempt| op(attempt).map(Some))
    }
}

fn pause(deadline: &Deadline, interval: Duration) {
    let nap = interval.min(deadline.remaining());
    if !nap.is_zero() {
        std::thread::sleep(nap);
    }
}

// =============================================================================
// CONVENIENCE FUNCTIONS
// =============================================================================

/// Retry `op` with default pacing until it succeeds or `timeout` elapses
pub fn poll<T, F>(op: F, timeout: Duration) -> SteadfastResult<T>
where
    F: FnMut(u32) -> SteadfastResult<T>,
{
    Poller::new(PollingPolicy::default().with_timeout(timeout)).retry("operation", op)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::WarningCounter;
    use crate::result::{DriverError, RepositoryError};

    fn fast(timeout_ms: u64) -> PollingPolicy {
        PollingPolicy::new()
            .with_timeout_ms(timeout_ms)
            .with_interval(Duration::from_millis(1))
            .with_max_interval(Duration::from_millis(4))
    }

    fn stale() -> SteadfastError {
        DriverError::stale("element is gone").into()
    }

    mod policy_tests {
        use super::*;

        #[test]
        fn test_default_policy() {
            let policy = PollingPolicy::default();
            assert_eq!(policy.timeout, Duration::from_millis(DEFAULT_TIMEOUT_MS));
            assert!(policy.poll_immediately);
            assert_eq!(policy.interval, Duration::from_millis(50));
        }

        #[test]
        fn test_backoff_doubles_and_caps() {
            let policy = PollingPolicy::new()
                .with_interval(Duration::from_millis(10))
                .with_max_interval(Duration::from_millis(35));
            let second = policy.next_interval(policy.interval);
            let third = policy.next_interval(second);
            let fourth = policy.next_interval(third);
            assert_eq!(second, Duration::from_millis(20));
            assert_eq!(third, Duration::from_millis(35));
            assert_eq!(fourth, Duration::from_millis(35));
        }

        #[test]
        fn test_within_shrinks_to_remaining_budget() {
            let deadline = Deadline::after(Duration::from_millis(20));
            let policy = PollingPolicy::new().with_timeout_ms(10_000).within(&deadline);
            assert!(policy.timeout <= Duration::from_millis(20));
        }

        #[test]
        fn test_within_keeps_shorter_timeout() {
            let deadline = Deadline::after(Duration::from_secs(60));
            let policy = PollingPolicy::new().with_timeout_ms(5).within(&deadline);
            assert_eq!(policy.timeout, Duration::from_millis(5));
        }
    }

    mod deadline_tests {
        use super::*;

        #[test]
        fn test_zero_budget_is_expired() {
            let deadline = Deadline::after(Duration::ZERO);
            assert!(deadline.is_expired());
            assert_eq!(deadline.remaining(), Duration::ZERO);
        }

        #[test]
        fn test_fresh_budget_has_time_left() {
            let deadline = Deadline::after(Duration::from_secs(30));
            assert!(!deadline.is_expired());
            assert!(deadline.remaining() > Duration::from_secs(29));
        }
    }

    mod until_tests {
        use super::*;

        #[test]
        fn test_short_circuits_on_success() {
            let mut calls = 0;
            let value = Poller::new(fast(5_000))
                .until("third attempt", |attempt| {
                    calls += 1;
                    Ok((attempt == 3).then_some(attempt))
                })
                .unwrap();
            assert_eq!(value, 3);
            assert_eq!(calls, 3);
        }

        #[test]
        fn test_first_attempt_success_calls_once() {
            let mut calls = 0;
            Poller::new(fast(5_000))
                .retry("immediate", |_| {
                    calls += 1;
                    Ok(())
                })
                .unwrap();
            assert_eq!(calls, 1);
        }

        #[test]
        fn test_times_out_when_condition_never_holds() {
            let start = Instant::now();
            let err = Poller::new(fast(40))
                .until::<(), _>("never", |_| Ok(None))
                .unwrap_err();
            assert!(start.elapsed() < Duration::from_millis(40 + 200));
            match err {
                SteadfastError::Timeout {
                    what, last_error, ..
                } => {
                    assert_eq!(what, "never");
                    assert!(last_error.is_none());
                }
                other => panic!("expected timeout, got {other:?}"),
            }
        }

        #[test]
        fn test_zero_timeout_makes_exactly_one_attempt() {
            let mut calls = 0;
            let err = Poller::new(fast(0))
                .until::<(), _>("instant", |_| {
                    calls += 1;
                    Ok(None)
                })
                .unwrap_err();
            assert_eq!(calls, 1);
            assert!(matches!(err, SteadfastError::Timeout { attempts: 1, .. }));
        }

        #[test]
        fn test_timeout_carries_last_transient_error() {
            let err = Poller::new(fast(20))
                .retry::<(), _>("stale", |_| Err(stale()))
                .unwrap_err();
            match err {
                SteadfastError::Timeout {
                    last_error: Some(last),
                    attempts,
                    ..
                } => {
                    assert!(attempts >= 1);
                    assert!(last.is_transient());
                }
                other => panic!("expected timeout with last error, got {other:?}"),
            }
        }

        #[test]
        fn test_fatal_error_stops_immediately() {
            let mut calls = 0;
            let err = Poller::new(fast(5_000))
                .retry::<(), _>("fatal", |_| {
                    calls += 1;
                    Err(RepositoryError::DuplicatePage { page: "x".into() }.into())
                })
                .unwrap_err();
            assert_eq!(calls, 1);
            assert!(matches!(err, SteadfastError::Repository(_)));
        }

        #[test]
        fn test_recovers_after_transient_errors() {
            let value = Poller::new(fast(5_000))
                .retry("flaky", |attempt| {
                    if attempt < 4 {
                        Err(stale())
                    } else {
                        Ok("done")
                    }
                })
                .unwrap();
            assert_eq!(value, "done");
        }

        #[test]
        fn test_delayed_first_attempt() {
            let policy = fast(5_000)
                .with_poll_immediately(false)
                .with_interval(Duration::from_millis(15));
            let start = Instant::now();
            Poller::new(policy).retry("delayed", |_| Ok(())).unwrap();
            assert!(start.elapsed() >= Duration::from_millis(15));
        }

        #[test]
        fn test_poll_convenience() {
            let value = poll(|attempt| Ok(attempt * 2), Duration::from_millis(10)).unwrap();
            assert_eq!(value, 2);
        }
    }

    mod retry_log_tests {
        use super::*;

        #[test]
        fn test_logs_once_per_class_change() {
            let mut log = RetryLog::new("click");
            let intercepted: SteadfastError = DriverError::click_intercepted("overlay").into();
            assert!(log.observe(&stale()));
            assert!(!log.observe(&stale()));
            assert!(log.observe(&intercepted));
            assert!(!log.observe(&intercepted));
            assert!(log.observe(&stale()));
            assert_eq!(log.lines(), 3);
        }

        #[test]
        fn test_poller_emits_one_warning_for_repeated_class() {
            let counter = WarningCounter::new();
            counter.capture(|| {
                let _ = Poller::new(fast(5_000)).retry("stale five times", |attempt| {
                    if attempt <= 5 {
                        Err(stale())
                    } else {
                        Ok(())
                    }
                });
            });
            assert_eq!(counter.count(), 1);
        }
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(24))]

            #[test]
            fn prop_success_on_attempt_k_uses_k_calls(k in 1u32..12) {
                let mut calls = 0u32;
                let policy = fast(10_000).with_interval(Duration::ZERO);
                let got = Poller::new(policy).until("k", |attempt| {
                    calls += 1;
                    Ok((attempt == k).then_some(attempt))
                }).unwrap();
                prop_assert_eq!(got, k);
                prop_assert_eq!(calls, k);
            }

            #[test]
            fn prop_failing_loop_is_bounded(timeout_ms in 0u64..30) {
                let start = Instant::now();
                let result = Poller::new(fast(timeout_ms)).retry::<(), _>("bounded", |_| Err(stale()));
                prop_assert!(result.is_err());
                prop_assert!(start.elapsed() < Duration::from_millis(timeout_ms + 200));
            }
        }
    }
}
