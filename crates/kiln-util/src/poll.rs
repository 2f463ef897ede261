//! Bounded polling for filesystem state that is not synchronously observable.
//!
//! Removing a directory tree can return before the OS reflects the removal
//! (most visibly on Windows, where open handles delay the final unlink). The
//! helpers here re-check a condition at a fixed interval for a fixed number of
//! checks instead of trusting the removal call.

use std::time::Duration;

/// Default number of checks before a wait gives up.
pub const DEFAULT_MAX_CHECKS: u32 = 10;

/// Default delay between two consecutive checks.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(500);

/// How long and how often a readiness wait polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Total number of checks, including the first immediate one.
    pub max_checks: u32,
    /// Sleep between two consecutive checks.
    pub interval: Duration,
}

impl PollPolicy {
    /// Create a policy with an explicit check count and interval.
    pub fn new(max_checks: u32, interval: Duration) -> Self {
        Self {
            max_checks,
            interval,
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CHECKS, DEFAULT_INTERVAL)
    }
}

/// Progress of a single wait. Lives only for the duration of [`wait_until`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollState {
    /// Checks performed so far.
    pub attempts: u32,
    /// Checks allowed before timing out. Never zero.
    pub max_attempts: u32,
    /// Sleep between checks.
    pub interval: Duration,
}

impl PollState {
    fn new(policy: PollPolicy) -> Self {
        Self {
            attempts: 0,
            max_attempts: policy.max_checks.max(1),
            interval: policy.interval,
        }
    }

    fn exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }
}

/// How a wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The condition held after `checks` checks.
    Ready { checks: u32 },
    /// The condition never held; all `checks` checks were spent.
    TimedOut { checks: u32 },
}

impl PollOutcome {
    /// Number of checks performed, whatever the outcome.
    pub fn checks(self) -> u32 {
        match self {
            PollOutcome::Ready { checks } | PollOutcome::TimedOut { checks } => checks,
        }
    }
}

/// Check `ready` immediately, then after every `policy.interval`, until it
/// returns `true` or `policy.max_checks` checks have been made.
///
/// No sleep follows the final check.
pub fn wait_until<F>(policy: PollPolicy, mut ready: F) -> PollOutcome
where
    F: FnMut() -> bool,
{
    let mut state = PollState::new(policy);
    loop {
        state.attempts = state.attempts.saturating_add(1);
        if ready() {
            return PollOutcome::Ready {
                checks: state.attempts,
            };
        }
        if state.exhausted() {
            return PollOutcome::TimedOut {
                checks: state.attempts,
            };
        }
        tracing::debug!(
            attempt = state.attempts,
            max = state.max_attempts,
            "condition not met yet, waiting {:?}",
            state.interval
        );
        std::thread::sleep(state.interval);
    }
}
