//! Circuit-breaker gate shared across calls.
//!
//! The gate decorates a [`RetryPolicy`] with open/reset windows and a state
//! machine shared by every call flowing through the same pipeline:
//!
//! - `CLOSED`: calls pass through to the inner policy; every failure
//!   increments the shared failure counter.
//! - `OPEN`: calls are rejected outright until the open window elapses.
//! - `HALF_OPEN`: exactly one call is admitted as a probe; its outcome
//!   decides whether the circuit closes again or reopens.
//!
//! The circuit opens exactly when the inner policy stops permitting
//! retries, so later unrelated calls fast-fail without re-running the
//! inner policy logic.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::ConfigError;
use crate::policy::{AttemptContext, RetryPolicy};

/// Observable circuit states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    /// Normal operation, the inner policy decides.
    Closed,
    /// Fast-failing; calls are rejected without attempting.
    Open,
    /// Waiting on the outcome of a single probe call.
    HalfOpen,
}

impl fmt::Display for BreakerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BreakerState::Closed => write!(f, "CLOSED"),
            BreakerState::Open => write!(f, "OPEN"),
            BreakerState::HalfOpen => write!(f, "HALF_OPEN"),
        }
    }
}

#[derive(Debug)]
enum CoreState {
    Closed,
    Open {
        since: Instant,
        wait: Duration,
    },
    HalfOpen {
        /// Whether the single probe slot for this window is taken.
        probe_taken: bool,
    },
}

#[derive(Debug)]
struct BreakerCore {
    state: CoreState,
    failures: u64,
}

/// Decorates a retry policy with circuit-breaker semantics.
///
/// Clones share one state instance: the breaker is keyed by the pipeline it
/// was built for, so every call through the same configuration sees the
/// same circuit. All transitions happen behind a single mutex; concurrent
/// callers never observe a torn state.
#[derive(Debug, Clone)]
pub struct CircuitBreakerGate {
    inner: Arc<RetryPolicy>,
    open_timeout: Duration,
    reset_timeout: Duration,
    core: Arc<Mutex<BreakerCore>>,
}

impl CircuitBreakerGate {
    /// Wrap `inner` with the given open and reset windows.
    ///
    /// `open_timeout` governs how long the circuit stays open after the
    /// inner policy is exhausted; `reset_timeout` governs how long it stays
    /// open again after a failed probe. Both must be non-zero.
    pub fn new(
        inner: RetryPolicy,
        open_timeout: Duration,
        reset_timeout: Duration,
    ) -> Result<Self, ConfigError> {
        if open_timeout.is_zero() {
            return Err(ConfigError::ZeroBreakerTimeout { which: "open" });
        }
        if reset_timeout.is_zero() {
            return Err(ConfigError::ZeroBreakerTimeout { which: "reset" });
        }
        Ok(Self {
            inner: Arc::new(inner),
            open_timeout,
            reset_timeout,
            core: Arc::new(Mutex::new(BreakerCore { state: CoreState::Closed, failures: 0 })),
        })
    }

    fn core(&self) -> MutexGuard<'_, BreakerCore> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Call-level admission check, run before the first attempt.
    ///
    /// An open circuit whose window has elapsed flips to half-open and
    /// admits the caller as the probe; exactly one probe is admitted per
    /// window. Returns false when the call must fast-fail without ever
    /// invoking the operation.
    pub fn admit(&self, now: Instant) -> bool {
        let mut core = self.core();
        match core.state {
            CoreState::Closed => true,
            CoreState::Open { since, wait } => {
                if now.duration_since(since) >= wait {
                    core.state = CoreState::HalfOpen { probe_taken: true };
                    debug!("circuit half-open, admitting probe call");
                    true
                } else {
                    false
                }
            }
            CoreState::HalfOpen { probe_taken: false } => {
                core.state = CoreState::HalfOpen { probe_taken: true };
                true
            }
            CoreState::HalfOpen { probe_taken: true } => false,
        }
    }

    /// Record a failed attempt and decide whether the call may continue.
    ///
    /// In the closed state the verdict comes from the inner policy; the
    /// moment the inner policy denies, the circuit opens. In the open state
    /// the verdict is always "stop" without re-running the inner policy. A
    /// probe failure reopens the circuit with the reset window governing
    /// the next probe.
    pub fn on_failure(&self, ctx: &AttemptContext, now: Instant) -> bool {
        let mut core = self.core();
        match core.state {
            CoreState::Closed => {
                core.failures += 1;
                if self.inner.allow_retry(ctx, now) {
                    true
                } else {
                    core.state = CoreState::Open { since: now, wait: self.open_timeout };
                    warn!(failures = core.failures, "retry policy exhausted, circuit opened");
                    false
                }
            }
            CoreState::Open { .. } => false,
            CoreState::HalfOpen { .. } => {
                core.failures += 1;
                core.state = CoreState::Open { since: now, wait: self.reset_timeout };
                warn!("probe failed, circuit reopened");
                false
            }
        }
    }

    /// Report an accepted outcome. A successful probe closes the circuit
    /// and resets the failure counter; successes in the closed state leave
    /// the counter untouched.
    pub fn on_success(&self) {
        let mut core = self.core();
        if matches!(core.state, CoreState::HalfOpen { .. }) {
            core.state = CoreState::Closed;
            core.failures = 0;
            debug!("probe succeeded, circuit closed");
        }
    }

    /// Current state, for logging and tests.
    pub fn state(&self) -> BreakerState {
        match self.core().state {
            CoreState::Closed => BreakerState::Closed,
            CoreState::Open { .. } => BreakerState::Open,
            CoreState::HalfOpen { .. } => BreakerState::HalfOpen,
        }
    }

    /// Failures recorded since the circuit last closed via a probe.
    pub fn failure_count(&self) -> u64 {
        self.core().failures
    }
}
