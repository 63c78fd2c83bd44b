//! Time source abstraction.
//!
//! Every time-window decision in this crate (time-limit policies, circuit
//! breaker open/reset windows) reads the current instant through [`Clock`],
//! so tests can drive time deterministically instead of sleeping.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Trait for reading monotonic time.
pub trait Clock: Send + Sync + 'static {
    /// Get the current instant.
    fn now(&self) -> Instant;
}

/// Real system clock for production use.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Implement Clock for Arc<T> where T: Clock for convenient cloning
impl<T: Clock> Clock for Arc<T> {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

/// Manually advanced clock for deterministic tests.
///
/// Clones share the same elapsed counter, so a test can hold one handle
/// while the component under test holds another.
#[derive(Debug, Clone)]
pub struct MockClock {
    start: Instant,
    elapsed: Arc<Mutex<Duration>>,
}

impl MockClock {
    /// Create a new mock clock starting at the current instant.
    pub fn new() -> Self {
        Self { start: Instant::now(), elapsed: Arc::new(Mutex::new(Duration::ZERO)) }
    }

    /// Advance the clock by a duration without any real delay.
    pub fn advance(&self, duration: Duration) {
        if let Ok(mut elapsed) = self.elapsed.lock() {
            *elapsed += duration;
        }
    }

    /// Advance the clock by milliseconds (convenience method).
    pub fn advance_millis(&self, millis: u64) {
        self.advance(Duration::from_millis(millis));
    }

    /// Get the simulated elapsed time.
    pub fn elapsed(&self) -> Duration {
        self.elapsed.lock().map(|e| *e).unwrap_or(Duration::ZERO)
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        let elapsed = self.elapsed.lock().map(|e| *e).unwrap_or(Duration::ZERO);
        self.start + elapsed
    }
}
