//! Inter-attempt delay computation.

use std::time::Duration;

/// Wait strategy applied between attempts.
///
/// Only a fixed period is supported: the same delay before every attempt
/// after the first, or no delay at all. Jitter and growth curves are out of
/// scope for this pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backoff {
    /// No wait between attempts.
    #[default]
    None,
    /// The same delay before every attempt after the first.
    Fixed(Duration),
}

impl Backoff {
    /// Delay to apply before executing the given attempt (1-based).
    ///
    /// The first attempt never waits.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        match self {
            Backoff::None => Duration::ZERO,
            Backoff::Fixed(period) => *period,
        }
    }
}
