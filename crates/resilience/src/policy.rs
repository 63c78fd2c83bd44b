//! Retry policy evaluation.
//!
//! Policies form a closed sum type: each variant answers one question,
//! "may this call make another attempt", against the per-call
//! [`AttemptContext`]. Evaluation is pure; the current instant is passed in
//! by the caller so the time source stays under the executor's control.

use std::time::{Duration, Instant};

use crate::error::Failure;

/// Per-call mutable retry state.
///
/// Owned by exactly one in-flight call and never shared across calls; the
/// attempt number only ever increases.
#[derive(Debug, Clone)]
pub struct AttemptContext {
    attempt: u32,
    started_at: Instant,
    last_failure: Option<Failure>,
}

impl AttemptContext {
    /// Start tracking a new call. The first attempt is number 1.
    pub fn new(started_at: Instant) -> Self {
        Self { attempt: 1, started_at, last_failure: None }
    }

    /// Number of the attempt currently executing (or the one that just
    /// failed).
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Instant the call started, as read from the executor's clock.
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// The most recent recorded failure, if any.
    pub fn last_failure(&self) -> Option<&Failure> {
        self.last_failure.as_ref()
    }

    /// Record the failure of the current attempt.
    pub fn record_failure(&mut self, failure: Failure) {
        self.last_failure = Some(failure);
    }

    /// Move on to the next attempt.
    pub fn advance(&mut self) {
        self.attempt += 1;
    }
}

/// How a composite combines its subpolicies' verdicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompositeMode {
    /// Retry is allowed if any subpolicy allows it.
    #[default]
    Optimistic,
    /// Retry is allowed only if all subpolicies allow it.
    Pessimistic,
}

/// A single retry rule.
///
/// Immutable once built and cheap to share; all mutable state lives in the
/// [`AttemptContext`] owned by the call being evaluated.
#[derive(Debug, Clone)]
pub enum RetryPolicy {
    /// Allow up to this many attempts in total.
    MaxAttempts(u32),
    /// Allow retries while the call has been running for less than this.
    TimeLimit(Duration),
    /// Combine several rules under one [`CompositeMode`].
    Composite {
        /// The subpolicies, evaluated in order against the same context.
        policies: Vec<RetryPolicy>,
        /// How the subpolicies' verdicts are combined.
        mode: CompositeMode,
    },
}

impl RetryPolicy {
    /// Attempt bound applied when nothing is configured.
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

    /// Decide whether the call may make one more attempt.
    ///
    /// Evaluated after the failure of attempt `ctx.attempt()`. Only the
    /// boolean verdict matters: a composite never reports which subpolicy
    /// denied. An empty composite places no constraint and allows the
    /// retry under either mode.
    pub fn allow_retry(&self, ctx: &AttemptContext, now: Instant) -> bool {
        match self {
            RetryPolicy::MaxAttempts(max) => ctx.attempt() < *max,
            RetryPolicy::TimeLimit(limit) => now.duration_since(ctx.started_at()) < *limit,
            RetryPolicy::Composite { policies, mode } => {
                if policies.is_empty() {
                    return true;
                }
                match mode {
                    CompositeMode::Optimistic => policies.iter().any(|p| p.allow_retry(ctx, now)),
                    CompositeMode::Pessimistic => policies.iter().all(|p| p.allow_retry(ctx, now)),
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::MaxAttempts(Self::DEFAULT_MAX_ATTEMPTS)
    }
}
