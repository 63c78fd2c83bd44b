//! The attempt loop.
//!
//! [`RetryExecutor`] drives one operation through the whole pipeline:
//! invoke, classify (the caller's job, reported back as an [`Outcome`]),
//! consult the policy and circuit breaker, wait out the backoff, rotate to
//! the next endpoint, and repeat, or give up with a terminal
//! [`RetryError`].

use std::future::Future;

use tracing::{debug, warn};
use url::Url;

use crate::clock::{Clock, SystemClock};
use crate::config::RetryProfile;
use crate::error::{Failure, RetryError};
use crate::policy::AttemptContext;
use crate::rotation::{rebase, EndpointRotator};

/// Result of one attempt, as judged by the caller's classifier.
#[derive(Debug)]
pub enum Outcome<T> {
    /// The attempt produced a final answer; the loop ends and the value is
    /// returned as-is.
    Accepted(T),
    /// The attempt failed in a way that may warrant another try.
    Rejected(Failure),
}

/// Drives the per-call attempt loop.
///
/// The executor is cheap to clone: clones share the circuit-breaker state
/// and the rotation cursor, while every call gets its own
/// [`AttemptContext`]. Attempts within one call run strictly sequentially;
/// the awaited operation and the backoff sleep are the only suspension
/// points.
#[derive(Debug, Clone)]
pub struct RetryExecutor<C: Clock = SystemClock> {
    profile: RetryProfile,
    rotator: EndpointRotator,
    clock: C,
}

impl RetryExecutor<SystemClock> {
    /// Build an executor over the given profile and endpoint rotation,
    /// using the system clock.
    pub fn new(profile: RetryProfile, rotator: EndpointRotator) -> Self {
        Self::with_clock(profile, rotator, SystemClock)
    }
}

impl<C: Clock> RetryExecutor<C> {
    /// Build an executor with a custom clock (useful for testing window
    /// behavior without sleeping).
    pub fn with_clock(profile: RetryProfile, rotator: EndpointRotator, clock: C) -> Self {
        Self { profile, rotator, clock }
    }

    /// The profile this executor decides with.
    pub fn profile(&self) -> &RetryProfile {
        &self.profile
    }

    /// The endpoint rotation this executor fails over with.
    pub fn rotator(&self) -> &EndpointRotator {
        &self.rotator
    }

    /// Execute `op` until an outcome is accepted or retries are exhausted.
    ///
    /// The first attempt targets `original` unchanged; every later attempt
    /// targets the next rotated endpoint with `original`'s path and query
    /// preserved. The operation receives the target and the 1-based attempt
    /// number, and must report back how its result should be treated.
    ///
    /// An open circuit rejects the call up front with
    /// [`RetryError::CircuitOpen`], without invoking `op` at all.
    pub async fn execute<T, Op, Fut>(&self, original: &Url, mut op: Op) -> Result<T, RetryError>
    where
        Op: FnMut(Url, u32) -> Fut,
        Fut: Future<Output = Outcome<T>>,
    {
        if let Some(gate) = self.profile.breaker() {
            if !gate.admit(self.clock.now()) {
                warn!(url = %original, "circuit open, rejecting call without attempting");
                return Err(RetryError::CircuitOpen);
            }
        }

        let mut ctx = AttemptContext::new(self.clock.now());
        loop {
            let target = if ctx.attempt() == 1 {
                original.clone()
            } else {
                rebase(self.rotator.next_endpoint(), original)
            };
            debug!(attempt = ctx.attempt(), url = %target, "executing attempt");

            match op(target, ctx.attempt()).await {
                Outcome::Accepted(value) => {
                    if let Some(gate) = self.profile.breaker() {
                        gate.on_success();
                    }
                    if ctx.attempt() > 1 {
                        debug!(attempts = ctx.attempt(), "call recovered after failover");
                    }
                    return Ok(value);
                }
                Outcome::Rejected(failure) => {
                    warn!(attempt = ctx.attempt(), failure = %failure, "attempt failed");
                    ctx.record_failure(failure.clone());

                    let now = self.clock.now();
                    let allowed = match self.profile.breaker() {
                        Some(gate) => gate.on_failure(&ctx, now),
                        None => self.profile.policy().allow_retry(&ctx, now),
                    };
                    if !allowed {
                        return Err(RetryError::Exhausted { attempts: ctx.attempt(), last: failure });
                    }

                    ctx.advance();
                    let delay = self.profile.backoff().delay_before(ctx.attempt());
                    if !delay.is_zero() {
                        debug!(attempt = ctx.attempt(), delay_ms = delay.as_millis() as u64, "backing off");
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
    }

    /// Like [`RetryExecutor::execute`], but on a terminal failure
    /// (exhausted retries or an open circuit) hand the error to `fallback`
    /// and return its value instead.
    pub async fn execute_with_fallback<T, Op, Fut, F>(
        &self,
        original: &Url,
        op: Op,
        fallback: F,
    ) -> T
    where
        Op: FnMut(Url, u32) -> Fut,
        Fut: Future<Output = Outcome<T>>,
        F: FnOnce(RetryError) -> T,
    {
        match self.execute(original, op).await {
            Ok(value) => value,
            Err(err) => {
                debug!(error = %err, "invoking fallback after terminal failure");
                fallback(err)
            }
        }
    }
}
