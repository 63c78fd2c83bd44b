//! Configuration surface: serde-friendly options and the validating
//! builder that turns them into an immutable retry profile.
//!
//! Where option values come from (environment, files, injected settings)
//! is the loader's business; everything here is validated once, at
//! construction, so nothing configuration-related can fail mid-call.

use std::time::Duration;

use serde::Deserialize;

use crate::backoff::Backoff;
use crate::breaker::CircuitBreakerGate;
use crate::error::ConfigError;
use crate::policy::{CompositeMode, RetryPolicy};

/// Recognized retry options, as produced by an external configuration
/// loader.
///
/// Field names follow the consumer-facing camelCase contract. Everything
/// is optional except the endpoint list; absent options fall back to the
/// documented defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryOptions {
    /// Maximum number of attempts before giving up.
    pub max_attempts: Option<u32>,
    /// Overall time budget for retrying a call, in milliseconds.
    pub timeout_millis: Option<u64>,
    /// Circuit breaker open window, in milliseconds. Only honored together
    /// with the reset window.
    pub circuit_breaker_open_timeout_millis: Option<u64>,
    /// Circuit breaker reset window, in milliseconds. Only honored together
    /// with the open window.
    pub circuit_breaker_reset_timeout_millis: Option<u64>,
    /// Fixed wait between attempts, in milliseconds.
    pub backoff_period_millis: Option<u64>,
    /// Optimistic (any subpolicy allows) vs pessimistic (all subpolicies
    /// must allow) composite evaluation. Defaults to optimistic.
    pub composite_optimistic: Option<bool>,
    /// Ordered list of equivalent base endpoints.
    #[serde(default)]
    pub endpoints: Vec<String>,
    /// Endpoint targeted by the first attempt of every call.
    pub preferred_endpoint: Option<String>,
}

impl RetryOptions {
    /// Convert the policy-related options into a validated profile.
    ///
    /// The endpoint fields are not consumed here; they feed the rotator and
    /// the client layer.
    pub fn to_profile(&self) -> Result<RetryProfile, ConfigError> {
        let mut builder = RetryProfile::builder();
        if let Some(n) = self.max_attempts {
            builder = builder.max_attempts(n);
        }
        if let Some(millis) = self.timeout_millis {
            builder = builder.time_limit(Duration::from_millis(millis));
        }
        if let (Some(open), Some(reset)) = (
            self.circuit_breaker_open_timeout_millis,
            self.circuit_breaker_reset_timeout_millis,
        ) {
            builder =
                builder.circuit_breaker(Duration::from_millis(open), Duration::from_millis(reset));
        }
        if let Some(millis) = self.backoff_period_millis {
            builder = builder.backoff_period(Duration::from_millis(millis));
        }
        if let Some(optimistic) = self.composite_optimistic {
            builder = builder.optimistic(optimistic);
        }
        builder.build()
    }
}

/// Immutable bundle of retry rules for one pipeline: the policy, the
/// backoff, and the optional circuit-breaker gate.
///
/// Cloning shares the breaker state: every executor built from clones of
/// one profile trips and recovers together, which makes the profile the
/// breaker's key.
#[derive(Debug, Clone, Default)]
pub struct RetryProfile {
    policy: RetryPolicy,
    backoff: Backoff,
    breaker: Option<CircuitBreakerGate>,
}

impl RetryProfile {
    /// Start building a profile.
    pub fn builder() -> RetryProfileBuilder {
        RetryProfileBuilder::default()
    }

    /// The configured retry policy.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// The configured backoff.
    pub fn backoff(&self) -> Backoff {
        self.backoff
    }

    /// The circuit-breaker gate, when one is configured.
    pub fn breaker(&self) -> Option<&CircuitBreakerGate> {
        self.breaker.as_ref()
    }
}

/// Fluent builder for [`RetryProfile`], validating on `build`.
#[derive(Debug, Default)]
pub struct RetryProfileBuilder {
    policies: Vec<RetryPolicy>,
    mode: CompositeMode,
    backoff: Backoff,
    breaker: Option<(Duration, Duration)>,
}

impl RetryProfileBuilder {
    /// Bound the call to at most `attempts` attempts.
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.policies.push(RetryPolicy::MaxAttempts(attempts));
        self
    }

    /// Bound the call to retries within `limit` of its start.
    pub fn time_limit(mut self, limit: Duration) -> Self {
        self.policies.push(RetryPolicy::TimeLimit(limit));
        self
    }

    /// Add an arbitrary (possibly composite) policy.
    pub fn policy(mut self, policy: RetryPolicy) -> Self {
        self.policies.push(policy);
        self
    }

    /// Choose how multiple policies combine: optimistic (any allows) or
    /// pessimistic (all must allow). Optimistic is the default.
    pub fn optimistic(mut self, optimistic: bool) -> Self {
        self.mode =
            if optimistic { CompositeMode::Optimistic } else { CompositeMode::Pessimistic };
        self
    }

    /// Wait a fixed period between attempts.
    pub fn backoff_period(mut self, period: Duration) -> Self {
        self.backoff = Backoff::Fixed(period);
        self
    }

    /// Gate the policy behind a circuit breaker with the given open and
    /// reset windows. Both must be non-zero.
    pub fn circuit_breaker(mut self, open_timeout: Duration, reset_timeout: Duration) -> Self {
        self.breaker = Some((open_timeout, reset_timeout));
        self
    }

    /// Validate and build the profile.
    ///
    /// With no policies configured the default ten-attempt bound applies;
    /// otherwise the configured policies are combined into one composite
    /// under the chosen mode. A single-entry composite behaves exactly
    /// like its entry.
    pub fn build(self) -> Result<RetryProfile, ConfigError> {
        for policy in &self.policies {
            validate_policy(policy)?;
        }

        let policy = if self.policies.is_empty() {
            RetryPolicy::default()
        } else {
            RetryPolicy::Composite { policies: self.policies, mode: self.mode }
        };

        let breaker = match self.breaker {
            Some((open, reset)) => Some(CircuitBreakerGate::new(policy.clone(), open, reset)?),
            None => None,
        };

        Ok(RetryProfile { policy, backoff: self.backoff, breaker })
    }
}

fn validate_policy(policy: &RetryPolicy) -> Result<(), ConfigError> {
    match policy {
        RetryPolicy::MaxAttempts(0) => Err(ConfigError::ZeroMaxAttempts),
        RetryPolicy::MaxAttempts(_) | RetryPolicy::TimeLimit(_) => Ok(()),
        RetryPolicy::Composite { policies, .. } => {
            policies.iter().try_for_each(validate_policy)
        }
    }
}
