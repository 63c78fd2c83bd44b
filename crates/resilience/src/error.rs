//! Error taxonomy for the retry pipeline.
//!
//! Construction problems (`ConfigError`) are fatal and surface when a
//! pipeline is built, never during execution. Per-attempt failures
//! (`Failure`) are recovered locally by the retry loop until the policy or
//! breaker limits apply, at which point the call terminates with a
//! [`RetryError`].

use std::fmt;

use thiserror::Error;

/// Classification of a single failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// The endpoint could not be reached at all (connect, timeout, I/O).
    Transport,
    /// The endpoint answered with a status outside the accepted set.
    UnexpectedStatus(u16),
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Transport => write!(f, "transport failure"),
            FailureKind::UnexpectedStatus(status) => write!(f, "unexpected status {status}"),
        }
    }
}

/// One recorded attempt failure: what went wrong and a human-readable
/// description of where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    /// What category of failure occurred.
    pub kind: FailureKind,
    /// Description of the failure, including the target endpoint.
    pub message: String,
}

impl Failure {
    /// A failure to reach the endpoint at all.
    pub fn transport(message: impl Into<String>) -> Self {
        Self { kind: FailureKind::Transport, message: message.into() }
    }

    /// A response whose status falls outside the accepted set.
    pub fn unexpected_status(status: u16, message: impl Into<String>) -> Self {
        Self { kind: FailureKind::UnexpectedStatus(status), message: message.into() }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Invalid pipeline configuration, raised at construction time only.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The endpoint list was empty.
    #[error("endpoint list must not be empty")]
    EmptyEndpoints,

    /// An endpoint string could not be parsed as an absolute URL.
    #[error("invalid endpoint URL `{url}`: {reason}")]
    InvalidEndpoint {
        /// The offending endpoint string.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A max-attempts policy was configured with zero attempts.
    #[error("max attempts must be greater than 0")]
    ZeroMaxAttempts,

    /// A circuit breaker window was configured as zero.
    #[error("circuit breaker {which} timeout must be greater than zero")]
    ZeroBreakerTimeout {
        /// Which window was zero (`"open"` or `"reset"`).
        which: &'static str,
    },
}

/// Terminal outcome of a call that never produced an accepted response.
#[derive(Debug, Error)]
pub enum RetryError {
    /// Every permitted attempt failed; wraps the last recorded failure.
    #[error("retries exhausted after {attempts} attempts, last failure: {last}")]
    Exhausted {
        /// How many attempts were made.
        attempts: u32,
        /// The failure recorded on the final attempt.
        last: Failure,
    },

    /// The circuit breaker rejected the call before any attempt was made.
    ///
    /// Kept distinct from [`RetryError::Exhausted`] so callers can tell
    /// "never attempted" from "attempted and failed repeatedly".
    #[error("circuit breaker is open, call was not attempted")]
    CircuitOpen,
}

impl RetryError {
    /// The failure recorded on the final attempt, if any attempt ran.
    pub fn last_failure(&self) -> Option<&Failure> {
        match self {
            RetryError::Exhausted { last, .. } => Some(last),
            RetryError::CircuitOpen => None,
        }
    }
}
