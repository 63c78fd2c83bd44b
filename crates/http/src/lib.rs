//! HTTP glue for the Backstop resilience pipeline.
//!
//! [`FailoverClient`] wraps `reqwest` with the decision engine from
//! `backstop-resilience`: buffered requests are replayed against rotating
//! endpoints, responses are classified against the fixed accepted-status
//! set, and the circuit breaker fast-fails calls once a pipeline has been
//! exhausted.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod classify;
pub mod client;
pub mod error;

pub use classify::{classify, ACCEPTED_STATUSES};
pub use client::{FailoverClient, FailoverClientBuilder};
pub use error::HttpError;

// Re-export the pipeline types callers configure the client with.
pub use backstop_resilience::{
    BreakerState, ConfigError, Failure, FailureKind, RetryError, RetryOptions, RetryProfile,
};
