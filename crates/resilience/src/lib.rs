//! Resilience decision engine for outbound calls.
//!
//! For each failed attempt against a remote service this crate decides
//! whether to retry, how long to wait, whether to stop trying entirely
//! (circuit open), and which of several known equivalent endpoints to try
//! next:
//!
//! - **Policies** ([`policy`]): a closed sum type of retry rules:
//!   attempt bounds, time limits, and optimistic/pessimistic composites.
//! - **Backoff** ([`backoff`]): fixed inter-attempt delay, or none.
//! - **Circuit breaker** ([`breaker`]): a gate shared across calls that
//!   fast-fails once the wrapped policy has been exhausted.
//! - **Endpoint rotation** ([`rotation`]): a circularly consumed list of
//!   equivalent base endpoints behind one atomic cursor.
//! - **The executor** ([`executor`]): the per-call attempt loop tying the
//!   pieces together.
//!
//! The executor stays transport-agnostic: callers run the actual I/O and
//! report each attempt's result as an [`Outcome`]. The `backstop-http`
//! crate supplies the HTTP glue.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod backoff;
pub mod breaker;
pub mod clock;
pub mod config;
pub mod error;
pub mod executor;
pub mod policy;
pub mod rotation;

// Re-export commonly used types for convenience
// ------------------------------
pub use backoff::Backoff;
pub use breaker::{BreakerState, CircuitBreakerGate};
pub use clock::{Clock, MockClock, SystemClock};
pub use config::{RetryOptions, RetryProfile, RetryProfileBuilder};
pub use error::{ConfigError, Failure, FailureKind, RetryError};
pub use executor::{Outcome, RetryExecutor};
pub use policy::{AttemptContext, CompositeMode, RetryPolicy};
pub use rotation::{rebase, EndpointRotator};
