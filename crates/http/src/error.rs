//! Errors surfaced by the failover client.

use backstop_resilience::{ConfigError, RetryError};
use thiserror::Error;

/// Everything that can go wrong building or using the failover client.
///
/// Retry-pipeline outcomes pass through transparently so callers can match
/// on [`RetryError`] directly; in particular the circuit-open rejection
/// stays distinguishable from ordinary exhaustion.
#[derive(Debug, Error)]
pub enum HttpError {
    /// The retry pipeline gave up: exhausted attempts or an open circuit.
    #[error(transparent)]
    Retry(#[from] RetryError),

    /// Invalid client or pipeline configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The underlying HTTP client could not be constructed.
    #[error("failed to build http client")]
    Build(#[source] reqwest::Error),

    /// The request could not be assembled (bad method/URL/header
    /// combination).
    #[error("invalid request")]
    InvalidRequest(#[source] reqwest::Error),

    /// The request body is a stream and cannot be buffered for replay.
    #[error("request body cannot be cloned; buffer the body to enable retries")]
    NonReplayableBody,
}
