//! Response classification: which results end the retry loop.

use backstop_resilience::{Failure, Outcome};
use reqwest::{Response, StatusCode};
use url::Url;

/// Statuses treated as handled application answers and returned as-is,
/// 4xx/5xx included. Any other status triggers the retry pipeline.
///
/// The set is part of the wire contract with the remote services and is
/// deliberately not configurable.
pub const ACCEPTED_STATUSES: [StatusCode; 5] = [
    StatusCode::OK,
    StatusCode::BAD_REQUEST,
    StatusCode::NOT_FOUND,
    StatusCode::EXPECTATION_FAILED,
    StatusCode::INTERNAL_SERVER_ERROR,
];

/// Judge one attempt's transport-level result.
///
/// Transport errors (connect, timeout, I/O) and statuses outside
/// [`ACCEPTED_STATUSES`] come back as rejections for the executor to
/// retry; everything else is final.
pub fn classify(result: Result<Response, reqwest::Error>, target: &Url) -> Outcome<Response> {
    match result {
        Ok(response) if ACCEPTED_STATUSES.contains(&response.status()) => {
            Outcome::Accepted(response)
        }
        Ok(response) => Outcome::Rejected(Failure::unexpected_status(
            response.status().as_u16(),
            format!("status {} from {target}", response.status().as_u16()),
        )),
        Err(err) => {
            Outcome::Rejected(Failure::transport(format!("endpoint {target} unreachable: {err}")))
        }
    }
}
