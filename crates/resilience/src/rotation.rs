//! Endpoint failover rotation.
//!
//! An ordered, circularly consumed list of equivalent base endpoints with a
//! cursor shared by every call in flight. The head of the list is where a
//! call's first attempt goes, so rotation starts at its successor and wraps
//! around the whole list.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use url::Url;

use crate::error::ConfigError;

/// Ordered set of equivalent base endpoints with a shared rotation cursor.
///
/// The list is fixed for the life of the rotator and never empty. Clones
/// share one cursor, so concurrent calls spread across the alternates
/// instead of all failing over to the same one.
#[derive(Debug, Clone)]
pub struct EndpointRotator {
    shared: Arc<RotatorShared>,
}

#[derive(Debug)]
struct RotatorShared {
    endpoints: Vec<Url>,
    cursor: AtomicUsize,
}

impl EndpointRotator {
    /// Build a rotator over the given base endpoints.
    ///
    /// The head of the list doubles as the default initial target, so the
    /// cursor starts at the second entry: the first failover goes to the
    /// head's successor, wrapping around the list. An empty list is a
    /// configuration error.
    pub fn new(endpoints: Vec<Url>) -> Result<Self, ConfigError> {
        if endpoints.is_empty() {
            return Err(ConfigError::EmptyEndpoints);
        }
        let start = 1 % endpoints.len();
        Ok(Self {
            shared: Arc::new(RotatorShared { endpoints, cursor: AtomicUsize::new(start) }),
        })
    }

    /// Parse and validate a list of endpoint strings.
    pub fn from_strs<I, S>(endpoints: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let parsed = endpoints
            .into_iter()
            .map(|raw| {
                Url::parse(raw.as_ref()).map_err(|err| ConfigError::InvalidEndpoint {
                    url: raw.as_ref().to_string(),
                    reason: err.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(parsed)
    }

    /// Hand out the next endpoint in rotation.
    ///
    /// The cursor is read and advanced in a single atomic step, so no two
    /// concurrent callers compute the same index from a stale read. The
    /// cursor grows monotonically and is taken modulo the list length.
    pub fn next_endpoint(&self) -> &Url {
        let cursor = self.shared.cursor.fetch_add(1, Ordering::Relaxed);
        let index = cursor % self.shared.endpoints.len();
        &self.shared.endpoints[index]
    }

    /// The head of the endpoint list, used as the default initial target.
    pub fn head(&self) -> &Url {
        &self.shared.endpoints[0]
    }

    /// Number of configured endpoints.
    pub fn len(&self) -> usize {
        self.shared.endpoints.len()
    }

    /// Always false: an empty rotator cannot be constructed.
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Substitute `base`'s scheme and authority into `original`, preserving the
/// original path and query string unchanged.
///
/// Method, headers and body bytes are the transport layer's to preserve:
/// this only rewrites where the request goes.
pub fn rebase(base: &Url, original: &Url) -> Url {
    let mut target = base.clone();
    target.set_path(original.path());
    target.set_query(original.query());
    target
}
