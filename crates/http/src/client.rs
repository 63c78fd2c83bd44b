//! Failover-aware HTTP client.
//!
//! Wraps a `reqwest` client with the retry pipeline: a request is buffered
//! once, then replayed (identical method, headers and body bytes) against
//! rotating endpoints until a response is accepted or the pipeline gives
//! up. Only the target authority changes between attempts; path and query
//! are preserved.

use std::time::Duration;

use backstop_resilience::{
    ConfigError, EndpointRotator, Failure, Outcome, RetryError, RetryExecutor, RetryOptions,
    RetryProfile,
};
use reqwest::header::HeaderMap;
use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response};
use tracing::debug;
use url::Url;

use crate::classify::classify;
use crate::error::HttpError;

/// Timeout applied to each individual HTTP attempt when none is
/// configured.
const DEFAULT_CLIENT_TIMEOUT: Duration = Duration::from_secs(300);

/// HTTP client with retry, circuit breaking and endpoint failover built in.
#[derive(Debug, Clone)]
pub struct FailoverClient {
    client: ReqwestClient,
    executor: RetryExecutor,
    preferred: Url,
}

impl FailoverClient {
    /// Start building a new client.
    pub fn builder() -> FailoverClientBuilder {
        FailoverClientBuilder::default()
    }

    /// The endpoint targeted by the first attempt of every call.
    pub fn preferred(&self) -> &Url {
        &self.preferred
    }

    /// The executor driving this client's attempt loops; exposes the
    /// breaker state for observability.
    pub fn executor(&self) -> &RetryExecutor {
        &self.executor
    }

    /// Create a request builder against the preferred endpoint.
    ///
    /// `path` is resolved relative to the preferred base URL and may carry
    /// a query string.
    pub fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, HttpError> {
        let url = self.preferred.join(path).map_err(|err| {
            HttpError::Config(ConfigError::InvalidEndpoint {
                url: path.to_string(),
                reason: err.to_string(),
            })
        })?;
        Ok(self.client.request(method, url))
    }

    /// Execute the request with retry and failover semantics.
    ///
    /// The request is assumed idempotent: it may be executed several times
    /// with identical bytes. It must also be replayable: streaming bodies
    /// cannot be cloned and are rejected up front with
    /// [`HttpError::NonReplayableBody`].
    /// Responses whose status is in the accepted set come back as-is,
    /// 4xx/5xx included; every other status and any transport error counts
    /// as a failed attempt.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response, HttpError> {
        let probe = builder.try_clone().ok_or(HttpError::NonReplayableBody)?;
        let request = probe.build().map_err(HttpError::InvalidRequest)?;
        let original = request.url().clone();

        let response = self
            .executor
            .execute(&original, |target, attempt| {
                let client = self.client.clone();
                let replay = builder.try_clone();
                async move {
                    let Some(replay) = replay else {
                        return Outcome::Rejected(Failure::transport(
                            "request body cannot be cloned for replay",
                        ));
                    };
                    let request = match replay.build() {
                        Ok(mut request) => {
                            *request.url_mut() = target.clone();
                            request
                        }
                        Err(err) => {
                            return Outcome::Rejected(Failure::transport(format!(
                                "request could not be built: {err}"
                            )));
                        }
                    };
                    debug!(attempt, method = %request.method(), url = %request.url(), "sending HTTP request");
                    let result = client.execute(request).await;
                    if let Ok(response) = &result {
                        debug!(attempt, status = %response.status(), url = %target, "received HTTP response");
                    }
                    classify(result, &target)
                }
            })
            .await?;
        Ok(response)
    }

    /// Like [`FailoverClient::send`], but when the pipeline gives up with
    /// exhausted retries or an open circuit, hand the terminal
    /// [`RetryError`] to `fallback` and return its response instead.
    pub async fn send_with_fallback<F>(
        &self,
        builder: RequestBuilder,
        fallback: F,
    ) -> Result<Response, HttpError>
    where
        F: FnOnce(RetryError) -> Response,
    {
        match self.send(builder).await {
            Err(HttpError::Retry(err)) => {
                debug!(error = %err, "serving fallback response");
                Ok(fallback(err))
            }
            other => other,
        }
    }
}

/// Builder for [`FailoverClient`].
#[derive(Debug)]
pub struct FailoverClientBuilder {
    timeout: Duration,
    user_agent: Option<String>,
    default_headers: Option<HeaderMap>,
    endpoints: Vec<String>,
    preferred_endpoint: Option<String>,
    profile: Option<RetryProfile>,
}

impl Default for FailoverClientBuilder {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_CLIENT_TIMEOUT,
            user_agent: None,
            default_headers: None,
            endpoints: Vec::new(),
            preferred_endpoint: None,
            profile: None,
        }
    }
}

impl FailoverClientBuilder {
    /// Per-attempt timeout for the underlying client. Defaults to five
    /// minutes.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// User agent for every request.
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Headers attached to every request.
    pub fn default_headers(mut self, headers: HeaderMap) -> Self {
        self.default_headers = Some(headers);
        self
    }

    /// The ordered set of equivalent base endpoints to rotate through.
    pub fn endpoints<I, S>(mut self, endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.endpoints = endpoints.into_iter().map(Into::into).collect();
        self
    }

    /// Add one endpoint to the rotation set.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoints.push(endpoint.into());
        self
    }

    /// The endpoint targeted by the first attempt of every call. Defaults
    /// to the head of the endpoint list.
    pub fn preferred_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.preferred_endpoint = Some(endpoint.into());
        self
    }

    /// The retry profile to decide with. Defaults to the ten-attempt bound
    /// with no backoff and no breaker.
    pub fn profile(mut self, profile: RetryProfile) -> Self {
        self.profile = Some(profile);
        self
    }

    /// Apply loaded [`RetryOptions`]: endpoints, preferred endpoint and the
    /// retry profile. Fails eagerly on invalid option combinations.
    pub fn options(mut self, options: &RetryOptions) -> Result<Self, HttpError> {
        self.endpoints = options.endpoints.clone();
        self.preferred_endpoint = options.preferred_endpoint.clone();
        self.profile = Some(options.to_profile()?);
        Ok(self)
    }

    /// Validate the configuration and build the client.
    pub fn build(self) -> Result<FailoverClient, HttpError> {
        let profile = match self.profile {
            Some(profile) => profile,
            None => RetryProfile::builder().build()?,
        };
        let rotator = EndpointRotator::from_strs(&self.endpoints)?;
        let preferred = match &self.preferred_endpoint {
            Some(raw) => Url::parse(raw).map_err(|err| ConfigError::InvalidEndpoint {
                url: raw.clone(),
                reason: err.to_string(),
            })?,
            None => rotator.head().clone(),
        };

        let mut client_builder = ReqwestClient::builder().timeout(self.timeout).no_proxy();
        if let Some(agent) = self.user_agent {
            client_builder = client_builder.user_agent(agent);
        }
        if let Some(headers) = self.default_headers {
            client_builder = client_builder.default_headers(headers);
        }
        let client = client_builder.build().map_err(HttpError::Build)?;

        Ok(FailoverClient { client, executor: RetryExecutor::new(profile, rotator), preferred })
    }
}
