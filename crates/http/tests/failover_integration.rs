//! Integration tests for the failover client against mock HTTP servers.
//!
//! Covers the accepted-status contract, retry on unexpected statuses,
//! endpoint rotation order, request replay fidelity, circuit breaking
//! across calls, backoff timing and the fallback path.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use backstop_http::{FailoverClient, FailureKind, HttpError, RetryError, RetryProfile};
use reqwest::{Method, StatusCode};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_env_filter("backstop_http=debug").try_init();
}

async fn server_answering(status: u16) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(status))
        .mount(&server)
        .await;
    server
}

fn client_for(endpoints: &[&MockServer], profile: RetryProfile) -> FailoverClient {
    FailoverClient::builder()
        .timeout(Duration::from_secs(5))
        .endpoints(endpoints.iter().map(|s| s.uri()))
        .profile(profile)
        .build()
        .expect("valid client")
}

fn attempts(n: u32) -> RetryProfile {
    RetryProfile::builder().max_attempts(n).build().expect("valid profile")
}

/// A 404 is a handled application answer: returned as-is, never retried.
#[tokio::test]
async fn accepted_status_is_returned_without_retry() {
    let server = server_answering(404).await;
    let client = client_for(&[&server], attempts(5));

    let request = client.request(Method::GET, "missing/item").expect("request");
    let response = client.send(request).await.expect("response");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let requests = server.received_requests().await.unwrap_or_default();
    assert_eq!(requests.len(), 1);
}

/// A 503 falls outside the accepted set and is retried until the attempt
/// bound is exhausted.
#[tokio::test]
async fn unexpected_status_is_retried_until_exhaustion() {
    let server = server_answering(503).await;
    let client = client_for(&[&server], attempts(3));

    let request = client.request(Method::GET, "api/verify").expect("request");
    let result = client.send(request).await;

    match result {
        Err(HttpError::Retry(RetryError::Exhausted { attempts, last })) => {
            assert_eq!(attempts, 3);
            assert_eq!(last.kind, FailureKind::UnexpectedStatus(503));
        }
        other => panic!("expected exhaustion, got {other:?}"),
    }
    let requests = server.received_requests().await.unwrap_or_default();
    assert_eq!(requests.len(), 3);
}

/// When the preferred endpoint is down, the next attempt reaches the
/// first alternate and its response ends the loop.
#[tokio::test]
async fn failover_reaches_the_healthy_endpoint() {
    init_tracing();
    let sick = server_answering(503).await;
    let healthy = server_answering(200).await;
    let client = client_for(&[&sick, &healthy], attempts(5));

    let request = client.request(Method::GET, "api/verify").expect("request");
    let response = client.send(request).await.expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(sick.received_requests().await.unwrap_or_default().len(), 1);
    assert_eq!(healthy.received_requests().await.unwrap_or_default().len(), 1);
}

/// With three endpoints all failing, five attempts walk the set in order
/// and wrap: head, then its successors, then around again.
#[tokio::test]
async fn rotation_wraps_across_the_endpoint_set() {
    let a = server_answering(503).await;
    let b = server_answering(503).await;
    let c = server_answering(503).await;
    let client = client_for(&[&a, &b, &c], attempts(5));

    let request = client.request(Method::GET, "api/verify").expect("request");
    let result = client.send(request).await;

    assert!(matches!(result, Err(HttpError::Retry(RetryError::Exhausted { attempts: 5, .. }))));
    assert_eq!(a.received_requests().await.unwrap_or_default().len(), 2);
    assert_eq!(b.received_requests().await.unwrap_or_default().len(), 2);
    assert_eq!(c.received_requests().await.unwrap_or_default().len(), 1);
}

/// Every replayed attempt carries identical method, headers, body bytes,
/// path and query; only the authority changes.
#[tokio::test]
async fn retries_replay_the_request_identically() {
    let payload = serde_json::json!({ "description": "verification request", "size": 42 });

    let sick = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/verify"))
        .and(header("x-request-source", "backstop-test"))
        .and(body_json(&payload))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&sick)
        .await;

    let healthy = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/verify"))
        .and(header("x-request-source", "backstop-test"))
        .and(body_json(&payload))
        .respond_with(ResponseTemplate::new(200).set_body_string("accepted"))
        .expect(1)
        .mount(&healthy)
        .await;

    let client = client_for(&[&sick, &healthy], attempts(3));
    let request = client
        .request(Method::POST, "api/verify?channel=batch")
        .expect("request")
        .header("x-request-source", "backstop-test")
        .json(&payload);

    let response = client.send(request).await.expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let replayed = healthy.received_requests().await.unwrap_or_default();
    assert_eq!(replayed.len(), 1);
    assert_eq!(replayed[0].url.query(), Some("channel=batch"));
}

/// Once a call exhausts the pipeline the breaker opens: the next call is
/// rejected up front and no request reaches the wire.
#[tokio::test]
async fn circuit_breaker_fast_fails_subsequent_calls() {
    init_tracing();
    let server = server_answering(503).await;
    let profile = RetryProfile::builder()
        .max_attempts(2)
        .circuit_breaker(Duration::from_secs(60), Duration::from_secs(60))
        .build()
        .expect("valid profile");
    let client = client_for(&[&server], profile);

    let request = client.request(Method::GET, "api/verify").expect("request");
    let result = client.send(request).await;
    assert!(matches!(result, Err(HttpError::Retry(RetryError::Exhausted { .. }))));
    assert_eq!(server.received_requests().await.unwrap_or_default().len(), 2);

    let request = client.request(Method::GET, "api/verify").expect("request");
    let result = client.send(request).await;
    assert!(matches!(result, Err(HttpError::Retry(RetryError::CircuitOpen))));
    assert_eq!(server.received_requests().await.unwrap_or_default().len(), 2);
}

/// Transport-level failures (connection refused) are classified as
/// retryable and reported as transport failures once exhausted.
#[tokio::test]
async fn connection_refused_counts_as_transport_failure() {
    // Bind then drop a listener so the port refuses connections.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);

    let client = FailoverClient::builder()
        .timeout(Duration::from_secs(2))
        .endpoint(format!("http://{addr}/"))
        .profile(attempts(2))
        .build()
        .expect("valid client");

    let request = client.request(Method::GET, "api/verify").expect("request");
    let result = client.send(request).await;

    match result {
        Err(HttpError::Retry(RetryError::Exhausted { attempts, last })) => {
            assert_eq!(attempts, 2);
            assert_eq!(last.kind, FailureKind::Transport);
        }
        other => panic!("expected transport exhaustion, got {other:?}"),
    }
}

/// Two 50ms inter-attempt waits put at least 100ms on the wall clock.
#[tokio::test]
async fn backoff_spreads_attempts_over_time() {
    let server = server_answering(503).await;
    let profile = RetryProfile::builder()
        .max_attempts(3)
        .backoff_period(Duration::from_millis(50))
        .build()
        .expect("valid profile");
    let client = client_for(&[&server], profile);

    let started = Instant::now();
    let request = client.request(Method::GET, "api/verify").expect("request");
    let result = client.send(request).await;

    assert!(result.is_err());
    assert!(started.elapsed() >= Duration::from_millis(100));
}

/// The fallback response replaces the terminal error when the pipeline
/// gives up.
#[tokio::test]
async fn fallback_response_is_served_on_exhaustion() {
    let server = server_answering(503).await;
    let client = client_for(&[&server], attempts(2));
    let fallback_invocations = Arc::new(AtomicUsize::new(0));
    let invocations = Arc::clone(&fallback_invocations);

    let request = client.request(Method::GET, "api/verify").expect("request");
    let response = client
        .send_with_fallback(request, move |err| {
            invocations.fetch_add(1, Ordering::SeqCst);
            assert!(matches!(err, RetryError::Exhausted { .. }));
            http::Response::new("served from cache").into()
        })
        .await
        .expect("fallback response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(fallback_invocations.load(Ordering::SeqCst), 1);
    assert_eq!(response.text().await.expect("body"), "served from cache");
}

/// A preferred endpoint outside the rotation set receives the first
/// attempt; retries move on to the configured alternates.
#[tokio::test]
async fn preferred_endpoint_receives_the_first_attempt() {
    let preferred = server_answering(503).await;
    let alternate = server_answering(200).await;

    let client = FailoverClient::builder()
        .timeout(Duration::from_secs(5))
        .preferred_endpoint(preferred.uri())
        .endpoint(alternate.uri())
        .profile(attempts(3))
        .build()
        .expect("valid client");

    let request = client.request(Method::GET, "api/verify").expect("request");
    let response = client.send(request).await.expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(preferred.received_requests().await.unwrap_or_default().len(), 1);
    assert_eq!(alternate.received_requests().await.unwrap_or_default().len(), 1);
}
