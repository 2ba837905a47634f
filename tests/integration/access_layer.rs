//! Cache, retry and rate limiting as seen through `UpstreamClient`.

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_test::{assert_err, assert_ok};

use sports_skills::http::{FetchError, Request, Scope, UpstreamClient};

use crate::mock_transport::MockTransport;

fn client(mock: &MockTransport) -> UpstreamClient {
    UpstreamClient::with_transport(Arc::new(mock.clone()))
}

#[tokio::test]
async fn test_cache_hit_skips_transport() {
    let mock = MockTransport::new().route("/exchange/status", 200, r#"{"exchange_active":true}"#);
    let client = client(&mock);
    let req = Request::new(Scope::Kalshi, "https://kalshi.test/exchange/status").ttl_secs(30);

    let first = assert_ok!(client.get_json(&req).await);
    let second = assert_ok!(client.get_json(&req).await);
    assert_eq!(first, second);
    assert_eq!(first["exchange_active"], json!(true));
    assert_eq!(mock.count("/exchange/status"), 1);
}

#[tokio::test]
async fn test_params_are_part_of_the_key() {
    let mock = MockTransport::new().route("/markets", 200, r#"{"markets":[]}"#);
    let client = client(&mock);
    for status in ["open", "closed", "open"] {
        let req = Request::new(Scope::Kalshi, "https://kalshi.test/markets")
            .param("status", status)
            .ttl_secs(60);
        assert_ok!(client.get_json(&req).await);
    }
    assert_eq!(
        mock.requests(),
        vec![
            "https://kalshi.test/markets?status=open".to_string(),
            "https://kalshi.test/markets?status=closed".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_not_found_is_attempted_once() {
    let mock = MockTransport::new().route("/missing", 404, "gone");
    let client = client(&mock);
    let err = assert_err!(
        client
            .get_json(&Request::new(Scope::Kalshi, "https://kalshi.test/missing"))
            .await
    );
    assert_eq!(err.status(), Some(404));
    assert_eq!(mock.count("/missing"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_server_error_retried_until_exhausted() {
    let mock = MockTransport::new().route("/flaky", 500, "boom");
    let client = client(&mock);
    let err = assert_err!(
        client
            .get_json(&Request::new(Scope::Kalshi, "https://kalshi.test/flaky"))
            .await
    );
    assert_eq!(err.status(), Some(500));
    assert_eq!(mock.count("/flaky"), client.retry_policy().max_attempts as usize);
}

#[tokio::test(start_paused = true)]
async fn test_connection_errors_are_retried() {
    let mock = MockTransport::new();
    mock.set_error(FetchError::Connection("reset by peer".into()));
    let client = client(&mock);
    let err = assert_err!(
        client
            .get_json(&Request::new(Scope::News, "https://feeds.test/rss"))
            .await
    );
    assert!(matches!(err, FetchError::Connection(_)));
    assert_eq!(mock.requests().len(), 3);
}

#[tokio::test]
async fn test_invalid_json_is_final() {
    let mock = MockTransport::new().route("/html", 200, "<html>maintenance</html>");
    let client = client(&mock);
    let err = assert_err!(
        client
            .get_json(&Request::new(Scope::PolymarketGamma, "https://gamma.test/html"))
            .await
    );
    assert!(matches!(err, FetchError::Decode { .. }));
    assert_eq!(mock.count("/html"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_empty_bucket_delays_instead_of_failing() {
    let mock = MockTransport::new().route("espn.test", 200, "{}");
    let client = client(&mock);
    let started = Instant::now();
    for i in 0..3 {
        let req = Request::new(Scope::Espn, format!("https://site.espn.test/scoreboard/{i}"));
        assert_ok!(client.get_json(&req).await);
    }
    // Two tokens up front, the third after a refill.
    assert!(started.elapsed() >= Duration::from_millis(400));
    assert_eq!(mock.requests().len(), 3);
}
