//! Integration tests for `MobileClient::fetch_mobile`.
//!
//! Uses `wiremock` to stand up a local HTTP server for each test so no
//! real network traffic is made.

use std::time::{Duration, Instant};

use mobprice_core::app_config::DEFAULT_MOBILE_USER_AGENT;
use mobprice_scraper::{MobileClient, ScraperError};
use wiremock::matchers::{headers, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(timeout: Duration) -> MobileClient {
    MobileClient::new(DEFAULT_MOBILE_USER_AGENT, timeout).expect("failed to build test MobileClient")
}

#[tokio::test]
async fn fetch_mobile_sends_mobile_identity_and_returns_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/searchresults.html"))
        .and(query_param("ss", "Haifa"))
        // wiremock's header matcher splits request values on `,`, so
        // comma-containing values are given in split form.
        .and(headers(
            "user-agent",
            DEFAULT_MOBILE_USER_AGENT.split(',').map(str::trim).collect(),
        ))
        .and(headers("accept-language", vec!["en-US", "en;q=0.9"]))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>mobile</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(Duration::from_secs(5));
    let url = format!("{}/searchresults.html?ss=Haifa", server.uri());
    let body = client.fetch_mobile(&url).await;

    assert!(body.is_ok(), "expected Ok, got: {body:?}");
    assert_eq!(body.unwrap(), "<html>mobile</html>");
}

#[tokio::test]
async fn fetch_mobile_maps_non_success_status_to_http_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = test_client(Duration::from_secs(5));
    let url = format!("{}/hotel/il/a.html", server.uri());
    let err = client.fetch_mobile(&url).await.unwrap_err();

    assert!(
        matches!(
            err,
            ScraperError::Http { status: 503, ref status_text, .. } if status_text == "Service Unavailable"
        ),
        "expected Http(503), got: {err:?}"
    );
}

#[tokio::test]
async fn fetch_mobile_does_not_retry() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(Duration::from_secs(5));
    let url = format!("{}/searchresults.html", server.uri());
    let result = client.fetch_mobile(&url).await;
    assert!(matches!(result, Err(ScraperError::Http { status: 500, .. })));
}

#[tokio::test]
async fn fetch_mobile_times_out_on_stalled_response() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("too late")
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let client = test_client(Duration::from_millis(200));
    let url = format!("{}/searchresults.html", server.uri());
    let started = Instant::now();
    let err = client.fetch_mobile(&url).await.unwrap_err();

    assert!(
        matches!(err, ScraperError::Timeout { timeout_ms: 200, .. }),
        "expected Timeout, got: {err:?}"
    );
    assert!(
        started.elapsed() < Duration::from_secs(3),
        "timeout should fire near the configured bound, took {:?}",
        started.elapsed()
    );
}

#[tokio::test]
async fn fetch_mobile_reports_transport_failure_as_network_error() {
    // Bind then drop a listener so the port is (almost certainly) closed.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let client = test_client(Duration::from_secs(5));
    let err = client
        .fetch_mobile(&format!("http://127.0.0.1:{port}/searchresults.html"))
        .await
        .unwrap_err();

    assert!(
        matches!(err, ScraperError::Network(_)),
        "expected Network, got: {err:?}"
    );
}

#[tokio::test]
async fn fetch_mobile_rejects_invalid_url_without_network() {
    let client = test_client(Duration::from_secs(5));
    let err = client.fetch_mobile("not a url").await.unwrap_err();
    assert!(matches!(err, ScraperError::InvalidUrl { .. }));
}
