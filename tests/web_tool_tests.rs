//! Fetch-path tests for the web tools, over a local wiremock server.
//!
//! Each test uses its own server (and therefore its own URL), so the
//! process-wide fetch cache never bleeds between tests.

use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use dossier::tools::web::web_fetch;

const TIMEOUT: Duration = Duration::from_secs(2);

#[tokio::test]
async fn fetch_strips_markup_down_to_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<html><head><style>body { color: red; }</style></head>\
             <body><h1>Acme Corp</h1><p>Widgets &amp; more</p>\
             <script>trackVisit();</script></body></html>",
        ))
        .mount(&server)
        .await;

    let url = format!("{}/about", server.uri());
    let reply = web_fetch(&url, TIMEOUT).await;

    assert!(reply.starts_with(&format!("Content from {url}:")), "{reply}");
    assert!(reply.contains("Acme Corp"));
    assert!(reply.contains("Widgets & more"));
    assert!(!reply.contains("trackVisit"));
    assert!(!reply.contains("color: red"));
    assert!(!reply.contains("<h1>"));
}

#[tokio::test]
async fn fetch_truncates_long_pages() {
    let server = MockServer::start().await;
    let body = format!("<html><body>{}</body></html>", "long text ".repeat(2000));
    Mock::given(method("GET"))
        .and(path("/novel"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let reply = web_fetch(&format!("{}/novel", server.uri()), TIMEOUT).await;

    assert!(reply.contains("[Content truncated - showing first 5000 characters]"));
}

#[tokio::test]
async fn fetch_reports_http_errors_as_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let url = format!("{}/gone", server.uri());
    let reply = web_fetch(&url, TIMEOUT).await;

    assert_eq!(reply, format!("Error: HTTP 404 when fetching {url}"));
}

#[tokio::test]
async fn fetch_reports_timeouts_as_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let url = format!("{}/slow", server.uri());
    let reply = web_fetch(&url, Duration::from_millis(200)).await;

    assert_eq!(reply, format!("Error: Request timeout while fetching {url}"));
}

#[tokio::test]
async fn fetch_serves_repeat_requests_from_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cached"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>stable content</p>"))
        .expect(1)
        .mount(&server)
        .await;

    let url = format!("{}/cached", server.uri());
    let first = web_fetch(&url, TIMEOUT).await;
    let second = web_fetch(&url, TIMEOUT).await;

    assert_eq!(first, second);
    assert!(first.contains("stable content"));
    // The mock's expect(1) verifies on drop that only one request landed.
}
