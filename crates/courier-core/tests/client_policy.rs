//! Transport policy tests: cancellation, timeouts, cookie jars, proxies and compression

mod test_support;

use std::sync::Arc;
use std::time::{Duration, Instant};

use courier_core::http::context::RequestContext;
use courier_core::{CookieJar, Error, RequestOptions};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn slow_server(delay: Duration) -> MockServer {
    let server = test_support::start_server().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(delay))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_cancellation_returns_promptly() {
    let server = slow_server(Duration::from_secs(5)).await;
    let token = CancellationToken::new();

    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let err = courier_core::get(
        &test_support::url(&server, "/slow"),
        Some(RequestOptions::new().cancellation(token)),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, Error::Cancelled));
    assert!(err.is_cancelled());
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_context_deadline() {
    let server = slow_server(Duration::from_secs(5)).await;

    let context = RequestContext::new().with_timeout(Duration::from_millis(50));
    let err = courier_core::get(
        &test_support::url(&server, "/slow"),
        Some(RequestOptions::new().context(context)),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, Error::DeadlineExceeded));
    assert!(err.is_timeout());
}

#[tokio::test]
async fn test_request_timeout_is_transport_timeout() {
    let server = slow_server(Duration::from_secs(3)).await;

    let err = courier_core::get(
        &test_support::url(&server, "/slow"),
        Some(RequestOptions::new().request_timeout(Duration::from_millis(100))),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, Error::Transport { .. }));
    assert!(err.is_timeout());
}

#[tokio::test]
async fn test_cookie_jar_carries_session() {
    let server = test_support::start_server().await;
    Mock::given(path("/login"))
        .respond_with(ResponseTemplate::new(200).insert_header("Set-Cookie", "sid=abc; Path=/"))
        .mount(&server)
        .await;
    Mock::given(path("/me"))
        .and(header("cookie", "sid=abc"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let jar = Arc::new(CookieJar::new());
    courier_core::post(
        &test_support::url(&server, "/login"),
        Some(RequestOptions::new().cookie_jar(jar.clone())),
    )
    .await
    .unwrap();

    let response = courier_core::get(
        &test_support::url(&server, "/me"),
        Some(RequestOptions::new().cookie_jar(jar)),
    )
    .await
    .unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_proxy_map_routes_requests() {
    let proxy = test_support::start_server().await;
    Mock::given(method("GET"))
        .and(path("/through-proxy"))
        .respond_with(ResponseTemplate::new(200).set_body_string("proxied"))
        .expect(1)
        .mount(&proxy)
        .await;

    let options = RequestOptions::new().proxy("http", proxy.uri().parse().unwrap());
    let response = courier_core::get("http://upstream.invalid/through-proxy", Some(options))
        .await
        .unwrap();
    assert_eq!(response.text().await.unwrap(), "proxied");
}

#[tokio::test]
async fn test_disable_compression() {
    let server = test_support::start_server().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    courier_core::get(&test_support::url(&server, "/plain"), None)
        .await
        .unwrap();
    courier_core::get(
        &test_support::url(&server, "/raw"),
        Some(RequestOptions::new().disable_compression()),
    )
    .await
    .unwrap();

    let plain = test_support::requests_to(&server, "/plain").await;
    let raw = test_support::requests_to(&server, "/raw").await;
    assert!(test_support::header(&plain[0], "accept-encoding").is_some());
    assert!(test_support::header(&raw[0], "accept-encoding").is_none());
}

#[tokio::test]
async fn test_caller_client_used_verbatim() {
    let server = test_support::start_server().await;
    Mock::given(header("x-client", "custom"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert("x-client", "custom".parse().unwrap());
    let client = reqwest::Client::builder().default_headers(headers).build().unwrap();

    let options = RequestOptions::new()
        .http_client(client)
        .disable_compression()
        .request_timeout(Duration::from_millis(1));
    let response = courier_core::get(&test_support::url(&server, "/"), Some(options))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}
