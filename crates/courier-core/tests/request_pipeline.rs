//! End-to-end tests for request construction against a mock server

mod test_support;

use std::collections::HashMap;

use cookie::Cookie;
use courier_core::config::DEFAULT_USER_AGENT;
use courier_core::http::dispatch;
use courier_core::{Defaults, Error, RequestOptions};
use reqwest::Request;
use serde::Serialize;
use serde_json::json;
use wiremock::matchers::{body_json, body_string, header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

#[derive(Serialize)]
struct Item {
    name: String,
    qty: u32,
}

fn widget() -> Item {
    Item {
        name: "widget".to_string(),
        qty: 3,
    }
}

#[tokio::test]
async fn test_json_body() {
    let server = test_support::start_server().await;
    Mock::given(method("POST"))
        .and(path("/items"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({"name": "widget", "qty": 3})))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let response = courier_core::post(
        &test_support::url(&server, "/items"),
        Some(RequestOptions::new().json_value(widget())),
    )
    .await
    .unwrap();
    assert_eq!(response.status(), 201);
}

#[tokio::test]
async fn test_xml_body() {
    let server = test_support::start_server().await;
    Mock::given(method("PUT"))
        .and(path("/items/1"))
        .and(header("content-type", "application/xml"))
        .and(body_string("<Item><name>widget</name><qty>3</qty></Item>"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let response = courier_core::put(
        &test_support::url(&server, "/items/1"),
        Some(RequestOptions::new().xml_value(widget())),
    )
    .await
    .unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_form_body() {
    let server = test_support::start_server().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string("password=p%26ss&user=two+words"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let data = HashMap::from([
        ("user".to_string(), "two words".to_string()),
        ("password".to_string(), "p&ss".to_string()),
    ]);
    let response = courier_core::post(
        &test_support::url(&server, "/login"),
        Some(RequestOptions::new().data(data)),
    )
    .await
    .unwrap();
    assert_eq!(response.status(), 204);
}

#[tokio::test]
async fn test_identity_headers_and_cookies() {
    let server = test_support::start_server().await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .and(header("user-agent", "agent/1.0"))
        .and(header("x-requested-with", "XMLHttpRequest"))
        .and(header("authorization", "Basic YW5uOnNlY3JldA=="))
        .and(header("cookie", "sid=1; theme=dark"))
        .and(header("x-trace", "abc"))
        .respond_with(ResponseTemplate::new(200).set_body_string("hello ann"))
        .expect(1)
        .mount(&server)
        .await;

    let options = RequestOptions::new()
        .header("X-Trace", "abc")
        .user_agent("agent/1.0")
        .ajax()
        .basic_auth("ann", "secret")
        .cookie(Cookie::new("sid", "1"))
        .cookie(Cookie::new("theme", "dark"));

    let response = courier_core::get(&test_support::url(&server, "/me"), Some(options))
        .await
        .unwrap();
    assert_eq!(response.text().await.unwrap(), "hello ann");
}

#[tokio::test]
async fn test_default_user_agent_and_host_override() {
    let server = test_support::start_server().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    courier_core::get(&test_support::url(&server, "/"), None).await.unwrap();
    courier_core::get(
        &test_support::url(&server, "/"),
        Some(RequestOptions::new().host("virtual.example")),
    )
    .await
    .unwrap();

    let received = test_support::requests_to(&server, "/").await;
    assert_eq!(received.len(), 2);
    assert_eq!(
        test_support::header(&received[0], "user-agent").as_deref(),
        Some(DEFAULT_USER_AGENT)
    );
    assert_eq!(
        test_support::header(&received[1], "host").as_deref(),
        Some("virtual.example")
    );
}

#[tokio::test]
async fn test_params_overwrite_url_query() {
    let server = test_support::start_server().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("a", "1"))
        .and(query_param("b", "2"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    courier_core::get(
        &test_support::url(&server, "/search?a=0&b=2"),
        Some(RequestOptions::new().param("a", "1")),
    )
    .await
    .unwrap();

    let received = test_support::requests_to(&server, "/search").await;
    assert_eq!(received[0].url.query(), Some("a=1&b=2"));
}

#[tokio::test]
async fn test_hook_rejection_sends_nothing() {
    let server = test_support::start_server().await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let options = RequestOptions::new()
        .before_request(|_: &mut Request| -> anyhow::Result<()> { anyhow::bail!("deletes are disabled") });
    let err = courier_core::delete(&test_support::url(&server, "/items/1"), Some(options))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Hook(_)));
    assert!(err.is_construction());
    assert_eq!(err.to_string(), "deletes are disabled");
}

#[tokio::test]
async fn test_hook_can_sign_request() {
    let server = test_support::start_server().await;
    Mock::given(method("GET"))
        .and(header("x-signature", "GET /signed"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let options = RequestOptions::new().before_request(|request: &mut Request| -> anyhow::Result<()> {
        let signature = format!("{} {}", request.method(), request.url().path());
        request.headers_mut().insert("x-signature", signature.parse()?);
        Ok(())
    });
    let response = courier_core::get(&test_support::url(&server, "/signed"), Some(options))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_session_request_and_explicit_defaults() {
    let server = test_support::start_server().await;
    Mock::given(method("PATCH"))
        .and(header("user-agent", "fleet/2"))
        .and(header("x-client", "session"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut default_headers = reqwest::header::HeaderMap::new();
    default_headers.insert("x-client", "session".parse().unwrap());
    let session = reqwest::Client::builder()
        .default_headers(default_headers)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    let defaults = Defaults::default().with_user_agent("fleet/2");
    let response = defaults
        .session_request(
            "patch",
            &test_support::url(&server, "/things"),
            Some(RequestOptions::new().json("{}")),
            &session,
        )
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_transport_error_is_not_construction() {
    // Nothing listens on a freshly released port.
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();

    let err = dispatch::do_request("GET", &format!("http://127.0.0.1:{}/", port), None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Transport { .. }));
    assert!(!err.is_construction());
    assert!(err.is_connect());
}
