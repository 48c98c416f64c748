//! Shared test support utilities for integration tests

#![allow(dead_code)]

use std::sync::Once;

use wiremock::MockServer;

static TRACING: Once = Once::new();

/// Install a test subscriber honouring `RUST_LOG`
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Start a mock server with tracing enabled
pub async fn start_server() -> MockServer {
    init_tracing();
    MockServer::start().await
}

/// Absolute URL for `path` on `server`
pub fn url(server: &MockServer, path: &str) -> String {
    format!("{}{}", server.uri(), path)
}

/// Every request the server received for `path`
pub async fn requests_to(server: &MockServer, path: &str) -> Vec<wiremock::Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|request| request.url.path() == path)
        .collect()
}

/// Header value as a string, if present
pub fn header(request: &wiremock::Request, name: &str) -> Option<String> {
    request
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}
