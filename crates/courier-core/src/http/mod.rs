//! HTTP request pipeline
//!
//! This module turns declarative request options into a sent request:
//! - Client selection and construction (TLS, proxies, timeouts, cookie jars)
//! - Query merging and body encoding (JSON, XML, multipart, forms)
//! - Header mutation (identity, auth, cookies)
//! - Redirect following with sensitive header stripping
//! - Cancellation, deadlines and a pre-send hook

pub mod auth;
pub mod body;
pub mod builder;
pub mod client;
pub mod context;
pub mod cookie;
pub mod dispatch;
pub mod hook;
pub mod multipart;
pub mod options;
pub mod proxy;
pub mod query;
pub mod redirect;
pub mod timeout;
pub mod tls;

pub use auth::BasicAuth;
pub use body::{encode_body, EncodedBody};
pub use client::{build_http_client, default_client, needs_custom_client, session_client_builder};
pub use context::RequestContext;
pub use self::cookie::CookieJar;
pub use dispatch::{
    delete, do_request, do_session_request, get, head, options, patch, post, prepare, put, PreparedRequest,
};
pub use hook::BeforeRequest;
pub use multipart::MultipartWriter;
pub use options::{Body, BodyKind, Encodable, FileUpload, Payload, RequestOptions};
pub use proxy::ProxyMap;
pub use redirect::RedirectPolicy;
pub use timeout::TimeoutConfig;
pub use tls::{TlsConfig, TlsVersion};

// Re-export commonly used types
pub use reqwest::{Client, Method, Response, StatusCode};
