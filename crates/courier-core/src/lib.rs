//! Courier Core - declarative HTTP requests on top of reqwest
//!
//! A call is described by a verb, a URL and an optional
//! [`RequestOptions`]. The crate picks (or builds) a client, merges query
//! values into the URL, encodes the body, applies headers, auth and cookies,
//! runs the caller's pre-send hook and sends the request with its own
//! redirect policy.
//!
//! # Main Components
//!
//! - **Options**: [`RequestOptions`] with builder methods for every knob
//! - **Client Builder**: shared client by default, dedicated client on demand
//! - **Body Encoder**: raw, JSON, XML, multipart/single-file upload, form
//! - **Redirect Policy**: limit, opt-out and cross-origin header stripping
//! - **Error Handling**: [`Error`] separates construction from transport errors
//!
//! # Example
//!
//! ```no_run
//! use courier_core::{RequestOptions, Result};
//!
//! async fn example() -> Result<()> {
//!     let options = RequestOptions::new()
//!         .param("q", "rust")
//!         .basic_auth("ann", "secret");
//!     let response = courier_core::get("https://example.com/search", Some(options)).await?;
//!     println!("{}", response.status());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod http;

// Re-export main types for convenience
pub use config::Defaults;
pub use error::{Error, Result};
pub use http::{
    delete, do_request, do_session_request, get, head, options, patch, post, put, BasicAuth, Body,
    CookieJar, FileUpload, Payload, RequestContext, RequestOptions, TimeoutConfig, TlsConfig,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
