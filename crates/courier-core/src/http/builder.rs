//! Request mutation
//!
//! Applies headers, identity, auth and cookies from [`RequestOptions`] onto
//! an already-built [`reqwest::Request`].

use reqwest::header::{HeaderName, HeaderValue, AUTHORIZATION, HOST, USER_AGENT};
use reqwest::{Method, Request};

use crate::config::Defaults;
use crate::http::cookie::add_cookie;
use crate::http::options::RequestOptions;
use crate::{Error, Result};

const X_REQUESTED_WITH: &str = "x-requested-with";

/// Parse an HTTP verb, case-insensitively
pub fn parse_method(method: &str) -> Result<Method> {
    Method::from_bytes(method.trim().to_uppercase().as_bytes()).map_err(|_| Error::InvalidMethod {
        method: method.to_string(),
    })
}

/// Apply every header-level option to `request`
///
/// Caller headers go first so the identity headers below can override them.
/// A caller `Content-Type` replaces the one set by the body encoder.
pub fn apply_headers(request: &mut Request, options: &RequestOptions, defaults: &Defaults) -> Result<()> {
    let headers = request.headers_mut();

    for (name, value) in &options.headers {
        headers.insert(header_name(name)?, header_value(name, value)?);
    }

    let user_agent = options
        .user_agent
        .as_deref()
        .filter(|agent| !agent.is_empty())
        .unwrap_or(&defaults.user_agent);
    headers.insert(USER_AGENT, header_value(USER_AGENT.as_str(), user_agent)?);

    if let Some(host) = options.host.as_deref().filter(|host| !host.is_empty()) {
        headers.insert(HOST, header_value(HOST.as_str(), host)?);
    }

    if let Some(auth) = &options.auth {
        headers.insert(AUTHORIZATION, auth.header_value()?);
    }

    if options.is_ajax {
        headers.insert(
            HeaderName::from_static(X_REQUESTED_WITH),
            HeaderValue::from_static("XMLHttpRequest"),
        );
    }

    for cookie in &options.cookies {
        add_cookie(headers, cookie)?;
    }

    Ok(())
}

fn header_name(name: &str) -> Result<HeaderName> {
    HeaderName::from_bytes(name.as_bytes()).map_err(|e| Error::InvalidHeader {
        name: name.to_string(),
        message: e.to_string(),
    })
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| Error::InvalidHeader {
        name: name.to_string(),
        message: e.to_string(),
    })
}
