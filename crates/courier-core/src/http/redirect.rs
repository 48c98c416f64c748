//! Redirect policy
//!
//! Clients built by this crate never follow redirects on their own. The loop
//! in [`execute`] follows them instead, so the limit, the opt-out and the
//! header stripping rules are all under our control.
//!
//! - `301`, `302` and `303` re-issue the request without a body; any method
//!   other than `GET` or `HEAD` becomes `GET`.
//! - `307` and `308` re-send the same method and body. A streaming body
//!   cannot be replayed, in which case the redirect response is returned.
//! - Sensitive headers are removed as soon as a hop leaves the origin
//!   (scheme, host and port) of the previous one.
//!
//! A caller-supplied client must be built with `redirect(Policy::none())`
//! (see [`session_client_builder`](crate::http::client::session_client_builder)).
//! A client that follows redirects itself hides them from this loop, so the
//! call fails with [`Error::UnmanagedRedirect`] instead of silently ignoring
//! the policy.

use std::collections::HashSet;
use std::time::Duration;

use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, HOST, LOCATION, REFERER,
    TRANSFER_ENCODING,
};
use reqwest::{Client, Method, Request, Response, StatusCode};
use tokio::time::Instant;
use tracing::{debug, warn};
use url::Url;

use crate::config::{Defaults, DEFAULT_REDIRECT_LIMIT, DEFAULT_SENSITIVE_HEADERS};
use crate::http::options::RequestOptions;
use crate::{Error, Result};

/// How redirects are followed for a single call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectPolicy {
    /// Redirects followed before [`Error::RedirectLimitExceeded`]
    pub limit: usize,
    /// When false the first redirect response is returned as-is
    pub allow: bool,
    /// Headers removed when a hop changes origin
    pub sensitive_headers: HashSet<HeaderName>,
}

impl Default for RedirectPolicy {
    fn default() -> Self {
        Self {
            limit: DEFAULT_REDIRECT_LIMIT,
            allow: true,
            sensitive_headers: DEFAULT_SENSITIVE_HEADERS.iter().cloned().collect(),
        }
    }
}

impl RedirectPolicy {
    /// Resolve the policy for a call, falling back to `defaults`
    pub fn from_options(options: &RequestOptions, defaults: &Defaults) -> Result<Self> {
        let sensitive_headers = match &options.sensitive_headers {
            Some(names) => names.clone(),
            None => defaults.sensitive_header_set()?,
        };

        Ok(Self {
            limit: options.redirect_limit.unwrap_or(defaults.redirect_limit),
            allow: options.allow_redirect,
            sensitive_headers,
        })
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Return redirect responses instead of following them
    pub fn no_follow(mut self) -> Self {
        self.allow = false;
        self
    }
}

/// Send `request`, following redirects according to `policy`
///
/// `budget` bounds the whole call. Each hop is sent with what is left of it,
/// so a slow chain fails with the transport's timeout error.
pub async fn execute(
    client: &Client,
    request: Request,
    policy: &RedirectPolicy,
    budget: Option<Duration>,
) -> Result<Response> {
    let deadline = budget.map(|budget| Instant::now() + budget);
    let mut request = request;
    let mut hops = 0;

    loop {
        if let (Some(deadline), Some(budget)) = (deadline, budget) {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(Error::RequestTimeout { timeout: budget });
            }
            *request.timeout_mut() = Some(remaining);
        }

        let replay = request.try_clone();
        let method = request.method().clone();
        let headers = request.headers().clone();
        let timeout = request.timeout().copied();
        let sent = request.url().clone();

        let response = client.execute(request).await?;
        let status = response.status();

        if !same_target(&sent, response.url()) {
            warn!(requested = %sent, landed = %response.url(), "client followed redirects outside the policy");
            return Err(Error::UnmanagedRedirect {
                url: sent.to_string(),
                landed: response.url().to_string(),
            });
        }

        let Some(location) = location(&response) else {
            return Ok(response);
        };

        if !policy.allow {
            debug!(%status, location, "redirect not followed");
            return Ok(response);
        }

        if hops >= policy.limit {
            return Err(Error::RedirectLimitExceeded {
                limit: policy.limit,
                url: response.url().to_string(),
            });
        }

        let previous = response.url().clone();
        let target = previous
            .join(location)
            .map_err(|e| Error::invalid_url(format!("bad redirect location {:?}", location), e))?;

        let mut next = if status == StatusCode::TEMPORARY_REDIRECT || status == StatusCode::PERMANENT_REDIRECT {
            match replay {
                Some(mut next) => {
                    *next.url_mut() = target;
                    next
                }
                None => {
                    debug!(%status, "request body cannot be replayed, returning redirect response");
                    return Ok(response);
                }
            }
        } else {
            let method = if method == Method::GET || method == Method::HEAD {
                method
            } else {
                Method::GET
            };
            let mut next = Request::new(method, target);
            *next.headers_mut() = without_content_headers(headers);
            *next.timeout_mut() = timeout;
            next
        };

        let next_url = next.url().clone();
        if previous.origin() != next_url.origin() {
            next.headers_mut().remove(HOST);
            for name in &policy.sensitive_headers {
                next.headers_mut().remove(name);
            }
        }
        set_referer(next.headers_mut(), &previous, &next_url);

        hops += 1;
        debug!(hop = hops, %status, from = %previous, to = %next_url, method = %next.method(), "following redirect");
        request = next;
    }
}

/// The transport moves URL credentials into a header and only rewrites the
/// response URL when it followed a redirect itself
fn same_target(sent: &Url, received: &Url) -> bool {
    fn bare(url: &Url) -> Url {
        let mut url = url.clone();
        let _ = url.set_username("");
        let _ = url.set_password(None);
        url.set_fragment(None);
        url
    }
    bare(sent) == bare(received)
}

fn location(response: &Response) -> Option<&str> {
    let redirect = matches!(
        response.status(),
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    );
    if !redirect {
        return None;
    }
    response.headers().get(LOCATION).and_then(|value| value.to_str().ok())
}

fn without_content_headers(mut headers: HeaderMap) -> HeaderMap {
    for name in [CONTENT_TYPE, CONTENT_LENGTH, CONTENT_ENCODING, TRANSFER_ENCODING] {
        headers.remove(name);
    }
    headers
}

/// Referer is the previous URL without credentials or fragment, and is never
/// sent from https to http
fn set_referer(headers: &mut HeaderMap, previous: &Url, next: &Url) {
    headers.remove(REFERER);
    if previous.scheme() == "https" && next.scheme() == "http" {
        return;
    }

    let mut referer = previous.clone();
    let _ = referer.set_username("");
    let _ = referer.set_password(None);
    referer.set_fragment(None);
    if let Ok(value) = HeaderValue::from_str(referer.as_str()) {
        headers.insert(REFERER, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::AUTHORIZATION;

    #[test]
    fn test_default_policy() {
        let policy = RedirectPolicy::default();
        assert_eq!(policy.limit, 30);
        assert!(policy.allow);
        assert!(policy.sensitive_headers.contains(&AUTHORIZATION));
        assert_eq!(policy.sensitive_headers.len(), 4);
    }

    #[test]
    fn test_policy_from_options() {
        let defaults = Defaults::default().with_redirect_limit(5);

        let policy = RedirectPolicy::from_options(&RequestOptions::new(), &defaults).unwrap();
        assert_eq!(policy.limit, 5);
        assert_eq!(policy, RedirectPolicy::default().with_limit(5));

        let options = RequestOptions::new()
            .redirect_limit(2)
            .allow_redirect(false)
            .sensitive_headers([HeaderName::from_static("x-api-key")]);
        let policy = RedirectPolicy::from_options(&options, &defaults).unwrap();
        assert_eq!(policy.limit, 2);
        assert!(!policy.allow);
        assert_eq!(policy.sensitive_headers.len(), 1);
        assert!(!policy.sensitive_headers.contains(&AUTHORIZATION));
    }

    #[test]
    fn test_content_headers_dropped() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("2"));
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer t"));

        let headers = without_content_headers(headers);
        assert!(headers.get(CONTENT_TYPE).is_none());
        assert!(headers.get(CONTENT_LENGTH).is_none());
        assert_eq!(headers[AUTHORIZATION], "Bearer t");
    }

    #[test]
    fn test_same_target_ignores_credentials_and_fragment() {
        let sent: Url = "http://ann:pw@a.example/path?q=1#frag".parse().unwrap();
        assert!(same_target(&sent, &"http://a.example/path?q=1".parse().unwrap()));
        assert!(!same_target(&sent, &"http://a.example/other?q=1".parse().unwrap()));
        assert!(!same_target(&sent, &"http://b.example/path?q=1".parse().unwrap()));
    }

    #[test]
    fn test_referer() {
        let mut headers = HeaderMap::new();
        let previous: Url = "https://user:pw@a.example/start#top".parse().unwrap();

        set_referer(&mut headers, &previous, &"https://b.example/".parse().unwrap());
        assert_eq!(headers[REFERER], "https://a.example/start");

        set_referer(&mut headers, &previous, &"http://b.example/".parse().unwrap());
        assert!(headers.get(REFERER).is_none());
    }
}
