//! Cookie handling
//!
//! [`CookieJar`] is the store attached to dedicated clients when cookie
//! tracking is requested. It refuses `Set-Cookie` headers whose `Domain`
//! attribute names a public suffix, so a response from `a.example.co.uk`
//! cannot plant a cookie for every `*.co.uk` site.

use cookie::Cookie;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{HeaderMap, HeaderValue, COOKIE};
use tracing::debug;
use url::Url;

use crate::{Error, Result};

/// Public-suffix aware cookie store
#[derive(Debug, Default)]
pub struct CookieJar {
    inner: Jar,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a `Set-Cookie` style string as if `url` had sent it
    pub fn add_cookie_str(&self, cookie: &str, url: &Url) {
        if let Ok(value) = HeaderValue::from_str(cookie) {
            self.set_cookies(&mut std::iter::once(&value), url);
        }
    }
}

impl CookieStore for CookieJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        let mut accepted = cookie_headers.filter(|header| accepts(header, url));
        self.inner.set_cookies(&mut accepted, url);
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        self.inner.cookies(url)
    }
}

fn accepts(header: &HeaderValue, url: &Url) -> bool {
    let Some(parsed) = header.to_str().ok().and_then(|raw| Cookie::parse(raw).ok()) else {
        return false;
    };
    let Some(domain) = parsed.domain() else {
        return true;
    };

    let domain = domain.trim_start_matches('.').to_ascii_lowercase();
    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
    let is_public_suffix = psl::suffix_str(&domain) == Some(domain.as_str());

    // A public suffix may only be used by the host that is itself that suffix.
    if is_public_suffix && domain != host {
        debug!(cookie = parsed.name(), domain = %domain, host = %host, "rejecting cookie scoped to a public suffix");
        return false;
    }
    true
}

/// Attach one cookie to the `Cookie` header, appending to any already present
pub fn add_cookie(headers: &mut HeaderMap, cookie: &Cookie<'_>) -> Result<()> {
    let pair = format!("{}={}", cookie.name(), cookie.value());
    let combined = match headers.get(COOKIE).and_then(|v| v.to_str().ok()) {
        Some(existing) if !existing.is_empty() => format!("{}; {}", existing, pair),
        _ => pair,
    };

    let value = HeaderValue::from_str(&combined).map_err(|e| Error::InvalidHeader {
        name: COOKIE.to_string(),
        message: format!("cookie {:?}: {}", cookie.name(), e),
    })?;
    headers.insert(COOKIE, value);
    Ok(())
}
