//! Client selection and construction
//!
//! Most calls go through one process-wide client. A dedicated client is
//! built only when the options ask for transport behaviour the shared one
//! cannot provide (TLS, proxies, timeouts, cookies, compression or a local
//! address). Redirects are disabled on every client built here; the
//! redirect policy drives them instead.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use reqwest::redirect::Policy;
use reqwest::{Client, ClientBuilder};
use tracing::debug;

use crate::config::Defaults;
use crate::http::cookie::CookieJar;
use crate::http::options::RequestOptions;
use crate::http::proxy::{reqwest_proxy, EnvProxy};
use crate::{Error, Result};

static SHARED_CLIENT: OnceLock<Client> = OnceLock::new();

/// Whether `options` require a dedicated client
pub fn needs_custom_client(options: &RequestOptions) -> bool {
    options.tls.is_custom()
        || options.disable_compression
        || !options.proxies.is_empty()
        || options.timeouts.has_overrides()
        || !options.cookies.is_empty()
        || options.uses_cookie_jar()
        || options.local_addr.is_some()
}

/// The process-wide client: environment proxies, no redirects, no timeout
pub fn default_client() -> Result<Client> {
    if let Some(client) = SHARED_CLIENT.get() {
        return Ok(client.clone());
    }

    let client = Client::builder()
        .redirect(Policy::none())
        .build()
        .map_err(|source| Error::ClientBuild { source })?;
    Ok(SHARED_CLIENT.get_or_init(|| client).clone())
}

/// Builder for a long-lived client to hand to
/// [`do_session_request`](crate::http::dispatch::do_session_request) or
/// [`RequestOptions::http_client`]
///
/// Redirects stay off so the per-call redirect policy can drive them.
pub fn session_client_builder() -> ClientBuilder {
    Client::builder().redirect(Policy::none())
}

/// Overall time allowed for a call, redirects included
///
/// Only dedicated clients carry one; the shared client and caller-supplied
/// clients are unbounded.
pub fn request_budget(options: &RequestOptions, defaults: &Defaults) -> Option<Duration> {
    if options.http_client.is_some() || !needs_custom_client(options) {
        return None;
    }
    options.timeouts.resolve(&defaults.timeouts).request_timeout()
}

/// Pick or build the client for a call
///
/// A caller-supplied client is used verbatim and every transport option is
/// ignored.
pub fn build_http_client(options: &RequestOptions, defaults: &Defaults) -> Result<Client> {
    if let Some(client) = &options.http_client {
        debug!("using caller-supplied client");
        return Ok(client.clone());
    }

    if !needs_custom_client(options) {
        return default_client();
    }

    let timeouts = options.timeouts.resolve(&defaults.timeouts);
    let mut builder = Client::builder()
        .redirect(Policy::none())
        .connect_timeout(timeouts.connect_timeout())
        .tcp_keepalive(timeouts.dial_keep_alive)
        .no_proxy()
        .proxy(reqwest_proxy(options.proxies.clone(), EnvProxy::from_env()));

    builder = options.tls.apply(builder);

    if let Some(addr) = options.local_addr {
        builder = builder.local_address(addr);
    }

    if options.disable_compression {
        builder = builder.no_gzip().no_brotli().no_deflate();
    }

    if options.uses_cookie_jar() {
        let jar = options
            .cookie_jar
            .clone()
            .unwrap_or_else(|| Arc::new(CookieJar::new()));
        builder = builder.cookie_provider(jar);
    }

    debug!(
        connect_timeout = ?timeouts.connect_timeout(),
        request_timeout = ?timeouts.request_timeout(),
        proxies = options.proxies.len(),
        insecure = options.tls.insecure_skip_verify,
        cookie_jar = options.uses_cookie_jar(),
        "building dedicated client"
    );

    builder.build().map_err(|source| Error::ClientBuild { source })
}
