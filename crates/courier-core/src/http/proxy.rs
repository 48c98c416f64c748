//! Proxy resolution
//!
//! A caller-supplied proxy map (scheme → proxy URL) is consulted first; any
//! scheme it does not cover falls back to the conventional environment
//! variables. The environment is read once per dedicated client, and
//! `NO_PROXY` is matched by reqwest for both sources.

use std::collections::HashMap;
use std::net::IpAddr;

use reqwest::NoProxy;
use url::Url;

/// Proxy map keyed by URL scheme, e.g. `"http" => http://127.0.0.1:8080`
pub type ProxyMap = HashMap<String, Url>;

/// Resolve the proxy for `target` from `proxies`, then `env`
pub fn resolve_proxy(proxies: &ProxyMap, env: &EnvProxy, target: &Url) -> Option<Url> {
    if let Some(proxy) = proxies.get(target.scheme()) {
        return Some(proxy.clone());
    }
    env.proxy_for(target)
}

/// Build the reqwest proxy hook for a dedicated client
pub fn reqwest_proxy(proxies: ProxyMap, env: EnvProxy) -> reqwest::Proxy {
    let no_proxy = env.no_proxy.clone();
    reqwest::Proxy::custom(move |target| resolve_proxy(&proxies, &env, target)).no_proxy(no_proxy)
}

/// Proxy settings read from `HTTP_PROXY`, `HTTPS_PROXY`, `ALL_PROXY` and
/// `NO_PROXY` (upper case first, then lower case)
#[derive(Debug, Clone, Default)]
pub struct EnvProxy {
    pub http: Option<Url>,
    pub https: Option<Url>,
    pub all: Option<Url>,
    pub no_proxy: Option<NoProxy>,
}

impl EnvProxy {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(&name.to_ascii_uppercase())
                .or_else(|| lookup(name))
                .filter(|value| !value.trim().is_empty())
        };

        Self {
            http: var("http_proxy").and_then(|v| parse_proxy_url(&v)),
            https: var("https_proxy").and_then(|v| parse_proxy_url(&v)),
            all: var("all_proxy").and_then(|v| parse_proxy_url(&v)),
            no_proxy: var("no_proxy").and_then(|v| NoProxy::from_string(&v)),
        }
    }

    /// Scheme proxy, else `ALL_PROXY`; loopback hosts are never proxied
    pub fn proxy_for(&self, target: &Url) -> Option<Url> {
        let host = target.host_str()?;
        if is_loopback(host) {
            return None;
        }

        let proxy = match target.scheme() {
            "https" => self.https.as_ref(),
            "http" => self.http.as_ref(),
            _ => None,
        };
        proxy.or(self.all.as_ref()).cloned()
    }
}

fn is_loopback(host: &str) -> bool {
    if host.eq_ignore_ascii_case("localhost") {
        return true;
    }
    host.trim_start_matches('[')
        .trim_end_matches(']')
        .parse::<IpAddr>()
        .map(|ip| ip.is_loopback())
        .unwrap_or(false)
}

/// Proxy values without a recognised scheme are taken as `http://`
fn parse_proxy_url(value: &str) -> Option<Url> {
    let value = value.trim();
    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https" | "socks5" | "socks5h") => Some(url),
        _ => Url::parse(&format!("http://{}", value)).ok(),
    }
}
