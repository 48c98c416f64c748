//! Library-wide defaults
//!
//! Values that other HTTP libraries keep in mutable globals (user agent,
//! fallback timeouts, redirect limit, sensitive headers) live in a plain
//! [`Defaults`] value that is threaded through the pipeline explicitly.

use std::collections::HashSet;
use std::time::Duration;

use reqwest::header::{HeaderName, AUTHORIZATION, COOKIE, PROXY_AUTHORIZATION, WWW_AUTHENTICATE};
use serde::{Deserialize, Serialize};

use crate::http::timeout::TimeoutConfig;
use crate::{Error, Result};

/// User agent sent when the caller does not set one
pub const DEFAULT_USER_AGENT: &str = concat!("Courier/", env!("CARGO_PKG_VERSION"));

/// Number of redirects followed before giving up
pub const DEFAULT_REDIRECT_LIMIT: usize = 30;

/// Headers removed when a redirect leaves the original host
pub const DEFAULT_SENSITIVE_HEADERS: [HeaderName; 4] =
    [AUTHORIZATION, PROXY_AUTHORIZATION, WWW_AUTHENTICATE, COOKIE];

/// Defaults applied wherever a request leaves a policy unset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Defaults {
    pub user_agent: String,
    pub timeouts: TimeoutConfig,
    pub redirect_limit: usize,
    pub sensitive_headers: Vec<String>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeouts: TimeoutConfig::library_defaults(),
            redirect_limit: DEFAULT_REDIRECT_LIMIT,
            sensitive_headers: DEFAULT_SENSITIVE_HEADERS
                .iter()
                .map(|name| name.as_str().to_string())
                .collect(),
        }
    }
}

impl Defaults {
    /// Read overrides from `COURIER_*` environment variables
    ///
    /// Recognised variables: `COURIER_USER_AGENT`, `COURIER_REDIRECT_LIMIT`,
    /// `COURIER_REQUEST_TIMEOUT_SECS`, `COURIER_DIAL_TIMEOUT_SECS`,
    /// `COURIER_TLS_HANDSHAKE_TIMEOUT_SECS` and `COURIER_KEEP_ALIVE_SECS`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Defaults::from_env`] with a custom variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut defaults = Self::default();

        if let Some(agent) = lookup("COURIER_USER_AGENT") {
            defaults.user_agent = agent;
        }
        if let Some(limit) = lookup("COURIER_REDIRECT_LIMIT") {
            defaults.redirect_limit = parse_number("COURIER_REDIRECT_LIMIT", &limit)?;
        }

        let secs = |key: &str| -> Result<Option<Duration>> {
            lookup(key)
                .map(|value| parse_number(key, &value).map(Duration::from_secs))
                .transpose()
        };
        if let Some(timeout) = secs("COURIER_REQUEST_TIMEOUT_SECS")? {
            defaults.timeouts.request = timeout;
        }
        if let Some(timeout) = secs("COURIER_DIAL_TIMEOUT_SECS")? {
            defaults.timeouts.dial = timeout;
        }
        if let Some(timeout) = secs("COURIER_TLS_HANDSHAKE_TIMEOUT_SECS")? {
            defaults.timeouts.tls_handshake = timeout;
        }
        if let Some(interval) = secs("COURIER_KEEP_ALIVE_SECS")? {
            defaults.timeouts.dial_keep_alive = interval;
        }

        Ok(defaults)
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_redirect_limit(mut self, limit: usize) -> Self {
        self.redirect_limit = limit;
        self
    }

    pub fn with_timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// The configured sensitive header names, validated
    pub fn sensitive_header_set(&self) -> Result<HashSet<HeaderName>> {
        self.sensitive_headers
            .iter()
            .map(|name| {
                HeaderName::from_bytes(name.as_bytes()).map_err(|e| Error::InvalidHeader {
                    name: name.clone(),
                    message: e.to_string(),
                })
            })
            .collect()
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e| Error::Configuration {
        message: format!("{} has invalid value {:?}: {}", key, value, e),
    })
}
