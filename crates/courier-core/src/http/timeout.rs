//! Timeout configuration for dedicated clients
//!
//! A zero duration in a per-request [`TimeoutConfig`] means "not overridden";
//! it is filled from the [`Defaults`](crate::config::Defaults) when a
//! dedicated client is built.

use std::time::Duration;
use serde::{Deserialize, Serialize};

/// Default time allowed for the TLS handshake
pub const DEFAULT_TLS_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);
/// Default time allowed for establishing the TCP connection
pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(30);
/// Default TCP keep-alive interval
pub const DEFAULT_DIAL_KEEP_ALIVE: Duration = Duration::from_secs(30);
/// Default bound on a whole request, redirects included
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(90);

/// Timeout configuration for a request's transport
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Time to complete the TLS handshake
    pub tls_handshake: Duration,
    /// Time to establish the TCP connection
    pub dial: Duration,
    /// Keep-alive interval for the dialed connection
    pub dial_keep_alive: Duration,
    /// Overall request timeout
    pub request: Duration,
}

impl TimeoutConfig {
    /// The fixed library defaults
    pub const fn library_defaults() -> Self {
        Self {
            tls_handshake: DEFAULT_TLS_HANDSHAKE_TIMEOUT,
            dial: DEFAULT_DIAL_TIMEOUT,
            dial_keep_alive: DEFAULT_DIAL_KEEP_ALIVE,
            request: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Whether any field carries an override
    pub fn has_overrides(&self) -> bool {
        !(self.tls_handshake.is_zero()
            && self.dial.is_zero()
            && self.dial_keep_alive.is_zero()
            && self.request.is_zero())
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request = timeout;
        self
    }

    pub fn with_dial_timeout(mut self, timeout: Duration) -> Self {
        self.dial = timeout;
        self
    }

    pub fn with_tls_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.tls_handshake = timeout;
        self
    }

    pub fn with_dial_keep_alive(mut self, interval: Duration) -> Self {
        self.dial_keep_alive = interval;
        self
    }

    /// Fill every zero field from `fallback`
    pub fn resolve(&self, fallback: &TimeoutConfig) -> TimeoutConfig {
        fn pick(value: Duration, fallback: Duration) -> Duration {
            if value.is_zero() {
                fallback
            } else {
                value
            }
        }

        TimeoutConfig {
            tls_handshake: pick(self.tls_handshake, fallback.tls_handshake),
            dial: pick(self.dial, fallback.dial),
            dial_keep_alive: pick(self.dial_keep_alive, fallback.dial_keep_alive),
            request: pick(self.request, fallback.request),
        }
    }

    /// Connect budget handed to reqwest, which covers both dial and handshake
    pub fn connect_timeout(&self) -> Duration {
        self.dial.saturating_add(self.tls_handshake)
    }

    /// Overall timeout, `None` when unbounded
    pub fn request_timeout(&self) -> Option<Duration> {
        (!self.request.is_zero()).then_some(self.request)
    }
}
