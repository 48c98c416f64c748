//! TLS policy for dedicated clients
//!
//! Certificate verification stays on unless a caller explicitly asks to skip
//! it.

use serde::{Deserialize, Serialize};

/// TLS configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsConfig {
    /// Accept any server certificate (dangerous!)
    pub insecure_skip_verify: bool,
    /// Minimum TLS version to negotiate
    pub min_version: Option<TlsVersion>,
}

/// TLS protocol versions supported by the rustls backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TlsVersion {
    TLS1_2,
    TLS1_3,
}

impl TlsVersion {
    fn to_reqwest_version(self) -> reqwest::tls::Version {
        match self {
            TlsVersion::TLS1_2 => reqwest::tls::Version::TLS_1_2,
            TlsVersion::TLS1_3 => reqwest::tls::Version::TLS_1_3,
        }
    }
}

impl TlsConfig {
    /// Verify certificates (the default)
    pub fn secure() -> Self {
        Self::default()
    }

    /// Skip certificate verification, for development against self-signed servers
    pub fn insecure() -> Self {
        Self {
            insecure_skip_verify: true,
            ..Self::default()
        }
    }

    pub fn with_min_version(mut self, version: TlsVersion) -> Self {
        self.min_version = Some(version);
        self
    }

    /// Whether this policy differs from what the shared client does
    pub fn is_custom(&self) -> bool {
        self.insecure_skip_verify || self.min_version.is_some()
    }

    /// Apply this policy to a client builder
    pub fn apply(&self, mut builder: reqwest::ClientBuilder) -> reqwest::ClientBuilder {
        if self.insecure_skip_verify {
            builder = builder.danger_accept_invalid_certs(true);
        }
        if let Some(version) = self.min_version {
            builder = builder.min_tls_version(version.to_reqwest_version());
        }
        builder
    }
}
