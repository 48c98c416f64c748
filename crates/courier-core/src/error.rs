//! Error types for Courier
//!
//! Errors fall into two groups. Construction errors are raised while turning
//! [`RequestOptions`](crate::http::RequestOptions) into a request and client,
//! before any network I/O happens. Transport errors come out of `reqwest`
//! (or the redirect loop and cancellation context wrapped around it) and are
//! carried unchanged.

use thiserror::Error;

/// Main error type for Courier operations
#[derive(Error, Debug)]
pub enum Error {
    /// The target URL, or a redirect `Location`, could not be parsed
    #[error("Invalid URL: {message}")]
    InvalidUrl {
        message: String,
        #[source]
        source: Option<url::ParseError>,
    },

    /// The HTTP verb is not a valid method token
    #[error("Invalid HTTP method: {method}")]
    InvalidMethod { method: String },

    /// A caller-supplied header name or value is not valid on the wire
    #[error("Invalid header {name}: {message}")]
    InvalidHeader { name: String, message: String },

    /// JSON payload could not be marshaled
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// XML payload could not be marshaled
    #[error("XML error: {message}")]
    Xml {
        message: String,
        #[source]
        source: crate::http::options::XmlError,
    },

    /// Query string could not be parsed or a structured query could not be encoded
    #[error("Query error: {message}")]
    Query {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// A file upload was supplied without a content stream
    #[error("File upload #{index} ({file_name}) has no contents")]
    MissingFileContents { index: usize, file_name: String },

    /// More than one file was supplied for a non-POST upload in strict mode
    #[error("{method} uploads accept a single file, got {count}")]
    TooManyUploads { method: String, count: usize },

    /// Building the multipart body failed
    #[error("Multipart error: {message}")]
    Multipart {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Configuration values could not be read
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// The dedicated client could not be assembled
    #[error("Failed to build HTTP client: {source}")]
    ClientBuild {
        #[source]
        source: reqwest::Error,
    },

    /// The pre-send hook rejected the request; the hook's error is kept as-is
    #[error(transparent)]
    Hook(anyhow::Error),

    /// Error raised by the underlying transport
    #[error("HTTP transport error: {source}")]
    Transport {
        #[source]
        source: reqwest::Error,
    },

    /// More redirects were requested than the policy allows
    #[error("Redirect limit of {limit} exceeded at {url}")]
    RedirectLimitExceeded { limit: usize, url: String },

    /// The client followed redirects itself, bypassing the redirect policy
    #[error("Client followed redirects from {url} to {landed}; build it with redirect::Policy::none()")]
    UnmanagedRedirect { url: String, landed: String },

    /// The overall request timeout ran out between redirect hops
    #[error("Request timed out after {timeout:?}")]
    RequestTimeout { timeout: std::time::Duration },

    /// The request context was cancelled before the call completed
    #[error("Request cancelled")]
    Cancelled,

    /// The request context's deadline passed before the call completed
    #[error("Request deadline exceeded")]
    DeadlineExceeded,
}

/// Convenience type alias for Results using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether the error was raised before any network I/O happened
    pub fn is_construction(&self) -> bool {
        !matches!(
            self,
            Error::Transport { .. }
                | Error::RedirectLimitExceeded { .. }
                | Error::UnmanagedRedirect { .. }
                | Error::RequestTimeout { .. }
                | Error::Cancelled
                | Error::DeadlineExceeded
        )
    }

    /// Whether a timeout (dial, TLS, overall request or context deadline) fired
    pub fn is_timeout(&self) -> bool {
        match self {
            Error::Transport { source } => source.is_timeout(),
            Error::DeadlineExceeded | Error::RequestTimeout { .. } => true,
            _ => false,
        }
    }

    /// Whether the transport failed to establish a connection
    pub fn is_connect(&self) -> bool {
        matches!(self, Error::Transport { source } if source.is_connect())
    }

    /// Whether the call was cut short by its context
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled | Error::DeadlineExceeded)
    }

    pub(crate) fn invalid_url(message: impl Into<String>, source: url::ParseError) -> Self {
        Error::InvalidUrl {
            message: message.into(),
            source: Some(source),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(source: reqwest::Error) -> Self {
        Error::Transport { source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_classification() {
        let err = Error::MissingFileContents {
            index: 0,
            file_name: "a.txt".to_string(),
        };
        assert!(err.is_construction());
        assert!(!err.is_timeout());

        assert!(!Error::Cancelled.is_construction());
        assert!(Error::Cancelled.is_cancelled());
        assert!(Error::DeadlineExceeded.is_timeout());
    }

    #[test]
    fn test_hook_error_is_transparent() {
        let err = Error::Hook(anyhow::anyhow!("token expired"));
        assert_eq!(err.to_string(), "token expired");
        assert!(err.is_construction());
    }

    #[test]
    fn test_redirect_limit_message() {
        let err = Error::RedirectLimitExceeded {
            limit: 3,
            url: "http://example.com/loop".to_string(),
        };
        assert!(err.to_string().contains("3"));
        assert!(!err.is_construction());
    }

    #[test]
    fn test_policy_errors_are_not_construction() {
        let err = Error::UnmanagedRedirect {
            url: "http://a.example/".to_string(),
            landed: "http://a.example/next".to_string(),
        };
        assert!(!err.is_construction());
        assert!(!err.is_timeout());

        let err = Error::RequestTimeout {
            timeout: std::time::Duration::from_millis(500),
        };
        assert!(!err.is_construction());
        assert!(err.is_timeout());
        assert!(!err.is_cancelled());
    }
}
