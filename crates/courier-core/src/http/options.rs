//! Declarative request options
//!
//! [`RequestOptions`] captures every knob of a call: body, query, headers,
//! auth, transport and session policy, plus the cancellation context and
//! pre-send hook. It is consumed by the call that uses it.
//!
//! # Body precedence
//!
//! The body is an explicit variant ([`Body`]) plus the `data` map, which is
//! used both for url-encoded forms and for the plain fields of a multipart
//! upload. When a caller supplies several bodies through the builder methods
//! the one with the highest precedence is kept:
//!
//! `Raw` > `Json` > `Xml` > `Files` > form `data` > nothing
//!
//! This is defined behaviour, not an error.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use cookie::Cookie;
use reqwest::header::HeaderName;
use serde::Serialize;
use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use crate::http::auth::BasicAuth;
use crate::http::context::RequestContext;
use crate::http::cookie::CookieJar;
use crate::http::hook::BeforeRequest;
use crate::http::proxy::ProxyMap;
use crate::http::timeout::TimeoutConfig;
use crate::http::tls::TlsConfig;
use crate::{Error, Result};

/// Error raised by the XML serializer
pub type XmlError = Box<dyn std::error::Error + Send + Sync>;

/// A value that can be marshaled into any of the supported wire formats
pub trait Encodable: Send + Sync {
    fn to_json(&self) -> serde_json::Result<Vec<u8>>;

    fn to_json_value(&self) -> serde_json::Result<serde_json::Value>;

    fn to_xml(&self) -> std::result::Result<String, XmlError>;
}

impl<T> Encodable for T
where
    T: Serialize + Send + Sync,
{
    fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    fn to_json_value(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }

    fn to_xml(&self) -> std::result::Result<String, XmlError> {
        quick_xml::se::to_string(self).map_err(Into::into)
    }
}

/// JSON or XML payload
///
/// Text and bytes are sent verbatim, so callers may pre-serialize; anything
/// else is marshaled when the request is built.
pub enum Payload {
    Text(String),
    Bytes(Bytes),
    Value(Box<dyn Encodable>),
}

impl Payload {
    /// Payload marshaled from any serializable value
    pub fn value<T>(value: T) -> Self
    where
        T: Serialize + Send + Sync + 'static,
    {
        Payload::Value(Box::new(value))
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::Bytes(Bytes::from(bytes))
    }
}

impl From<Bytes> for Payload {
    fn from(bytes: Bytes) -> Self {
        Payload::Bytes(bytes)
    }
}

impl From<serde_json::Value> for Payload {
    fn from(value: serde_json::Value) -> Self {
        Payload::value(value)
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Payload::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Payload::Value(_) => f.write_str("Value(..)"),
        }
    }
}

/// Readable content of an upload
pub type FileContents = Box<dyn AsyncRead + Send + Sync + Unpin>;

/// A file to upload
///
/// The content stream is consumed exactly once by the body encoder and
/// dropped (closed) right after it has been copied.
pub struct FileUpload {
    /// Form field name; synthesized as `file` or `file1`, `file2`, ... when absent
    pub field_name: Option<String>,
    pub file_name: String,
    /// Explicit MIME type; when set a custom part header is written
    pub mime: Option<String>,
    pub contents: Option<FileContents>,
}

impl FileUpload {
    pub fn new<R>(file_name: impl Into<String>, contents: R) -> Self
    where
        R: AsyncRead + Send + Sync + Unpin + 'static,
    {
        Self {
            field_name: None,
            file_name: file_name.into(),
            mime: None,
            contents: Some(Box::new(contents)),
        }
    }

    /// Upload from in-memory bytes
    pub fn from_bytes(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self::new(file_name, std::io::Cursor::new(bytes.into()))
    }

    /// Open a file on disk; the upload is named after the file
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = tokio::fs::File::open(path)
            .await
            .map_err(|source| Error::Multipart {
                message: format!("failed to open {}", path.display()),
                source,
            })?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::new(file_name, file))
    }

    pub fn with_field_name(mut self, field_name: impl Into<String>) -> Self {
        self.field_name = Some(field_name.into());
        self
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }
}

impl fmt::Debug for FileUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileUpload")
            .field("field_name", &self.field_name)
            .field("file_name", &self.file_name)
            .field("mime", &self.mime)
            .field("contents", &self.contents.as_ref().map(|_| ".."))
            .finish()
    }
}

/// Request body variant
#[derive(Debug)]
pub enum Body {
    /// Caller-supplied body, sent unmodified without a `Content-Type`
    Raw(reqwest::Body),
    Json(Payload),
    Xml(Payload),
    /// Multipart upload for POST, single raw file for other verbs
    Files(Vec<FileUpload>),
}

impl Body {
    fn kind(&self) -> BodyKind {
        match self {
            Body::Raw(_) => BodyKind::Raw,
            Body::Json(_) => BodyKind::Json,
            Body::Xml(_) => BodyKind::Xml,
            Body::Files(_) => BodyKind::FileUpload,
        }
    }
}

/// Encoding strategy the body encoder will pick, in precedence order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BodyKind {
    Raw,
    Json,
    Xml,
    FileUpload,
    Form,
    None,
}

impl fmt::Display for BodyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BodyKind::Raw => "raw",
            BodyKind::Json => "json",
            BodyKind::Xml => "xml",
            BodyKind::FileUpload => "file-upload",
            BodyKind::Form => "form",
            BodyKind::None => "none",
        };
        f.write_str(name)
    }
}

/// Per-call request configuration
pub struct RequestOptions {
    pub body: Option<Body>,
    /// Form fields: the url-encoded body, or the plain fields of a multipart upload
    pub data: Option<HashMap<String, String>>,

    /// Query values that replace same-named values already in the URL
    pub params: HashMap<String, String>,
    /// Structured query object whose values are appended to the URL
    pub query: Option<Box<dyn Encodable>>,

    pub headers: HashMap<String, String>,
    pub user_agent: Option<String>,
    pub host: Option<String>,
    pub auth: Option<BasicAuth>,
    pub is_ajax: bool,
    pub cookies: Vec<Cookie<'static>>,

    pub tls: TlsConfig,
    pub disable_compression: bool,
    pub proxies: ProxyMap,
    pub timeouts: TimeoutConfig,
    pub local_addr: Option<IpAddr>,

    pub use_cookie_jar: bool,
    /// Explicit jar; implies `use_cookie_jar`
    pub cookie_jar: Option<Arc<CookieJar>>,
    /// Pre-built client; every transport policy field is ignored when set
    pub http_client: Option<reqwest::Client>,
    pub redirect_limit: Option<usize>,
    /// `false` returns the first redirect response instead of following it
    pub allow_redirect: bool,
    pub sensitive_headers: Option<HashSet<HeaderName>>,
    /// Reject non-POST uploads with more than one file instead of sending the first
    pub strict_single_upload: bool,

    pub context: Option<RequestContext>,
    pub before_request: Option<Arc<dyn BeforeRequest>>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            body: None,
            data: None,
            params: HashMap::new(),
            query: None,
            headers: HashMap::new(),
            user_agent: None,
            host: None,
            auth: None,
            is_ajax: false,
            cookies: Vec::new(),
            tls: TlsConfig::default(),
            disable_compression: false,
            proxies: ProxyMap::new(),
            timeouts: TimeoutConfig::default(),
            local_addr: None,
            use_cookie_jar: false,
            cookie_jar: None,
            http_client: None,
            redirect_limit: None,
            allow_redirect: true,
            sensitive_headers: None,
            strict_single_upload: false,
            context: None,
            before_request: None,
        }
    }
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// The strategy the body encoder will use
    pub fn body_kind(&self) -> BodyKind {
        match (&self.body, &self.data) {
            (Some(body), _) => body.kind(),
            (None, Some(_)) => BodyKind::Form,
            (None, None) => BodyKind::None,
        }
    }

    /// Whether cookie tracking is on; an explicit jar always turns it on
    pub fn uses_cookie_jar(&self) -> bool {
        self.use_cookie_jar || self.cookie_jar.is_some()
    }

    fn set_body(&mut self, body: Body) {
        match &self.body {
            Some(current) if current.kind() < body.kind() => {
                debug!(kept = %current.kind(), ignored = %body.kind(), "body already set with higher precedence");
            }
            _ => self.body = Some(body),
        }
    }

    /// Send `body` unmodified
    pub fn raw_body(mut self, body: impl Into<reqwest::Body>) -> Self {
        self.set_body(Body::Raw(body.into()));
        self
    }

    pub fn json(mut self, payload: impl Into<Payload>) -> Self {
        self.set_body(Body::Json(payload.into()));
        self
    }

    /// JSON body marshaled from any serializable value
    pub fn json_value<T>(self, value: T) -> Self
    where
        T: Serialize + Send + Sync + 'static,
    {
        self.json(Payload::value(value))
    }

    pub fn xml(mut self, payload: impl Into<Payload>) -> Self {
        self.set_body(Body::Xml(payload.into()));
        self
    }

    /// XML body marshaled from any serializable value
    pub fn xml_value<T>(self, value: T) -> Self
    where
        T: Serialize + Send + Sync + 'static,
    {
        self.xml(Payload::value(value))
    }

    /// Add a file to the upload list
    pub fn file(mut self, upload: FileUpload) -> Self {
        match &mut self.body {
            Some(Body::Files(files)) => files.push(upload),
            _ => self.set_body(Body::Files(vec![upload])),
        }
        self
    }

    pub fn files(mut self, uploads: impl IntoIterator<Item = FileUpload>) -> Self {
        for upload in uploads {
            self = self.file(upload);
        }
        self
    }

    pub fn data(mut self, data: HashMap<String, String>) -> Self {
        self.data = Some(data);
        self
    }

    pub fn form_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn params(mut self, params: HashMap<String, String>) -> Self {
        self.params.extend(params);
        self
    }

    /// Structured query; only used when no `params` are set
    pub fn query_struct<T>(mut self, query: T) -> Self
    where
        T: Serialize + Send + Sync + 'static,
    {
        self.query = Some(Box::new(query));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = Some(BasicAuth::new(username, password));
        self
    }

    pub fn ajax(mut self) -> Self {
        self.is_ajax = true;
        self
    }

    pub fn cookie(mut self, cookie: Cookie<'static>) -> Self {
        self.cookies.push(cookie);
        self
    }

    pub fn insecure_skip_verify(mut self) -> Self {
        self.tls.insecure_skip_verify = true;
        self
    }

    pub fn tls(mut self, tls: TlsConfig) -> Self {
        self.tls = tls;
        self
    }

    pub fn disable_compression(mut self) -> Self {
        self.disable_compression = true;
        self
    }

    /// Route `scheme` traffic through `proxy`
    pub fn proxy(mut self, scheme: impl Into<String>, proxy: Url) -> Self {
        self.proxies.insert(scheme.into(), proxy);
        self
    }

    pub fn timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.request = timeout;
        self
    }

    pub fn dial_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.dial = timeout;
        self
    }

    pub fn tls_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.tls_handshake = timeout;
        self
    }

    pub fn dial_keep_alive(mut self, interval: Duration) -> Self {
        self.timeouts.dial_keep_alive = interval;
        self
    }

    pub fn local_addr(mut self, addr: IpAddr) -> Self {
        self.local_addr = Some(addr);
        self
    }

    pub fn use_cookie_jar(mut self) -> Self {
        self.use_cookie_jar = true;
        self
    }

    pub fn cookie_jar(mut self, jar: Arc<CookieJar>) -> Self {
        self.cookie_jar = Some(jar);
        self
    }

    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn redirect_limit(mut self, limit: usize) -> Self {
        self.redirect_limit = Some(limit);
        self
    }

    pub fn allow_redirect(mut self, allow: bool) -> Self {
        self.allow_redirect = allow;
        self
    }

    pub fn sensitive_headers(mut self, names: impl IntoIterator<Item = HeaderName>) -> Self {
        self.sensitive_headers = Some(names.into_iter().collect());
        self
    }

    pub fn strict_single_upload(mut self) -> Self {
        self.strict_single_upload = true;
        self
    }

    pub fn context(mut self, context: RequestContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Cancel the call when `token` fires
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        let context = self.context.take().unwrap_or_default();
        self.context = Some(context.with_cancellation(token));
        self
    }

    pub fn before_request(mut self, hook: impl BeforeRequest + 'static) -> Self {
        self.before_request = Some(Arc::new(hook));
        self
    }
}

impl fmt::Debug for RequestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestOptions")
            .field("body", &self.body)
            .field("data", &self.data)
            .field("params", &self.params)
            .field("query", &self.query.as_ref().map(|_| ".."))
            .field("headers", &self.headers)
            .field("user_agent", &self.user_agent)
            .field("host", &self.host)
            .field("auth", &self.auth)
            .field("is_ajax", &self.is_ajax)
            .field("cookies", &self.cookies)
            .field("tls", &self.tls)
            .field("disable_compression", &self.disable_compression)
            .field("proxies", &self.proxies)
            .field("timeouts", &self.timeouts)
            .field("local_addr", &self.local_addr)
            .field("use_cookie_jar", &self.use_cookie_jar)
            .field("cookie_jar", &self.cookie_jar.is_some())
            .field("http_client", &self.http_client.is_some())
            .field("redirect_limit", &self.redirect_limit)
            .field("allow_redirect", &self.allow_redirect)
            .field("context", &self.context)
            .field("before_request", &self.before_request.is_some())
            .finish_non_exhaustive()
    }
}
