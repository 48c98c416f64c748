//! Request dispatch
//!
//! Entry points that turn a verb, a URL and [`RequestOptions`] into a sent
//! request. Construction runs in a fixed order: client selection, URL
//! finalization, body encoding, header mutation, redirect policy, then the
//! pre-send hook. Nothing touches the network until every step succeeded.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Request, Response};
use tracing::debug;
use url::Url;

use crate::config::Defaults;
use crate::http::body::encode_body;
use crate::http::builder::{apply_headers, parse_method};
use crate::http::client::{build_http_client, request_budget};
use crate::http::context::RequestContext;
use crate::http::hook::run_hook;
use crate::http::options::RequestOptions;
use crate::http::query::{merge_params, merge_struct};
use crate::http::redirect::{self, RedirectPolicy};
use crate::{Error, Result};

/// A fully built request together with everything needed to send it
#[derive(Debug)]
pub struct PreparedRequest {
    client: Client,
    request: Request,
    policy: RedirectPolicy,
    budget: Option<Duration>,
    context: RequestContext,
}

impl PreparedRequest {
    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn policy(&self) -> &RedirectPolicy {
        &self.policy
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Overall time allowed for the send, redirects included
    pub fn budget(&self) -> Option<Duration> {
        self.budget
    }

    /// Send the request, following redirects, within the call's context
    pub async fn send(self) -> Result<Response> {
        let PreparedRequest {
            client,
            request,
            policy,
            budget,
            context,
        } = self;
        context.run(redirect::execute(&client, request, &policy, budget)).await
    }
}

/// Build the request for `method` and `url` without sending it
///
/// `session` replaces client selection entirely when given.
pub async fn prepare(
    method: &str,
    url: &str,
    options: Option<RequestOptions>,
    session: Option<&Client>,
    defaults: &Defaults,
) -> Result<PreparedRequest> {
    let mut options = options.unwrap_or_default();
    if options.cookie_jar.is_some() {
        options.use_cookie_jar = true;
    }

    let method = parse_method(method)?;

    let (client, budget) = match session {
        Some(client) => (client.clone(), None),
        None => (build_http_client(&options, defaults)?, request_budget(&options, defaults)),
    };

    let url = finalize_url(url, &options)?;
    let mut request = Request::new(method, url);

    let encoded = encode_body(
        request.method(),
        options.body.take(),
        options.data.take(),
        options.strict_single_upload,
    )
    .await?;
    debug!(method = %request.method(), url = %request.url(), body = %encoded.kind, "prepared request");

    if let Some(content_type) = encoded.content_type {
        request.headers_mut().insert(CONTENT_TYPE, content_type);
    }
    *request.body_mut() = encoded.body;

    apply_headers(&mut request, &options, defaults)?;

    let policy = RedirectPolicy::from_options(&options, defaults)?;
    let context = options.context.take().unwrap_or_default();

    run_hook(options.before_request.as_deref(), &mut request)?;

    Ok(PreparedRequest {
        client,
        request,
        policy,
        budget,
        context,
    })
}

/// Merge the query options into `url`
///
/// A params map takes priority over a structured query object; they are
/// never combined.
fn finalize_url(url: &str, options: &RequestOptions) -> Result<Url> {
    let merged = if !options.params.is_empty() {
        merge_params(url, &options.params)?
    } else if let Some(query) = &options.query {
        merge_struct(url, &**query)?
    } else {
        url.to_string()
    };

    Url::parse(&merged).map_err(|e| Error::invalid_url(format!("cannot parse {:?}", merged), e))
}

async fn dispatch(
    method: &str,
    url: &str,
    options: Option<RequestOptions>,
    session: Option<&Client>,
    defaults: &Defaults,
) -> Result<Response> {
    let context = options
        .as_ref()
        .and_then(|options| options.context.clone())
        .unwrap_or_default();

    let prepared = context.run(prepare(method, url, options, session, defaults)).await?;
    prepared.send().await
}

impl Defaults {
    /// Send a request using these defaults
    pub async fn request(&self, method: &str, url: &str, options: Option<RequestOptions>) -> Result<Response> {
        dispatch(method, url, options, None, self).await
    }

    /// Send a request on a long-lived client using these defaults
    pub async fn session_request(
        &self,
        method: &str,
        url: &str,
        options: Option<RequestOptions>,
        client: &Client,
    ) -> Result<Response> {
        dispatch(method, url, options, Some(client), self).await
    }
}

/// Send a request with the library defaults
pub async fn do_request(method: &str, url: &str, options: Option<RequestOptions>) -> Result<Response> {
    Defaults::default().request(method, url, options).await
}

/// Send a request on a caller-owned client; transport options are ignored
pub async fn do_session_request(
    method: &str,
    url: &str,
    options: Option<RequestOptions>,
    client: &Client,
) -> Result<Response> {
    Defaults::default().session_request(method, url, options, client).await
}

pub async fn get(url: &str, options: Option<RequestOptions>) -> Result<Response> {
    do_request("GET", url, options).await
}

pub async fn post(url: &str, options: Option<RequestOptions>) -> Result<Response> {
    do_request("POST", url, options).await
}

pub async fn put(url: &str, options: Option<RequestOptions>) -> Result<Response> {
    do_request("PUT", url, options).await
}

pub async fn patch(url: &str, options: Option<RequestOptions>) -> Result<Response> {
    do_request("PATCH", url, options).await
}

pub async fn delete(url: &str, options: Option<RequestOptions>) -> Result<Response> {
    do_request("DELETE", url, options).await
}

pub async fn head(url: &str, options: Option<RequestOptions>) -> Result<Response> {
    do_request("HEAD", url, options).await
}

pub async fn options(url: &str, options: Option<RequestOptions>) -> Result<Response> {
    do_request("OPTIONS", url, options).await
}
