//! Cookie-aware HTTP client and the authenticated myCloud request pipeline.
//!
//! `HttpClient` wraps a `reqwest::Client` that carries a cookie jar across
//! redirects (the login flow depends on it) and logs every redirect hop.
//! [`HttpClient::send`] issues one bearer-authenticated API call described
//! by an [`ApiRequest`] and returns a tagged [`Reply`].

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, AUTHORIZATION, CONTENT_TYPE, COOKIE, ORIGIN, RANGE, REFERER};
use reqwest::{Method, Response};
use serde::de::DeserializeOwned;

use crate::config::HttpSettings;
use crate::errors::{Result, ScmcError};

/// Logical root every upstream storage path lives under.
pub const STORAGE_ROOT: &str = "/Drive";

/// The upstream rejects clients that do not look like the web app.
pub const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/55.0.2883.87 Safari/537.36";
pub const WEB_ORIGIN: &str = "https://www.mycloud.ch/";

pub const CONTENT_TYPE_JSON: &str = "application/json; charset=UTF-8";
pub const CONTENT_TYPE_OCTET_STREAM: &str = "application/octet-stream";

const MAX_REDIRECTS: usize = 10;

// ---------------------------------------------------------------------------
// Request descriptor
// ---------------------------------------------------------------------------

/// What the caller wants back from an API call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    /// Require 2xx and decode the JSON body.
    Decode,
    /// Hand back the live response whatever its status.
    Raw,
    /// Require 2xx and discard the body.
    Ack,
}

/// One upstream API call.
#[derive(Debug)]
pub struct ApiRequest {
    method: Method,
    server: String,
    action: String,
    path: Option<String>,
    mode: ResponseMode,
    body: Option<reqwest::Body>,
    content_type: Option<String>,
    range: Option<String>,
}

impl ApiRequest {
    pub fn new(method: Method, server: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            method,
            server: server.into(),
            action: action.into(),
            path: None,
            mode: ResponseMode::Decode,
            body: None,
            content_type: None,
            range: None,
        }
    }

    pub fn get(server: impl Into<String>, action: impl Into<String>) -> Self {
        Self::new(Method::GET, server, action)
    }

    pub fn put(server: impl Into<String>, action: impl Into<String>) -> Self {
        Self::new(Method::PUT, server, action)
    }

    /// Logical object path (without the storage root).
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn body(mut self, body: impl Into<reqwest::Body>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Forward a `Range` header verbatim. Empty values are ignored.
    pub fn range(mut self, range: Option<&str>) -> Self {
        self.range = range.filter(|r| !r.is_empty()).map(str::to_string);
        self
    }

    pub fn raw(mut self) -> Self {
        self.mode = ResponseMode::Raw;
        self
    }

    pub fn ack(mut self) -> Self {
        self.mode = ResponseMode::Ack;
        self
    }

    pub fn mode(&self) -> ResponseMode {
        self.mode
    }

    /// Full request URL without the query string.
    pub fn url(&self) -> String {
        format!("{}/{}", self.server.trim_end_matches('/'), self.action)
    }

    /// Explicit override, else octet-stream for bodies, else JSON.
    pub fn resolved_content_type(&self) -> &str {
        match (&self.content_type, &self.body) {
            (Some(ct), _) => ct,
            (None, Some(_)) => CONTENT_TYPE_OCTET_STREAM,
            (None, None) => CONTENT_TYPE_JSON,
        }
    }

    /// Short description used in logs and errors, e.g. `PUT object [/repo/]`.
    pub fn context(&self) -> String {
        match &self.path {
            Some(p) => format!("{} {} [{}]", self.method, self.action, p),
            None => format!("{} {}", self.method, self.action),
        }
    }
}

/// Tagged outcome of [`HttpClient::send`].
#[derive(Debug)]
pub enum Reply<T> {
    Decoded(T),
    Raw(Response),
    Ack,
}

impl<T> Reply<T> {
    pub fn into_decoded(self) -> Result<T> {
        match self {
            Reply::Decoded(value) => Ok(value),
            _ => Err(ScmcError::Protocol("expected a decoded response body".into())),
        }
    }

    pub fn into_raw(self) -> Result<Response> {
        match self {
            Reply::Raw(response) => Ok(response),
            _ => Err(ScmcError::Protocol("expected a raw response".into())),
        }
    }
}

// ---------------------------------------------------------------------------
// HttpClient
// ---------------------------------------------------------------------------

/// Shared, cookie-aware HTTP client. Cheap to clone.
#[derive(Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
    cookies: Arc<Jar>,
}

impl HttpClient {
    /// Build a new client from the given settings with an empty cookie jar.
    pub fn new(settings: &HttpSettings) -> Result<Self> {
        let cookies = Arc::new(Jar::default());
        let inner = reqwest::Client::builder()
            .cookie_provider(Arc::clone(&cookies))
            .redirect(redirect_policy())
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(settings.connect_timeout))
            .read_timeout(Duration::from_secs(settings.read_timeout))
            .pool_max_idle_per_host(settings.max_idle_conns_per_host)
            .pool_idle_timeout(Duration::from_secs(settings.idle_conn_timeout))
            .build()
            .map_err(ScmcError::Http)?;
        Ok(Self { inner, cookies })
    }

    pub fn from_defaults() -> Result<Self> {
        Self::new(&HttpSettings::default())
    }

    /// The underlying `reqwest::Client`, for the unauthenticated login hops.
    pub fn client(&self) -> &reqwest::Client {
        &self.inner
    }

    pub fn cookies(&self) -> &Arc<Jar> {
        &self.cookies
    }

    /// Issue one authenticated API call.
    ///
    /// In [`ResponseMode::Raw`] the caller owns the returned response and
    /// must check its status. The other modes fail with
    /// [`ScmcError::UnexpectedStatus`] on any non-2xx status.
    pub async fn send<T>(&self, token: &str, request: ApiRequest) -> Result<Reply<T>>
    where
        T: DeserializeOwned + Default,
    {
        if token.is_empty() {
            return Err(ScmcError::Unauthenticated);
        }

        let context = request.context();
        let url = request.url();
        let content_type = request.resolved_content_type().to_string();
        let mode = request.mode;
        let ApiRequest {
            method,
            path,
            body,
            range,
            ..
        } = request;

        let mut builder = self
            .inner
            .request(method, &url)
            .bearer_auth(token)
            .header(ORIGIN, WEB_ORIGIN)
            .header(REFERER, WEB_ORIGIN)
            .header(CONTENT_TYPE, content_type);
        if let Some(ref p) = path {
            builder = builder.query(&[("p", encode_path(p))]);
        }
        if let Some(ref r) = range {
            builder = builder.header(RANGE, r);
        }
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let outgoing = builder.build()?;
        log_request(&outgoing, path.as_deref());

        let response = self.inner.execute(outgoing).await?;
        log_response(&response, path.as_deref());

        match mode {
            ResponseMode::Raw => Ok(Reply::Raw(response)),
            ResponseMode::Decode => {
                let response = ensure_success(response, &context).await?;
                let bytes = response.bytes().await?;
                Ok(Reply::Decoded(decode_stream(&bytes)?))
            }
            ResponseMode::Ack => {
                ensure_success(response, &context).await?;
                Ok(Reply::Ack)
            }
        }
    }
}

fn redirect_policy() -> reqwest::redirect::Policy {
    reqwest::redirect::Policy::custom(|attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            attempt.error("too many redirects")
        } else {
            tracing::debug!(url = %attempt.url(), status = %attempt.status(), "redirect");
            attempt.follow()
        }
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Encode a logical path into the `p` query parameter value.
pub fn encode_path(path: &str) -> String {
    STANDARD.encode(format!("{STORAGE_ROOT}{path}"))
}

/// Decode a body holding zero or more concatenated JSON values.
///
/// The last value wins; an empty body yields `T::default()`.
pub fn decode_stream<T>(body: &[u8]) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let mut decoded = None;
    for value in serde_json::Deserializer::from_slice(body).into_iter::<T>() {
        decoded = Some(value?);
    }
    Ok(decoded.unwrap_or_default())
}

/// Pass 2xx responses through; otherwise log the body and fail.
pub async fn ensure_success(response: Response, context: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match response.text().await {
        Ok(body) => {
            for line in body.trim().lines() {
                tracing::error!(context, "response body: {}", line);
            }
        }
        Err(e) => tracing::error!(context, "failed to read response body: {}", e),
    }

    Err(ScmcError::UnexpectedStatus {
        status: status.as_u16(),
        context: context.to_string(),
    })
}

/// Render headers for trace output with credentials masked.
pub fn redacted_headers(headers: &HeaderMap) -> String {
    headers
        .iter()
        .map(|(name, value)| {
            let shown = if value.is_sensitive() || name == AUTHORIZATION || name == COOKIE {
                "<redacted>"
            } else {
                value.to_str().unwrap_or("<binary>")
            };
            format!("{name}: {shown}")
        })
        .collect::<Vec<_>>()
        .join("; ")
}

fn log_request(request: &reqwest::Request, path: Option<&str>) {
    tracing::debug!(
        method = %request.method(),
        url = %request.url(),
        path = path.unwrap_or(""),
        "outgoing request"
    );
    if tracing::enabled!(tracing::Level::TRACE) {
        tracing::trace!(headers = %redacted_headers(request.headers()), "outgoing request headers");
    }
}

fn log_response(response: &Response, path: Option<&str>) {
    tracing::debug!(
        status = response.status().as_u16(),
        url = %response.url(),
        path = path.unwrap_or(""),
        "response"
    );
    if tracing::enabled!(tracing::Level::TRACE) {
        tracing::trace!(headers = %redacted_headers(response.headers()), "response headers");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
