//! HTTP Basic authentication middleware.
//!
//! Every request must carry Basic credentials. The first request for a
//! username logs in to myCloud; later ones reuse the cached session. The
//! resolved storage handle is attached to the request as [`Authenticated`].
//! The whole request, login included, is bounded by the request timeout.
//! Responses produced here carry the negotiated media type like the
//! dispatcher's do.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, WWW_AUTHENTICATE},
        HeaderMap, HeaderValue, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use super::protocol::ApiVersion;
use super::AppState;
use crate::cloud::{CloudStorage, Credentials};

pub const REALM: &str = "Basic realm=\"restic\"";

/// Request extension carrying the caller's storage handle.
#[derive(Clone)]
pub struct Authenticated {
    pub username: String,
    pub storage: Arc<dyn CloudStorage>,
}

/// Extract Basic credentials from the `Authorization` header.
pub fn parse_basic_auth(headers: &HeaderMap) -> Option<Credentials> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some(Credentials::new(username, password))
}

/// 401 with nothing but the status text.
pub fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(WWW_AUTHENTICATE, REALM)],
        "Unauthorized",
    )
        .into_response()
}

pub async fn session_middleware(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let version = ApiVersion::from_accept(req.headers().get(ACCEPT).and_then(|v| v.to_str().ok()));

    let run = authenticate_and_run(&state, req, next);
    let mut response = match tokio::time::timeout(state.request_timeout, run).await {
        Ok(response) => response,
        Err(_) => {
            tracing::error!(%method, %uri, timeout = ?state.request_timeout, "request timed out");
            let status = StatusCode::INTERNAL_SERVER_ERROR;
            (status, status.canonical_reason().unwrap_or("")).into_response()
        }
    };
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(version.media_type()));
    response
}

async fn authenticate_and_run(state: &AppState, mut req: Request, next: Next) -> Response {
    let Some(credentials) = parse_basic_auth(req.headers()) else {
        tracing::warn!(uri = %req.uri(), "request without basic credentials");
        return unauthorized();
    };

    match state
        .sessions
        .get_or_login(&credentials, state.connector.as_ref())
        .await
    {
        Ok(storage) => {
            req.extensions_mut().insert(Authenticated {
                username: credentials.username,
                storage,
            });
            next.run(req).await
        }
        Err(e) => {
            tracing::error!(username = %credentials.username, "authorization failed: {}", e);
            unauthorized()
        }
    }
}
