//! myCloud login handshake.
//!
//! The web login bounces through three hosts before handing out a bearer
//! token in a redirect URL. [`Session::establish`] replays that chain with a
//! cookie-aware client. Each hop that can go wrong has its own [`LoginStep`]
//! so a failure says exactly where the flow broke.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::HeaderValue;
use reqwest::Url;
use serde_json::{Map, Value};

use crate::cloud::endpoints::Endpoints;
use crate::crypto;
use crate::errors::{Result, ScmcError};
use crate::http_client::HttpClient;

/// Key the identity provider reads the pre-filled username from.
pub const PROVIDED_USER_ID: &str = "providedUserId";

/// `base64("\"\"")`, the state value the web app sends.
const LOGIN_STATE: &str = "IiI=";

/// Stages of the login handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoginStep {
    Initiate,
    ExtractAuthState,
    BindIdentity,
    PreLogin,
    Credentials,
    Token,
}

impl fmt::Display for LoginStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoginStep::Initiate => "login initiation",
            LoginStep::ExtractAuthState => "auth state extraction",
            LoginStep::BindIdentity => "identity binding",
            LoginStep::PreLogin => "pre-login",
            LoginStep::Credentials => "credential submission",
            LoginStep::Token => "token validation",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// AuthState
// ---------------------------------------------------------------------------

/// Opaque state bag handed out by the login entry point.
///
/// Only `providedUserId` is ever written; every other key is carried back
/// untouched and in its original order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthState(Map<String, Value>);

impl AuthState {
    /// Decode the `auth_state` query value.
    ///
    /// The upstream strips Base64 padding, and query decoding turns `+`
    /// into a space. Both are undone before decoding.
    pub fn decode(raw: &str) -> Result<Self> {
        let mut normalized = raw.trim().replace(' ', "+");
        let unpadded = normalized.trim_end_matches('=').len();
        normalized.truncate(unpadded);
        while normalized.len() % 4 != 0 {
            normalized.push('=');
        }

        let json = STANDARD.decode(normalized.as_bytes()).map_err(|e| {
            ScmcError::login(LoginStep::ExtractAuthState, format!("invalid base64: {e}"))
        })?;
        let map: Map<String, Value> = serde_json::from_slice(&json).map_err(|e| {
            ScmcError::login(
                LoginStep::ExtractAuthState,
                format!("auth_state is not a JSON object: {e}"),
            )
        })?;
        Ok(Self(map))
    }

    pub fn bind_user(&mut self, username: &str) {
        self.0
            .insert(PROVIDED_USER_ID.to_string(), Value::String(username.to_string()));
    }

    /// Padded standard Base64 of the JSON object.
    pub fn encode(&self) -> Result<String> {
        let json = serde_json::to_vec(&self.0)
            .map_err(|e| ScmcError::login(LoginStep::BindIdentity, e.to_string()))?;
        Ok(STANDARD.encode(json))
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// An authenticated myCloud session: the cookie-carrying client, the auth
/// state used during login and the bearer token.
///
/// Only [`Session::establish`] creates one, so a `Session` always holds a
/// token.
#[derive(Clone)]
pub struct Session {
    http: HttpClient,
    auth_state: AuthState,
    token: String,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("auth_state_keys", &self.auth_state.len())
            .field("token", &"<redacted>")
            .finish()
    }
}

impl Session {
    /// Run the full login handshake. No step is retried.
    pub async fn establish(
        http: HttpClient,
        endpoints: &Endpoints,
        username: &str,
        password: &str,
    ) -> Result<Self> {
        tracing::info!(username, "logging in to myCloud");

        // 1. Initiate: the entry point redirects to a page carrying RURL.
        let client_id = crypto::random_uuid_v4()
            .map_err(|e| ScmcError::login(LoginStep::Initiate, e.to_string()))?;
        let response = http
            .client()
            .get(&endpoints.login)
            .query(&[
                ("client_id", client_id.as_str()),
                ("response_type", "token"),
                ("redirect_uri", endpoints.redirect_uri.as_str()),
                ("application_type", "web"),
                ("state", LOGIN_STATE),
            ])
            .send()
            .await
            .map_err(|e| ScmcError::login(LoginStep::Initiate, e.to_string()))?;
        let landed = response.url().clone();
        tracing::debug!(url = %landed, status = response.status().as_u16(), "login initiated");
        let rurl = query_param(&landed, "RURL")
            .ok_or_else(|| ScmcError::login(LoginStep::Initiate, "no RURL in redirect target"))?;

        // 2. ExtractAuthState
        let rurl = landed.join(&rurl).map_err(|e| {
            ScmcError::login(LoginStep::ExtractAuthState, format!("invalid RURL: {e}"))
        })?;
        let raw_state = query_param(&rurl, "auth_state").ok_or_else(|| {
            ScmcError::login(LoginStep::ExtractAuthState, "no auth_state in RURL")
        })?;
        let mut auth_state = AuthState::decode(&raw_state)?;
        tracing::debug!(keys = auth_state.len(), "auth state decoded");

        // 3. BindIdentity
        auth_state.bind_user(username);
        let encoded_state = auth_state.encode()?;

        // 4. PreLogin: the identity provider sets cookies and points at the SSO form.
        let response = http
            .client()
            .get(&endpoints.identity_login)
            .query(&[("type", "login"), ("auth_state", encoded_state.as_str())])
            .send()
            .await
            .map_err(|e| ScmcError::login(LoginStep::PreLogin, e.to_string()))?;
        let landed = response.url().clone();
        tracing::debug!(url = %landed, status = response.status().as_u16(), "pre-login done");
        let sso_rurl = query_param(&landed, "RURL")
            .ok_or_else(|| ScmcError::login(LoginStep::PreLogin, "no RURL in redirect target"))?;

        // 5. Credentials
        let response = http
            .client()
            .post(&endpoints.sso_login)
            .query(&[
                ("SNA", "mycloud"),
                ("RURL", sso_rurl.as_str()),
                ("UN", username),
            ])
            .form(&[
                ("username", username),
                ("p", "true"),
                ("password", password),
                ("anmelden", ""),
            ])
            .send()
            .await
            .map_err(|e| ScmcError::login(LoginStep::Credentials, e.to_string()))?;
        let landed = response.url().clone();
        tracing::debug!(status = response.status().as_u16(), "credentials submitted");
        let raw_token = query_param(&landed, "access_token").ok_or_else(|| {
            ScmcError::login(LoginStep::Credentials, "no access token was returned")
        })?;

        // 6. Token: query decoding turned '+' into spaces.
        let token = raw_token.replace(' ', "+");
        if token.trim().is_empty() {
            return Err(ScmcError::login(LoginStep::Token, "access token is empty"));
        }
        HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
            ScmcError::login(
                LoginStep::Token,
                "access token cannot be sent as an HTTP header",
            )
        })?;

        tracing::info!(username, "logged in to myCloud");
        Ok(Self {
            http,
            auth_state,
            token,
        })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    pub fn auth_state(&self) -> &AuthState {
        &self.auth_state
    }
}

fn query_param(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
