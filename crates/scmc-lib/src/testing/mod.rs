//! In-process fake of the myCloud login chain and storage API for tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::header::{CONTENT_RANGE, COOKIE, LOCATION, RANGE, SET_COOKIE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Form, Json, Router};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::Url;
use serde_json::{json, Value};

use crate::cloud::endpoints::Endpoints;
use crate::cloud::session::{LoginStep, PROVIDED_USER_ID};
use crate::cloud::types::{DeleteRequest, DeleteResponse};
use crate::http_client::STORAGE_ROOT;

pub const FAKE_USER: &str = "alice@example.ch";
pub const FAKE_PASSWORD: &str = "correct horse";
/// Contains `+` and `=` so redirect query decoding mangles it.
pub const FAKE_TOKEN: &str = "tok+en/abc==";

/// Value carried through the auth state; encodes with a `+`.
const NONCE: &str = "~~~>>>";

/// Serve `router` on an ephemeral local port and return its base URL.
pub async fn spawn_router(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

#[derive(Default)]
struct Store {
    /// Full `/Drive/...` paths; directories end with `/`.
    entries: BTreeMap<String, Vec<u8>>,
    trash: Vec<String>,
    reject: HashSet<String>,
    name_override: Option<String>,
    broken: Option<LoginStep>,
    login_delay: Duration,
}

struct FakeState {
    base: String,
    store: Mutex<Store>,
    logins: AtomicUsize,
}

impl FakeState {
    fn store(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap()
    }

    fn url(&self, path: &str, params: &[(&str, &str)]) -> String {
        let mut url = Url::parse(&format!("{}{}", self.base, path)).unwrap();
        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in params {
                pairs.append_pair(k, v);
            }
        }
        url.to_string()
    }
}

/// Handle to a running fake upstream.
pub struct FakeCloud {
    state: Arc<FakeState>,
}

impl FakeCloud {
    pub async fn start() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let state = Arc::new(FakeState {
            base,
            store: Mutex::new(Store::default()),
            logins: AtomicUsize::new(0),
        });

        let router = Router::new()
            .route("/login", get(login_entry))
            .route("/portal", get(|| async { "portal" }))
            .route("/idp/login", get(identity_login))
            .route("/sso/form", get(|| async { "sso form" }))
            .route("/sso/login", post(sso_login))
            .route("/landing", get(|| async { "welcome" }))
            .route("/me", get(me))
            .route("/usage", get(usage))
            .route("/metadata", get(metadata))
            .route("/object", put(put_object).get(get_object))
            .route("/trash/items", put(trash_items))
            .with_state(Arc::clone(&state));

        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        Self { state }
    }

    pub fn endpoints(&self) -> Endpoints {
        Endpoints::with_base(&self.state.base)
    }

    /// Number of successful credential submissions.
    pub fn logins(&self) -> usize {
        self.state.logins.load(Ordering::SeqCst)
    }

    /// Make the given login hop misbehave.
    pub fn break_login(&self, step: LoginStep) {
        self.state.store().broken = Some(step);
    }

    pub fn set_login_delay(&self, delay: Duration) {
        self.state.store().login_delay = delay;
    }

    /// Echo this name instead of the real one when objects are created.
    pub fn override_name(&self, name: Option<&str>) {
        self.state.store().name_override = name.map(str::to_string);
    }

    pub fn reject_delete(&self, path: &str) {
        self.state.store().reject.insert(full(path));
    }

    pub fn exists(&self, path: &str) -> bool {
        self.state.store().entries.contains_key(&full(path))
    }

    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.state.store().entries.get(&full(path)).cloned()
    }

    pub fn put_file(&self, path: &str, content: &[u8]) {
        let mut store = self.state.store();
        insert_with_parents(&mut store.entries, &full(path), content.to_vec());
    }

    pub fn trashed(&self, path: &str) -> bool {
        self.state.store().trash.contains(&full(path))
    }

    /// Directories strictly below `path`.
    pub fn directories_under(&self, path: &str) -> usize {
        let prefix = full(path);
        self.state
            .store()
            .entries
            .keys()
            .filter(|k| k.starts_with(&prefix) && **k != prefix && k.ends_with('/'))
            .count()
    }
}

fn full(path: &str) -> String {
    format!("{STORAGE_ROOT}{path}")
}

fn name_of(path: &str) -> String {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or("")
        .to_string()
}

fn insert_with_parents(entries: &mut BTreeMap<String, Vec<u8>>, path: &str, content: Vec<u8>) {
    let trimmed = path.trim_end_matches('/');
    let mut end = 0;
    while let Some(pos) = trimmed[end + 1..].find('/') {
        end += pos + 1;
        entries.entry(format!("{}/", &trimmed[..end])).or_default();
    }
    entries.insert(path.to_string(), content);
}

fn redirect(location: String) -> Response {
    (StatusCode::FOUND, [(LOCATION, location)]).into_response()
}

fn see_other(location: String) -> Response {
    (StatusCode::SEE_OTHER, [(LOCATION, location)]).into_response()
}

// ---------------------------------------------------------------------------
// Login chain
// ---------------------------------------------------------------------------

async fn login_entry(
    State(state): State<Arc<FakeState>>,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    let broken = state.store().broken;
    let valid = q.get("client_id").map(|c| c.len() == 36).unwrap_or(false)
        && q.get("response_type").map(String::as_str) == Some("token")
        && q.get("application_type").map(String::as_str) == Some("web")
        && q.get("state").map(String::as_str) == Some("IiI=");
    if !valid {
        return StatusCode::BAD_REQUEST.into_response();
    }

    match broken {
        Some(LoginStep::Initiate) => redirect(state.url("/portal", &[])),
        Some(LoginStep::ExtractAuthState) => {
            redirect(state.url("/portal", &[("RURL", "/idp/start?other=1")]))
        }
        _ => {
            let auth_state = json!({
                "client_id": q.get("client_id"),
                "nonce": NONCE,
                "redirect_uri": q.get("redirect_uri"),
            });
            let encoded = STANDARD.encode(serde_json::to_vec(&auth_state).unwrap());
            let inner = format!("/idp/start?auth_state={}", encoded.trim_end_matches('='));
            redirect(state.url("/portal", &[("RURL", &inner)]))
        }
    }
}

async fn identity_login(
    State(state): State<Arc<FakeState>>,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    let decoded = q
        .get("auth_state")
        .and_then(|s| STANDARD.decode(s).ok())
        .and_then(|b| serde_json::from_slice::<Value>(&b).ok());
    let user = match decoded {
        Some(v) if v["nonce"] == NONCE && q.get("type").map(String::as_str) == Some("login") => {
            match v[PROVIDED_USER_ID].as_str() {
                Some(u) => u.to_string(),
                None => return StatusCode::BAD_REQUEST.into_response(),
            }
        }
        _ => return StatusCode::BAD_REQUEST.into_response(),
    };

    if state.store().broken == Some(LoginStep::PreLogin) {
        return redirect(state.url("/sso/form", &[]));
    }

    (
        StatusCode::FOUND,
        [
            (SET_COOKIE, format!("idp_session={user}; Path=/")),
            (LOCATION, state.url("/sso/form", &[("RURL", "/sso/continue")])),
        ],
    )
        .into_response()
}

async fn sso_login(
    State(state): State<Arc<FakeState>>,
    Query(q): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let has_cookie = headers
        .get(COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(|c| c.contains("idp_session="))
        .unwrap_or(false);
    let well_formed = has_cookie
        && q.get("SNA").map(String::as_str) == Some("mycloud")
        && q.get("RURL").map(String::as_str) == Some("/sso/continue")
        && q.get("UN") == form.get("username")
        && form.get("p").map(String::as_str) == Some("true")
        && form.contains_key("anmelden");
    if !well_formed {
        return StatusCode::BAD_REQUEST.into_response();
    }

    let (broken, delay) = {
        let store = state.store();
        (store.broken, store.login_delay)
    };
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let accepted = form.get("username").map(String::as_str) == Some(FAKE_USER)
        && form.get("password").map(String::as_str) == Some(FAKE_PASSWORD);
    match broken {
        Some(LoginStep::Credentials) => see_other(state.url("/sso/form", &[("error", "1")])),
        Some(LoginStep::Token) if accepted => {
            see_other(format!("{}/landing?access_token=bad%0Atoken", state.base))
        }
        _ if accepted => {
            state.logins.fetch_add(1, Ordering::SeqCst);
            // Raw '+' in the query, as the real SSO sends it.
            see_other(format!("{}/landing?access_token={FAKE_TOKEN}", state.base))
        }
        _ => see_other(state.url("/sso/form", &[("error", "1")])),
    }
}

// ---------------------------------------------------------------------------
// Storage API
// ---------------------------------------------------------------------------

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {FAKE_TOKEN}"))
        .unwrap_or(false)
}

fn target(q: &HashMap<String, String>) -> Option<String> {
    let raw = STANDARD.decode(q.get("p")?).ok()?;
    let path = String::from_utf8(raw).ok()?;
    path.starts_with(STORAGE_ROOT).then_some(path)
}

async fn me(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!({
        "Identifier": "id-1",
        "UserName": FAKE_USER,
        "Email": FAKE_USER,
        "EmailConfirmed": true,
        "Subscription": {"Name": "Free", "MaxFileSize": 2147483648u64},
        "Editions": null,
        "HashID": "hash-1",
    }))
    .into_response()
}

async fn usage(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    // Two concatenated documents; clients keep the last.
    let body = format!(
        "{}\n{}\n",
        json!({"TotalBytes": 1}),
        json!({
            "BackupBytes": 1048576,
            "DriveBytes": 2097152,
            "TotalBytes": 3145728,
        })
    );
    ([("content-type", "application/json")], body).into_response()
}

async fn metadata(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let Some(path) = target(&q) else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    let store = state.store();
    let Some(content) = store.entries.get(&path) else {
        return (StatusCode::NOT_FOUND, "not found").into_response();
    };

    if !path.ends_with('/') {
        return Json(json!({
            "Name": name_of(&path),
            "Path": path,
            "Length": content.len(),
            "Mime": "application/octet-stream",
            "CreationTime": "2018-01-01T00:00:00Z",
        }))
        .into_response();
    }

    let mut files = Vec::new();
    let mut directories = Vec::new();
    for (key, value) in store.entries.range(path.clone()..) {
        if !key.starts_with(&path) {
            break;
        }
        let rest = &key[path.len()..];
        if rest.is_empty() {
            continue;
        }
        match rest.find('/') {
            None => files.push(json!({"Name": rest, "Path": key, "Length": value.len()})),
            Some(i) if i == rest.len() - 1 => {
                directories.push(json!({"Name": &rest[..i], "Path": key}))
            }
            Some(_) => {}
        }
    }
    Json(json!({
        "Name": name_of(&path),
        "Path": path,
        "Files": files,
        "Directories": directories,
    }))
    .into_response()
}

async fn put_object(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Query(q): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let Some(path) = target(&q) else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    let mut store = state.store();
    let length = body.len();
    if path.ends_with('/') {
        insert_with_parents(&mut store.entries, &path, Vec::new());
    } else {
        insert_with_parents(&mut store.entries, &path, body.to_vec());
    }
    let name = store.name_override.clone().unwrap_or_else(|| name_of(&path));
    Json(json!({"Name": name, "Path": path, "Length": length})).into_response()
}

fn parse_range(header: &str, len: usize) -> Option<(usize, usize)> {
    let spec = header.strip_prefix("bytes=")?;
    let (start, end) = spec.split_once('-')?;
    let start: usize = start.parse().ok()?;
    let end: usize = if end.is_empty() {
        len.checked_sub(1)?
    } else {
        end.parse::<usize>().ok()?.min(len.checked_sub(1)?)
    };
    (start <= end).then_some((start, end))
}

async fn get_object(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let Some(path) = target(&q) else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    let content = match state.store().entries.get(&path) {
        Some(c) if !path.ends_with('/') => c.clone(),
        _ => return (StatusCode::NOT_FOUND, "no such object").into_response(),
    };

    match headers.get(RANGE).and_then(|v| v.to_str().ok()) {
        Some(range) => match parse_range(range, content.len()) {
            Some((start, end)) => (
                StatusCode::PARTIAL_CONTENT,
                [(
                    CONTENT_RANGE,
                    format!("bytes {start}-{end}/{}", content.len()),
                )],
                content[start..=end].to_vec(),
            )
                .into_response(),
            None => StatusCode::RANGE_NOT_SATISFIABLE.into_response(),
        },
        None => (StatusCode::OK, content).into_response(),
    }
}

async fn trash_items(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Json(request): Json<DeleteRequest>,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let mut store = state.store();
    let mut outcome = DeleteResponse::default();
    for item in request.items {
        if store.reject.contains(&item) || !store.entries.contains_key(&item) {
            outcome.failed.push(item);
            continue;
        }
        if item.ends_with('/') {
            store.entries.retain(|k, _| !k.starts_with(&item));
        } else {
            store.entries.remove(&item);
        }
        store.trash.push(item.clone());
        outcome.completed.push(item);
    }
    Json(outcome).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_with_parents() {
        let mut entries = BTreeMap::new();
        insert_with_parents(&mut entries, "/Drive/a/b/c", b"x".to_vec());
        let keys: Vec<&String> = entries.keys().collect();
        assert_eq!(keys, vec!["/Drive/", "/Drive/a/", "/Drive/a/b/", "/Drive/a/b/c"]);
    }

    #[test]
    fn test_parse_range() {
        assert_eq!(parse_range("bytes=2-6", 10), Some((2, 6)));
        assert_eq!(parse_range("bytes=5-", 10), Some((5, 9)));
        assert_eq!(parse_range("bytes=0-99", 10), Some((0, 9)));
        assert_eq!(parse_range("bytes=0-1", 0), None);
        assert_eq!(parse_range("items=0-1", 10), None);
    }
}
