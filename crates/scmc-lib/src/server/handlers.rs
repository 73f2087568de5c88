//! restic REST backend request handling.
//!
//! A single dispatcher maps (path kind, method) onto storage operations
//! after the `data/` key rewrite. Upstream error details are logged, never
//! returned to the client.

use axum::{
    body::Body,
    extract::{Extension, Request},
    http::{
        header::{ACCEPT, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, RANGE},
        HeaderValue, Method, StatusCode,
    },
    response::{IntoResponse, Response},
    Json,
};
use futures_util::{StreamExt, TryStreamExt};

use super::middleware::Authenticated;
use super::protocol::{
    is_data_collection, layout_directories, render_listing, rewrite_data_key, ApiVersion,
    ListEntry, PathKind,
};
use crate::cloud::CloudStorage;
use crate::errors::ScmcError;

/// Why a backend request was not served.
#[derive(Debug)]
pub enum Failure {
    BadRequest(&'static str),
    NotImplemented,
    Storage(ScmcError),
}

impl From<ScmcError> for Failure {
    fn from(err: ScmcError) -> Self {
        Failure::Storage(err)
    }
}

impl Failure {
    pub fn status(&self) -> StatusCode {
        match self {
            Failure::BadRequest(_) => StatusCode::BAD_REQUEST,
            Failure::NotImplemented => StatusCode::NOT_IMPLEMENTED,
            Failure::Storage(err) => status_for(err),
        }
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Failure::BadRequest(reason) => write!(f, "bad request: {reason}"),
            Failure::NotImplemented => f.write_str("not implemented"),
            Failure::Storage(err) => write!(f, "{err}"),
        }
    }
}

/// HTTP status for a storage error.
pub fn status_for(err: &ScmcError) -> StatusCode {
    match err {
        ScmcError::Unauthenticated | ScmcError::AuthenticationFailed { .. } => {
            StatusCode::UNAUTHORIZED
        }
        ScmcError::NotFound(_) => StatusCode::NOT_FOUND,
        ScmcError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        e if e.upstream_status() == Some(404) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

type Outcome = std::result::Result<Response, Failure>;

/// Fallback handler serving every backend path.
pub async fn dispatch(Extension(auth): Extension<Authenticated>, req: Request) -> Response {
    let (parts, body) = req.into_parts();
    let version = ApiVersion::from_accept(parts.headers.get(ACCEPT).and_then(|v| v.to_str().ok()));
    let range = parts
        .headers
        .get(RANGE)
        .and_then(|v| v.to_str().ok())
        .filter(|r| !r.is_empty())
        .map(str::to_string);
    let path = rewrite_data_key(parts.uri.path()).into_owned();
    let storage = auth.storage.as_ref();

    let outcome = match (PathKind::of(&path), &parts.method) {
        (PathKind::Collection, &Method::POST) => {
            if create_requested(parts.uri.query()) {
                create_repository(storage, &path).await
            } else {
                Err(Failure::BadRequest("missing create=true"))
            }
        }
        (PathKind::Collection, &Method::DELETE) => delete(storage, &path).await,
        (PathKind::Collection, &Method::GET) => list(storage, &path, version).await,
        (PathKind::Item, &Method::HEAD) => check(storage, &path).await,
        (PathKind::Item, &Method::GET) => get(storage, &path, range.as_deref()).await,
        (PathKind::Item, &Method::POST) => save(storage, &path, body).await,
        (PathKind::Item, &Method::DELETE) => delete(storage, &path).await,
        _ => Err(Failure::NotImplemented),
    };

    let range_note = range.map(|r| format!(" {r}")).unwrap_or_default();
    let mut response = match outcome {
        Ok(response) => {
            tracing::info!(
                user = %auth.username,
                "{} {}{} -> OK",
                parts.method,
                parts.uri,
                range_note
            );
            response
        }
        Err(failure) => {
            let status = failure.status();
            tracing::info!(
                user = %auth.username,
                "{} {}{} -> error: {}",
                parts.method,
                parts.uri,
                range_note,
                failure
            );
            (status, status.canonical_reason().unwrap_or("")).into_response()
        }
    };
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(version.media_type()));
    response
}

fn create_requested(query: Option<&str>) -> bool {
    query
        .map(|q| q.split('&').any(|pair| pair == "create=true"))
        .unwrap_or(false)
}

/// Create the repository root, its areas and every `data/` shard, in
/// order. The first failure aborts; nothing is rolled back.
async fn create_repository(storage: &dyn CloudStorage, path: &str) -> Outcome {
    for dir in layout_directories(path) {
        storage.create_directory(&dir).await?;
    }
    Ok(StatusCode::OK.into_response())
}

async fn delete(storage: &dyn CloudStorage, path: &str) -> Outcome {
    storage.delete_many(&[path.to_string()]).await?;
    Ok(StatusCode::OK.into_response())
}

async fn check(storage: &dyn CloudStorage, path: &str) -> Outcome {
    let metadata = storage.metadata(path).await?;
    Ok((StatusCode::OK, [(CONTENT_LENGTH, metadata.length.to_string())]).into_response())
}

async fn get(storage: &dyn CloudStorage, path: &str, range: Option<&str>) -> Outcome {
    let download = storage.open_file(path, range).await?;
    let status = StatusCode::from_u16(download.status).unwrap_or(StatusCode::OK);

    let mut response = Response::new(Body::from_stream(download.body));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    if let Some(length) = download.content_length {
        headers.insert(CONTENT_LENGTH, HeaderValue::from(length));
    }
    if let Some(content_range) = download.content_range {
        if let Ok(value) = HeaderValue::from_str(&content_range) {
            headers.insert(CONTENT_RANGE, value);
        }
    }
    Ok(response)
}

async fn save(storage: &dyn CloudStorage, path: &str, body: Body) -> Outcome {
    let stream = body
        .into_data_stream()
        .map_err(std::io::Error::other)
        .boxed();
    storage.create_file(path, stream).await?;
    Ok(StatusCode::OK.into_response())
}

/// List file entries. `data/` is flattened across its shard directories.
async fn list(storage: &dyn CloudStorage, path: &str, version: ApiVersion) -> Outcome {
    let metadata = storage.metadata(path).await?;

    let mut entries = Vec::new();
    if is_data_collection(path) {
        for dir in &metadata.directories {
            let shard = storage.metadata(&format!("{path}{}/", dir.name)).await?;
            entries.extend(shard.files.into_iter().map(|f| ListEntry {
                name: f.name,
                size: f.length,
            }));
        }
    } else {
        entries.extend(metadata.files.into_iter().map(|f| ListEntry {
            name: f.name,
            size: f.length,
        }));
    }

    Ok(Json(render_listing(version, entries)).into_response())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
