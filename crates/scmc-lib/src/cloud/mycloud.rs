//! Typed myCloud storage client.
//!
//! Wraps an authenticated [`Session`] and exposes the identity, usage,
//! metadata, object and trash endpoints.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{StreamExt, TryStreamExt};
use reqwest::header::CONTENT_RANGE;
use reqwest::StatusCode;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::cloud::endpoints::Endpoints;
use crate::cloud::session::Session;
use crate::cloud::types::{
    CreateObjectResponse, DeleteRequest, DeleteResponse, IdentityResponse, Metadata, UsageResponse,
};
use crate::cloud::{ByteStream, CloudStorage, Connector, Credentials, Download};
use crate::config::HttpSettings;
use crate::errors::{Result, ScmcError};
use crate::http_client::{
    ensure_success, ApiRequest, HttpClient, Reply, CONTENT_TYPE_JSON, CONTENT_TYPE_OCTET_STREAM,
    STORAGE_ROOT,
};

/// An authenticated myCloud account.
#[derive(Debug)]
pub struct MyCloud {
    session: Session,
    endpoints: Endpoints,
}

impl MyCloud {
    pub fn new(session: Session, endpoints: Endpoints) -> Self {
        Self { session, endpoints }
    }

    /// Log in and return a ready client.
    pub async fn login(
        http: HttpClient,
        endpoints: Endpoints,
        username: &str,
        password: &str,
    ) -> Result<Self> {
        let session = Session::establish(http, &endpoints, username, password).await?;
        Ok(Self::new(session, endpoints))
    }

    pub fn access_token(&self) -> &str {
        self.session.token()
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    async fn call<T>(&self, request: ApiRequest) -> Result<Reply<T>>
    where
        T: serde::de::DeserializeOwned + Default,
    {
        self.session
            .http()
            .send(self.session.token(), request)
            .await
    }

    // -----------------------------------------------------------------------
    // Account
    // -----------------------------------------------------------------------

    pub async fn identity(&self) -> Result<IdentityResponse> {
        self.call(ApiRequest::get(&self.endpoints.identity_server, "me"))
            .await?
            .into_decoded()
    }

    pub async fn usage(&self) -> Result<UsageResponse> {
        self.call(ApiRequest::get(&self.endpoints.storage_server, "usage"))
            .await?
            .into_decoded()
    }

    // -----------------------------------------------------------------------
    // Objects
    // -----------------------------------------------------------------------

    /// Metadata of a file, or of a directory and its children when `path`
    /// ends with `/`.
    pub async fn metadata(&self, path: &str) -> Result<Metadata> {
        let request = ApiRequest::get(&self.endpoints.storage_server, "metadata").path(path);
        match self.call(request).await {
            Ok(reply) => reply.into_decoded(),
            Err(e) if e.upstream_status() == Some(404) => {
                Err(ScmcError::NotFound(path.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    /// Create a directory with all parents. `path` must end with `/`.
    pub async fn create_directory(&self, path: &str) -> Result<()> {
        if !path.ends_with('/') {
            return Err(ScmcError::InvalidArgument(format!(
                "directory path must end with a slash: {path}"
            )));
        }

        let echo: CreateObjectResponse = self
            .call(ApiRequest::put(&self.endpoints.storage_server, "object").path(path))
            .await?
            .into_decoded()?;
        verify_echo(path, &echo.name)
    }

    /// Upload a file. `path` must not end with `/`.
    pub async fn create_file(&self, path: &str, body: impl Into<reqwest::Body>) -> Result<()> {
        if path.ends_with('/') {
            return Err(ScmcError::InvalidArgument(format!(
                "file path must not end with a slash: {path}"
            )));
        }

        let request = ApiRequest::put(&self.endpoints.storage_server, "object")
            .path(path)
            .body(body)
            .content_type(CONTENT_TYPE_OCTET_STREAM);
        let echo: CreateObjectResponse = self.call(request).await?.into_decoded()?;
        verify_echo(path, &echo.name)
    }

    /// Start a download and check its status: 206 when a range is given,
    /// 200 otherwise.
    pub async fn open_file(&self, path: &str, range: Option<&str>) -> Result<Download> {
        let range = range.filter(|r| !r.is_empty());
        let request = ApiRequest::get(&self.endpoints.storage_server, "object")
            .path(path)
            .range(range)
            .raw();
        let response = self.call::<()>(request).await?.into_raw()?;

        let expected = if range.is_some() {
            StatusCode::PARTIAL_CONTENT
        } else {
            StatusCode::OK
        };
        let status = response.status();
        if status != expected {
            let context = format!("GET object [{path}] (expected {})", expected.as_u16());
            return Err(match ensure_success(response, &context).await {
                Err(e) => e,
                Ok(_) => ScmcError::UnexpectedStatus {
                    status: status.as_u16(),
                    context,
                },
            });
        }

        let content_range = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        Ok(Download {
            status: status.as_u16(),
            content_length: response.content_length(),
            content_range,
            body: response
                .bytes_stream()
                .map_err(std::io::Error::other)
                .boxed(),
        })
    }

    /// Download a file into `sink`, returning the number of bytes written.
    pub async fn get_file<W>(&self, path: &str, sink: &mut W, range: Option<&str>) -> Result<u64>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let mut download = self.open_file(path, range).await?;
        let mut written = 0u64;
        while let Some(chunk) = download.body.next().await {
            let chunk = chunk?;
            sink.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        sink.flush().await?;
        Ok(written)
    }

    /// Move items to the trash. Directories are removed recursively.
    pub async fn delete_many(&self, paths: &[String]) -> Result<()> {
        if paths.is_empty() {
            return Ok(());
        }

        let body = serde_json::to_vec(&DeleteRequest {
            items: paths
                .iter()
                .map(|p| format!("{STORAGE_ROOT}{p}"))
                .collect(),
        })?;
        let request = ApiRequest::put(&self.endpoints.storage_server, "trash/items")
            .body(body)
            .content_type(CONTENT_TYPE_JSON);
        let outcome: DeleteResponse = self.call(request).await?.into_decoded()?;

        tracing::debug!(
            completed = outcome.completed.len(),
            failed = outcome.failed.len(),
            "trash request done"
        );
        if !outcome.failed.is_empty() {
            return Err(ScmcError::PartialFailure {
                items: outcome.failed,
            });
        }
        Ok(())
    }
}

/// Last non-empty segment of a path, ignoring a trailing slash.
pub fn final_segment(path: &str) -> &str {
    path.trim_end_matches('/').rsplit('/').next().unwrap_or("")
}

fn verify_echo(path: &str, echoed: &str) -> Result<()> {
    let expected = final_segment(path);
    if echoed != expected {
        return Err(ScmcError::Protocol(format!(
            "invalid name returned for {path}: expected \"{expected}\", got \"{echoed}\""
        )));
    }
    Ok(())
}

#[async_trait]
impl CloudStorage for MyCloud {
    async fn metadata(&self, path: &str) -> Result<Metadata> {
        MyCloud::metadata(self, path).await
    }

    async fn create_directory(&self, path: &str) -> Result<()> {
        MyCloud::create_directory(self, path).await
    }

    async fn create_file(&self, path: &str, body: ByteStream) -> Result<()> {
        MyCloud::create_file(self, path, reqwest::Body::wrap_stream(body)).await
    }

    async fn open_file(&self, path: &str, range: Option<&str>) -> Result<Download> {
        MyCloud::open_file(self, path, range).await
    }

    async fn delete_many(&self, paths: &[String]) -> Result<()> {
        MyCloud::delete_many(self, paths).await
    }
}

// ---------------------------------------------------------------------------
// Connector
// ---------------------------------------------------------------------------

/// Logs in with a fresh cookie jar per credential pair.
#[derive(Debug, Clone, Default)]
pub struct MyCloudConnector {
    http: HttpSettings,
    endpoints: Endpoints,
}

impl MyCloudConnector {
    pub fn new(http: HttpSettings, endpoints: Endpoints) -> Self {
        Self { http, endpoints }
    }
}

#[async_trait]
impl Connector for MyCloudConnector {
    async fn connect(&self, credentials: &Credentials) -> Result<Arc<dyn CloudStorage>> {
        let client = HttpClient::new(&self.http)?;
        let cloud = MyCloud::login(
            client,
            self.endpoints.clone(),
            &credentials.username,
            &credentials.password,
        )
        .await?;
        Ok(Arc::new(cloud))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
