pub mod endpoints;
pub mod mycloud;
pub mod session;
pub mod types;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;

use crate::errors::Result;
use types::Metadata;

pub use endpoints::Endpoints;
pub use mycloud::{MyCloud, MyCloudConnector};
pub use session::{LoginStep, Session};

/// Streaming request or response body.
pub type ByteStream = BoxStream<'static, std::io::Result<Bytes>>;

/// A verified download: status already checked, body not yet consumed.
pub struct Download {
    pub status: u16,
    pub content_length: Option<u64>,
    pub content_range: Option<String>,
    pub body: ByteStream,
}

impl fmt::Debug for Download {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Download")
            .field("status", &self.status)
            .field("content_length", &self.content_length)
            .field("content_range", &self.content_range)
            .finish_non_exhaustive()
    }
}

/// Storage operations the backend adapter needs.
///
/// Paths are logical (no `/Drive` prefix). Directory paths end with `/`,
/// file paths never do.
#[async_trait]
pub trait CloudStorage: Send + Sync {
    async fn metadata(&self, path: &str) -> Result<Metadata>;

    /// Create a directory and its parents.
    async fn create_directory(&self, path: &str) -> Result<()>;

    async fn create_file(&self, path: &str, body: ByteStream) -> Result<()>;

    /// Open a file for streaming, optionally limited to a byte range.
    async fn open_file(&self, path: &str, range: Option<&str>) -> Result<Download>;

    /// Move files or directories (recursively) to the trash.
    async fn delete_many(&self, paths: &[String]) -> Result<()>;
}

/// Turns a credential pair into an authenticated storage handle.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, credentials: &Credentials) -> Result<Arc<dyn CloudStorage>>;
}

/// Username and password. `Debug` never prints the password.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
