//! Per-username cache of authenticated storage handles.
//!
//! One lock guards the map; each username owns a `OnceCell` so at most one
//! login runs per username while cached users proceed without contention.
//! A failed or abandoned login leaves the cell empty for the next caller.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell};

use crate::cloud::session::LoginStep;
use crate::cloud::{CloudStorage, Connector, Credentials};
use crate::crypto;
use crate::errors::{Result, ScmcError};

struct CachedSession {
    fingerprint: String,
    storage: Arc<dyn CloudStorage>,
}

#[derive(Default)]
pub struct SessionCache {
    entries: Mutex<HashMap<String, Arc<OnceCell<CachedSession>>>>,
}

impl SessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached handle for `credentials.username`, logging in
    /// through `connector` on first sight.
    ///
    /// A cached username presented with a different password is rejected.
    pub async fn get_or_login(
        &self,
        credentials: &Credentials,
        connector: &dyn Connector,
    ) -> Result<Arc<dyn CloudStorage>> {
        let cell = {
            let mut entries = self.entries.lock().await;
            Arc::clone(entries.entry(credentials.username.clone()).or_default())
        };

        let fingerprint =
            crypto::credential_fingerprint(&credentials.username, &credentials.password);
        let cached = cell
            .get_or_try_init(|| async {
                tracing::info!(username = %credentials.username, "establishing new session");
                let storage = connector.connect(credentials).await?;
                Ok::<_, ScmcError>(CachedSession {
                    fingerprint: fingerprint.clone(),
                    storage,
                })
            })
            .await?;

        if cached.fingerprint != fingerprint {
            tracing::warn!(
                username = %credentials.username,
                "password does not match cached session"
            );
            return Err(ScmcError::login(
                LoginStep::Credentials,
                "password does not match the established session",
            ));
        }
        Ok(Arc::clone(&cached.storage))
    }

    /// Number of usernames with an established session.
    pub async fn established(&self) -> usize {
        self.entries
            .lock()
            .await
            .values()
            .filter(|cell| cell.initialized())
            .count()
    }
}
