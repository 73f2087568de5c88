//! restic REST backend server.
//!
//! An axum server translating the restic REST protocol into myCloud storage
//! calls. Every request goes through Basic authentication and the
//! per-username session cache before reaching the single dispatcher.

pub mod config;
pub mod handlers;
pub mod middleware;
pub mod protocol;
pub mod sessions;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{middleware as axum_mw, Router};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

use crate::cloud::Connector;
use crate::errors::{Result, ScmcError};
use config::ServerConfig;
use sessions::SessionCache;

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// Shared state for the backend handlers.
pub struct AppState {
    pub sessions: SessionCache,
    pub connector: Arc<dyn Connector>,
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(connector: Arc<dyn Connector>, request_timeout: Duration) -> Self {
        Self {
            sessions: SessionCache::new(),
            connector,
            request_timeout,
        }
    }
}

// ---------------------------------------------------------------------------
// ShutdownHandle
// ---------------------------------------------------------------------------

/// Handle returned by `start_server` that allows triggering graceful shutdown.
pub struct ShutdownHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    local_addr: SocketAddr,
    drain_timeout: Duration,
    task: JoinHandle<()>,
}

impl ShutdownHandle {
    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting connections and wait for in-flight requests, up to
    /// the drain timeout. After that the server task is aborted and this
    /// returns without waiting further.
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            if tx.send(()).is_err() {
                return Err(ScmcError::Server {
                    status: 500,
                    message: "Server already stopped".into(),
                });
            }
        }

        match tokio::time::timeout(self.drain_timeout, &mut self.task).await {
            Ok(_) => {
                tracing::info!("server stopped");
            }
            Err(_) => {
                tracing::warn!(
                    timeout = ?self.drain_timeout,
                    "in-flight requests did not finish in time, closing connections"
                );
                self.task.abort();
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Router construction
// ---------------------------------------------------------------------------

/// Build the backend router. Every path and method goes to
/// [`handlers::dispatch`] behind the session middleware.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .fallback(handlers::dispatch)
        .layer(axum_mw::from_fn_with_state(
            state,
            middleware::session_middleware,
        ))
        .layer(TraceLayer::new_for_http())
}

// ---------------------------------------------------------------------------
// Server startup
// ---------------------------------------------------------------------------

/// Bind the listener and serve in a background task.
///
/// Returns a `ShutdownHandle` for graceful shutdown.
pub async fn start_server(
    config: &ServerConfig,
    connector: Arc<dyn Connector>,
) -> Result<ShutdownHandle> {
    config.validate()?;

    let state = Arc::new(AppState::new(connector, config.request_timeout()));
    let router = build_router(state);
    let addr = config.addr();

    let listener = TcpListener::bind(addr).await.map_err(|e| ScmcError::Server {
        status: 500,
        message: format!("Failed to bind to {}: {}", addr, e),
    })?;

    let local_addr = listener.local_addr().map_err(|e| ScmcError::Server {
        status: 500,
        message: format!("Failed to get local address: {}", e),
    })?;

    tracing::info!(addr = %local_addr, "restic REST backend listening");

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let task = tokio::spawn(async move {
        let serve = axum::serve(listener, router).with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
            tracing::info!("shutdown requested, draining in-flight requests");
        });

        if let Err(e) = serve.await {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok(ShutdownHandle {
        shutdown_tx: Some(shutdown_tx),
        local_addr,
        drain_timeout: config.shutdown_timeout(),
        task,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
