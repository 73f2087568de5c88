//! Backend server settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, ScmcError};

pub const DEFAULT_ADDRESS: &str = "127.0.0.1:9000";

/// Upper bound for a single backend request, in seconds.
pub const REQUEST_TIMEOUT_SECS: u64 = 300;

/// How long shutdown waits for in-flight requests, in seconds.
pub const SHUTDOWN_TIMEOUT_SECS: u64 = 10;

/// Configuration for the restic REST backend listener.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Bind address as "host:port".
    pub address: String,
    pub request_timeout_secs: u64,
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.into(),
            request_timeout_secs: REQUEST_TIMEOUT_SECS,
            shutdown_timeout_secs: SHUTDOWN_TIMEOUT_SECS,
        }
    }
}

impl ServerConfig {
    /// Validate the configuration: the address needs a numeric port and
    /// both timeouts must be positive.
    pub fn validate(&self) -> Result<()> {
        let port = self
            .address
            .rsplit_once(':')
            .map(|(host, port)| (host, port.parse::<u16>()));
        match port {
            Some((host, Ok(_))) if !host.is_empty() => {}
            _ => {
                return Err(ScmcError::Config(format!(
                    "invalid listen address \"{}\", expected host:port",
                    self.address
                )))
            }
        }
        if self.request_timeout_secs == 0 {
            return Err(ScmcError::Config("request timeout must be positive".into()));
        }
        if self.shutdown_timeout_secs == 0 {
            return Err(ScmcError::Config("shutdown timeout must be positive".into()));
        }
        Ok(())
    }

    pub fn addr(&self) -> &str {
        &self.address
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}
