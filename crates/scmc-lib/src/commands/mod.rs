//! CLI commands and the shared state they run against.

pub mod check;
pub mod info;
pub mod serve;
pub mod usage;
pub mod version;

use std::sync::Arc;

use clap::ArgMatches;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;

use crate::cli::CommandRegistry;
use crate::cloud::{Credentials, MyCloud, MyCloudConnector};
use crate::config::{Config, EnvConfig};
use crate::errors::{Result, ScmcError};
use crate::http_client::HttpClient;
use crate::tui;

// ---------------------------------------------------------------------------
// Services
// ---------------------------------------------------------------------------

/// Configuration and lazily established clients shared by command handlers.
///
/// Nothing logs in until a command asks for it, so `version` and
/// `restic-rest-server` never prompt for credentials.
pub struct Services {
    pub config: Config,
    pub env: &'static EnvConfig,
    pub shutdown: CancellationToken,
    username: Option<String>,
    password: Option<String>,
    mycloud: OnceCell<Arc<MyCloud>>,
}

impl Services {
    pub fn new(config: Config, env: &'static EnvConfig, shutdown: CancellationToken) -> Self {
        Self {
            config,
            env,
            shutdown,
            username: None,
            password: None,
            mycloud: OnceCell::new(),
        }
    }

    /// Credentials given as global CLI flags; they win over every other source.
    pub fn with_credential_flags(
        mut self,
        username: Option<String>,
        password: Option<String>,
    ) -> Self {
        self.username = username;
        self.password = password;
        self
    }

    /// Resolve credentials from flags, config file and environment,
    /// prompting for anything still missing.
    pub fn credentials(&self) -> Result<Credentials> {
        let (username, password) =
            self.config
                .credentials(self.username.clone(), self.password.clone(), self.env);
        tui::complete_credentials(username, password)
    }

    pub fn connector(&self) -> MyCloudConnector {
        MyCloudConnector::new(self.config.http.clone(), self.config.endpoints.clone())
    }

    /// Perform a fresh login, bypassing the cached client.
    pub async fn login(&self, credentials: &Credentials) -> Result<MyCloud> {
        let http = HttpClient::new(&self.config.http)?;
        MyCloud::login(
            http,
            self.config.endpoints.clone(),
            &credentials.username,
            &credentials.password,
        )
        .await
    }

    /// Lazily log in and return the shared client.
    pub async fn mycloud(&self) -> Result<&Arc<MyCloud>> {
        self.mycloud
            .get_or_try_init(|| async {
                let credentials = self.credentials()?;
                let cloud = self.login(&credentials).await?;
                tracing::debug!(username = %credentials.username, "logged in");
                Ok::<_, ScmcError>(Arc::new(cloud))
            })
            .await
    }
}

// ---------------------------------------------------------------------------
// Registration and dispatch
// ---------------------------------------------------------------------------

/// Register every command.
pub fn register_commands(registry: &mut CommandRegistry) -> Result<()> {
    registry.register(version::version_meta())?;
    registry.register(info::info_meta())?;
    registry.register(usage::usage_meta())?;
    registry.register(check::check_meta())?;
    registry.register(serve::serve_meta())?;
    Ok(())
}

/// Run the named subcommand.
pub async fn dispatch_command(name: &str, matches: &ArgMatches, services: &Services) -> Result<()> {
    match name {
        "version" => version::handle_version(matches),
        "info" => info::handle_info(matches, services).await?,
        "usage" => usage::handle_usage(services).await?,
        "check" => check::handle_check(services).await?,
        serve::COMMAND_NAME => serve::handle_serve(matches, services).await?,
        other => return Err(ScmcError::Command(format!("unknown command: {other}"))),
    }
    Ok(())
}
