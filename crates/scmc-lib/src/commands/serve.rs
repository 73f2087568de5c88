//! restic REST backend command.
//!
//! Provides `restic-rest-server` (alias: `serve`), which runs the backend
//! until SIGINT or SIGTERM and then drains in-flight requests.

use std::sync::Arc;

use clap::{value_parser, Arg, ArgMatches, Command};

use super::Services;
use crate::cli::{CommandBuilder, CommandCategory, CommandMeta};
use crate::errors::Result;
use crate::output;
use crate::server::{self, config::ServerConfig};

pub const COMMAND_NAME: &str = "restic-rest-server";

/// Build the `restic-rest-server` clap command.
pub fn serve_command() -> Command {
    Command::new(COMMAND_NAME)
        .about("Serve a restic REST backend storing into myCloud")
        .arg(
            Arg::new("address")
                .short('a')
                .long("address")
                .help("Listen address as host:port [default: from config, 127.0.0.1:9000]"),
        )
        .arg(
            Arg::new("request-timeout")
                .long("request-timeout")
                .value_parser(value_parser!(u64).range(1..))
                .help("Seconds a single backend request may take"),
        )
        .arg(
            Arg::new("shutdown-timeout")
                .long("shutdown-timeout")
                .value_parser(value_parser!(u64).range(1..))
                .help("Seconds to wait for in-flight requests on shutdown"),
        )
}

/// Build the `CommandMeta` for registry registration.
pub fn serve_meta() -> CommandMeta {
    CommandBuilder::from_clap(serve_command())
        .category(CommandCategory::Server)
        .aliases(&["serve"])
        .build()
}

/// Flags override the `server` section of the config file.
pub fn resolve_server_config(matches: &ArgMatches, base: &ServerConfig) -> ServerConfig {
    let mut config = base.clone();
    if let Some(address) = matches.get_one::<String>("address") {
        config.address = address.clone();
    }
    if let Some(secs) = matches.get_one::<u64>("request-timeout") {
        config.request_timeout_secs = *secs;
    }
    if let Some(secs) = matches.get_one::<u64>("shutdown-timeout") {
        config.shutdown_timeout_secs = *secs;
    }
    config
}

/// Handle the `restic-rest-server` command.
pub async fn handle_serve(matches: &ArgMatches, services: &Services) -> Result<()> {
    let config = resolve_server_config(matches, &services.config.server);
    let handle = server::start_server(&config, Arc::new(services.connector())).await?;

    output::info(&format!(
        "restic REST backend listening on http://{}/",
        handle.local_addr()
    ));

    services.shutdown.cancelled().await;
    handle.shutdown().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::services_for;
    use crate::testing::FakeCloud;
    use std::time::Duration;

    #[test]
    fn test_flags_override_config() {
        let matches = serve_command()
            .try_get_matches_from([
                COMMAND_NAME,
                "--address",
                "0.0.0.0:8000",
                "--request-timeout",
                "60",
            ])
            .unwrap();
        let config = resolve_server_config(&matches, &ServerConfig::default());
        assert_eq!(config.address, "0.0.0.0:8000");
        assert_eq!(config.request_timeout_secs, 60);
        assert_eq!(config.shutdown_timeout_secs, ServerConfig::default().shutdown_timeout_secs);
    }

    #[test]
    fn test_defaults_come_from_config() {
        let matches = serve_command().try_get_matches_from([COMMAND_NAME]).unwrap();
        let base = ServerConfig {
            address: "127.0.0.1:9100".into(),
            ..Default::default()
        };
        assert_eq!(resolve_server_config(&matches, &base), base);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        assert!(serve_command()
            .try_get_matches_from([COMMAND_NAME, "--shutdown-timeout", "0"])
            .is_err());
    }

    #[test]
    fn test_serve_meta_alias() {
        let meta = serve_meta();
        assert_eq!(meta.name, COMMAND_NAME);
        assert_eq!(meta.aliases, vec!["serve"]);
        assert_eq!(meta.category, CommandCategory::Server);
    }

    #[tokio::test]
    async fn test_serve_stops_on_cancellation() {
        let fake = FakeCloud::start().await;
        let services = services_for(&fake);
        let matches = serve_command()
            .try_get_matches_from([COMMAND_NAME, "--address", "127.0.0.1:0"])
            .unwrap();

        let token = services.shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            token.cancel();
        });
        tokio::time::timeout(Duration::from_secs(5), handle_serve(&matches, &services))
            .await
            .expect("server should stop after cancellation")
            .unwrap();
        assert_eq!(fake.logins(), 0);
    }
}
