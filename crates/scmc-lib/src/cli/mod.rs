pub mod registry;

use std::path::PathBuf;

use clap::{value_parser, Arg, ArgMatches};

use crate::config::env::{PASSWORD_VAR, USERNAME_VAR};
use crate::logger::LogLevel;

pub use registry::{CommandBuilder, CommandCategory, CommandMeta, CommandRegistry};

/// Creates the root clap Command with the global flags shared by every
/// subcommand.
pub fn create_root_command() -> clap::Command {
    clap::Command::new("scmc")
        .about("Swisscom myCloud client and restic REST backend")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::new("config-file")
                .short('c')
                .long("config-file")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Config file [default: $HOME/.scmc.yaml, then /etc/scmc.yaml]"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .global(true)
                .value_parser(|s: &str| s.parse::<LogLevel>())
                .help(format!("Log level, one of {}", LogLevel::NAMES.join(", "))),
        )
        .arg(
            Arg::new("username")
                .short('u')
                .long("username")
                .global(true)
                .help(format!("Swisscom myCloud username [default: ${USERNAME_VAR}]")),
        )
        .arg(
            Arg::new("password")
                .short('p')
                .long("password")
                .global(true)
                .help(format!("Swisscom myCloud password [default: ${PASSWORD_VAR}]")),
        )
}

/// Global flags after parsing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlobalArgs {
    pub config_file: Option<PathBuf>,
    pub log_level: Option<LogLevel>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl GlobalArgs {
    pub fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            config_file: matches.get_one::<PathBuf>("config-file").cloned(),
            log_level: matches.get_one::<LogLevel>("log-level").copied(),
            username: matches.get_one::<String>("username").cloned(),
            password: matches.get_one::<String>("password").cloned(),
        }
    }
}
