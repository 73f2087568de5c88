//! Version CLI command: display application version and platform.
//!
//! Supports `--json` flag for machine-readable output.

use clap::{Arg, ArgMatches, Command};
use serde::Serialize;

use crate::cli::{CommandBuilder, CommandCategory, CommandMeta};

#[derive(Debug, Serialize)]
struct VersionInfo {
    name: &'static str,
    version: &'static str,
    os: &'static str,
    arch: &'static str,
}

impl VersionInfo {
    fn current() -> Self {
        Self {
            name: "scmc",
            version: env!("CARGO_PKG_VERSION"),
            os: std::env::consts::OS,
            arch: std::env::consts::ARCH,
        }
    }
}

/// Build the `version` clap command.
pub fn version_command() -> Command {
    Command::new("version")
        .about("Print version information")
        .arg(
            Arg::new("json")
                .long("json")
                .action(clap::ArgAction::SetTrue)
                .help("Output version information as JSON"),
        )
}

/// Build the `CommandMeta` for registry registration.
pub fn version_meta() -> CommandMeta {
    CommandBuilder::from_clap(version_command())
        .category(CommandCategory::Core)
        .build()
}

fn render(info: &VersionInfo, json: bool) -> String {
    if json {
        serde_json::to_string(info).unwrap_or_default()
    } else {
        format!("{} {} for {}/{}", info.name, info.version, info.os, info.arch)
    }
}

/// Handle the `version` command.
pub fn handle_version(matches: &ArgMatches) {
    println!("{}", render(&VersionInfo::current(), matches.get_flag("json")));
}
