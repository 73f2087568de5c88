//! Info CLI command: log in and print the account identity.

use clap::{Arg, ArgMatches, Command};

use super::Services;
use crate::cli::{CommandBuilder, CommandCategory, CommandMeta};
use crate::cloud::types::IdentityResponse;
use crate::errors::{Result, ScmcError};

pub const OUTPUT_FORMATS: [&str; 2] = ["yaml", "json"];

/// Build the `info` clap command.
pub fn info_command() -> Command {
    Command::new("info")
        .about("Log in to myCloud and show information about the account")
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_parser(OUTPUT_FORMATS)
                .default_value("yaml")
                .help("Output format"),
        )
}

/// Build the `CommandMeta` for registry registration.
pub fn info_meta() -> CommandMeta {
    CommandBuilder::from_clap(info_command())
        .category(CommandCategory::Cloud)
        .build()
}

/// Render an identity as YAML or pretty JSON, without trailing whitespace.
pub fn render_identity(identity: &IdentityResponse, format: &str) -> Result<String> {
    let text = match format {
        "yaml" => serde_yaml::to_string(identity)?,
        "json" => serde_json::to_string_pretty(identity)?,
        other => {
            return Err(ScmcError::InvalidArgument(format!(
                "invalid output format \"{other}\""
            )))
        }
    };
    Ok(text.trim().to_string())
}

/// Handle the `info` command.
pub async fn handle_info(matches: &ArgMatches, services: &Services) -> Result<()> {
    let format = matches
        .get_one::<String>("output")
        .map(String::as_str)
        .unwrap_or("yaml");
    let identity = services.mycloud().await?.identity().await?;
    println!("{}", render_identity(&identity, format)?);
    Ok(())
}
