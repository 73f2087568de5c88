//! Usage CLI command: storage consumed per category.

use clap::Command;

use super::Services;
use crate::cli::{CommandBuilder, CommandCategory, CommandMeta};
use crate::cloud::types::UsageResponse;
use crate::errors::Result;
use crate::output::format_bytes;

pub fn usage_command() -> Command {
    Command::new("usage").about("Log in to myCloud and show storage usage per category")
}

pub fn usage_meta() -> CommandMeta {
    CommandBuilder::from_clap(usage_command())
        .category(CommandCategory::Cloud)
        .build()
}

/// One aligned `label: size` line per category.
pub fn render_usage(usage: &UsageResponse) -> String {
    usage
        .categories()
        .iter()
        .map(|(label, bytes)| format!("{:<10} {:>10}", format!("{label}:"), format_bytes(*bytes)))
        .collect::<Vec<_>>()
        .join("\n")
}

pub async fn handle_usage(services: &Services) -> Result<()> {
    let usage = services.mycloud().await?.usage().await?;
    println!("{}", render_usage(&usage));
    Ok(())
}
