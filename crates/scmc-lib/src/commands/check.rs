//! Check CLI command: log in and exercise the identity and usage calls,
//! one numbered line per step.

use std::io::Write;

use clap::Command;

use super::Services;
use crate::cli::{CommandBuilder, CommandCategory, CommandMeta};
use crate::cloud::MyCloud;
use crate::errors::{Result, ScmcError};

pub const CHECKS: [&str; 3] = ["authentication", "fetch identity", "fetch usage"];

pub fn check_command() -> Command {
    Command::new("check").about("Log in to myCloud and test the supported API calls")
}

pub fn check_meta() -> CommandMeta {
    CommandBuilder::from_clap(check_command())
        .category(CommandCategory::Cloud)
        .build()
}

fn status_line(index: usize, name: &str, outcome: &std::result::Result<(), ScmcError>) -> String {
    let verdict = match outcome {
        Ok(()) => "OK".to_string(),
        Err(e) => e.to_string(),
    };
    format!("[{:>2}/{}] {}: {}", index + 1, CHECKS.len(), name, verdict)
}

/// Run every check in order, writing one line each. Stops at the first
/// failure and returns it.
pub async fn run_checks(services: &Services, out: &mut impl Write) -> Result<()> {
    let credentials = services.credentials()?;
    let mut cloud: Option<MyCloud> = None;

    for (index, name) in CHECKS.iter().enumerate() {
        let outcome = if index == 0 {
            services
                .login(&credentials)
                .await
                .map(|logged_in| cloud = Some(logged_in))
        } else {
            match cloud.as_ref() {
                Some(c) if index == 1 => c.identity().await.map(|_| ()),
                Some(c) => c.usage().await.map(|_| ()),
                None => Err(ScmcError::Unauthenticated),
            }
        };
        writeln!(out, "{}", status_line(index, name, &outcome))?;
        out.flush()?;
        if let Err(e) = outcome {
            tracing::debug!(check = %name, "check failed: {e}");
            return Err(ScmcError::Command(format!("check \"{name}\" failed")));
        }
    }

    writeln!(out, "All checks successfully executed.")?;
    Ok(())
}

pub async fn handle_check(services: &Services) -> Result<()> {
    let mut stdout = std::io::stdout();
    run_checks(services, &mut stdout).await
}
