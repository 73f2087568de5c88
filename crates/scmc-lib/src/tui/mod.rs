//! Interactive credential prompts via `dialoguer`.
//!
//! Used only when a username or password was given neither as a flag, in
//! the config file, nor in the environment.

use std::io;

use crossterm::tty::IsTty;
use dialoguer::{theme::ColorfulTheme, Input, Password};

use crate::cloud::Credentials;
use crate::errors::{Result, ScmcError};

pub const USERNAME_PROMPT: &str = "Swisscom myCloud username";
pub const PASSWORD_PROMPT: &str = "Swisscom myCloud password";

/// Whether stdin is attached to a terminal.
pub fn is_interactive() -> bool {
    io::stdin().is_tty()
}

/// Display a text input prompt and return the trimmed entry.
pub fn text_input(prompt: &str) -> Result<String> {
    let value = Input::<String>::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .interact_text()
        .map_err(|e| ScmcError::Command(format!("Text input error: {e}")))?;
    Ok(value.trim().to_string())
}

/// Display a hidden password prompt.
pub fn password_input(prompt: &str) -> Result<String> {
    Password::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .interact()
        .map_err(|e| ScmcError::Command(format!("Password input error: {e}")))
}

/// Complete a partially resolved credential pair, prompting for whatever
/// is missing. Fails without a terminal instead of blocking on stdin.
pub fn complete_credentials(
    username: Option<String>,
    password: Option<String>,
) -> Result<Credentials> {
    let missing = match (&username, &password) {
        (None, _) => "username",
        (_, None) => "password",
        _ => "",
    };
    if !missing.is_empty() && !is_interactive() {
        return Err(ScmcError::Config(format!(
            "no myCloud {missing} given and stdin is not a terminal"
        )));
    }

    let username = match username {
        Some(u) => u,
        None => text_input(USERNAME_PROMPT)?,
    };
    let password = match password {
        Some(p) => p,
        None => password_input(PASSWORD_PROMPT)?,
    };
    Ok(Credentials::new(username, password))
}
