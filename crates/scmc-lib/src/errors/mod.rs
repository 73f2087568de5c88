use thiserror::Error;

use crate::cloud::session::LoginStep;

#[derive(Error, Debug)]
pub enum ScmcError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("no access token (bearer) available")]
    Unauthenticated,

    #[error("authentication failed during {step}: {message}")]
    AuthenticationFailed { step: LoginStep, message: String },

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("got status code {status} from {context}")]
    UnexpectedStatus { status: u16, context: String },

    #[error("deletion not completed for the following items: {}", items.join(", "))]
    PartialFailure { items: Vec<String> },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Command error: {0}")]
    Command(String),
}

impl ScmcError {
    /// Shorthand for a login failure at a given step.
    pub fn login(step: LoginStep, message: impl Into<String>) -> Self {
        ScmcError::AuthenticationFailed {
            step,
            message: message.into(),
        }
    }

    /// The login step that failed, if this is an authentication failure.
    pub fn login_step(&self) -> Option<LoginStep> {
        match self {
            ScmcError::AuthenticationFailed { step, .. } => Some(*step),
            _ => None,
        }
    }

    /// HTTP status reported by the upstream, if any.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            ScmcError::UnexpectedStatus { status, .. } => Some(*status),
            ScmcError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ScmcError>;

/// Logs a fatal error and exits the process with code 1.
///
/// Intended for unrecoverable errors during start-up.
pub fn handle_fatal(err: ScmcError) -> ! {
    tracing::error!("Fatal error: {}", err);
    std::process::exit(1)
}

/// Maps a `ScmcError` to user-friendly CLI output with actionable suggestions.
pub fn handle_command_error(err: &ScmcError) {
    use crate::output;

    match err {
        ScmcError::AuthenticationFailed { step, message } => {
            output::error(&format!("Login failed during {step}: {message}"));
            match step {
                LoginStep::Credentials => {
                    output::info("Check your myCloud username and password.");
                }
                _ => {
                    output::info(
                        "The myCloud login flow may have changed. Re-run with `--log-level debug` to see every hop.",
                    );
                }
            }
        }
        ScmcError::Unauthenticated => {
            output::error("Not logged in to myCloud.");
        }
        ScmcError::UnexpectedStatus { status, context } => {
            output::error(&format!("myCloud returned status {status} for {context}"));
            if *status == 401 {
                output::info("The session token may have expired. Log in again.");
            }
        }
        ScmcError::Http(e) => {
            output::error(&format!("Network error: {}", e));
            output::info("Check your internet connection.");
        }
        ScmcError::Config(msg) => {
            output::error(&format!("Configuration error: {}", msg));
        }
        ScmcError::Yaml(e) => {
            output::error(&format!("Invalid configuration file: {}", e));
        }
        ScmcError::Command(msg) => {
            output::error(&format!("Error: {}", msg));
        }
        _ => {
            output::error(&format!("{}", err));
        }
    }
}
