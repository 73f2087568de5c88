use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::env::EnvConfig;
use crate::cloud::endpoints::Endpoints;
use crate::errors::{Result, ScmcError};
use crate::logger::LogLevel;
use crate::server::config::ServerConfig;

/// File name looked up in the home directory.
pub const USER_CONFIG_FILE: &str = ".scmc.yaml";
pub const SYSTEM_CONFIG_FILE: &str = "/etc/scmc.yaml";

/// Outbound HTTP client settings. Timeouts are in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpSettings {
    pub connect_timeout: u64,
    pub read_timeout: u64,
    pub idle_conn_timeout: u64,
    pub max_idle_conns_per_host: usize,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout: 10,
            read_timeout: 300,
            idle_conn_timeout: 90,
            max_idle_conns_per_host: 100,
        }
    }
}

/// Contents of `scmc.yaml`. Unknown keys are rejected.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(alias = "loglevel")]
    pub log_level: Option<LogLevel>,
    pub http: HttpSettings,
    pub server: ServerConfig,
    pub endpoints: Endpoints,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("log_level", &self.log_level)
            .field("http", &self.http)
            .field("server", &self.server)
            .field("endpoints", &self.endpoints)
            .finish()
    }
}

impl Config {
    /// Parse YAML text. An empty document yields the defaults.
    pub fn from_yaml(contents: &str) -> Result<Self> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(contents)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ScmcError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_yaml(&contents).map_err(|e| {
            ScmcError::Config(format!("failed to parse {}: {e}", path.display()))
        })
    }

    /// Load the explicit file if given, otherwise the first existing default
    /// location, otherwise the defaults. Returns the file used, if any.
    pub fn discover(
        explicit: Option<&Path>,
        home: Option<&Path>,
    ) -> Result<(Self, Option<PathBuf>)> {
        if let Some(path) = explicit {
            let config = Self::load(path)?;
            return Ok((config, Some(path.to_path_buf())));
        }

        for candidate in default_locations(home) {
            if candidate.is_file() {
                tracing::debug!(path = %candidate.display(), "using config file");
                let config = Self::load(&candidate)?;
                return Ok((config, Some(candidate)));
            }
        }

        Ok((Self::default(), None))
    }

    pub fn validate(&self) -> Result<()> {
        self.server.validate()?;
        if self.http.connect_timeout == 0 || self.http.read_timeout == 0 {
            return Err(ScmcError::Config("http timeouts must be positive".into()));
        }
        Ok(())
    }

    /// Fill in credentials: explicit values, then this file, then the
    /// environment. Anything still missing is left for the caller to prompt.
    pub fn credentials(
        &self,
        username: Option<String>,
        password: Option<String>,
        env: &EnvConfig,
    ) -> (Option<String>, Option<String>) {
        let pick = |flag: Option<String>, file: &Option<String>, env: &Option<String>| {
            flag.filter(|v| !v.is_empty())
                .or_else(|| file.clone().filter(|v| !v.is_empty()))
                .or_else(|| env.clone())
        };
        (
            pick(username, &self.username, &env.username),
            pick(password, &self.password, &env.password),
        )
    }
}

/// `$HOME/.scmc.yaml`, then `/etc/scmc.yaml`.
pub fn default_locations(home: Option<&Path>) -> Vec<PathBuf> {
    let mut locations = Vec::with_capacity(2);
    if let Some(home) = home {
        locations.push(home.join(USER_CONFIG_FILE));
    }
    locations.push(PathBuf::from(SYSTEM_CONFIG_FILE));
    locations
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(Config::from_yaml("").unwrap(), Config::default());
        assert_eq!(Config::from_yaml("\n  \n").unwrap(), Config::default());
    }

    #[test]
    fn test_full_document() {
        let config = Config::from_yaml(
            r#"
username: alice
password: secret
loglevel: DEBUG
http:
  read_timeout: 60
server:
  address: 0.0.0.0:8000
endpoints:
  storage_server: http://localhost:1
"#,
        )
        .unwrap();
        assert_eq!(config.username.as_deref(), Some("alice"));
        assert_eq!(config.log_level, Some(LogLevel::Debug));
        assert_eq!(config.http.read_timeout, 60);
        assert_eq!(config.http.connect_timeout, 10);
        assert_eq!(config.server.address, "0.0.0.0:8000");
        assert_eq!(config.endpoints.storage_server, "http://localhost:1");
        assert_eq!(config.endpoints.login, Endpoints::default().login);
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let err = Config::from_yaml("username: a\nfavourite_colour: blue\n").unwrap_err();
        assert!(matches!(err, ScmcError::Yaml(_)));
    }

    #[test]
    fn test_invalid_log_level_is_rejected() {
        assert!(Config::from_yaml("log_level: loud\n").is_err());
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = Config {
            password: Some("hunter2".into()),
            ..Default::default()
        };
        assert!(!format!("{config:?}").contains("hunter2"));
    }

    #[test]
    fn test_load_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "bogus: [").unwrap();
        let err = Config::load(file.path()).unwrap_err();
        assert!(err.to_string().contains(&file.path().display().to_string()));
    }

    #[test]
    fn test_discover_prefers_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "username: explicit").unwrap();
        let (config, used) = Config::discover(Some(file.path()), None).unwrap();
        assert_eq!(config.username.as_deref(), Some("explicit"));
        assert_eq!(used.as_deref(), Some(file.path()));
    }

    #[test]
    fn test_discover_finds_home_file() {
        let home = tempfile::tempdir().unwrap();
        std::fs::write(home.path().join(USER_CONFIG_FILE), "username: home\n").unwrap();
        let (config, used) = Config::discover(None, Some(home.path())).unwrap();
        assert_eq!(config.username.as_deref(), Some("home"));
        assert_eq!(used, Some(home.path().join(USER_CONFIG_FILE)));
    }

    #[test]
    fn test_discover_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.yaml");
        assert!(matches!(
            Config::discover(Some(&missing), None),
            Err(ScmcError::Config(_))
        ));
    }

    #[test]
    fn test_default_locations_order() {
        let locations = default_locations(Some(Path::new("/home/u")));
        assert_eq!(
            locations,
            vec![
                PathBuf::from("/home/u/.scmc.yaml"),
                PathBuf::from("/etc/scmc.yaml")
            ]
        );
        assert_eq!(default_locations(None), vec![PathBuf::from("/etc/scmc.yaml")]);
    }

    #[test]
    fn test_credential_precedence() {
        let env = EnvConfig::from_lookup(|key| match key {
            "MYCLOUD_USERNAME" => Some("env-user".into()),
            "MYCLOUD_PASSWORD" => Some("env-pass".into()),
            _ => None,
        });
        let config = Config {
            username: Some("file-user".into()),
            ..Default::default()
        };

        let (user, pass) = config.credentials(Some("flag-user".into()), None, &env);
        assert_eq!(user.as_deref(), Some("flag-user"));
        assert_eq!(pass.as_deref(), Some("env-pass"));

        let (user, _) = config.credentials(None, None, &env);
        assert_eq!(user.as_deref(), Some("file-user"));

        let (user, _) = Config::default().credentials(None, None, &env);
        assert_eq!(user.as_deref(), Some("env-user"));

        let (user, pass) =
            Config::default().credentials(None, None, &EnvConfig::from_lookup(|_| None));
        assert!(user.is_none() && pass.is_none());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = Config::default();
        config.validate().unwrap();
        config.http.read_timeout = 0;
        assert!(config.validate().is_err());
    }
}
