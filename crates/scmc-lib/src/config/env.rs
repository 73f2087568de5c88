use std::path::PathBuf;
use std::sync::OnceLock;

pub const USERNAME_VAR: &str = "MYCLOUD_USERNAME";
pub const PASSWORD_VAR: &str = "MYCLOUD_PASSWORD";

/// Values read from the environment once at startup.
///
/// Access via `EnvConfig::get()` which returns a `&'static EnvConfig`.
pub struct EnvConfig {
    pub username: Option<String>,
    pub password: Option<String>,
    pub home_dir: Option<PathBuf>,
}

static ENV: OnceLock<EnvConfig> = OnceLock::new();

impl EnvConfig {
    pub fn get() -> &'static EnvConfig {
        ENV.get_or_init(|| Self::from_lookup(|key| std::env::var(key).ok()))
    }

    /// Build from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());
        Self {
            username: var(USERNAME_VAR),
            password: var(PASSWORD_VAR),
            home_dir: var("HOME").map(PathBuf::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_values_are_unset() {
        let env = EnvConfig::from_lookup(|key| match key {
            USERNAME_VAR => Some(String::new()),
            PASSWORD_VAR => Some("pw".into()),
            "HOME" => Some("/home/u".into()),
            _ => None,
        });
        assert!(env.username.is_none());
        assert_eq!(env.password.as_deref(), Some("pw"));
        assert_eq!(env.home_dir, Some(PathBuf::from("/home/u")));
    }

    #[test]
    fn test_get_returns_same_instance() {
        let a = EnvConfig::get() as *const EnvConfig;
        let b = EnvConfig::get() as *const EnvConfig;
        assert_eq!(a, b);
    }
}
