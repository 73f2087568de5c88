use serde::{Deserialize, Serialize};

pub const DEFAULT_LOGIN_URL: &str = "https://support.prod.mdl.swisscom.ch/login";
pub const DEFAULT_IDENTITY_LOGIN_URL: &str = "https://identity-sc.prod.mdl.swisscom.ch/login";
pub const DEFAULT_SSO_LOGIN_URL: &str = "https://login.sso.bluewin.ch/login";
pub const DEFAULT_REDIRECT_URI: &str = "https://www.mycloud.ch/login";
pub const DEFAULT_IDENTITY_SERVER: &str = "https://identity.prod.mdl.swisscom.ch";
pub const DEFAULT_STORAGE_SERVER: &str = "https://storage.prod.mdl.swisscom.ch";

/// Upstream URLs used by the login chain and the storage API.
///
/// Every field defaults to the production host, so a config file only needs
/// to name the ones it overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Endpoints {
    pub login: String,
    pub identity_login: String,
    pub sso_login: String,
    pub redirect_uri: String,
    pub identity_server: String,
    pub storage_server: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            login: DEFAULT_LOGIN_URL.to_string(),
            identity_login: DEFAULT_IDENTITY_LOGIN_URL.to_string(),
            sso_login: DEFAULT_SSO_LOGIN_URL.to_string(),
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            identity_server: DEFAULT_IDENTITY_SERVER.to_string(),
            storage_server: DEFAULT_STORAGE_SERVER.to_string(),
        }
    }
}

impl Endpoints {
    /// All endpoints rooted under a single base URL.
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            login: format!("{base}/login"),
            identity_login: format!("{base}/idp/login"),
            sso_login: format!("{base}/sso/login"),
            redirect_uri: format!("{base}/landing"),
            identity_server: base.to_string(),
            storage_server: base.to_string(),
        }
    }
}
