use crate::error::{Error, Result};
use crate::service::DEFAULT_ENDPOINT;
use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const DEFAULT_CREDENTIALS_ENV_VAR: &str = "SERVICE_ACCOUNT_KEY";
const CONFIG_FILE: &str = "rc/config.toml";

/// Settings read from `$XDG_CONFIG_HOME/rc/config.toml`. Every key is
/// optional; command-line flags override whatever is set here.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub endpoint: String,
    pub timeout_seconds: u64,
    pub credentials_env_var: String,
    pub token_uri: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_seconds: 5,
            credentials_env_var: DEFAULT_CREDENTIALS_ENV_VAR.to_string(),
            token_uri: None,
        }
    }
}

impl Config {
    pub fn from_toml(source: &str) -> Result<Self> {
        let config: Config = toml::from_str(source)
            .map_err(|e| Error::configuration(format!("invalid settings file: {e}")))?;

        // Empty values mean "not set".
        let defaults = Config::default();
        Ok(Config {
            endpoint: if config.endpoint.is_empty() {
                defaults.endpoint
            } else {
                config.endpoint
            },
            timeout_seconds: if config.timeout_seconds == 0 {
                defaults.timeout_seconds
            } else {
                config.timeout_seconds
            },
            credentials_env_var: if config.credentials_env_var.is_empty() {
                defaults.credentials_env_var
            } else {
                config.credentials_env_var
            },
            token_uri: config.token_uri.filter(|uri| !uri.is_empty()),
        })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path).map_err(|e| {
            Error::configuration(format!("cannot read settings file {}: {e}", path.display()))
        })?;
        Self::from_toml(&source)
    }
}

/// Loads the settings file: the explicit `path` if given (it must exist),
/// otherwise the XDG location if present, otherwise defaults. Nothing is
/// ever written.
pub fn load(path: Option<&Path>) -> Result<Config> {
    if let Some(path) = path {
        return Config::from_file(path);
    }

    let xdg_dirs = xdg::BaseDirectories::new();
    match xdg_dirs.find_config_file(CONFIG_FILE) {
        Some(found) => Config::from_file(&found),
        None => Ok(Config::default()),
    }
}
