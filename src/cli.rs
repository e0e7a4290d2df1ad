use crate::error::{Error, Result};
use crate::updates::UpdateRequest;
use clap::Parser;
use std::io::Read;
use std::path::PathBuf;

/// Overwrite default parameter values in a Firebase Remote Config template.
///
/// Updates are given as KEY=VALUE arguments, or, when none are given, as a
/// JSON object of strings on standard input.
#[derive(Parser, Debug)]
#[command(name = "rc", version, about, long_about = None)]
pub struct Cli {
    /// Google Cloud project ID (defaults to the service account's project)
    #[arg(short, long, default_value = "")]
    pub project: String,

    /// Timeout for the whole update, in seconds [default: 5]
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Base64 encoded service account key (JSON); read from
    /// $SERVICE_ACCOUNT_KEY when omitted
    #[arg(long)]
    pub credentials: Option<String>,

    /// Remote Config API base URL
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Settings file (defaults to $XDG_CONFIG_HOME/rc/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Validate the update against the service without publishing it
    #[arg(long)]
    pub validate_only: bool,

    /// Parameters to set, as KEY=VALUE (split on the first '=')
    #[arg(value_name = "KEY=VALUE")]
    pub updates: Vec<String>,
}

impl Cli {
    /// The base64 credentials: the flag if given, otherwise the variable
    /// named `env_var` as returned by `lookup`.
    pub fn resolve_credentials<F>(&self, env_var: &str, lookup: F) -> Result<String>
    where
        F: FnOnce(&str) -> Option<String>,
    {
        self.credentials
            .clone()
            .filter(|c| !c.is_empty())
            .or_else(|| lookup(env_var).filter(|c| !c.is_empty()))
            .ok_or_else(|| {
                Error::configuration(format!("no credentials passed and {env_var} not set"))
            })
    }

    /// Positional arguments take precedence; `input` is only read when
    /// there are none.
    pub fn update_request<R: Read>(&self, input: R) -> Result<UpdateRequest> {
        let request = if self.updates.is_empty() {
            UpdateRequest::from_json_reader(input)?
        } else {
            UpdateRequest::from_args(&self.updates)?
        };
        if request.is_empty() {
            return Err(Error::configuration("no parameters to update"));
        }
        Ok(request)
    }
}
