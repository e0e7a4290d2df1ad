use crate::error::{Error, Result};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::Deserialize;
use std::fmt;

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// The subset of a Google Cloud service-account key (JSON) needed to mint
/// access tokens.
#[derive(Deserialize, Clone)]
pub struct ServiceAccountKey {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub private_key_id: String,
    pub private_key: String,
    pub client_email: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

// Keeps the private key out of logs and panic messages.
impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("kind", &self.kind)
            .field("project_id", &self.project_id)
            .field("private_key_id", &self.private_key_id)
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

impl ServiceAccountKey {
    /// Decodes a base64-encoded key as passed on the command line or in the
    /// environment.
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let raw = STANDARD
            .decode(encoded.trim())
            .map_err(|e| Error::configuration(format!("credentials are not valid base64: {e}")))?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &[u8]) -> Result<Self> {
        let key: ServiceAccountKey = serde_json::from_slice(raw).map_err(|e| {
            Error::configuration(format!("credentials are not a service account key: {e}"))
        })?;

        if !key.kind.is_empty() && key.kind != "service_account" {
            return Err(Error::configuration(format!(
                "expected a service_account key, got '{}'",
                key.kind
            )));
        }
        if key.client_email.is_empty() {
            return Err(Error::configuration("service account key has no client_email"));
        }
        if key.private_key.is_empty() {
            return Err(Error::configuration("service account key has no private_key"));
        }
        Ok(key)
    }
}
