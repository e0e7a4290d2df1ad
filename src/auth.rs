//! # Service Account Authentication
//!
//! Exchanges a signed JWT assertion for an OAuth2 access token
//! (the `jwt-bearer` grant), scoped to Remote Config.

use crate::credentials::ServiceAccountKey;
use crate::error::{Error, Result};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::debug;

pub const SCOPE_FIREBASE_REMOTE_CONFIG: &str =
    "https://www.googleapis.com/auth/firebase.remoteconfig";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME: Duration = Duration::from_secs(3600);

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct AssertionClaims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: u64,
    pub exp: u64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// A bearer token for the Remote Config API.
#[derive(Clone)]
pub struct AccessToken {
    secret: String,
    expires_in: Option<Duration>,
}

impl AccessToken {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            expires_in: None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.secret
    }

    pub fn expires_in(&self) -> Option<Duration> {
        self.expires_in
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Signs the RS256 assertion presented to the token endpoint.
pub fn sign_assertion(
    key: &ServiceAccountKey,
    token_uri: &str,
    scope: &str,
    issued_at: u64,
) -> Result<String> {
    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
        .map_err(|e| Error::configuration(format!("invalid service account private key: {e}")))?;

    let mut header = Header::new(Algorithm::RS256);
    if !key.private_key_id.is_empty() {
        header.kid = Some(key.private_key_id.clone());
    }

    let claims = AssertionClaims {
        iss: key.client_email.clone(),
        scope: scope.to_string(),
        aud: token_uri.to_string(),
        iat: issued_at,
        exp: issued_at + ASSERTION_LIFETIME.as_secs(),
    };

    jsonwebtoken::encode(&header, &claims, &encoding_key)
        .map_err(|e| Error::configuration(format!("failed to sign token assertion: {e}")))
}

/// Requests an access token for `scope` on behalf of the service account.
pub async fn fetch_access_token(
    http: &reqwest::Client,
    key: &ServiceAccountKey,
    token_uri: &str,
    scope: &str,
) -> Result<AccessToken> {
    let issued_at = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    let assertion = sign_assertion(key, token_uri, scope, issued_at)?;

    debug!(client_email = %key.client_email, %token_uri, "exchanging service account assertion");

    let response = http
        .post(token_uri)
        .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let reason = match serde_json::from_str::<TokenErrorResponse>(&body) {
            Ok(err) => match err.error_description {
                Some(description) => format!("{}: {description}", err.error),
                None => err.error,
            },
            Err(_) => body.trim().to_string(),
        };
        return Err(Error::authentication(format!(
            "token endpoint returned {}: {reason}",
            status.as_u16()
        )));
    }

    let token: TokenResponse = response
        .json()
        .await
        .map_err(|e| Error::authentication(format!("unreadable token response: {e}")))?;
    if token.access_token.is_empty() {
        return Err(Error::authentication("token endpoint returned an empty access token"));
    }

    Ok(AccessToken {
        secret: token.access_token,
        expires_in: token.expires_in.map(Duration::from_secs),
    })
}
