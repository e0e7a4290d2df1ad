//! # Remote Config Service
//!
//! The remote contract this tool is a client of: fetch the current document
//! together with its entity tag, and write a document back under an
//! `If-Match` precondition. `HttpRemoteConfigService` speaks the Firebase
//! Remote Config REST API.

use crate::auth::AccessToken;
use crate::document::RemoteConfigDocument;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::header::{ETAG, IF_MATCH};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tracing::debug;

pub const DEFAULT_ENDPOINT: &str = "https://firebaseremoteconfig.googleapis.com";

/// A document as read from the service, with the version token needed to
/// write it back.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedDocument {
    pub document: RemoteConfigDocument,
    pub etag: String,
}

#[async_trait]
pub trait RemoteConfigService: Send + Sync {
    /// Reads the current document of `project_id`.
    async fn get_document(&self, project_id: &str) -> Result<FetchedDocument>;

    /// Replaces the document of `project_id`, provided its current version
    /// still matches `if_match`. Returns the entity tag of the new version.
    async fn update_document(
        &self,
        project_id: &str,
        document: &RemoteConfigDocument,
        if_match: &str,
        validate_only: bool,
    ) -> Result<String>;
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

/// Canonical codes the service uses when a write lost a version race.
const CONFLICT_CODES: [&str; 2] = ["FAILED_PRECONDITION", "ABORTED"];

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

pub struct HttpRemoteConfigService {
    http: reqwest::Client,
    endpoint: String,
    token: AccessToken,
}

impl HttpRemoteConfigService {
    pub fn new(http: reqwest::Client, endpoint: &str, token: AccessToken) -> Self {
        Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            token,
        }
    }

    /// The document resource of `project_id`. The id is pushed as a single
    /// path segment, so reserved characters in it are percent-encoded.
    fn document_url(&self, project_id: &str) -> Result<Url> {
        let mut url = Url::parse(&self.endpoint).map_err(|e| {
            Error::configuration(format!("invalid endpoint '{}': {e}", self.endpoint))
        })?;
        url.path_segments_mut()
            .map_err(|()| {
                Error::configuration(format!("endpoint '{}' cannot carry a path", self.endpoint))
            })?
            .pop_if_empty()
            .extend(["v1", "projects"])
            .push(project_id)
            .push("remoteConfig");
        Ok(url)
    }
}

fn etag_of(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get(ETAG)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Turns a non-success response into the matching error variant.
async fn error_from_response(response: reqwest::Response, if_match: Option<&str>) -> Error {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let envelope = serde_json::from_str::<ErrorEnvelope>(&body).ok();
    let code = envelope.as_ref().and_then(|e| e.error.status.clone());
    let message = match envelope {
        Some(envelope) => match envelope.error.status {
            Some(code) if !envelope.error.message.is_empty() => {
                format!("{code}: {}", envelope.error.message)
            }
            Some(code) => code,
            None => envelope.error.message,
        },
        None => body.trim().to_string(),
    };
    let message = if message.is_empty() {
        status.canonical_reason().unwrap_or("no details").to_string()
    } else {
        message
    };

    let lost_race = matches!(status, StatusCode::PRECONDITION_FAILED | StatusCode::CONFLICT)
        || code.is_some_and(|c| CONFLICT_CODES.contains(&c.as_str()));

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Error::authentication(format!("{}: {message}", status.as_u16()))
        }
        _ if lost_race => Error::PreconditionFailed {
            etag: if_match.unwrap_or_default().to_string(),
            message,
        },
        _ => Error::Api {
            status: status.as_u16(),
            message,
        },
    }
}

#[async_trait]
impl RemoteConfigService for HttpRemoteConfigService {
    async fn get_document(&self, project_id: &str) -> Result<FetchedDocument> {
        let url = self.document_url(project_id)?;
        debug!(%url, "fetching remote config");

        let response = self
            .http
            .get(url)
            .bearer_auth(self.token.as_str())
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(error_from_response(response, None).await);
        }

        let etag = etag_of(&response).ok_or(Error::MissingEtag)?;
        let body = response.text().await?;
        let document: RemoteConfigDocument =
            serde_json::from_str(&body).map_err(|e| Error::InvalidResponse(e.to_string()))?;
        debug!(
            %etag,
            parameters = document.parameters.len(),
            conditions = document.conditions.len(),
            "fetched remote config"
        );
        Ok(FetchedDocument { document, etag })
    }

    async fn update_document(
        &self,
        project_id: &str,
        document: &RemoteConfigDocument,
        if_match: &str,
        validate_only: bool,
    ) -> Result<String> {
        let url = self.document_url(project_id)?;
        debug!(%url, %if_match, validate_only, "publishing remote config");

        let mut request = self
            .http
            .put(url)
            .bearer_auth(self.token.as_str())
            .header(IF_MATCH, if_match)
            .json(document);
        if validate_only {
            request = request.query(&[("validateOnly", "true")]);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(error_from_response(response, Some(if_match)).await);
        }
        Ok(etag_of(&response).unwrap_or_default())
    }
}
