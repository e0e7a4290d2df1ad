use crate::auth::{self, SCOPE_FIREBASE_REMOTE_CONFIG};
use crate::context::OperationContext;
use crate::credentials::ServiceAccountKey;
use crate::error::{Error, Result};
use crate::service::{DEFAULT_ENDPOINT, HttpRemoteConfigService, RemoteConfigService};
use crate::updates::UpdateRequest;
use std::sync::Arc;
use tracing::{debug, info};

/// Where the session talks to.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub endpoint: String,
    /// Overrides the token endpoint named in the service account key.
    pub token_uri: Option<String>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            token_uri: None,
        }
    }
}

/// Read-merge-write updater for the default values of one project's
/// remote config.
pub struct ConfigUpdater {
    project_id: String,
    service: Arc<dyn RemoteConfigService>,
    validate_only: bool,
}

impl ConfigUpdater {
    /// Authenticates as the service account and returns an updater bound to
    /// the resulting session. An empty `project_id` falls back to the key's
    /// own project.
    pub async fn connect(
        ctx: &OperationContext,
        project_id: &str,
        key: &ServiceAccountKey,
        options: &SessionOptions,
    ) -> Result<Self> {
        let project_id = resolve_project_id(project_id, key)?;
        let http = reqwest::Client::builder()
            .user_agent(concat!("remoteconfig/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let token_uri = options.token_uri.as_deref().unwrap_or(&key.token_uri);
        let token = ctx
            .run(auth::fetch_access_token(
                &http,
                key,
                token_uri,
                SCOPE_FIREBASE_REMOTE_CONFIG,
            ))
            .await?;
        debug!(%project_id, expires_in = ?token.expires_in(), "authenticated");

        let service = HttpRemoteConfigService::new(http, &options.endpoint, token);
        Self::with_service(&project_id, Arc::new(service))
    }

    /// Binds an updater to an already established service handle.
    pub fn with_service(project_id: &str, service: Arc<dyn RemoteConfigService>) -> Result<Self> {
        if project_id.trim().is_empty() {
            return Err(Error::configuration("project id must not be empty"));
        }
        Ok(Self {
            project_id: project_id.to_string(),
            service,
            validate_only: false,
        })
    }

    /// When set, writes are only validated by the service, not published.
    pub fn validate_only(mut self, validate_only: bool) -> Self {
        self.validate_only = validate_only;
        self
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Overwrites the default value of every parameter in `updates`, leaving
    /// the rest of the remote document untouched.
    ///
    /// The write is conditional on the entity tag returned by the read; if
    /// someone else published in between, this fails with
    /// [`Error::PreconditionFailed`] and nothing is retried.
    pub async fn set_default_values(
        &self,
        ctx: &OperationContext,
        updates: &UpdateRequest,
    ) -> Result<()> {
        if updates.is_empty() {
            return Err(Error::configuration("no parameters to update"));
        }

        let fetched = ctx.run(self.service.get_document(&self.project_id)).await?;
        let update = fetched.document.with_default_values(updates);
        debug!(
            etag = %fetched.etag,
            remaining = ?ctx.remaining(),
            "writing merged document"
        );

        let new_etag = ctx
            .run(self.service.update_document(
                &self.project_id,
                &update,
                &fetched.etag,
                self.validate_only,
            ))
            .await?;

        info!(
            project_id = %self.project_id,
            updated = updates.len(),
            previous_etag = %fetched.etag,
            %new_etag,
            validate_only = self.validate_only,
            "updated remote config defaults"
        );
        Ok(())
    }
}

fn resolve_project_id(project_id: &str, key: &ServiceAccountKey) -> Result<String> {
    let project_id = project_id.trim();
    if !project_id.is_empty() {
        return Ok(project_id.to_string());
    }
    if !key.project_id.is_empty() {
        return Ok(key.project_id.clone());
    }
    Err(Error::configuration(
        "no project id given and the service account key names none",
    ))
}
