use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Everything that can end a single update run.
///
/// Each variant is terminal: nothing in this crate retries or downgrades
/// an error once it has been produced.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or malformed input, detected before any network call.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The token endpoint or the Remote Config API rejected our credentials.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The cause is left to the source chain, so `{:#}` prints it once.
    #[error("transport error")]
    Transport(#[from] reqwest::Error),

    #[error("deadline of {0:?} exceeded")]
    DeadlineExceeded(std::time::Duration),

    #[error("operation cancelled")]
    Cancelled,

    /// The document changed between our read and our write.
    #[error("precondition failed: {message} (etag {etag})")]
    PreconditionFailed { etag: String, message: String },

    /// A successful read without the version token a write would need.
    #[error("remote config response carried no ETag; refusing to write without a precondition")]
    MissingEtag,

    /// A success status whose body is not a remote config document.
    #[error("invalid remote config response: {0}")]
    InvalidResponse(String),

    #[error("remote config API returned {status}: {message}")]
    Api { status: u16, message: String },
}

impl Error {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn authentication(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    pub fn is_precondition_failed(&self) -> bool {
        matches!(self, Self::PreconditionFailed { .. })
    }
}
