//! Error taxonomy shared by the token manager, the API client and the
//! reconciliation engine.

use thiserror::Error;

/// Errors raised while obtaining, refreshing or storing OAuth credentials.
///
/// Cloneable so a single refresh result can be handed to every caller that
/// awaited the same in-flight refresh.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Not authenticated. Run 'tasklink auth login' first.")]
    NotAuthenticated,

    #[error("Refresh token was rejected (invalid_grant); authorize again")]
    InvalidGrant,

    #[error("Token endpoint returned {error}: {description}")]
    TokenEndpoint { error: String, description: String },

    #[error("Authorization was not granted: {0}")]
    Denied(String),

    #[error("Authorization callback carried an unexpected state value")]
    StateMismatch,

    #[error("Timed out waiting for authorization in the browser")]
    Timeout,

    #[error("Callback listener error: {0}")]
    Listener(String),

    #[error("Failed to open browser: {0}")]
    Browser(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Token storage error: {0}")]
    Storage(String),
}

/// Errors surfaced by remote calls and document access.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The remote service answered 401 and no refresh was attempted.
    #[error("Access token expired")]
    TokenExpired,

    /// The remote resource does not exist (HTTP 404).
    #[error("Not found: {0}")]
    NotFound(String),

    /// The remote service answered 429.
    #[error("Rate limited by remote service (retry after {retry_after:?}s)")]
    RateLimited { retry_after: Option<u64> },

    /// Any other non-2xx answer.
    #[error("API error {status} {reason}: {message}")]
    Api {
        status: u16,
        reason: String,
        message: String,
    },

    /// Transport-level failure (connection refused, malformed body, ...).
    #[error("HTTP error: {0}")]
    Http(String),

    /// Local document read/write failure.
    #[error("Document error for {document}: {message}")]
    Io { document: String, message: String },
}

impl Error {
    /// Returns true if repeating the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Api { status, .. } => *status >= 500,
            Error::Http(_) | Error::RateLimited { .. } | Error::TokenExpired => true,
            Error::Auth(_) | Error::NotFound(_) | Error::Io { .. } => false,
        }
    }

    pub fn io(document: &str, message: impl std::fmt::Display) -> Self {
        Error::Io {
            document: document.to_string(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
