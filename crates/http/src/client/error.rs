//! Client error types

use pitstop_core::CoreError;
use thiserror::Error;

/// Client error types
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server could not be reached (timeout, DNS, refused connection)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// Server returned an error status that was not recovered
    #[error("Server error {status}: {message}")]
    Http { status: u16, message: String },

    /// 401 received while transparent refresh is disabled
    #[error("Authentication expired")]
    AuthExpired,

    /// The session is gone; the user has been sent to the login view
    #[error("Authentication could not be recovered: {0}")]
    AuthUnrecoverable(UnrecoverableAuth),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Session storage failed
    #[error("Storage error: {0}")]
    Storage(#[from] CoreError),

    /// The request descriptor could not be turned into an HTTP request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The server answered 2xx with a body the client cannot use
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

/// Why a session could not be recovered
///
/// `Clone` so one refresh failure can be handed to every queued request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnrecoverableAuth {
    #[error("no stored credentials to refresh with")]
    MissingCredentials,

    #[error("refresh attempts exhausted after {attempts}")]
    RetryLimitExceeded { attempts: u32 },

    #[error("authenticate endpoint answered {status}: {message}")]
    RefreshRejected { status: u16, message: String },

    #[error("authenticate endpoint unreachable: {0}")]
    RefreshUnreachable(String),

    #[error("authenticate response carried no auth_token")]
    MissingToken,

    #[error("token refresh was abandoned before completing")]
    RefreshAbandoned,

    #[error("session storage failed: {0}")]
    Storage(String),
}

impl ClientError {
    /// Create error from HTTP status code
    pub fn from_status(status: reqwest::StatusCode, message: String) -> Self {
        Self::Http {
            status: status.as_u16(),
            message,
        }
    }

    /// HTTP status carried by the error, if the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Network(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether the session has ended and the user must log in again
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::AuthExpired | Self::AuthUnrecoverable(_))
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}
