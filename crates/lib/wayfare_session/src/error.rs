//! Session and request error types.

use thiserror::Error;

/// Convenience alias for session-layer results.
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors surfaced by the session layer.
///
/// Expected auth failures inside the token store and refresh coordinator are
/// reported as booleans; these variants are what reaches callers of the
/// lifecycle, the request pipeline, and the services built on top of them.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    /// Login rejected by the server. Session state is left untouched.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Refresh token invalid, expired, or rejected by the server.
    #[error("Refresh rejected: {0}")]
    RefreshRejected(String),

    /// Timeout or connection failure.
    #[error("Network error: {0}")]
    Network(String),

    /// A resource call still returned 401 after a successful refresh and retry.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The session cannot be recovered; the caller should show the login surface.
    ///
    /// `status` is the response that triggered the redirect (401 on the
    /// reactive path), or `None` when no request was sent.
    #[error("Login required: {reason}")]
    LoginRequired { reason: String, status: Option<u16> },

    /// The request was superseded or explicitly cancelled.
    #[error("Request cancelled")]
    Cancelled,

    /// Any other non-success HTTP status, propagated unchanged.
    #[error("Request failed [{path}]: {status} - {message}")]
    Http {
        path: String,
        status: u16,
        message: String,
    },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl SessionError {
    /// Whether this is a cancellation, which call sites suppress silently.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SessionError::Cancelled)
    }

    /// Whether the caller should redirect to the login surface.
    pub fn requires_login(&self) -> bool {
        matches!(self, SessionError::LoginRequired { .. })
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            SessionError::Http { status, .. } => Some(*status),
            SessionError::Unauthorized(_) | SessionError::InvalidCredentials => Some(401),
            SessionError::LoginRequired { status, .. } => *status,
            _ => None,
        }
    }
}
