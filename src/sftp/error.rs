//! Error taxonomy for SFTP connections.
//!
//! Failures are split into three classes so callers can react differently:
//!
//! 1. **Missing credentials** ([`ConnectionError::AuthenticationRequired`]):
//!    reported before any network I/O.
//! 2. **Authentication failures** ([`ConnectionError::Authentication`]): the
//!    server rejected the credentials or the interactive flow was cancelled.
//!    These are user-correctable and must not be retried blindly.
//! 3. **Transport failures** ([`ConnectionError::Transport`]): DNS, refused
//!    connections, timeouts, negotiation and sub-channel failures. These are
//!    connectivity problems and are safe to retry.
//!
//! Transport implementations report through [`SessionError`], which the
//! connection handler maps onto [`ConnectionError`].

use thiserror::Error;

/// Signal returned by a prompter when the user dismisses an input request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("input cancelled")]
pub struct Cancelled;

/// Failure reported by a transport session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Network or protocol level failure.
    #[error("{0}")]
    Io(String),
    /// The server rejected every authentication attempt.
    #[error("{0}")]
    Auth(String),
    /// The user cancelled an interactive prompt during the handshake.
    #[error("{0}")]
    Cancelled(String),
}

impl SessionError {
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io(message.into())
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }
}

impl From<Cancelled> for SessionError {
    fn from(_: Cancelled) -> Self {
        Self::Cancelled("Authentication cancelled by user".to_string())
    }
}

/// Error returned by [`ConnectionHandler::start`](super::ConnectionHandler::start).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    /// No credentials were available for the target.
    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    /// Credentials were rejected or the interactive flow failed.
    #[error("authentication failed: {reason}")]
    Authentication { reason: String, cancelled: bool },

    /// Any other I/O failure while establishing the connection.
    #[error("transport error: {0}")]
    Transport(String),
}

impl ConnectionError {
    /// Whether retrying the same connection may succeed.
    ///
    /// Only transport failures qualify; authentication failures would repeat
    /// and could lock the account.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Whether the user cancelled an interactive prompt.
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            Self::Authentication {
                cancelled: true,
                ..
            }
        )
    }
}

impl From<SessionError> for ConnectionError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Io(message) => Self::Transport(message),
            SessionError::Auth(reason) => Self::Authentication {
                reason,
                cancelled: false,
            },
            SessionError::Cancelled(reason) => Self::Authentication {
                reason,
                cancelled: true,
            },
        }
    }
}
