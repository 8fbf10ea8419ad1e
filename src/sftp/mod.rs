//! SFTP connection handling.
//!
//! This module is organized into the following submodules:
//!
//! - `types`: Connection targets, credentials and status types
//! - `config`: Timeout and transport settings with environment variable support
//! - `error`: Error taxonomy (missing credentials, authentication, transport)
//! - `prompt`: Interactive input collaborator
//! - `auth`: Authentication strategies answering handshake challenges
//! - `transport`: Transport abstraction and the russh implementation
//! - `handler`: Connection lifecycle orchestration
//! - `lock`, `scoped`: Realm locks and the scoped connection guard

pub mod auth;
pub mod config;
pub mod error;
pub mod handler;
pub mod lock;
pub mod prompt;
pub mod scoped;
pub mod transport;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use auth::{ChallengeResponder, InteractiveStrategy, PasswordStrategy, select_strategy};
pub use error::{Cancelled, ConnectionError, SessionError};
pub use handler::ConnectionHandler;
pub use lock::{REALM_LOCKS, RealmBusy, RealmLock, RealmLocks};
pub use prompt::{NonInteractive, Prompter, TerminalPrompter};
pub use scoped::ScopedConnection;
pub use transport::{RusshTransport, SftpChannel, SubChannel, Transport, TransportSession};
pub use types::{
    ConnectionInfo, ConnectionState, ConnectionTarget, Credentials, DEFAULT_SSH_PORT, Prompt,
};
