//! Transport abstraction.
//!
//! The connection handler never talks to an SSH library directly. It drives a
//! [`Transport`] through the following sequence:
//!
//! 1. [`Transport::open_session`] creates a fresh, unconnected session.
//! 2. [`TransportSession::attach_identity`] (optional) and
//!    [`TransportSession::set_challenge_handler`] configure it.
//! 3. [`TransportSession::connect`] performs the handshake, calling the
//!    challenge handler for every authentication challenge.
//! 4. [`TransportSession::open_subchannel`] and [`SubChannel::connect`] open the
//!    file-transfer sub-channel on the same session.
//!
//! [`RusshTransport`] is the production implementation.

mod ssh;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::auth::ChallengeResponder;
use super::error::SessionError;

pub use ssh::{RusshSession, RusshTransport, SftpChannel, build_client_config};

/// Subsystem name of the file-transfer sub-channel.
pub const SFTP_SUBSYSTEM: &str = "sftp";

/// Factory for transport sessions.
pub trait Transport: Send + Sync {
    type Session: TransportSession;

    /// Create a new unconnected session. Performs no network I/O.
    fn open_session(&self, login: &str, host: &str, port: u16)
    -> Result<Self::Session, SessionError>;
}

/// A single SSH connection, prior to any sub-channel.
#[async_trait]
pub trait TransportSession: Send + Sync + 'static {
    type Channel: SubChannel;

    /// Attach a private key identity.
    fn attach_identity(&mut self, key_path: &Path) -> Result<(), SessionError>;

    /// Register the responder answering authentication challenges.
    fn set_challenge_handler(&mut self, responder: Arc<dyn ChallengeResponder>);

    /// Connect and authenticate. Server round-trips are bounded by `timeout`.
    async fn connect(&mut self, timeout: Duration) -> Result<(), SessionError>;

    /// Open a sub-channel for `subsystem` on the connected session.
    async fn open_subchannel(&mut self, subsystem: &str) -> Result<Self::Channel, SessionError>;

    fn is_connected(&self) -> bool;

    async fn disconnect(&self) -> Result<(), SessionError>;
}

/// A service-specific stream multiplexed over a session.
#[async_trait]
pub trait SubChannel: Send + Sync + 'static {
    /// Start the subsystem, bounded by `timeout`.
    async fn connect(&mut self, timeout: Duration) -> Result<(), SessionError>;

    fn is_closed(&self) -> bool;

    /// Ask the remote side to end the subsystem.
    async fn quit(&self) -> Result<(), SessionError>;
}
