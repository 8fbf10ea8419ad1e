//! Connection targets, credentials and connection status types.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default SSH port used when the target does not specify one.
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Remote location to connect to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionTarget {
    pub host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Private key identity attached to the transport when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key_path: Option<PathBuf>,
}

impl ConnectionTarget {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            private_key_path: None,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_private_key(mut self, path: impl Into<PathBuf>) -> Self {
        self.private_key_path = Some(path.into());
        self
    }

    /// Port actually used for the connection.
    pub fn effective_port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_SSH_PORT)
    }

    /// `host:port` identity of this target.
    pub fn realm(&self) -> String {
        format!("{}:{}", self.host, self.effective_port())
    }
}

/// Login and secret for a target.
///
/// An empty secret means no stored password is available and the
/// interactive strategy must be used.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    pub login: String,
    #[serde(default)]
    pub secret: String,
}

impl Credentials {
    pub fn new(login: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            secret: secret.into(),
        }
    }

    pub fn has_secret(&self) -> bool {
        !self.secret.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("secret", &if self.has_secret() { "***" } else { "" })
            .finish()
    }
}

/// One entry of a keyboard-interactive prompt list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub label: String,
    /// Whether the answer may be displayed while typed.
    pub echo: bool,
}

impl Prompt {
    pub fn new(label: impl Into<String>, echo: bool) -> Self {
        Self {
            label: label.into(),
            echo,
        }
    }
}

/// Derived connection state of a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// The last `start` attempt failed.
    Failed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Failed => write!(f, "failed"),
        }
    }
}

/// Metadata of an established connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionInfo {
    pub connection_id: String,
    pub host: String,
    pub port: u16,
    pub login: String,
    /// Name of the authentication strategy used for the handshake
    pub strategy: String,
    /// RFC3339 timestamp
    pub connected_at: String,
}
