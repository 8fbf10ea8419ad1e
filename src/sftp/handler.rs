//! Connection handler: one authenticated SFTP connection.
//!
//! ## Connection Lifecycle
//!
//! 1. **Credentials check**: without credentials `start` fails with
//!    [`ConnectionError::AuthenticationRequired`] before any transport call.
//! 2. **Session**: a fresh transport session is opened for the target's host
//!    and effective port (22 unless configured). A configured private key path
//!    is attached as an identity.
//! 3. **Strategy**: [`select_strategy`] picks password or interactive
//!    authentication and registers it as the session's challenge handler.
//! 4. **Handshake**: the session connects, bounded by the connect timeout.
//! 5. **Sub-channel**: the `sftp` sub-channel is opened and connected with the
//!    same timeout.
//!
//! Session and sub-channel are published only once every step succeeded. A
//! failed attempt disconnects whatever it built and leaves the handler
//! disconnected. A `close` issued while `start` is still running wins: the
//! fresh connection is torn down instead of published.
//!
//! ## Thread Safety
//!
//! `is_connected`, `state`, `channel` and `close` may be called from any task
//! while another one runs `start`. They share one handler-scoped mutex that
//! guards the session and sub-channel slots and is never held across an
//! `.await`. Concurrent `start` calls are serialized.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::{debug, info, warn};

use super::auth::select_strategy;
use super::config::resolve_connect_timeout;
use super::error::ConnectionError;
use super::prompt::{NonInteractive, Prompter};
use super::transport::{SFTP_SUBSYSTEM, SubChannel, Transport, TransportSession};
use super::types::{ConnectionInfo, ConnectionState, ConnectionTarget, Credentials};

type SessionOf<T> = <T as Transport>::Session;
type ChannelOf<T> = <SessionOf<T> as TransportSession>::Channel;

/// Published connection state.
struct Live<T: Transport> {
    session: Option<Arc<SessionOf<T>>>,
    channel: Option<Arc<ChannelOf<T>>>,
    info: Option<ConnectionInfo>,
    /// Bumped by every `close`.
    epoch: u64,
}

impl<T: Transport> Live<T> {
    fn empty() -> Self {
        Self {
            session: None,
            channel: None,
            info: None,
            epoch: 0,
        }
    }
}

/// A connection built by `start`, not yet published.
struct Established<T: Transport> {
    session: SessionOf<T>,
    channel: ChannelOf<T>,
    info: ConnectionInfo,
}

/// Owns the transport session and `sftp` sub-channel for one remote location.
pub struct ConnectionHandler<T: Transport> {
    transport: T,
    target: ConnectionTarget,
    credentials: Option<Credentials>,
    prompter: Arc<dyn Prompter>,
    connect_timeout: Duration,
    live: Mutex<Live<T>>,
    starting: tokio::sync::Mutex<()>,
    failed: AtomicBool,
}

impl<T: Transport> ConnectionHandler<T> {
    /// Create a handler. No I/O happens until [`start`](Self::start).
    ///
    /// Interactive prompts are cancelled unless a prompter is supplied with
    /// [`with_prompter`](Self::with_prompter).
    pub fn new(transport: T, target: ConnectionTarget, credentials: Option<Credentials>) -> Self {
        Self {
            transport,
            target,
            credentials,
            prompter: Arc::new(NonInteractive),
            connect_timeout: resolve_connect_timeout(None),
            live: Mutex::new(Live::empty()),
            starting: tokio::sync::Mutex::new(()),
            failed: AtomicBool::new(false),
        }
    }

    pub fn with_prompter(mut self, prompter: Arc<dyn Prompter>) -> Self {
        self.prompter = prompter;
        self
    }

    /// Bound for the handshake and for opening the sub-channel.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn target(&self) -> &ConnectionTarget {
        &self.target
    }

    fn live(&self) -> MutexGuard<'_, Live<T>> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Connect, authenticate and open the `sftp` sub-channel.
    ///
    /// Returns immediately if the handler is already connected. A handler
    /// whose previous attempt failed, or whose connection was closed or
    /// dropped, is cleaned up and reconnected with a fresh session.
    pub async fn start(&self) -> Result<(), ConnectionError> {
        let _starting = self.starting.lock().await;

        if self.is_connected() {
            debug!("Already connected to {}", self.target.realm());
            return Ok(());
        }

        // Drop leftovers of a connection the server closed
        self.close().await;

        let epoch = self.live().epoch;

        info!("Starting connection to {}", self.target.realm());
        match self.establish().await {
            Ok(established) => {
                if let Some(aborted) = self.publish(established, epoch) {
                    info!(
                        "Connection to {} was closed during start",
                        self.target.realm()
                    );
                    self.teardown(
                        Some(Arc::new(aborted.channel)),
                        Some(Arc::new(aborted.session)),
                    )
                    .await;
                    return Err(ConnectionError::Transport(
                        "Connection closed during start".to_string(),
                    ));
                }
                self.failed.store(false, Ordering::SeqCst);
                info!("Connection to {} established", self.target.realm());
                Ok(())
            }
            Err(e) => {
                self.failed.store(true, Ordering::SeqCst);
                info!("Connection to {} failed: {}", self.target.realm(), e);
                Err(e)
            }
        }
    }

    /// Publish `established` unless `close` ran since `epoch` was read, in
    /// which case it is handed back unpublished.
    fn publish(
        &self,
        established: Established<T>,
        epoch: u64,
    ) -> Option<Established<T>> {
        let mut live = self.live();
        if live.epoch != epoch {
            return Some(established);
        }
        live.session = Some(Arc::new(established.session));
        live.channel = Some(Arc::new(established.channel));
        live.info = Some(established.info);
        None
    }

    async fn establish(&self) -> Result<Established<T>, ConnectionError> {
        let credentials = self.credentials.as_ref().ok_or_else(|| {
            ConnectionError::AuthenticationRequired("Login and password required".to_string())
        })?;

        let port = self.target.effective_port();
        let mut session = self
            .transport
            .open_session(&credentials.login, &self.target.host, port)?;

        match self.handshake(&mut session, credentials).await {
            Ok((channel, strategy)) => Ok(Established {
                session,
                channel,
                info: ConnectionInfo {
                    connection_id: uuid::Uuid::new_v4().to_string(),
                    host: self.target.host.clone(),
                    port,
                    login: credentials.login.clone(),
                    strategy: strategy.to_string(),
                    connected_at: chrono::Utc::now().to_rfc3339(),
                },
            }),
            Err(e) => {
                if session.is_connected()
                    && let Err(disconnect_err) = session.disconnect().await
                {
                    warn!(
                        "Failed to disconnect half-open session to {}: {}",
                        self.target.realm(),
                        disconnect_err
                    );
                }
                Err(e)
            }
        }
    }

    async fn handshake(
        &self,
        session: &mut SessionOf<T>,
        credentials: &Credentials,
    ) -> Result<(ChannelOf<T>, &'static str), ConnectionError> {
        if let Some(key_path) = &self.target.private_key_path {
            debug!("Attaching identity {:?}", key_path);
            session.attach_identity(key_path)?;
        }

        let strategy = select_strategy(credentials, self.prompter.clone());
        let strategy_name = strategy.name();
        session.set_challenge_handler(strategy);

        session.connect(self.connect_timeout).await?;

        let mut channel = session.open_subchannel(SFTP_SUBSYSTEM).await?;
        channel.connect(self.connect_timeout).await?;

        Ok((channel, strategy_name))
    }

    /// True iff the session reports connected and the sub-channel is open.
    pub fn is_connected(&self) -> bool {
        let live = self.live();
        live.session.as_ref().is_some_and(|s| s.is_connected())
            && live.channel.as_ref().is_some_and(|c| !c.is_closed())
    }

    /// Derived connection state.
    pub fn state(&self) -> ConnectionState {
        if self.starting.try_lock().is_err() {
            ConnectionState::Connecting
        } else if self.is_connected() {
            ConnectionState::Connected
        } else if self.failed.load(Ordering::SeqCst) {
            ConnectionState::Failed
        } else {
            ConnectionState::Disconnected
        }
    }

    /// The open sub-channel, for issuing file operations.
    pub fn channel(&self) -> Option<Arc<ChannelOf<T>>> {
        self.live().channel.clone()
    }

    /// Metadata of the current connection, if any.
    pub fn info(&self) -> Option<ConnectionInfo> {
        self.live().info.clone()
    }

    /// Best-effort shutdown: quit the sub-channel, then disconnect the session.
    ///
    /// Never fails; teardown errors are logged. Calling it on a handler that
    /// never connected, or more than once, makes no transport calls. A
    /// `start` still in progress is aborted before it publishes.
    pub async fn close(&self) {
        let (session, channel) = {
            let mut live = self.live();
            live.info = None;
            live.epoch = live.epoch.wrapping_add(1);
            (live.session.take(), live.channel.take())
        };
        self.failed.store(false, Ordering::SeqCst);

        self.teardown(channel, session).await;
    }

    async fn teardown(
        &self,
        channel: Option<Arc<ChannelOf<T>>>,
        session: Option<Arc<SessionOf<T>>>,
    ) {
        if let Some(channel) = channel
            && let Err(e) = channel.quit().await
        {
            warn!("Error closing sub-channel to {}: {}", self.target.realm(), e);
        }

        if let Some(session) = session {
            if let Err(e) = session.disconnect().await {
                warn!("Error disconnecting from {}: {}", self.target.realm(), e);
            }
            debug!("Closed connection to {}", self.target.realm());
        }
    }

    /// No-op: SSH servers such as OpenSSH keep idle connections open, so no
    /// application-level heartbeat is sent.
    pub fn keep_alive(&self) {}
}
