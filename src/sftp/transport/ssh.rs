//! russh-backed transport.
//!
//! ## Handshake
//!
//! 1. **TCP + key exchange**: `client::connect`, bounded by the connect timeout.
//!    The server host key is presented to the challenge handler as a yes/no
//!    confirmation; a denial aborts the connection.
//! 2. **Banner**: forwarded to the challenge handler as a message.
//! 3. **Password**: tried when the challenge handler has a password.
//! 4. **Keyboard-interactive**: every info request is answered through the
//!    challenge handler until the server accepts or rejects.
//!
//! Each server round-trip is bounded by the connect timeout. Time spent waiting
//! for the user to answer a prompt is not.
//!
//! ## Public key authentication
//!
//! An attached identity is recorded but never offered to the server.

use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use russh::client::{self, KeyboardInteractiveAuthResponse, Msg};
use russh::{Channel, Disconnect, keys};
use russh_sftp::client::SftpSession;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tracing::{debug, info, warn};

use crate::sftp::auth::ChallengeResponder;
use crate::sftp::config::{resolve_compression, resolve_inactivity_timeout};
use crate::sftp::error::SessionError;
use crate::sftp::types::Prompt;

use super::{SubChannel, Transport, TransportSession};

/// Build russh client configuration.
///
/// Keepalive probes are disabled: SSH servers keep idle connections open and
/// the connection handler does not heartbeat. `inactivity_timeout` of `None`
/// keeps an idle session open indefinitely.
pub fn build_client_config(
    inactivity_timeout: Option<Duration>,
    compress: bool,
) -> Arc<client::Config> {
    let compression = if compress {
        (&[russh::compression::ZLIB, russh::compression::NONE][..]).into()
    } else {
        (&[russh::compression::NONE][..]).into()
    };

    let preferred = russh::Preferred {
        compression,
        ..Default::default()
    };

    Arc::new(client::Config {
        inactivity_timeout,
        keepalive_interval: None,
        preferred,
        ..Default::default()
    })
}

/// Run one server round-trip under `timeout`.
async fn bounded<T, F>(timeout: Duration, what: &str, future: F) -> Result<T, SessionError>
where
    F: std::future::Future<Output = Result<T, russh::Error>>,
{
    tokio::time::timeout(timeout, future)
        .await
        .map_err(|_| SessionError::io(format!("{} timed out after {:?}", what, timeout)))?
        .map_err(|e| SessionError::io(format!("{} failed: {}", what, e)))
}

/// [`Transport`] over russh.
pub struct RusshTransport {
    config: Arc<client::Config>,
}

impl RusshTransport {
    pub fn new(config: Arc<client::Config>) -> Self {
        Self { config }
    }

    /// Transport configured from the environment.
    pub fn from_env() -> Self {
        Self::new(build_client_config(
            resolve_inactivity_timeout(None),
            resolve_compression(None),
        ))
    }
}

impl Default for RusshTransport {
    fn default() -> Self {
        Self::from_env()
    }
}

impl Transport for RusshTransport {
    type Session = RusshSession;

    fn open_session(
        &self,
        login: &str,
        host: &str,
        port: u16,
    ) -> Result<Self::Session, SessionError> {
        if host.is_empty() {
            return Err(SessionError::io("No host specified"));
        }

        Ok(RusshSession {
            config: self.config.clone(),
            login: login.to_string(),
            host: host.to_string(),
            port,
            identity: None,
            responder: None,
            timeout: Duration::from_millis(crate::sftp::config::DEFAULT_CONNECT_TIMEOUT_MS),
            handle: None,
        })
    }
}

/// russh client handler routing host key checks and banners to the
/// challenge handler.
struct ChallengeClient {
    host: String,
    port: u16,
    responder: Arc<dyn ChallengeResponder>,
}

impl client::Handler for ChallengeClient {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &keys::PublicKey,
    ) -> Result<bool, Self::Error> {
        let fingerprint = server_public_key.fingerprint(keys::HashAlg::Sha256);
        let message = format!(
            "The authenticity of host '{}:{}' can't be established.\nKey fingerprint is {}.\nContinue connecting?",
            self.host, self.port, fingerprint
        );

        let accepted = self.responder.confirm(&message);
        if !accepted {
            warn!("Host key for {}:{} was not accepted", self.host, self.port);
        }
        Ok(accepted)
    }

    async fn auth_banner(
        &mut self,
        banner: &str,
        _session: &mut client::Session,
    ) -> Result<(), Self::Error> {
        self.responder.show_message(banner).await;
        Ok(())
    }
}

/// A russh session to one host.
pub struct RusshSession {
    config: Arc<client::Config>,
    login: String,
    host: String,
    port: u16,
    identity: Option<PathBuf>,
    responder: Option<Arc<dyn ChallengeResponder>>,
    timeout: Duration,
    handle: Option<client::Handle<ChallengeClient>>,
}

impl RusshSession {
    /// Identity attached with [`TransportSession::attach_identity`].
    pub fn identity(&self) -> Option<&Path> {
        self.identity.as_deref()
    }

    async fn authenticate(
        &self,
        handle: &mut client::Handle<ChallengeClient>,
        responder: &dyn ChallengeResponder,
    ) -> Result<(), SessionError> {
        if let Some(password) = responder.password() {
            let result = bounded(
                self.timeout,
                "Password authentication",
                handle.authenticate_password(&self.login, password),
            )
            .await?;

            if result.success() {
                debug!("Password accepted for {}@{}", self.login, self.host);
                return Ok(());
            }
            debug!("Password rejected, falling back to keyboard-interactive");
        }

        let mut reply = bounded(
            self.timeout,
            "Keyboard-interactive authentication",
            handle.authenticate_keyboard_interactive_start(&self.login, None::<String>),
        )
        .await?;

        loop {
            match reply {
                KeyboardInteractiveAuthResponse::Success => return Ok(()),
                KeyboardInteractiveAuthResponse::Failure { .. } => {
                    return Err(SessionError::auth(
                        "Authentication failed: no authentication methods succeeded",
                    ));
                }
                KeyboardInteractiveAuthResponse::InfoRequest {
                    name,
                    instructions,
                    prompts,
                } => {
                    let prompts: Vec<Prompt> = prompts
                        .into_iter()
                        .map(|p| Prompt::new(p.prompt, p.echo))
                        .collect();

                    let answers = responder
                        .answer_prompts(&name, &instructions, &prompts)
                        .await?;

                    reply = bounded(
                        self.timeout,
                        "Keyboard-interactive response",
                        handle.authenticate_keyboard_interactive_respond(answers),
                    )
                    .await?;
                }
            }
        }
    }
}

#[async_trait]
impl TransportSession for RusshSession {
    type Channel = SftpChannel;

    fn attach_identity(&mut self, key_path: &Path) -> Result<(), SessionError> {
        warn!(
            "Public key authentication is not supported, identity {:?} will not be offered",
            key_path
        );
        self.identity = Some(key_path.to_path_buf());
        Ok(())
    }

    fn set_challenge_handler(&mut self, responder: Arc<dyn ChallengeResponder>) {
        self.responder = Some(responder);
    }

    async fn connect(&mut self, timeout: Duration) -> Result<(), SessionError> {
        let responder = self
            .responder
            .clone()
            .ok_or_else(|| SessionError::io("No challenge handler registered"))?;
        self.timeout = timeout;

        let handler = ChallengeClient {
            host: self.host.clone(),
            port: self.port,
            responder: responder.clone(),
        };

        debug!("Connecting to {}:{}", self.host, self.port);
        let mut handle = bounded(
            timeout,
            "Connection",
            client::connect(self.config.clone(), (self.host.as_str(), self.port), handler),
        )
        .await?;

        if let Err(e) = self.authenticate(&mut handle, responder.as_ref()).await {
            if let Err(disconnect_err) = handle
                .disconnect(Disconnect::ByApplication, "", "English")
                .await
            {
                warn!(
                    "Failed to disconnect unauthenticated session to {}:{}: {}",
                    self.host, self.port, disconnect_err
                );
            }
            return Err(e);
        }

        info!(
            "Authenticated {}@{}:{} using {}",
            self.login,
            self.host,
            self.port,
            responder.name()
        );
        self.handle = Some(handle);
        Ok(())
    }

    async fn open_subchannel(&mut self, subsystem: &str) -> Result<Self::Channel, SessionError> {
        let handle = self
            .handle
            .as_ref()
            .ok_or_else(|| SessionError::io("Session is not connected"))?;

        let channel = bounded(self.timeout, "Opening channel", handle.channel_open_session()).await?;

        Ok(SftpChannel {
            subsystem: subsystem.to_string(),
            pending: Mutex::new(Some(channel)),
            sftp: None,
            closed: AtomicBool::new(false),
            remote_closed: Arc::new(AtomicBool::new(false)),
        })
    }

    fn is_connected(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_closed())
    }

    async fn disconnect(&self) -> Result<(), SessionError> {
        let Some(handle) = &self.handle else {
            return Ok(());
        };

        handle
            .disconnect(Disconnect::ByApplication, "", "English")
            .await
            .map_err(|e| SessionError::io(format!("Disconnect failed: {}", e)))
    }
}

/// Channel stream that flags end-of-stream or a read error, both of which
/// mean the server is done with the channel.
struct EofWatch<S> {
    inner: S,
    closed: Arc<AtomicBool>,
}

impl<S: AsyncRead + Unpin> AsyncRead for EofWatch<S> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let before = buf.filled().len();
        let polled = Pin::new(&mut self.inner).poll_read(cx, buf);
        match &polled {
            Poll::Ready(Ok(())) if buf.filled().len() == before && buf.remaining() > 0 => {
                debug!("SFTP channel reached end of stream");
                self.closed.store(true, Ordering::SeqCst);
            }
            Poll::Ready(Err(_)) => self.closed.store(true, Ordering::SeqCst),
            _ => {}
        }
        polled
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for EofWatch<S> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

/// SFTP sub-channel.
pub struct SftpChannel {
    subsystem: String,
    pending: Mutex<Option<Channel<Msg>>>,
    sftp: Option<SftpSession>,
    closed: AtomicBool,
    remote_closed: Arc<AtomicBool>,
}

impl SftpChannel {
    /// The SFTP client, once connected.
    pub fn session(&self) -> Option<&SftpSession> {
        self.sftp.as_ref()
    }
}

#[async_trait]
impl SubChannel for SftpChannel {
    async fn connect(&mut self, timeout: Duration) -> Result<(), SessionError> {
        let channel = self
            .pending
            .get_mut()
            .map_err(|_| SessionError::io("Channel state poisoned"))?
            .take()
            .ok_or_else(|| SessionError::io("Sub-channel already connected"))?;

        bounded(
            timeout,
            "Requesting subsystem",
            channel.request_subsystem(true, self.subsystem.as_str()),
        )
        .await?;

        let stream = EofWatch {
            inner: channel.into_stream(),
            closed: self.remote_closed.clone(),
        };
        let sftp = tokio::time::timeout(timeout, SftpSession::new(stream))
            .await
            .map_err(|_| SessionError::io(format!("SFTP init timed out after {:?}", timeout)))?
            .map_err(|e| SessionError::io(format!("SFTP init failed: {}", e)))?;

        debug!("SFTP sub-channel ready");
        self.sftp = Some(sftp);
        Ok(())
    }

    /// Closed until connected, after `quit`, and once the server ends the
    /// subsystem (seen when the SFTP client's reader hits end of stream).
    fn is_closed(&self) -> bool {
        self.sftp.is_none()
            || self.closed.load(Ordering::SeqCst)
            || self.remote_closed.load(Ordering::SeqCst)
    }

    async fn quit(&self) -> Result<(), SessionError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        match &self.sftp {
            Some(sftp) => sftp
                .close()
                .await
                .map_err(|e| SessionError::io(format!("SFTP close failed: {}", e))),
            None => Ok(()),
        }
    }
}
