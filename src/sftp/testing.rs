//! Test doubles shared by the unit tests.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::auth::ChallengeResponder;
use super::error::{Cancelled, SessionError};
use super::prompt::Prompter;
use super::transport::{SubChannel, Transport, TransportSession};
use super::types::Prompt;

/// Request received by [`ScriptedPrompter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Message(String),
    Text(String),
    Secret(String),
}

/// Prompter answering from a fixed list; cancels once the list runs out.
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<Request>>,
}

impl ScriptedPrompter {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: Mutex::new(answers.into_iter().map(Into::into).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    fn next(&self, request: Request) -> Result<String, Cancelled> {
        self.requests.lock().unwrap().push(request);
        self.answers.lock().unwrap().pop_front().ok_or(Cancelled)
    }
}

#[async_trait]
impl Prompter for ScriptedPrompter {
    async fn show_message(&self, message: &str) {
        self.requests
            .lock()
            .unwrap()
            .push(Request::Message(message.to_string()));
    }

    async fn request_text(&self, prompt: &str) -> Result<String, Cancelled> {
        self.next(Request::Text(prompt.to_string()))
    }

    async fn request_secret(&self, prompt: &str) -> Result<String, Cancelled> {
        self.next(Request::Secret(prompt.to_string()))
    }
}

/// Challenge the fake transport raises during `connect`.
#[derive(Debug, Clone)]
pub enum Challenge {
    Message(String),
    YesNo(String),
    Password,
    Passphrase,
    Prompts(Vec<Prompt>),
}

/// How the responder answered a challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Shown,
    Confirmed(bool),
    Password(Option<String>),
    Passphrase(Option<String>),
    Prompts(Vec<String>),
}

/// Everything the fake transport was asked to do.
#[derive(Debug, Default, Clone)]
pub struct CallLog {
    pub sessions: Vec<(String, String, u16)>,
    pub identities: Vec<PathBuf>,
    pub strategies: Vec<&'static str>,
    pub connects: Vec<Duration>,
    pub subchannels: Vec<String>,
    pub subchannel_connects: usize,
    pub disconnects: usize,
    pub quits: usize,
    pub answers: Vec<Answer>,
}

impl CallLog {
    pub fn total(&self) -> usize {
        self.sessions.len()
            + self.identities.len()
            + self.strategies.len()
            + self.connects.len()
            + self.subchannels.len()
            + self.subchannel_connects
            + self.disconnects
            + self.quits
    }
}

/// Scripted in-memory transport.
#[derive(Clone, Default)]
pub struct FakeTransport {
    log: Arc<Mutex<CallLog>>,
    challenges: Vec<Challenge>,
    connect_error: Option<SessionError>,
    subchannel_error: Option<SessionError>,
    panic_on_disconnect: bool,
    live: Arc<AtomicBool>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_challenges(mut self, challenges: Vec<Challenge>) -> Self {
        self.challenges = challenges;
        self
    }

    pub fn failing_connect(mut self, error: SessionError) -> Self {
        self.connect_error = Some(error);
        self
    }

    pub fn failing_subchannel(mut self, error: SessionError) -> Self {
        self.subchannel_error = Some(error);
        self
    }

    /// Sessions panic when asked to disconnect.
    pub fn panicking_disconnect(mut self) -> Self {
        self.panic_on_disconnect = true;
        self
    }

    pub fn log(&self) -> CallLog {
        self.log.lock().unwrap().clone()
    }

    /// Simulate the server dropping the connection.
    pub fn sever(&self) {
        self.live.store(false, Ordering::SeqCst);
    }
}

impl Transport for FakeTransport {
    type Session = FakeSession;

    fn open_session(
        &self,
        login: &str,
        host: &str,
        port: u16,
    ) -> Result<Self::Session, SessionError> {
        self.log
            .lock()
            .unwrap()
            .sessions
            .push((login.to_string(), host.to_string(), port));

        Ok(FakeSession {
            transport: self.clone(),
            responder: None,
            connected: false,
        })
    }
}

pub struct FakeSession {
    transport: FakeTransport,
    responder: Option<Arc<dyn ChallengeResponder>>,
    connected: bool,
}

impl FakeSession {
    fn record(&self, answer: Answer) {
        self.transport.log.lock().unwrap().answers.push(answer);
    }
}

#[async_trait]
impl TransportSession for FakeSession {
    type Channel = FakeChannel;

    fn attach_identity(&mut self, key_path: &Path) -> Result<(), SessionError> {
        self.transport
            .log
            .lock()
            .unwrap()
            .identities
            .push(key_path.to_path_buf());
        Ok(())
    }

    fn set_challenge_handler(&mut self, responder: Arc<dyn ChallengeResponder>) {
        self.transport
            .log
            .lock()
            .unwrap()
            .strategies
            .push(responder.name());
        self.responder = Some(responder);
    }

    async fn connect(&mut self, timeout: Duration) -> Result<(), SessionError> {
        self.transport.log.lock().unwrap().connects.push(timeout);
        let responder = self
            .responder
            .clone()
            .ok_or_else(|| SessionError::io("No challenge handler registered"))?;

        for challenge in self.transport.challenges.clone() {
            match challenge {
                Challenge::Message(message) => {
                    responder.show_message(&message).await;
                    self.record(Answer::Shown);
                }
                Challenge::YesNo(message) => {
                    let allowed = responder.confirm(&message);
                    self.record(Answer::Confirmed(allowed));
                    if !allowed {
                        return Err(SessionError::io("Host key rejected"));
                    }
                }
                Challenge::Password => {
                    self.record(Answer::Password(responder.password().map(String::from)));
                }
                Challenge::Passphrase => {
                    self.record(Answer::Passphrase(
                        responder.passphrase().map(String::from),
                    ));
                }
                Challenge::Prompts(prompts) => {
                    let answers = responder.answer_prompts("", "", &prompts).await?;
                    self.record(Answer::Prompts(answers));
                }
            }
        }

        if let Some(error) = self.transport.connect_error.clone() {
            return Err(error);
        }

        self.connected = true;
        self.transport.live.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn open_subchannel(&mut self, subsystem: &str) -> Result<Self::Channel, SessionError> {
        self.transport
            .log
            .lock()
            .unwrap()
            .subchannels
            .push(subsystem.to_string());

        if !self.connected {
            return Err(SessionError::io("Session is not connected"));
        }

        Ok(FakeChannel {
            transport: self.transport.clone(),
            open: AtomicBool::new(false),
        })
    }

    fn is_connected(&self) -> bool {
        self.connected && self.transport.live.load(Ordering::SeqCst)
    }

    async fn disconnect(&self) -> Result<(), SessionError> {
        if self.transport.panic_on_disconnect {
            panic!("disconnect failed");
        }
        self.transport.log.lock().unwrap().disconnects += 1;
        self.transport.live.store(false, Ordering::SeqCst);
        Ok(())
    }
}

pub struct FakeChannel {
    transport: FakeTransport,
    open: AtomicBool,
}

#[async_trait]
impl SubChannel for FakeChannel {
    async fn connect(&mut self, _timeout: Duration) -> Result<(), SessionError> {
        self.transport.log.lock().unwrap().subchannel_connects += 1;
        if let Some(error) = self.transport.subchannel_error.clone() {
            return Err(error);
        }
        self.open.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        !self.open.load(Ordering::SeqCst)
    }

    async fn quit(&self) -> Result<(), SessionError> {
        self.transport.log.lock().unwrap().quits += 1;
        self.open.store(false, Ordering::SeqCst);
        Ok(())
    }
}
