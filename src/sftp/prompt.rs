//! Interactive input collaborator.
//!
//! The interactive authentication strategy asks a [`Prompter`] for answers to
//! keyboard-interactive prompts. How the question is rendered (terminal, GUI
//! dialog, scripted test double) is up to the implementation; the only
//! contract is that every collection request returns either a value or
//! [`Cancelled`].

use async_trait::async_trait;
use tracing::{debug, info};

use super::error::Cancelled;

/// Source of user input during authentication.
#[async_trait]
pub trait Prompter: Send + Sync {
    /// Display an informational message. Fire-and-forget.
    async fn show_message(&self, message: &str);

    /// Collect one visible text value for `prompt`.
    async fn request_text(&self, prompt: &str) -> Result<String, Cancelled>;

    /// Collect one masked value for `prompt`.
    async fn request_secret(&self, prompt: &str) -> Result<String, Cancelled>;
}

/// Prompter for unattended use: logs messages and cancels every request.
#[derive(Debug, Default, Clone, Copy)]
pub struct NonInteractive;

#[async_trait]
impl Prompter for NonInteractive {
    async fn show_message(&self, message: &str) {
        info!("{}", message);
    }

    async fn request_text(&self, prompt: &str) -> Result<String, Cancelled> {
        debug!("No interactive input available for prompt {:?}", prompt);
        Err(Cancelled)
    }

    async fn request_secret(&self, prompt: &str) -> Result<String, Cancelled> {
        debug!("No interactive input available for prompt {:?}", prompt);
        Err(Cancelled)
    }
}

/// Prompter reading from the controlling terminal.
///
/// Reads run on the blocking thread pool so the runtime stays responsive.
/// End of input or a read error counts as cancellation.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompter;

#[async_trait]
impl Prompter for TerminalPrompter {
    async fn show_message(&self, message: &str) {
        eprintln!("{}", message);
    }

    async fn request_text(&self, prompt: &str) -> Result<String, Cancelled> {
        let prompt = prompt.to_string();
        tokio::task::spawn_blocking(move || {
            use std::io::{BufRead, Write};

            let mut stderr = std::io::stderr();
            let _ = write!(stderr, "{}", prompt);
            let _ = stderr.flush();

            let mut line = String::new();
            match std::io::stdin().lock().read_line(&mut line) {
                Ok(0) | Err(_) => Err(Cancelled),
                Ok(_) => Ok(line.trim_end_matches(['\r', '\n']).to_string()),
            }
        })
        .await
        .map_err(|_| Cancelled)?
    }

    async fn request_secret(&self, prompt: &str) -> Result<String, Cancelled> {
        let prompt = prompt.to_string();
        tokio::task::spawn_blocking(move || {
            rpassword::prompt_password(prompt).map_err(|_| Cancelled)
        })
        .await
        .map_err(|_| Cancelled)?
    }
}
