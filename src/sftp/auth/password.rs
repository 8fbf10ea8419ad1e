//! Stored-password authentication.

use async_trait::async_trait;
use tracing::debug;

use crate::sftp::error::Cancelled;
use crate::sftp::types::{Credentials, Prompt};

use super::traits::ChallengeResponder;

/// Answers every challenge from stored credentials.
///
/// Never interacts with the user and never blocks.
pub struct PasswordStrategy {
    credentials: Credentials,
}

impl PasswordStrategy {
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }
}

#[async_trait]
impl ChallengeResponder for PasswordStrategy {
    async fn show_message(&self, message: &str) {
        debug!("Server message: {}", message);
    }

    fn confirm(&self, _message: &str) -> bool {
        true
    }

    fn password(&self) -> Option<&str> {
        Some(&self.credentials.secret)
    }

    fn passphrase(&self) -> Option<&str> {
        Some(&self.credentials.secret)
    }

    async fn answer_prompts(
        &self,
        _name: &str,
        _instruction: &str,
        prompts: &[Prompt],
    ) -> Result<Vec<String>, Cancelled> {
        // Echoed prompts ask for the login, masked ones for the secret
        Ok(prompts
            .iter()
            .map(|prompt| {
                if prompt.echo {
                    self.credentials.login.clone()
                } else {
                    self.credentials.secret.clone()
                }
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "password"
    }
}
