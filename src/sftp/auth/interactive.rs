//! Interactive (keyboard-interactive) authentication.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::sftp::error::Cancelled;
use crate::sftp::prompt::Prompter;
use crate::sftp::types::Prompt;

use super::traits::ChallengeResponder;

/// Strategy used when no stored secret is available.
///
/// Password and passphrase requests are declined so the transport falls
/// through to keyboard-interactive, whose prompts are forwarded to the
/// [`Prompter`] one at a time.
pub struct InteractiveStrategy {
    prompter: Arc<dyn Prompter>,
}

impl InteractiveStrategy {
    pub fn new(prompter: Arc<dyn Prompter>) -> Self {
        Self { prompter }
    }
}

#[async_trait]
impl ChallengeResponder for InteractiveStrategy {
    async fn show_message(&self, message: &str) {
        self.prompter.show_message(message).await;
    }

    fn confirm(&self, _message: &str) -> bool {
        true
    }

    fn password(&self) -> Option<&str> {
        None
    }

    fn passphrase(&self) -> Option<&str> {
        None
    }

    async fn answer_prompts(
        &self,
        name: &str,
        instruction: &str,
        prompts: &[Prompt],
    ) -> Result<Vec<String>, Cancelled> {
        debug!(
            "Keyboard-interactive round {:?} with {} prompt(s)",
            name,
            prompts.len()
        );

        if !instruction.is_empty() {
            self.prompter.show_message(instruction).await;
        }

        let mut answers = Vec::with_capacity(prompts.len());
        for prompt in prompts {
            let answer = if prompt.echo {
                self.prompter.request_text(&prompt.label).await
            } else {
                self.prompter.request_secret(&prompt.label).await
            };

            match answer {
                Ok(value) => answers.push(value),
                Err(Cancelled) => {
                    info!("Interactive input cancelled at prompt {:?}", prompt.label);
                    return Err(Cancelled);
                }
            }
        }

        Ok(answers)
    }

    fn name(&self) -> &'static str {
        "interactive"
    }
}
