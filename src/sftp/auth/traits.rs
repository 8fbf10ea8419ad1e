//! Challenge responder trait definition.
//!
//! During the SSH handshake the transport raises challenges (banners, host
//! key confirmations, password requests, keyboard-interactive prompt lists)
//! and expects an answer to each one. A [`ChallengeResponder`] answers all of
//! them; leaving one unanswered would stall the handshake.

use async_trait::async_trait;

use crate::sftp::error::Cancelled;
use crate::sftp::types::Prompt;

/// Answers every authentication challenge a transport can raise.
///
/// Implementations must be thread-safe (`Send + Sync`) because the transport
/// calls them from its own connection task.
#[async_trait]
pub trait ChallengeResponder: Send + Sync {
    /// Informational message from the server (e.g. a banner).
    async fn show_message(&self, message: &str);

    /// Yes/no confirmation. `false` denies.
    fn confirm(&self, message: &str) -> bool;

    /// Password for password authentication.
    ///
    /// `None` means unavailable; the transport must treat it as a denial and
    /// move on to the next method.
    fn password(&self) -> Option<&str>;

    /// Passphrase for an encrypted private key. `None` means unavailable.
    fn passphrase(&self) -> Option<&str>;

    /// Answer a keyboard-interactive round.
    ///
    /// Returns exactly one answer per prompt, in prompt order.
    async fn answer_prompts(
        &self,
        name: &str,
        instruction: &str,
        prompts: &[Prompt],
    ) -> Result<Vec<String>, Cancelled>;

    /// Get the name of this strategy.
    ///
    /// Used for logging and connection metadata.
    fn name(&self) -> &'static str;
}
