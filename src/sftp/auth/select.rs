//! Strategy selection.

use std::sync::Arc;

use tracing::debug;

use crate::sftp::prompt::Prompter;
use crate::sftp::types::Credentials;

use super::traits::ChallengeResponder;
use super::{InteractiveStrategy, PasswordStrategy};

/// Pick the strategy for one connection attempt.
///
/// A non-empty secret selects [`PasswordStrategy`]; otherwise the handshake
/// is driven by [`InteractiveStrategy`] through `prompter`.
pub fn select_strategy(
    credentials: &Credentials,
    prompter: Arc<dyn Prompter>,
) -> Arc<dyn ChallengeResponder> {
    let strategy: Arc<dyn ChallengeResponder> = if credentials.has_secret() {
        Arc::new(PasswordStrategy::new(credentials.clone()))
    } else {
        Arc::new(InteractiveStrategy::new(prompter))
    };

    debug!(
        "Selected {} authentication for {}",
        strategy.name(),
        credentials.login
    );
    strategy
}
