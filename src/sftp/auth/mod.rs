//! Authentication strategies for SFTP connections.
//!
//! The transport drives the handshake and raises challenges; a
//! [`ChallengeResponder`] answers them. Two strategies exist and exactly one
//! is picked per connection attempt by [`select_strategy`]:
//!
//! - [`PasswordStrategy`]: answers everything from stored credentials
//! - [`InteractiveStrategy`]: declines password requests and asks a
//!   [`Prompter`](crate::sftp::prompt::Prompter) for keyboard-interactive answers
//!
//! Public-key authentication is not supported.

mod interactive;
mod password;
mod select;
mod traits;

pub use interactive::InteractiveStrategy;
pub use password::PasswordStrategy;
pub use select::select_strategy;
pub use traits::ChallengeResponder;
