//! Lifecycle of a single authenticated SFTP connection over SSH.
//!
//! See [`sftp::ConnectionHandler`] for the entry point.

pub mod sftp;
