#![deny(warnings)]
#![deny(clippy::unwrap_used)]

use std::env;
use std::sync::Arc;

use dotenv::dotenv;
use sftp_connect::sftp::{
    ConnectionHandler, ConnectionTarget, Credentials, REALM_LOCKS, RusshTransport,
    ScopedConnection, TerminalPrompter,
};
use tracing::{error, info};

/// Environment variable supplying the login when the destination has none
const LOGIN_ENV_VAR: &str = "SFTP_LOGIN";

/// Environment variable supplying the stored password; empty means interactive
const PASSWORD_ENV_VAR: &str = "SFTP_PASSWORD";

/// Environment variable supplying a private key path
const KEY_PATH_ENV_VAR: &str = "SFTP_KEY_PATH";

/// Split `[login@]host[:port]`.
///
/// Uses `rsplit_once` so bracketed IPv6 hosts (`[::1]:22`) keep their colons.
fn parse_destination(destination: &str) -> Result<(Option<String>, String, Option<u16>), String> {
    let (login, address) = match destination.split_once('@') {
        Some((login, address)) => (Some(login.to_string()), address),
        None => (None, destination),
    };

    let (host, port) = match address.rsplit_once(':') {
        Some((host, port_str)) if !host.ends_with(':') => {
            let port = port_str
                .parse::<u16>()
                .map_err(|e| format!("Invalid port number: {}", e))?;
            (host.to_string(), Some(port))
        }
        _ => (address.to_string(), None),
    };

    if host.is_empty() {
        return Err("No host specified".to_string());
    }

    Ok((login, host, port))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("info".parse().expect("valid directive")),
        )
        .with_writer(std::io::stderr)
        .init();

    let destination = env::args()
        .nth(1)
        .ok_or("usage: sftp-connect [login@]host[:port]")?;
    let (login, host, port) = parse_destination(&destination)?;

    let login = login
        .or_else(|| env::var(LOGIN_ENV_VAR).ok())
        .or_else(|| env::var("USER").ok());
    let credentials =
        login.map(|login| Credentials::new(login, env::var(PASSWORD_ENV_VAR).unwrap_or_default()));

    let mut target = ConnectionTarget::new(host);
    if let Some(port) = port {
        target = target.with_port(port);
    }
    if let Ok(key_path) = env::var(KEY_PATH_ENV_VAR) {
        target = target.with_private_key(key_path);
    }

    let handler = Arc::new(
        ConnectionHandler::new(RusshTransport::from_env(), target, credentials)
            .with_prompter(Arc::new(TerminalPrompter)),
    );
    let connection = ScopedConnection::open(handler, &REALM_LOCKS)?;

    if let Err(e) = connection.start().await {
        error!("Could not connect to {}: {}", connection.target().realm(), e);
        connection.close().await;
        return Err(e.into());
    }

    let summary = connection
        .info()
        .map(|info| serde_json::to_string_pretty(&info))
        .transpose()?;
    if let Some(summary) = summary {
        println!("{}", summary);
    }

    info!("Closing connection to {}", connection.target().realm());
    connection.close().await;
    Ok(())
}
