use std::sync::Arc;

use thiserror::Error;

/// Errors produced while connecting, opening channels, or running remote
/// commands over an SSH session.
///
/// The variant captured by [`crate::channel::ChannelState`] from the
/// open-confirmation, open-failure, or close hooks is cloneable so that
/// both `wait_open()` and the waiter task can observe it without fighting
/// over ownership of the one error that was ever raised.
#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("failed to connect to {host}:{port}: {source}")]
    Connect {
        host: String,
        port: u16,
        #[source]
        source: Arc<anyhow::Error>,
    },

    #[error("authentication to {user}@{host} failed: {reason}")]
    AuthFailed {
        user: String,
        host: String,
        reason: String,
    },

    #[error("server key for {host}:{port} did not match known_hosts")]
    HostKeyMismatch { host: String, port: u16 },

    #[error("channel open refused by server: {reason} (code {code})")]
    ChannelOpenFailed { code: u32, reason: String },

    #[error("ssh transport fault: {0}")]
    Transport(String),

    #[error("session is closed")]
    SessionClosed,

    #[error("io error: {0}")]
    Io(Arc<std::io::Error>),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(Arc::new(e))
    }
}

impl From<russh::Error> for Error {
    fn from(e: russh::Error) -> Self {
        Error::Transport(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
