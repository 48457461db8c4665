use std::time::Duration;

use ultimate_protocol::ProtocolError;

/// Session-level failures. Every variant ends the session; none are retried.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("connecting to {addr} failed: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("connecting to {0} timed out")]
    ConnectTimeout(String),

    /// The server kicked us. Not a bug, just the end of the session.
    #[error("disconnected by server: {0}")]
    ServerDisconnect(String),

    #[error("server timeout: nothing received for {0:?}")]
    Timeout(Duration),

    #[error("login did not complete within {0} packets")]
    LoginTimeout(usize),

    #[error("connection closed")]
    ConnectionClosed,

    #[error("{0} is already running")]
    AlreadyRunning(&'static str),

    #[error("{0} did not signal readiness")]
    StartFailed(&'static str),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("unsupported: {0}")]
    Unsupported(&'static str),

    #[error("no player position received within {0:?}")]
    PositionTimeout(Duration),

    #[error("movement coordinator stopped unexpectedly")]
    MovementStopped,
}

impl ClientError {
    /// Human-readable reason for the top-level session report.
    pub fn reason(&self) -> String {
        match self {
            ClientError::ServerDisconnect(reason) => reason.clone(),
            other => other.to_string(),
        }
    }
}

pub type Result<T, E = ClientError> = std::result::Result<T, E>;
