use thiserror::Error;

use crate::serial::SerialPortError;

/// Errors thay may occur in this library.
///
/// The messages of the session related variants are what clients see
/// in `error` replies.
#[derive(Debug, Error)]
pub enum Error {
    /// A connect request without a port.
    #[error("No port specified")]
    NoPortSpecified,

    /// The port could not be opened.
    #[error("Cannot open {0}")]
    CannotOpen(String),

    /// Tried to write while no port is open.
    #[error("Not connected")]
    NotConnected,

    /// The open port failed.
    #[error("{0}")]
    Serial(#[from] SerialPortError),

    /// The machine session is no longer running.
    #[error("The machine session has ended")]
    SessionClosed,

    /// The configuration is not valid.
    #[error("The configuration is not valid. Problem: `{0}`")]
    BadConfig(String),

    /// The HTTP server failed.
    #[error("Server problem: {0}")]
    Server(String),

    /// Websocket problem on the client side.
    #[error("Websocket problem: {0}")]
    Websocket(#[from] tungstenite::Error),

    /// A frame could not be (de)serialized.
    #[error("Bad json: {0}")]
    BadJson(#[from] serde_json::Error),

    /// The websocket closed.
    #[error("The connection was closed")]
    ConnectionClosed,
}

impl Error {
    /// Get the problem if this is a bad config error.
    pub fn try_into_bad_config(self) -> Option<String> {
        match self {
            Error::BadConfig(problem) => Some(problem),
            _ => None,
        }
    }
}
