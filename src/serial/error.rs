use std::io;

use thiserror::Error;

/// Problems with a serial transport.
#[derive(Debug, Error)]
pub enum SerialPortError {
    /// IO related errors.
    #[error("Underlying IO problem: {0}")]
    IO(#[from] io::Error),

    /// The device could not be opened.
    #[error("Could not open port at {path}, problem: {problem}")]
    Open {
        /// The device path.
        path: String,

        /// Why it failed.
        problem: String,
    },

    /// The transport was used after being closed.
    #[error("Serial port is not open")]
    NotOpen,

    /// Serial port disconnected.
    #[error("Serial port disconnected")]
    Disconnected,
}
