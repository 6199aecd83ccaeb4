//! Tool Error Types

use stream_receiver::ReceiveError;
use thiserror::Error;

/// Errors that end a tool run
#[derive(Debug, Error)]
pub enum ToolError {
    /// Nothing received within the wait window
    #[error("Timeout. No response from device.")]
    NoResponse,

    /// Serial port could not be opened or queried
    #[error("Serial port error: {0}")]
    Serial(String),

    /// Command frame could not be written
    #[error("Failed to write command frame: {0}")]
    Write(#[source] std::io::Error),

    /// Receive task failed; fatal
    #[error(transparent)]
    Receive(#[from] ReceiveError),

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl From<tokio_serial::Error> for ToolError {
    fn from(err: tokio_serial::Error) -> Self {
        ToolError::Serial(err.to_string())
    }
}
