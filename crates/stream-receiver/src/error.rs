//! Receiver Error Types

use thiserror::Error;

/// Errors that end the receive task
#[derive(Debug, Error)]
pub enum ReceiveError {
    /// Single-byte read from the device failed
    #[error("Serial read error: {0}")]
    Transport(#[from] std::io::Error),

    /// Receive task panicked or was aborted
    #[error("Receiver task failed: {0}")]
    TaskFailed(String),
}
