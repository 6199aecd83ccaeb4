//! Protocol Error Types

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Errors raised while decoding sensor responses
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Nothing was received within the wait window
    #[error("No response from device")]
    NoResponse,

    /// Leading frame markers absent or frame cut short
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    /// Live data layout other than version 4
    #[error("Unsupported live data version {0} (only version 4 is supported)")]
    UnsupportedVersion(u16),

    /// Capture buffer too short for analog derivation
    #[error("Insufficient capture data: need {needed} bytes, captured {captured}")]
    InsufficientCaptureData { needed: usize, captured: usize },

    /// Received checksum differs from the computed 16-bit sum
    #[error("Checksum mismatch: expected {expected:04X}, got {actual:04X}")]
    ChecksumMismatch { expected: u16, actual: u16 },

    /// Frame data shorter than the record it must hold
    #[error("Truncated {record} record: need {needed} data bytes, got {available}")]
    TruncatedRecord {
        record: &'static str,
        needed: usize,
        available: usize,
    },

    /// Sensor answered with a NACK frame
    #[error("Sensor rejected request: {0}")]
    Nack(NackReason),
}

/// Reason code carried by a NACK frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NackReason {
    VariableNotReadable,
    VariableNotWritable,
    OutOfRange,
    IncorrectLength,
    UnexpectedBytes,
    ChecksumFailed,
    IncorrectVersion,
    Busy,
    InvalidData,
    InvalidState,
    SerialError,
    DeviceFault,
    Unknown(u8),
}

impl NackReason {
    /// Map a raw reason byte to its documented meaning
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => NackReason::VariableNotReadable,
            2 => NackReason::VariableNotWritable,
            3 => NackReason::OutOfRange,
            4 => NackReason::IncorrectLength,
            5 => NackReason::UnexpectedBytes,
            6 => NackReason::ChecksumFailed,
            7 => NackReason::IncorrectVersion,
            8 => NackReason::Busy,
            9 => NackReason::InvalidData,
            10 => NackReason::InvalidState,
            11 => NackReason::SerialError,
            // 12 is unassigned
            13 => NackReason::DeviceFault,
            other => NackReason::Unknown(other),
        }
    }

    /// Raw reason byte
    pub fn code(&self) -> u8 {
        match self {
            NackReason::VariableNotReadable => 1,
            NackReason::VariableNotWritable => 2,
            NackReason::OutOfRange => 3,
            NackReason::IncorrectLength => 4,
            NackReason::UnexpectedBytes => 5,
            NackReason::ChecksumFailed => 6,
            NackReason::IncorrectVersion => 7,
            NackReason::Busy => 8,
            NackReason::InvalidData => 9,
            NackReason::InvalidState => 10,
            NackReason::SerialError => 11,
            NackReason::DeviceFault => 13,
            NackReason::Unknown(code) => *code,
        }
    }
}

impl fmt::Display for NackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            NackReason::VariableNotReadable => "variable not readable",
            NackReason::VariableNotWritable => "variable not writable",
            NackReason::OutOfRange => "out of range",
            NackReason::IncorrectLength => "incorrect length",
            NackReason::UnexpectedBytes => "unexpected bytes",
            NackReason::ChecksumFailed => "checksum failed",
            NackReason::IncorrectVersion => "incorrect version",
            NackReason::Busy => "busy",
            NackReason::InvalidData => "invalid data",
            NackReason::InvalidState => "invalid state",
            NackReason::SerialError => "serial error",
            NackReason::DeviceFault => "device fault",
            NackReason::Unknown(_) => "unknown reason",
        };
        write!(f, "{} (code {})", text, self.code())
    }
}
