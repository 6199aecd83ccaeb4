//! Dynament Premier Sensor Protocol
//!
//! This crate implements the DLE-delimited command/response protocol spoken
//! by Dynament combustible-gas (LEL) sensors over a point-to-point serial
//! line, and decodes the fixed-layout binary replies into engineering units.

mod analog;
mod decoder;
mod error;
mod frame;
mod record;

pub use analog::{derive_analog_reading, AnalogReading, ADC_UNIT, CAPTURE_CAPACITY, MIN_CAPTURE_LEN};
pub use decoder::{decode, decode_with, DecodeOptions, DecodeWarning, Decoded, ResponseFrame, SensorRecord};
pub use error::{NackReason, ProtocolError};
pub use frame::{build_frame, checksum, encode_read_request, stuff, unstuff, Command};
pub use record::{ConfigRecord, LiveDataRecord, LIVE_DATA_VERSION};

/// Control byte constants
pub mod control {
    /// Data link escape, frame delimiter
    pub const DLE: u8 = 0x10;
    /// Read variable
    pub const RD: u8 = 0x13;
    /// Write variable
    pub const WR: u8 = 0x15;
    /// Acknowledge
    pub const ACK: u8 = 0x16;
    /// Negative acknowledge
    pub const NACK: u8 = 0x19;
    /// Single data frame
    pub const DAT: u8 = 0x1A;
    /// End of frame
    pub const EOF: u8 = 0x1F;
    /// Write password, first byte
    pub const WP1: u8 = 0xE5;
    /// Write password, second byte
    pub const WP2: u8 = 0xA2;
}

/// Sensor variable identifiers
pub mod variable {
    /// Configuration data
    pub const CONFIG_DATA: u8 = 0;
    /// Live data (full)
    pub const LIVE_DATA: u8 = 1;
    /// Zero sensor 1
    pub const ZERO_SENSOR1: u8 = 2;
    /// Span sensor 1, range 1
    pub const SPAN_SENSOR1_R1: u8 = 3;
    /// Live data (simple)
    pub const LIVE_DATA_SIMPLE: u8 = 6;
    /// User data
    pub const USER_DATA: u8 = 11;
}
