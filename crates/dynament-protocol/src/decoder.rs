//! Response Decoding
//!
//! A successful read is answered with
//! `| DLE | DAT | LEN | DATA | DLE | EOF | CSUM-HI | CSUM-LO |`, a rejected one
//! with `| DLE | NACK | REASON |`.

use crate::control::{DAT, DLE, EOF, NACK};
use crate::error::{NackReason, ProtocolError};
use crate::frame::{checksum, Command};
use crate::record::{ConfigRecord, LiveDataRecord};
use serde::Serialize;
use tracing::{debug, warn};

/// Offset of the first data byte in a response
const DATA_OFFSET: usize = 3;

/// Decoding options
#[derive(Debug, Clone, Copy, Default)]
pub struct DecodeOptions {
    /// Reject responses whose checksum does not match the computed sum
    pub verify_checksum: bool,
}

/// A decoded record
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SensorRecord {
    Config(ConfigRecord),
    LiveData(LiveDataRecord),
}

/// Non-fatal findings reported alongside a decoded record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DecodeWarning {
    /// LEN byte disagrees with the number of data bytes received
    DataLengthMismatch { declared: u8, actual: usize },
    /// DLE/EOF trailer missing after the live data record
    TrailerMismatch,
    /// Checksum bytes present but not matching (only when not verifying)
    ChecksumMismatch { expected: u16, actual: u16 },
}

/// Result of a successful decode
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decoded {
    pub record: SensorRecord,
    /// LEN byte as sent by the sensor
    pub declared_len: u8,
    pub warnings: Vec<DecodeWarning>,
}

/// A response split into its parts, data de-stuffed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseFrame {
    pub declared_len: u8,
    pub data: Vec<u8>,
    /// Wire offset of the trailing DLE, if a `DLE EOF` pair was found
    pub trailer_offset: Option<usize>,
    /// Checksum bytes following EOF, if received
    pub received_checksum: Option<u16>,
    /// Sum over the wire bytes from the leading DLE through EOF
    pub computed_checksum: Option<u16>,
}

impl ResponseFrame {
    /// Split a raw receive buffer into header, data and trailer
    pub fn parse(buffer: &[u8]) -> Result<Self, ProtocolError> {
        match buffer {
            [] => return Err(ProtocolError::NoResponse),
            [first, ..] if *first != DLE => {
                return Err(ProtocolError::MalformedFrame(format!(
                    "expected DLE at offset 0, got 0x{:02x}",
                    first
                )))
            }
            [_] => {
                return Err(ProtocolError::MalformedFrame(
                    "frame ends after leading DLE".to_string(),
                ))
            }
            [_, NACK, reason, ..] => return Err(ProtocolError::Nack(NackReason::from_code(*reason))),
            [_, NACK] => {
                return Err(ProtocolError::MalformedFrame(
                    "NACK frame without reason code".to_string(),
                ))
            }
            [_, marker, ..] if *marker != DAT => {
                return Err(ProtocolError::MalformedFrame(format!(
                    "expected DAT at offset 1, got 0x{:02x}",
                    marker
                )))
            }
            [_, _] => {
                return Err(ProtocolError::MalformedFrame(
                    "frame ends before data length".to_string(),
                ))
            }
            _ => {}
        }

        let declared_len = buffer[2];
        let mut data = Vec::with_capacity(usize::from(declared_len));
        let mut trailer_offset = None;
        let mut i = DATA_OFFSET;
        while i < buffer.len() {
            let b = buffer[i];
            if b == DLE {
                match buffer.get(i + 1) {
                    Some(&DLE) => {
                        data.push(DLE);
                        i += 2;
                        continue;
                    }
                    Some(&EOF) => {
                        trailer_offset = Some(i);
                        break;
                    }
                    Some(_) => debug!("Unpaired DLE at offset {}", i),
                    None => break,
                }
            }
            data.push(b);
            i += 1;
        }

        let (received_checksum, computed_checksum) = match trailer_offset {
            Some(t) => {
                let computed = checksum(&buffer[..t + 2]);
                let received = match (buffer.get(t + 2), buffer.get(t + 3)) {
                    (Some(&hi), Some(&lo)) => Some(u16::from_be_bytes([hi, lo])),
                    _ => None,
                };
                (received, Some(computed))
            }
            None => (None, None),
        };

        Ok(Self {
            declared_len,
            data,
            trailer_offset,
            received_checksum,
            computed_checksum,
        })
    }
}

/// Decode a receive buffer for the given command with default options
pub fn decode(command: Command, buffer: &[u8]) -> Result<Decoded, ProtocolError> {
    decode_with(command, buffer, &DecodeOptions::default())
}

/// Decode a receive buffer for the given command
pub fn decode_with(
    command: Command,
    buffer: &[u8],
    options: &DecodeOptions,
) -> Result<Decoded, ProtocolError> {
    let frame = ResponseFrame::parse(buffer)?;
    let mut warnings = Vec::new();

    match (frame.computed_checksum, frame.received_checksum) {
        (Some(expected), Some(actual)) if expected != actual => {
            if options.verify_checksum {
                return Err(ProtocolError::ChecksumMismatch { expected, actual });
            }
            debug!("Ignoring checksum mismatch: expected {:04X}, got {:04X}", expected, actual);
            warnings.push(DecodeWarning::ChecksumMismatch { expected, actual });
        }
        (_, None) if options.verify_checksum => {
            return Err(ProtocolError::MalformedFrame(
                "checksum bytes missing".to_string(),
            ));
        }
        _ => {}
    }

    if usize::from(frame.declared_len) != frame.data.len() {
        warn!(
            "Data length byte says {} but {} data bytes received",
            frame.declared_len,
            frame.data.len()
        );
        warnings.push(DecodeWarning::DataLengthMismatch {
            declared: frame.declared_len,
            actual: frame.data.len(),
        });
    }

    let record = match command {
        Command::ReadLiveData | Command::ReadLiveDataSimple => {
            let live = LiveDataRecord::from_bytes(&frame.data)?;
            if command == Command::ReadLiveData
                && !(frame.trailer_offset.is_some() && frame.data.len() == LiveDataRecord::SIZE)
            {
                warn!("Live data trailer (DLE EOF) not found after record");
                warnings.push(DecodeWarning::TrailerMismatch);
            }
            SensorRecord::LiveData(live)
        }
        Command::ReadConfigData => SensorRecord::Config(ConfigRecord::from_bytes(&frame.data)?),
    };

    Ok(Decoded {
        record,
        declared_len: frame.declared_len,
        warnings,
    })
}
