//! Command Frame Encoding
//!
//! Frame layout: `| DLE | CMD | PAYLOAD | DLE | EOF | CSUM-HI | CSUM-LO |`.
//! The checksum is the 16-bit sum of every byte from the leading DLE through
//! EOF inclusive, sent high byte first.

use crate::control::{DLE, EOF, RD};
use crate::variable;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const READ_CONFIG_DATA_FRAME: [u8; 7] = [0x10, 0x13, 0x00, 0x10, 0x1F, 0x00, 0x52];
const READ_LIVE_DATA_FRAME: [u8; 7] = [0x10, 0x13, 0x01, 0x10, 0x1F, 0x00, 0x53];
const READ_LIVE_DATA_SIMPLE_FRAME: [u8; 7] = [0x10, 0x13, 0x06, 0x10, 0x1F, 0x00, 0x58];

/// Commands understood by the tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Command {
    /// Read the configuration record
    ReadConfigData,
    /// Read the full version-4 live data record
    ReadLiveData,
    /// Read live data, reporting only the gas reading fields
    ReadLiveDataSimple,
}

impl Command {
    /// All supported commands
    pub const ALL: [Command; 3] = [
        Command::ReadConfigData,
        Command::ReadLiveData,
        Command::ReadLiveDataSimple,
    ];

    /// Variable identifier carried in the request payload
    pub fn variable_id(&self) -> u8 {
        match self {
            Command::ReadConfigData => variable::CONFIG_DATA,
            Command::ReadLiveData => variable::LIVE_DATA,
            Command::ReadLiveDataSimple => variable::LIVE_DATA_SIMPLE,
        }
    }

    /// The precomputed request frame for this command
    pub fn frame(&self) -> &'static [u8] {
        match self {
            Command::ReadConfigData => &READ_CONFIG_DATA_FRAME,
            Command::ReadLiveData => &READ_LIVE_DATA_FRAME,
            Command::ReadLiveDataSimple => &READ_LIVE_DATA_SIMPLE_FRAME,
        }
    }

    /// Command-line name
    pub fn name(&self) -> &'static str {
        match self {
            Command::ReadConfigData => "read-config-data",
            Command::ReadLiveData => "read-live-data",
            Command::ReadLiveDataSimple => "read-live-data-simple",
        }
    }

    /// Whether the response carries a live data record
    pub fn is_live_data(&self) -> bool {
        matches!(self, Command::ReadLiveData | Command::ReadLiveDataSimple)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Command::ALL
            .into_iter()
            .find(|cmd| cmd.name() == s)
            .ok_or_else(|| format!("unknown command '{}'", s))
    }
}

/// Return the request frame for a command and its length
pub fn build_frame(command: Command) -> (&'static [u8], usize) {
    let frame = command.frame();
    (frame, frame.len())
}

/// 16-bit unsigned sum of `bytes`, modulo 65536
pub fn checksum(bytes: &[u8]) -> u16 {
    bytes
        .iter()
        .fold(0u16, |sum, &b| sum.wrapping_add(u16::from(b)))
}

/// Build a read request for an arbitrary variable with a computed checksum
pub fn encode_read_request(variable_id: u8) -> Vec<u8> {
    let mut frame = Vec::with_capacity(8);
    frame.push(DLE);
    frame.push(RD);
    frame.extend(stuff(&[variable_id]));
    frame.push(DLE);
    frame.push(EOF);
    let sum = checksum(&frame);
    frame.extend_from_slice(&sum.to_be_bytes());
    frame
}

/// Double every DLE in a data section
pub fn stuff(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    for &b in data {
        out.push(b);
        if b == DLE {
            out.push(DLE);
        }
    }
    out
}

/// Collapse `DLE DLE` pairs in a data section back to a single DLE
pub fn unstuff(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut iter = data.iter().copied().peekable();
    while let Some(b) = iter.next() {
        out.push(b);
        if b == DLE && iter.peek() == Some(&DLE) {
            iter.next();
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_start_with_dle() {
        for cmd in Command::ALL {
            let (bytes, len) = build_frame(cmd);
            assert_eq!(bytes[0], DLE);
            assert_eq!(len, 7);
            assert_eq!(bytes.len(), len);
            assert_eq!(&bytes[3..5], &[DLE, EOF]);
        }
    }

    #[test]
    fn test_computed_frames_match_literals() {
        for cmd in Command::ALL {
            assert_eq!(encode_read_request(cmd.variable_id()), cmd.frame(), "{}", cmd);
        }
    }

    #[test]
    fn test_checksum_wraps() {
        assert_eq!(checksum(&[]), 0);
        assert_eq!(checksum(&[0x10, 0x13, 0x00, 0x10, 0x1F]), 0x0052);
        assert_eq!(checksum(&vec![0xFF; 300]), (0xFFu32 * 300 % 65536) as u16);
    }

    #[test]
    fn test_stuffing() {
        let data = [0x01, DLE, 0x02, DLE, DLE];
        let stuffed = stuff(&data);
        assert_eq!(stuffed, vec![0x01, DLE, DLE, 0x02, DLE, DLE, DLE, DLE]);
        assert_eq!(unstuff(&stuffed), data.to_vec());
    }

    #[test]
    fn test_command_names() {
        for cmd in Command::ALL {
            assert_eq!(cmd.name().parse::<Command>().unwrap(), cmd);
        }
        assert!("ping".parse::<Command>().is_err());
        assert!(Command::ReadLiveDataSimple.is_live_data());
        assert!(!Command::ReadConfigData.is_live_data());
    }
}
