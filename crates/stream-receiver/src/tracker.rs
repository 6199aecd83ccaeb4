//! Response Frame Boundary Tracking

use dynament_protocol::control::{DLE, EOF, NACK};

/// Header bytes before the data section (DLE, DAT, LEN)
const HEADER_LEN: usize = 3;
/// Checksum bytes after EOF
const CHECKSUM_LEN: usize = 2;

/// Watches the inbound byte stream for the end of one response frame.
///
/// A data frame is complete once `DLE EOF` and its two checksum bytes have
/// arrived, a NACK frame once its reason byte has. `DLE DLE` inside the data
/// section is a stuffed data byte, not a boundary.
#[derive(Debug, Clone, Default)]
pub struct FrameTracker {
    position: usize,
    leading_dle: bool,
    nack: bool,
    after_dle: bool,
    eof_at: Option<usize>,
    complete: bool,
}

impl FrameTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one byte; returns true on the byte that completes the frame
    pub fn feed(&mut self, byte: u8) -> bool {
        let index = self.position;
        self.position += 1;
        if self.complete {
            return false;
        }

        match index {
            0 => self.leading_dle = byte == DLE,
            1 => self.nack = self.leading_dle && byte == NACK,
            2 if self.nack => self.complete = true,
            i if i >= HEADER_LEN => match self.eof_at {
                Some(eof) => self.complete = i == eof + CHECKSUM_LEN,
                None if self.after_dle => {
                    self.after_dle = false;
                    if byte == EOF {
                        self.eof_at = Some(i);
                    }
                }
                None => self.after_dle = byte == DLE,
            },
            _ => {}
        }
        self.complete
    }

    /// Whether a whole frame has been observed
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Bytes seen so far
    pub fn position(&self) -> usize {
        self.position
    }
}
