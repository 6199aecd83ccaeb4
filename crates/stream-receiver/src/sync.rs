//! Sync Marker Detection and Capture

use dynament_protocol::CAPTURE_CAPACITY;
use serde::Serialize;
use tracing::{debug, warn};

/// First byte of the sync marker
pub const SYNC_LEAD: u8 = 0x0F;
/// Second byte of the sync marker
pub const SYNC_TRAIL: u8 = 0x0C;
/// Number of times the marker is honoured per run (start, stop)
pub const MAX_SYNC_TOGGLES: u8 = 2;

/// Capture state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum CaptureState {
    #[default]
    Idle,
    Capturing,
}

/// Fixed-capacity capture storage that saturates instead of overrunning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureBuffer {
    bytes: [u8; CAPTURE_CAPACITY],
    len: usize,
    dropped: usize,
}

impl Default for CaptureBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self {
            bytes: [0; CAPTURE_CAPACITY],
            len: 0,
            dropped: 0,
        }
    }

    /// Append a byte; returns false and counts the byte as dropped when full
    pub fn push(&mut self, byte: u8) -> bool {
        if self.len == CAPTURE_CAPACITY {
            self.dropped += 1;
            return false;
        }
        self.bytes[self.len] = byte;
        self.len += 1;
        true
    }

    /// Captured bytes
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bytes discarded after the buffer filled
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Whether any byte was discarded
    pub fn overflowed(&self) -> bool {
        self.dropped > 0
    }
}

/// Byte-at-a-time sync marker state machine
#[derive(Debug, Clone, Default)]
pub struct SyncDetector {
    state: CaptureState,
    prev: u8,
    toggles: u8,
    capture: CaptureBuffer,
}

impl SyncDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one byte. Returns the new state when the marker toggled capture.
    ///
    /// While capturing, the byte is stored before the marker check, so the
    /// opening marker's trail byte is not captured and the closing one is.
    pub fn feed(&mut self, byte: u8) -> Option<CaptureState> {
        if self.state == CaptureState::Capturing && !self.capture.push(byte) && self.capture.dropped() == 1 {
            warn!(
                "Capture buffer full at {} bytes, dropping further bytes",
                CAPTURE_CAPACITY
            );
        }

        let mut toggled = None;
        if self.prev == SYNC_LEAD && byte == SYNC_TRAIL && self.toggles < MAX_SYNC_TOGGLES {
            self.state = match self.state {
                CaptureState::Idle => CaptureState::Capturing,
                CaptureState::Capturing => CaptureState::Idle,
            };
            self.toggles += 1;
            debug!("Sync marker {} of {}: {:?}", self.toggles, MAX_SYNC_TOGGLES, self.state);
            toggled = Some(self.state);
        }

        self.prev = byte;
        toggled
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// Number of marker toggles seen so far
    pub fn toggles(&self) -> u8 {
        self.toggles
    }

    /// Whether a full start/stop pair was seen
    pub fn is_complete(&self) -> bool {
        self.toggles >= MAX_SYNC_TOGGLES
    }

    pub fn capture(&self) -> &CaptureBuffer {
        &self.capture
    }

    pub fn into_capture(self) -> CaptureBuffer {
        self.capture
    }
}
