//! Serial Stream Receiver
//!
//! Collects every byte arriving from the sensor, tracks response frame
//! boundaries and, in raw-capture mode, records the analog block delimited
//! by `0x0F 0x0C` sync markers.

mod error;
mod receiver;
mod sync;
mod tracker;

pub use error::ReceiveError;
pub use receiver::{ReceiveProgress, ReceiveSnapshot, ReceiverConfig, ReceiverHandle, StreamReceiver, WaitOutcome};
pub use sync::{CaptureBuffer, CaptureState, SyncDetector, MAX_SYNC_TOGGLES, SYNC_LEAD, SYNC_TRAIL};
pub use tracker::FrameTracker;
