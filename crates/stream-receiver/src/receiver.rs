//! Stream Receiver Task
//!
//! The receiver owns the receive and capture buffers while it runs. Progress
//! is published through a watch channel; once the coordinator is done
//! waiting it signals shutdown and joins the task, which hands back the
//! finished buffers as a [`ReceiveSnapshot`].

use crate::error::ReceiveError;
use crate::sync::{CaptureBuffer, SyncDetector};
use crate::tracker::FrameTracker;
use serde::Serialize;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace};

/// Receiver configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct ReceiverConfig {
    /// Enable sync-marker detection and analog capture
    pub raw_capture: bool,
}

/// Progress published after every byte
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReceiveProgress {
    pub bytes_received: usize,
    pub frame_complete: bool,
    pub sync_toggles: u8,
    pub capture_complete: bool,
}

impl ReceiveProgress {
    /// Whether any byte arrived
    pub fn response_observed(&self) -> bool {
        self.bytes_received > 0
    }

    /// Whether the coordinator can stop waiting
    pub fn is_complete(&self, raw_capture: bool) -> bool {
        if raw_capture {
            self.capture_complete
        } else {
            self.frame_complete
        }
    }
}

/// Buffers handed back when the receiver stops
#[derive(Debug, Clone, Default)]
pub struct ReceiveSnapshot {
    /// Every byte received, in order
    pub received: Vec<u8>,
    /// Analog capture, present only if a sync marker was seen
    pub capture: Option<CaptureBuffer>,
    pub frame_complete: bool,
    pub sync_toggles: u8,
}

impl ReceiveSnapshot {
    /// Whether any byte arrived
    pub fn response_observed(&self) -> bool {
        !self.received.is_empty()
    }
}

/// Byte collector state, independent of any I/O
#[derive(Debug, Default)]
pub struct StreamReceiver {
    received: Vec<u8>,
    tracker: FrameTracker,
    sync: Option<SyncDetector>,
}

impl StreamReceiver {
    /// Create a collector; sync detection runs only in raw-capture mode
    pub fn new(config: ReceiverConfig) -> Self {
        Self {
            received: Vec::with_capacity(200),
            tracker: FrameTracker::new(),
            sync: config.raw_capture.then(SyncDetector::new),
        }
    }

    /// Record one inbound byte
    pub fn push(&mut self, byte: u8) {
        self.received.push(byte);
        if self.tracker.feed(byte) {
            debug!("Response frame complete after {} bytes", self.received.len());
        }
        if let Some(sync) = self.sync.as_mut() {
            sync.feed(byte);
        }
    }

    pub fn progress(&self) -> ReceiveProgress {
        let sync_toggles = self.sync.as_ref().map_or(0, SyncDetector::toggles);
        ReceiveProgress {
            bytes_received: self.received.len(),
            frame_complete: self.tracker.is_complete(),
            sync_toggles,
            capture_complete: self.sync.as_ref().is_some_and(SyncDetector::is_complete),
        }
    }

    pub fn received(&self) -> &[u8] {
        &self.received
    }

    /// Finish collecting and give up the buffers
    pub fn into_snapshot(self) -> ReceiveSnapshot {
        let frame_complete = self.tracker.is_complete();
        let (capture, sync_toggles) = match self.sync {
            Some(sync) if sync.toggles() > 0 => {
                let toggles = sync.toggles();
                (Some(sync.into_capture()), toggles)
            }
            _ => (None, 0),
        };
        ReceiveSnapshot {
            received: self.received,
            capture,
            frame_complete,
            sync_toggles,
        }
    }

    /// Spawn the receive loop on the current tokio runtime
    pub fn spawn<R>(reader: R, config: ReceiverConfig) -> ReceiverHandle
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (progress_tx, progress_rx) = watch::channel(ReceiveProgress::default());
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(receive_loop(reader, Self::new(config), shutdown_rx, progress_tx));
        debug!("Started receive task (raw capture: {})", config.raw_capture);

        ReceiverHandle {
            raw_capture: config.raw_capture,
            progress: progress_rx,
            shutdown: Some(shutdown_tx),
            task,
        }
    }
}

async fn receive_loop<R>(
    mut reader: R,
    mut receiver: StreamReceiver,
    mut shutdown: oneshot::Receiver<()>,
    progress: watch::Sender<ReceiveProgress>,
) -> Result<ReceiveSnapshot, ReceiveError>
where
    R: AsyncRead + Unpin,
{
    let mut byte = [0u8; 1];
    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => {
                debug!("Receive task shutting down");
                break;
            }
            read = reader.read(&mut byte) => match read {
                Ok(0) => {
                    debug!("Serial stream closed");
                    break;
                }
                Ok(_) => {
                    trace!("rx 0x{:02x}", byte[0]);
                    receiver.push(byte[0]);
                    progress.send_replace(receiver.progress());
                }
                Err(e) => {
                    error!("Serial read error: {}", e);
                    return Err(ReceiveError::Transport(e));
                }
            },
        }
    }
    Ok(receiver.into_snapshot())
}

/// Outcome of waiting on the receiver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// A complete frame (or capture block in raw mode) arrived
    Complete,
    /// The wait window elapsed first
    TimedOut,
    /// The receive task ended (stream closed or read error)
    Stopped,
}

/// Handle to a running receive task
pub struct ReceiverHandle {
    raw_capture: bool,
    progress: watch::Receiver<ReceiveProgress>,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<ReceiveSnapshot, ReceiveError>>,
}

impl ReceiverHandle {
    /// Latest published progress
    pub fn progress(&self) -> ReceiveProgress {
        *self.progress.borrow()
    }

    /// Suspend until the response is complete, the task stops, or `timeout` elapses
    pub async fn wait(&mut self, timeout: Duration) -> WaitOutcome {
        let raw_capture = self.raw_capture;
        let completed = self.progress.wait_for(|p| p.is_complete(raw_capture));
        let outcome = match tokio::time::timeout(timeout, completed).await {
            Ok(Ok(_)) => WaitOutcome::Complete,
            Ok(Err(_)) => WaitOutcome::Stopped,
            Err(_) => WaitOutcome::TimedOut,
        };
        info!(
            "Receive wait ended: {:?} ({} bytes)",
            outcome,
            self.progress().bytes_received
        );
        outcome
    }

    /// Signal shutdown and join the task, taking ownership of its buffers
    pub async fn finish(mut self) -> Result<ReceiveSnapshot, ReceiveError> {
        if let Some(shutdown) = self.shutdown.take() {
            // the task may already have ended on its own
            let _ = shutdown.send(());
        }
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(ReceiveError::TaskFailed(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dynament_protocol::control::{DAT, DLE, EOF};
    use tokio::io::AsyncWriteExt;

    const FRAME: [u8; 9] = [DLE, DAT, 2, 0x04, 0x00, DLE, EOF, 0x00, 0x63];

    #[test]
    fn test_collector_progress() {
        let mut receiver = StreamReceiver::new(ReceiverConfig::default());
        for b in FRAME {
            receiver.push(b);
        }
        let progress = receiver.progress();
        assert_eq!(progress.bytes_received, 9);
        assert!(progress.frame_complete);
        assert!(progress.is_complete(false));
        assert!(!progress.is_complete(true));

        let snapshot = receiver.into_snapshot();
        assert_eq!(snapshot.received, FRAME.to_vec());
        assert!(snapshot.capture.is_none());
    }

    #[test]
    fn test_no_capture_outside_raw_mode() {
        let mut receiver = StreamReceiver::new(ReceiverConfig { raw_capture: false });
        for b in [0x0F, 0x0C, 1, 2, 0x0F, 0x0C] {
            receiver.push(b);
        }
        assert_eq!(receiver.progress().sync_toggles, 0);
        assert!(receiver.into_snapshot().capture.is_none());
    }

    #[tokio::test]
    async fn test_receives_frame() {
        let (mut device, host) = tokio::io::duplex(64);
        let mut handle = StreamReceiver::spawn(host, ReceiverConfig::default());

        device.write_all(&FRAME).await.unwrap();
        assert_eq!(handle.wait(Duration::from_secs(5)).await, WaitOutcome::Complete);

        let snapshot = handle.finish().await.unwrap();
        assert_eq!(snapshot.received, FRAME.to_vec());
        assert!(snapshot.frame_complete);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_times_out_without_bytes() {
        let (_device, host) = tokio::io::duplex(64);
        let mut handle = StreamReceiver::spawn(host, ReceiverConfig::default());

        assert_eq!(handle.wait(Duration::from_secs(1)).await, WaitOutcome::TimedOut);
        assert!(!handle.progress().response_observed());

        let snapshot = handle.finish().await.unwrap();
        assert!(!snapshot.response_observed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_frame_times_out() {
        let (mut device, host) = tokio::io::duplex(64);
        let mut handle = StreamReceiver::spawn(host, ReceiverConfig::default());

        device.write_all(&FRAME[..5]).await.unwrap();
        assert_eq!(handle.wait(Duration::from_secs(1)).await, WaitOutcome::TimedOut);

        let snapshot = handle.finish().await.unwrap();
        assert_eq!(snapshot.received, FRAME[..5].to_vec());
        assert!(!snapshot.frame_complete);
    }

    #[tokio::test]
    async fn test_raw_capture_completes_on_second_marker() {
        let (mut device, host) = tokio::io::duplex(64);
        let mut handle = StreamReceiver::spawn(host, ReceiverConfig { raw_capture: true });

        let mut stream = vec![0x55, 0x0F, 0x0C];
        stream.extend(0x20..0x40u8);
        stream.extend([0x0F, 0x0C, 0x99]);
        device.write_all(&stream).await.unwrap();

        assert_eq!(handle.wait(Duration::from_secs(5)).await, WaitOutcome::Complete);
        let snapshot = handle.finish().await.unwrap();
        let capture = snapshot.capture.unwrap();
        assert_eq!(capture.len(), 34);
        assert_eq!(capture.as_slice()[0], 0x20);
        assert_eq!(snapshot.sync_toggles, 2);
    }

    #[tokio::test]
    async fn test_closed_stream_stops_task() {
        let (device, host) = tokio::io::duplex(64);
        let mut handle = StreamReceiver::spawn(host, ReceiverConfig::default());
        drop(device);

        assert_eq!(handle.wait(Duration::from_secs(5)).await, WaitOutcome::Stopped);
        let snapshot = handle.finish().await.unwrap();
        assert!(snapshot.received.is_empty());
    }
}
