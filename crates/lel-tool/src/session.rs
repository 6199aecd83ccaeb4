//! Command exchange
//!
//! One invocation sends exactly one command frame, waits for the reply and
//! decodes what arrived.

use crate::error::ToolError;
use crate::settings::ToolConfig;
use dynament_protocol::{
    build_frame, decode_with, derive_analog_reading, AnalogReading, Command, DecodeOptions, Decoded,
    ProtocolError,
};
use std::time::Duration;
use stream_receiver::{ReceiverConfig, StreamReceiver, WaitOutcome};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

/// What to send and how to treat the reply
#[derive(Debug, Clone, Copy)]
pub struct ExchangeRequest {
    pub command: Command,
    /// Collect the analog block instead of decoding a record
    pub raw_capture: bool,
    pub timeout: Duration,
    pub decode: DecodeOptions,
}

impl ExchangeRequest {
    pub fn new(command: Command) -> Self {
        Self {
            command,
            raw_capture: false,
            timeout: Duration::from_secs(1),
            decode: DecodeOptions::default(),
        }
    }

    /// Build a request from the resolved configuration
    pub fn from_config(command: Command, config: &ToolConfig) -> Self {
        Self {
            command,
            raw_capture: config.raw,
            timeout: config.timeout(),
            decode: DecodeOptions {
                verify_checksum: config.verify_checksum,
            },
        }
    }
}

/// Everything learned from one exchange
#[derive(Debug, Clone)]
pub struct ExchangeOutcome {
    pub command: Command,
    pub wait: WaitOutcome,
    /// Raw reply bytes
    pub received: Vec<u8>,
    /// Decoded record; `None` in raw-capture mode
    pub record: Option<Result<Decoded, ProtocolError>>,
    /// Analog reading; `None` when no sync marker was seen
    pub analog: Option<Result<AnalogReading, ProtocolError>>,
    /// Capture bytes dropped after the capture buffer filled
    pub capture_dropped: usize,
}

async fn write_frame<W>(writer: &mut W, frame: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(frame).await?;
    writer.flush().await
}

/// Send the request's command frame and collect the reply
pub async fn run_exchange<R, W>(
    reader: R,
    writer: &mut W,
    request: &ExchangeRequest,
) -> Result<ExchangeOutcome, ToolError>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin,
{
    let mut receiver = StreamReceiver::spawn(
        reader,
        ReceiverConfig {
            raw_capture: request.raw_capture,
        },
    );

    let (frame, len) = build_frame(request.command);
    info!("Sending {} command", request.command);
    debug!("tx {:02x?}", frame);
    if let Err(e) = write_frame(writer, frame).await {
        // the receiver result no longer matters once the write failed
        let _ = receiver.finish().await;
        return Err(ToolError::Write(e));
    }
    debug!("Wrote {} command bytes", len);

    let wait = receiver.wait(request.timeout).await;
    let snapshot = receiver.finish().await?;

    if !snapshot.response_observed() {
        warn!("No bytes received within {:?}", request.timeout);
        return Err(ToolError::NoResponse);
    }
    debug!("rx {:02x?}", snapshot.received);

    let record = (!request.raw_capture)
        .then(|| decode_with(request.command, &snapshot.received, &request.decode));

    let capture_dropped = snapshot.capture.as_ref().map_or(0, |c| c.dropped());
    if capture_dropped > 0 {
        warn!("Capture overflowed, {} bytes dropped", capture_dropped);
    }
    let analog = snapshot
        .capture
        .as_ref()
        .map(|capture| derive_analog_reading(capture.as_slice()));

    Ok(ExchangeOutcome {
        command: request.command,
        wait,
        received: snapshot.received,
        record,
        analog,
        capture_dropped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test(start_paused = true)]
    async fn test_silent_device_is_no_response() {
        let (mut device, host) = tokio::io::duplex(64);
        let (reader, mut writer) = tokio::io::split(host);

        let request = ExchangeRequest::new(Command::ReadLiveData);
        let result = run_exchange(reader, &mut writer, &request).await;
        assert!(matches!(result, Err(ToolError::NoResponse)));

        // the command frame still went out
        let mut sent = [0u8; 7];
        device.read_exact(&mut sent).await.unwrap();
        assert_eq!(&sent, Command::ReadLiveData.frame());
    }

    #[test]
    fn test_request_from_config() {
        let config = ToolConfig {
            raw: true,
            timeout_ms: 250,
            verify_checksum: true,
            ..ToolConfig::default()
        };
        let request = ExchangeRequest::from_config(Command::ReadConfigData, &config);
        assert!(request.raw_capture);
        assert_eq!(request.timeout, Duration::from_millis(250));
        assert!(request.decode.verify_checksum);
    }
}
