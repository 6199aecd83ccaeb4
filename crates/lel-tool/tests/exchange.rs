//! End-to-end exchanges against a simulated sensor on an in-memory serial line

use dynament_protocol::control::{DAT, DLE, EOF, NACK};
use dynament_protocol::{
    checksum, stuff, Command, ConfigRecord, DecodeOptions, LiveDataRecord, NackReason, ProtocolError,
    SensorRecord, LIVE_DATA_VERSION,
};
use lel_tool::presenter::render_text;
use lel_tool::session::{run_exchange, ExchangeOutcome, ExchangeRequest};
use lel_tool::ToolError;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use stream_receiver::{ReceiveError, WaitOutcome};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt, DuplexStream, ReadBuf};

fn data_response(data: &[u8]) -> Vec<u8> {
    let mut frame = vec![DLE, DAT, data.len() as u8];
    frame.extend(stuff(data));
    frame.extend([DLE, EOF]);
    let sum = checksum(&frame);
    frame.extend_from_slice(&sum.to_be_bytes());
    frame
}

fn live_record(version: u16) -> LiveDataRecord {
    LiveDataRecord {
        version,
        status_flags: 0x0002,
        reading: 4.75,
        temperature: 19.5,
        detector: 0x3210,
        reference: 0x2100,
        absorbance: 0.031,
        uptime: 123_456,
        detector_min: 0x3000,
        detector_max: 0x3300,
        reference_min: 0x2000,
        reference_max: 0x2200,
    }
}

fn config_record() -> ConfigRecord {
    ConfigRecord {
        version: 2,
        sensor_type: *b"MSH-HC\0\0",
        mode_bits: 0x0010,
        sensor_fsd: 100,
        zero_offset: 0.0,
        zero_cal_temperature: 20.0,
        span_cal_temperature: 20.5,
        dac_zero: 0.4,
        dac_fsd: 2.0,
        pos_zero_suppress: 1.0,
        neg_zero_suppress: -1.0,
        calibration_gas_value: 50.0,
        span_offset: 0.0,
        el: 4.4,
        power: 0.8,
        serial_number: *b"A1B2C3D4E5",
        rounding: 0.1,
        dac_power_up: 0x0190,
        baud_rate: 0x9600,
        warm_up_time: 45,
    }
}

/// Sensor side: read one request frame, check it, answer with `reply`
fn simulate_sensor(
    mut device: DuplexStream,
    expected: Command,
    reply: Vec<u8>,
) -> tokio::task::JoinHandle<DuplexStream> {
    tokio::spawn(async move {
        let mut request = [0u8; 7];
        device.read_exact(&mut request).await.unwrap();
        assert_eq!(&request, expected.frame());
        device.write_all(&reply).await.unwrap();
        device
    })
}

async fn exchange(
    command: Command,
    raw_capture: bool,
    reply: Vec<u8>,
) -> Result<ExchangeOutcome, ToolError> {
    let (device, host) = tokio::io::duplex(256);
    let sensor = simulate_sensor(device, command, reply);
    let (reader, mut writer) = tokio::io::split(host);

    let request = ExchangeRequest {
        raw_capture,
        timeout: Duration::from_secs(5),
        ..ExchangeRequest::new(command)
    };
    let result = run_exchange(reader, &mut writer, &request).await;
    let _device = sensor.await.unwrap();
    result
}

#[tokio::test]
async fn test_read_live_data() {
    let record = live_record(LIVE_DATA_VERSION);
    let outcome = exchange(Command::ReadLiveData, false, data_response(&record.to_bytes()))
        .await
        .unwrap();

    assert_eq!(outcome.wait, WaitOutcome::Complete);
    assert!(outcome.analog.is_none());
    let decoded = outcome.record.clone().unwrap().unwrap();
    assert_eq!(decoded.record, SensorRecord::LiveData(record));
    assert!(decoded.warnings.is_empty());

    let text = render_text(&outcome);
    assert!(text.contains("Gas Reading: 4.750000"));
    assert!(text.contains("Temperature: 19.500000"));
}

#[tokio::test]
async fn test_read_config_data() {
    let record = config_record();
    let outcome = exchange(Command::ReadConfigData, false, data_response(&record.to_bytes()))
        .await
        .unwrap();

    let decoded = outcome.record.clone().unwrap().unwrap();
    assert_eq!(decoded.declared_len, 78);
    assert_eq!(decoded.record, SensorRecord::Config(record));

    let text = render_text(&outcome);
    assert!(text.contains("Sensor Type: MSH-HC\n"));
    assert!(text.contains("SerialNumber: A1B2C3D4E5\n"));
    assert!(text.contains("WarmUpTime: 0x002d\n"));
}

#[tokio::test]
async fn test_unsupported_live_data_version() {
    let record = live_record(5);
    let outcome = exchange(Command::ReadLiveDataSimple, false, data_response(&record.to_bytes()))
        .await
        .unwrap();
    assert_eq!(outcome.record, Some(Err(ProtocolError::UnsupportedVersion(5))));
}

#[tokio::test]
async fn test_nack_reply() {
    let outcome = exchange(Command::ReadConfigData, false, vec![DLE, NACK, 8])
        .await
        .unwrap();
    assert_eq!(outcome.record, Some(Err(ProtocolError::Nack(NackReason::Busy))));
}

#[tokio::test(start_paused = true)]
async fn test_garbage_reply_is_malformed() {
    let outcome = exchange(Command::ReadLiveData, false, vec![0xC0, 0x57, 0x0C, 0xC0])
        .await
        .unwrap();
    assert_eq!(outcome.wait, WaitOutcome::TimedOut);
    assert!(matches!(outcome.record, Some(Err(ProtocolError::MalformedFrame(_)))));
}

#[tokio::test]
async fn test_checksum_verification_rejects_corrupt_reply() {
    let mut reply = data_response(&live_record(LIVE_DATA_VERSION).to_bytes());
    let last = reply.len() - 1;
    reply[last] ^= 0xFF;

    let (device, host) = tokio::io::duplex(256);
    let sensor = simulate_sensor(device, Command::ReadLiveData, reply);
    let (reader, mut writer) = tokio::io::split(host);
    let request = ExchangeRequest {
        timeout: Duration::from_secs(5),
        decode: DecodeOptions { verify_checksum: true },
        ..ExchangeRequest::new(Command::ReadLiveData)
    };
    let outcome = run_exchange(reader, &mut writer, &request).await.unwrap();
    sensor.await.unwrap();

    assert!(matches!(outcome.record, Some(Err(ProtocolError::ChecksumMismatch { .. }))));
}

#[tokio::test]
async fn test_raw_capture_analog_reading() {
    let mut block = vec![0u8; 34];
    block[2] = 10;
    block[3] = 5;
    block[8] = 20;
    let mut stream = vec![0x7F, 0x0F, 0x0C];
    stream.extend(&block);
    stream.extend([0x0F, 0x0C]);

    let outcome = exchange(Command::ReadLiveData, true, stream).await.unwrap();
    assert!(outcome.record.is_none());

    let reading = outcome.analog.unwrap().unwrap();
    assert_eq!(reading.data1, 1285);
    assert_eq!(reading.light_intensity, 1285.0 * (3.0f32 / 32768.0));
    assert_eq!(reading.data4, 10240);
    assert_eq!(reading.data16, 0);
}

#[tokio::test]
async fn test_raw_capture_too_short() {
    let stream = vec![0x0F, 0x0C, 1, 2, 3, 0x0F, 0x0C];
    let outcome = exchange(Command::ReadLiveData, true, stream).await.unwrap();
    assert_eq!(
        outcome.analog,
        Some(Err(ProtocolError::InsufficientCaptureData {
            needed: 34,
            captured: 5
        }))
    );
}

#[tokio::test(start_paused = true)]
async fn test_no_response() {
    let (device, host) = tokio::io::duplex(256);
    let (reader, mut writer) = tokio::io::split(host);
    let request = ExchangeRequest::new(Command::ReadConfigData);

    let result = run_exchange(reader, &mut writer, &request).await;
    assert!(matches!(result, Err(ToolError::NoResponse)));
    drop(device);
}

struct UnpluggedReader;

impl AsyncRead for UnpluggedReader {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "device unplugged")))
    }
}

#[tokio::test]
async fn test_read_error_is_fatal() {
    let mut sink = tokio::io::sink();
    let request = ExchangeRequest::new(Command::ReadLiveData);

    let result = run_exchange(UnpluggedReader, &mut sink, &request).await;
    assert!(matches!(result, Err(ToolError::Receive(ReceiveError::Transport(_)))));
}
