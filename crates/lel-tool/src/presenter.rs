//! Output formatting

use crate::session::ExchangeOutcome;
use dynament_protocol::control::{DAT, DLE, EOF};
use dynament_protocol::{AnalogReading, Command, ConfigRecord, Decoded, DecodeWarning, LiveDataRecord, SensorRecord};
use serde_json::json;
use std::fmt::Write;

/// Printed when the sensor stays silent
pub const NO_RESPONSE_MESSAGE: &str = "Timeout.\nNo response from device.\nCheck power connections.";

/// Render an exchange as human-readable lines
pub fn render_text(outcome: &ExchangeOutcome) -> String {
    let mut out = String::new();

    match &outcome.record {
        Some(Ok(decoded)) => write_decoded(&mut out, outcome.command, decoded),
        Some(Err(e)) => {
            let _ = writeln!(out, "Decode error: {}", e);
        }
        None => {}
    }

    match &outcome.analog {
        Some(Ok(reading)) => write_analog(&mut out, reading),
        Some(Err(e)) => {
            let _ = writeln!(out, "Analog error: {}", e);
        }
        None if outcome.record.is_none() => {
            let _ = writeln!(out, "No sync marker observed");
        }
        None => {}
    }

    if outcome.capture_dropped > 0 {
        let _ = writeln!(out, "Capture overflow: {} bytes dropped", outcome.capture_dropped);
    }
    out
}

fn write_decoded(out: &mut String, command: Command, decoded: &Decoded) {
    let _ = writeln!(out, "DLE (0x{:x})", DLE);
    let _ = writeln!(out, "DAT (0x{:x})", DAT);
    let _ = writeln!(out, "Data Length: 0x{:x}", decoded.declared_len);

    match &decoded.record {
        SensorRecord::LiveData(live) => write_live_data(out, command, live),
        SensorRecord::Config(config) => write_config(out, config),
    }

    if command == Command::ReadLiveData {
        if decoded.warnings.contains(&DecodeWarning::TrailerMismatch) {
            let _ = writeln!(out, "??? (trailer DLE EOF missing)");
        } else {
            let _ = writeln!(out, "DLE (0x{:x})", DLE);
            let _ = writeln!(out, "EOF (0x{:x})", EOF);
        }
    }

    for warning in &decoded.warnings {
        match warning {
            DecodeWarning::DataLengthMismatch { declared, actual } => {
                let _ = writeln!(out, "Warning: data length 0x{:x} but {} bytes received", declared, actual);
            }
            DecodeWarning::ChecksumMismatch { expected, actual } => {
                let _ = writeln!(out, "Warning: checksum 0x{:04x}, computed 0x{:04x}", actual, expected);
            }
            DecodeWarning::TrailerMismatch => {}
        }
    }
}

fn write_live_data(out: &mut String, command: Command, live: &LiveDataRecord) {
    let _ = writeln!(out, "Version: 0x{:04x}", live.version);
    let _ = writeln!(out, "StatusFlags: 0x{:04x}", live.status_flags);
    let _ = writeln!(out, "Gas Reading: {:.6}", live.reading);

    if command == Command::ReadLiveDataSimple {
        return;
    }
    let _ = writeln!(out, "Temperature: {:.6}", live.temperature);
    let _ = writeln!(out, "Detector Signal: 0x{:04x}", live.detector);
    let _ = writeln!(out, "Reference Signal: 0x{:04x}", live.reference);
    let _ = writeln!(out, "Absorbance: {:.6}", live.absorbance);
    let _ = writeln!(out, "Uptime: 0x{:04x}", live.uptime);
    let _ = writeln!(out, "DetMin: 0x{:04x}", live.detector_min);
    let _ = writeln!(out, "DetMax: 0x{:04x}", live.detector_max);
    let _ = writeln!(out, "RefMin: 0x{:04x}", live.reference_min);
    let _ = writeln!(out, "RefMax: 0x{:04x}", live.reference_max);
}

fn write_config(out: &mut String, config: &ConfigRecord) {
    let _ = writeln!(out, "Version: 0x{:04x}", config.version);
    let _ = writeln!(out, "Sensor Type: {}", config.sensor_type_text());
    let _ = writeln!(out, "ModeBits: 0x{:04x}", config.mode_bits);
    let _ = writeln!(out, "SensorFsd: 0x{:04x}", config.sensor_fsd);
    for (name, value) in [
        ("ZeroOffset", config.zero_offset),
        ("ZeroCalTemperature", config.zero_cal_temperature),
        ("SpanCalTemperature", config.span_cal_temperature),
        ("DacZero", config.dac_zero),
        ("DacFsd", config.dac_fsd),
        ("PosZeroSuppress", config.pos_zero_suppress),
        ("NegZeroSuppress", config.neg_zero_suppress),
        ("CalibrationGasValue", config.calibration_gas_value),
        ("SpanOffset", config.span_offset),
        ("El", config.el),
        ("Power", config.power),
    ] {
        let _ = writeln!(out, "{}: {:.6}", name, value);
    }
    let _ = writeln!(out, "SerialNumber: {}", config.serial_number_text());
    let _ = writeln!(out, "Rounding: {:.6}", config.rounding);
    let _ = writeln!(out, "DacPowerUp: 0x{:04x}", config.dac_power_up);
    let _ = writeln!(out, "BaudRate: 0x{:04x}", config.baud_rate);
    let _ = writeln!(out, "WarmUpTime: 0x{:04x}", config.warm_up_time);
}

fn write_analog(out: &mut String, reading: &AnalogReading) {
    let _ = writeln!(out, "Light Intensity: {:.6}", reading.light_intensity);
    let _ = writeln!(out, "Temperature(C): {:.6}", reading.temperature_c);
    let _ = writeln!(out, "Humidity(%): {:.6}", reading.humidity_pct);
    let _ = writeln!(out, "Methane(Percent LEL): {:.6}", reading.lel_pct);
}

/// Render an exchange as a JSON document
pub fn render_json(outcome: &ExchangeOutcome) -> Result<String, serde_json::Error> {
    let record = match &outcome.record {
        Some(Ok(decoded)) => json!({ "decoded": decoded }),
        Some(Err(e)) => json!({ "error": e.to_string() }),
        None => serde_json::Value::Null,
    };
    let analog = match &outcome.analog {
        Some(Ok(reading)) => json!({ "reading": reading }),
        Some(Err(e)) => json!({ "error": e.to_string() }),
        None => serde_json::Value::Null,
    };

    serde_json::to_string_pretty(&json!({
        "command": outcome.command,
        "bytes_received": outcome.received.len(),
        "record": record,
        "analog": analog,
        "capture_dropped": outcome.capture_dropped,
    }))
}
