//! Analog Stream Derivation
//!
//! Converts the bytes captured between two sync markers in raw-capture mode
//! into light intensity, temperature, humidity and LEL. Each sample is a
//! pair of 7-bit bytes; the constants describe the analog front end and are
//! kept exactly as calibrated.

use crate::error::ProtocolError;
use serde::Serialize;

/// Capacity of the raw capture buffer
pub const CAPTURE_CAPACITY: usize = 40;

/// Bytes needed to reach the highest sample index used (33)
pub const MIN_CAPTURE_LEN: usize = 34;

/// ADC unit scale, volts per count
pub const ADC_UNIT: f32 = 3.0 / 32768.0;

/// Values derived from one captured analog block
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AnalogReading {
    /// Raw light count (bytes 2, 3)
    pub data1: i32,
    /// Raw temperature count (bytes 8, 9)
    pub data4: i32,
    /// Raw humidity count (bytes 10, 11)
    pub data5: i32,
    /// Raw LEL count (bytes 32, 33)
    pub data16: i32,
    pub light_intensity: f32,
    pub temperature_c: f32,
    pub humidity_pct: f32,
    pub lel_pct: f32,
}

fn seven_bit(capture: &[u8], index: usize) -> i32 {
    i32::from(capture[index] & 0x7F)
}

/// Derive an analog reading from a capture buffer
pub fn derive_analog_reading(capture: &[u8]) -> Result<AnalogReading, ProtocolError> {
    if capture.len() < MIN_CAPTURE_LEN {
        return Err(ProtocolError::InsufficientCaptureData {
            needed: MIN_CAPTURE_LEN,
            captured: capture.len(),
        });
    }

    let data1 = 128 * seven_bit(capture, 2) + seven_bit(capture, 3);
    let data4 = 4 * (128 * seven_bit(capture, 8) + seven_bit(capture, 9));
    let data5 = 4 * (128 * seven_bit(capture, 10) + seven_bit(capture, 11));
    let data16 = 128 * (seven_bit(capture, 32) + seven_bit(capture, 33));

    let u = ADC_UNIT;
    let light_intensity = data1 as f32 * u;
    // single-precision products, double-precision scaling, as calibrated
    let temperature_c = ((f64::from(u * data4 as f32) / 3.0 * 2.7 / 2.0 - 0.5) / 0.01) as f32;
    let humidity_pct = ((f64::from(data5 as f32 * u) * 2.7 / 9.0 - 0.1515)
        / 0.00636
        / (1.0546 - 0.00216 * f64::from(temperature_c))) as f32;
    let lel_pct = data16 as f32;

    Ok(AnalogReading {
        data1,
        data4,
        data5,
        data16,
        light_intensity,
        temperature_c,
        humidity_pct,
        lel_pct,
    })
}
