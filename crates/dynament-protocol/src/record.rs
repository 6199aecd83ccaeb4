//! Fixed-Layout Sensor Records
//!
//! Records are packed with no padding. Integers are little-endian, floats
//! are 4-byte IEEE-754 single precision.

use crate::error::ProtocolError;
use serde::Serialize;

/// The only live data layout this tool understands
pub const LIVE_DATA_VERSION: u16 = 4;

/// Sequential little-endian field reader over a record's data bytes
struct FieldReader<'a> {
    bytes: &'a [u8],
    pos: usize,
    record: &'static str,
}

impl<'a> FieldReader<'a> {
    fn new(bytes: &'a [u8], record: &'static str) -> Self {
        Self { bytes, pos: 0, record }
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], ProtocolError> {
        let field = self
            .bytes
            .get(self.pos..self.pos + N)
            .and_then(|slice| <[u8; N]>::try_from(slice).ok())
            .ok_or(ProtocolError::TruncatedRecord {
                record: self.record,
                needed: self.pos + N,
                available: self.bytes.len(),
            })?;
        self.pos += N;
        Ok(field)
    }

    fn u16(&mut self) -> Result<u16, ProtocolError> {
        self.take().map(u16::from_le_bytes)
    }

    fn u32(&mut self) -> Result<u32, ProtocolError> {
        self.take().map(u32::from_le_bytes)
    }

    fn f32(&mut self) -> Result<f32, ProtocolError> {
        self.take().map(f32::from_le_bytes)
    }
}

/// Configuration record (variable 0)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigRecord {
    pub version: u16,
    pub sensor_type: [u8; 8],
    pub mode_bits: u16,
    /// Full-scale deflection code
    pub sensor_fsd: u16,
    pub zero_offset: f32,
    pub zero_cal_temperature: f32,
    pub span_cal_temperature: f32,
    pub dac_zero: f32,
    pub dac_fsd: f32,
    pub pos_zero_suppress: f32,
    pub neg_zero_suppress: f32,
    pub calibration_gas_value: f32,
    pub span_offset: f32,
    pub el: f32,
    pub power: f32,
    pub serial_number: [u8; 10],
    pub rounding: f32,
    pub dac_power_up: u16,
    pub baud_rate: u16,
    pub warm_up_time: u16,
}

impl ConfigRecord {
    /// Encoded size in bytes
    pub const SIZE: usize = 78;

    /// Decode from the de-stuffed data section of a response
    pub fn from_bytes(data: &[u8]) -> Result<Self, ProtocolError> {
        if data.len() < Self::SIZE {
            return Err(ProtocolError::TruncatedRecord {
                record: "config",
                needed: Self::SIZE,
                available: data.len(),
            });
        }

        let mut r = FieldReader::new(data, "config");
        Ok(Self {
            version: r.u16()?,
            sensor_type: r.take()?,
            mode_bits: r.u16()?,
            sensor_fsd: r.u16()?,
            zero_offset: r.f32()?,
            zero_cal_temperature: r.f32()?,
            span_cal_temperature: r.f32()?,
            dac_zero: r.f32()?,
            dac_fsd: r.f32()?,
            pos_zero_suppress: r.f32()?,
            neg_zero_suppress: r.f32()?,
            calibration_gas_value: r.f32()?,
            span_offset: r.f32()?,
            el: r.f32()?,
            power: r.f32()?,
            serial_number: r.take()?,
            rounding: r.f32()?,
            dac_power_up: r.u16()?,
            baud_rate: r.u16()?,
            warm_up_time: r.u16()?,
        })
    }

    /// Encode in the instrument's wire layout
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::SIZE);
        out.extend_from_slice(&self.version.to_le_bytes());
        out.extend_from_slice(&self.sensor_type);
        out.extend_from_slice(&self.mode_bits.to_le_bytes());
        out.extend_from_slice(&self.sensor_fsd.to_le_bytes());
        for value in [
            self.zero_offset,
            self.zero_cal_temperature,
            self.span_cal_temperature,
            self.dac_zero,
            self.dac_fsd,
            self.pos_zero_suppress,
            self.neg_zero_suppress,
            self.calibration_gas_value,
            self.span_offset,
            self.el,
            self.power,
        ] {
            out.extend_from_slice(&value.to_le_bytes());
        }
        out.extend_from_slice(&self.serial_number);
        out.extend_from_slice(&self.rounding.to_le_bytes());
        out.extend_from_slice(&self.dac_power_up.to_le_bytes());
        out.extend_from_slice(&self.baud_rate.to_le_bytes());
        out.extend_from_slice(&self.warm_up_time.to_le_bytes());
        out
    }

    /// Sensor type tag as text, NUL padding removed
    pub fn sensor_type_text(&self) -> String {
        tag_text(&self.sensor_type)
    }

    /// Serial number tag as text, NUL padding removed
    pub fn serial_number_text(&self) -> String {
        tag_text(&self.serial_number)
    }
}

fn tag_text(tag: &[u8]) -> String {
    String::from_utf8_lossy(tag)
        .trim_end_matches('\0')
        .to_string()
}

/// Live data record, version 4 layout (variables 1 and 6)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiveDataRecord {
    pub version: u16,
    pub status_flags: u16,
    /// Gas reading
    pub reading: f32,
    pub temperature: f32,
    /// Detector signal
    pub detector: u16,
    /// Reference signal
    pub reference: u16,
    pub absorbance: f32,
    pub uptime: u32,
    pub detector_min: u16,
    pub detector_max: u16,
    pub reference_min: u16,
    pub reference_max: u16,
}

impl LiveDataRecord {
    /// Encoded size in bytes
    pub const SIZE: usize = 32;

    /// Decode from the de-stuffed data section of a response.
    ///
    /// The version is checked before anything else so that a record in an
    /// unknown layout is never partially interpreted.
    pub fn from_bytes(data: &[u8]) -> Result<Self, ProtocolError> {
        let mut r = FieldReader::new(data, "live data");
        let version = r.u16()?;
        if version != LIVE_DATA_VERSION {
            return Err(ProtocolError::UnsupportedVersion(version));
        }
        if data.len() < Self::SIZE {
            return Err(ProtocolError::TruncatedRecord {
                record: "live data",
                needed: Self::SIZE,
                available: data.len(),
            });
        }

        Ok(Self {
            version,
            status_flags: r.u16()?,
            reading: r.f32()?,
            temperature: r.f32()?,
            detector: r.u16()?,
            reference: r.u16()?,
            absorbance: r.f32()?,
            uptime: r.u32()?,
            detector_min: r.u16()?,
            detector_max: r.u16()?,
            reference_min: r.u16()?,
            reference_max: r.u16()?,
        })
    }

    /// Encode in the instrument's wire layout
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::SIZE);
        out.extend_from_slice(&self.version.to_le_bytes());
        out.extend_from_slice(&self.status_flags.to_le_bytes());
        out.extend_from_slice(&self.reading.to_le_bytes());
        out.extend_from_slice(&self.temperature.to_le_bytes());
        out.extend_from_slice(&self.detector.to_le_bytes());
        out.extend_from_slice(&self.reference.to_le_bytes());
        out.extend_from_slice(&self.absorbance.to_le_bytes());
        out.extend_from_slice(&self.uptime.to_le_bytes());
        out.extend_from_slice(&self.detector_min.to_le_bytes());
        out.extend_from_slice(&self.detector_max.to_le_bytes());
        out.extend_from_slice(&self.reference_min.to_le_bytes());
        out.extend_from_slice(&self.reference_max.to_le_bytes());
        out
    }
}
