//! Serial port setup
//!
//! The sensor talks 8N1 without flow control at 9600, 19200 or 38400 baud.

use crate::error::ToolError;
use serde::Serialize;
use tokio_serial::{DataBits, FlowControl, Parity, SerialPort, SerialPortBuilderExt, SerialStream, StopBits};
use tracing::{info, warn};

/// Baud rates the sensor supports
pub const SUPPORTED_BAUD_RATES: [u32; 3] = [9600, 19200, 38400];

/// Sensor factory default
pub const DEFAULT_BAUD_RATE: u32 = 38400;

/// Map an unsupported baud rate to the default
pub fn normalize_baud(baud: u32) -> u32 {
    if SUPPORTED_BAUD_RATES.contains(&baud) {
        baud
    } else {
        warn!("Unsupported baud rate {}, using {}", baud, DEFAULT_BAUD_RATE);
        DEFAULT_BAUD_RATE
    }
}

/// Open the device in raw 8N1 mode
pub fn open_port(device: &str, baud: u32) -> Result<SerialStream, ToolError> {
    info!("Opening {} at {} baud", device, baud);
    let port = tokio_serial::new(device, baud)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .open_native_async()
        .map_err(|e| ToolError::Serial(format!("could not open {}: {}", device, e)))?;
    info!("Device {} opened", device);
    Ok(port)
}

/// Settings reported by the serial driver
#[derive(Debug, Clone, Serialize)]
pub struct PortSettings {
    pub device: String,
    pub baud_rate: u32,
    pub data_bits: String,
    pub parity: String,
    pub stop_bits: String,
    pub flow_control: String,
}

impl PortSettings {
    /// Read the current settings of an open port
    pub fn query(device: &str, port: &SerialStream) -> Result<Self, ToolError> {
        Ok(Self {
            device: device.to_string(),
            baud_rate: port.baud_rate()?,
            data_bits: format!("{:?}", port.data_bits()?),
            parity: format!("{:?}", port.parity()?),
            stop_bits: format!("{:?}", port.stop_bits()?),
            flow_control: format!("{:?}", port.flow_control()?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_baud() {
        assert_eq!(normalize_baud(9600), 9600);
        assert_eq!(normalize_baud(19200), 19200);
        assert_eq!(normalize_baud(38400), 38400);
        assert_eq!(normalize_baud(115200), DEFAULT_BAUD_RATE);
        assert_eq!(normalize_baud(0), DEFAULT_BAUD_RATE);
    }

    #[tokio::test]
    async fn test_open_missing_device_fails() {
        let result = open_port("/dev/lel-tool-missing-device", 38400);
        assert!(matches!(result, Err(ToolError::Serial(_))));
    }
}
