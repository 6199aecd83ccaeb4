//! Tool configuration
//!
//! Layered: built-in defaults, then `lel-tool.toml` (or the `--config` file),
//! then `LEL_TOOL_*` environment variables, then command-line flags.

use crate::cli::Cli;
use crate::error::ToolError;
use crate::serial::normalize_baud;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Config file looked up in the working directory when `--config` is absent
const DEFAULT_CONFIG_NAME: &str = "lel-tool";

/// Environment variable prefix
const ENV_PREFIX: &str = "LEL_TOOL";

/// How decoded output is printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Tool configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    /// Serial device path
    pub device: String,

    /// Baud rate (9600, 19200 or 38400)
    pub baud: u32,

    /// Time to wait for the reply (milliseconds)
    pub timeout_ms: u64,

    /// Raw-capture mode: collect the analog block instead of decoding a record
    pub raw: bool,

    /// Reject replies with a bad checksum
    pub verify_checksum: bool,

    pub format: OutputFormat,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            device: "/dev/ttyUSB0".to_string(),
            baud: 38400,
            timeout_ms: 1000,
            raw: false,
            verify_checksum: false,
            format: OutputFormat::Text,
        }
    }
}

impl ToolConfig {
    /// Load file and environment layers
    pub fn load(path: Option<&Path>) -> Result<Self, ToolError> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_NAME).required(false),
        };

        let settings = config::Config::builder()
            .add_source(file)
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Load all layers and apply command-line overrides
    pub fn resolve(cli: &Cli) -> Result<Self, ToolError> {
        let mut config = Self::load(cli.config.as_deref())?;
        config.apply_cli(cli);
        config.baud = normalize_baud(config.baud);
        Ok(config)
    }

    /// Command-line flags win over every other layer
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(device) = &cli.device {
            self.device = device.clone();
        }
        if let Some(baud) = cli.baud {
            self.baud = baud;
        }
        if let Some(timeout_ms) = cli.timeout_ms {
            self.timeout_ms = timeout_ms;
        }
        if let Some(format) = cli.format {
            self.format = format;
        }
        self.raw |= cli.raw;
        self.verify_checksum |= cli.verify_checksum;
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
