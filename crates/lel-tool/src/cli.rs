//! Command-line arguments

use crate::settings::OutputFormat;
use clap::{ArgGroup, Parser};
use dynament_protocol::Command;
use std::path::PathBuf;

/// Read configuration and live data from a Dynament LEL gas sensor
#[derive(Debug, Clone, Parser)]
#[command(name = "lel-tool", version, about)]
#[command(group(
    ArgGroup::new("request")
        .args(["read_config_data", "read_live_data", "read_live_data_simple"])
        .multiple(false)
))]
#[command(after_help = "Examples:
  lel-tool --read-live-data
  lel-tool --read-live-data --raw
  lel-tool --read-config-data
  lel-tool --device /dev/ttyUSB0 --read-live-data-simple")]
pub struct Cli {
    /// Read the sensor configuration record
    #[arg(long)]
    pub read_config_data: bool,

    /// Read the full live data record
    #[arg(long)]
    pub read_live_data: bool,

    /// Read live data, showing the gas reading only
    #[arg(long)]
    pub read_live_data_simple: bool,

    /// Serial device (default /dev/ttyUSB0)
    #[arg(short, long)]
    pub device: Option<String>,

    /// Baud rate: 9600, 19200 or 38400 (default 38400)
    #[arg(short, long)]
    pub baud: Option<u32>,

    /// Capture the raw analog block between sync markers instead of decoding
    #[arg(short, long)]
    pub raw: bool,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Print the serial port settings and exit
    #[arg(short, long)]
    pub query_serial_info: bool,

    /// Reply wait window in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Reject replies whose checksum does not match
    #[arg(long)]
    pub verify_checksum: bool,

    /// Output format
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Configuration file (default ./lel-tool.toml if present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// The requested sensor command, if any
    pub fn selected_command(&self) -> Option<Command> {
        if self.read_config_data {
            Some(Command::ReadConfigData)
        } else if self.read_live_data {
            Some(Command::ReadLiveData)
        } else if self.read_live_data_simple {
            Some(Command::ReadLiveDataSimple)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_selected_command() {
        let cli = Cli::parse_from(["lel-tool", "--read-config-data"]);
        assert_eq!(cli.selected_command(), Some(Command::ReadConfigData));

        let cli = Cli::parse_from(["lel-tool", "--read-live-data-simple", "-v"]);
        assert_eq!(cli.selected_command(), Some(Command::ReadLiveDataSimple));
        assert!(cli.verbose);

        let cli = Cli::parse_from(["lel-tool", "--query-serial-info"]);
        assert_eq!(cli.selected_command(), None);
    }

    #[test]
    fn test_commands_are_exclusive() {
        let result = Cli::try_parse_from(["lel-tool", "--read-live-data", "--read-config-data"]);
        assert!(result.is_err());
    }
}
