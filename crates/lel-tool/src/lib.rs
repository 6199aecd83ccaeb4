//! Dynament LEL Sensor Tool
//!
//! Sends one read command to a Dynament gas sensor over a serial line,
//! waits for the reply and presents the decoded record.

pub mod cli;
pub mod error;
pub mod presenter;
pub mod serial;
pub mod session;
pub mod settings;

pub use error::ToolError;

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Initialize logging to stderr; decoded output goes to stdout
pub fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("Logging already initialized");
    }
}
