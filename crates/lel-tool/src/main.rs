//! Dynament LEL Sensor Tool - Main Entry Point

use anyhow::Context;
use clap::{CommandFactory, Parser};
use lel_tool::cli::Cli;
use lel_tool::presenter::{render_json, render_text, NO_RESPONSE_MESSAGE};
use lel_tool::serial::{open_port, PortSettings};
use lel_tool::session::{run_exchange, ExchangeRequest};
use lel_tool::settings::{OutputFormat, ToolConfig};
use lel_tool::{init_logging, ToolError};
use std::process::ExitCode;
use tracing::{debug, error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    info!("=== LEL Tool v{} ===", env!("CARGO_PKG_VERSION"));

    let command = cli.selected_command();
    if command.is_none() && !cli.query_serial_info {
        Cli::command().print_help()?;
        return Ok(ExitCode::FAILURE);
    }

    let config = ToolConfig::resolve(&cli).context("loading configuration")?;
    debug!("Resolved configuration: {:?}", config);

    let port = open_port(&config.device, config.baud)?;

    if cli.query_serial_info {
        let settings = PortSettings::query(&config.device, &port)?;
        match config.format {
            OutputFormat::Text => {
                println!("Serial settings for {}", settings.device);
                println!("baud: {}", settings.baud_rate);
                println!("data bits: {}", settings.data_bits);
                println!("parity: {}", settings.parity);
                println!("stop bits: {}", settings.stop_bits);
                println!("flow control: {}", settings.flow_control);
            }
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&settings)?),
        }
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = command else {
        return Ok(ExitCode::FAILURE);
    };
    let request = ExchangeRequest::from_config(command, &config);
    let (reader, mut writer) = tokio::io::split(port);

    let outcome = match run_exchange(reader, &mut writer, &request).await {
        Ok(outcome) => outcome,
        Err(ToolError::NoResponse) => {
            println!("{}", NO_RESPONSE_MESSAGE);
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => return Err(e.into()),
    };

    match config.format {
        OutputFormat::Text => print!("{}", render_text(&outcome)),
        OutputFormat::Json => println!("{}", render_json(&outcome)?),
    }

    info!("All done");
    if matches!(outcome.record, Some(Err(_))) {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
