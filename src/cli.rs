//! Command-line interface

use clap::Parser;
use mqttled::config::DEFAULT_CONFIG_PATH;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mqttled")]
#[command(about = "Expose Linux LEDs to Home Assistant over MQTT")]
#[command(version)]
pub struct Cli {
    /// Config file path
    #[arg(default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Enable debug logging (same as --log-level debug)
    #[arg(short, long)]
    pub debug: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Validate the config, open the LEDs and print what would be announced
    #[arg(long)]
    pub check: bool,
}
