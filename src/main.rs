//! mqttled daemon
//!
//! Loads the config, builds the LED registry and runs the MQTT event loop
//! until SIGINT/SIGTERM.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use mqttled::config::host_name;
use mqttled::{Config, ConnectionOutcome, Controller, ControllerContext, MemoryBus, MessageRouter};

mod bridge;
mod cli;

use bridge::Bridge;
use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.debug { "debug" } else { cli.log_level.as_str() };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!("Loading config from {:?}", cli.config);
    let config = Config::load(&cli.config)?;
    let hostname = host_name().context("Cannot determine host name")?;

    if cli.check {
        return check(&config, &hostname);
    }

    let bridge = Bridge::new(&config, &hostname)?;
    bridge.run(bridge::shutdown_signal()).await
}

/// Build the registry against an in-memory bus and print the announcement
fn check(config: &Config, hostname: &str) -> Result<()> {
    let ctx = ControllerContext::from_config(config, hostname);
    let bus = Arc::new(MemoryBus::new());
    let mut router = MessageRouter::new();
    let controller = Controller::new(ctx, config, bus.clone(), &mut router)?;

    controller.on_connect(ConnectionOutcome::Accepted);

    println!(
        "{} light(s) under {}",
        controller.len(),
        controller.context().namespace()
    );
    for id in controller.light_ids() {
        println!("  - {id}");
    }
    println!();
    for msg in bus.take() {
        let retained = if msg.retain { " (retained)" } else { "" };
        println!("{}{}\n  {}", msg.topic, retained, msg.payload_str());
    }
    Ok(())
}
