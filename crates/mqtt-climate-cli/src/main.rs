//! Command-line host for a single MQTT climate entity.

mod config;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use mqtt_climate::{convert_temperature, parse_temperature, ClimateRuntime, TemperatureUnit};
use tracing::{error, info, warn};

use crate::config::HostConfig;

/// MQTT climate host - run a thermostat entity against an MQTT broker.
#[derive(Parser, Debug)]
#[command(name = "mqtt-climate")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Action to perform.
    #[command(subcommand)]
    command: Command,

    /// Verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Connect to the broker and host the configured entity until Ctrl-C.
    Run {
        /// Host configuration file.
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Validate a host configuration file and print it.
    Check {
        /// Host configuration file.
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Parse a temperature payload such as "21.5 °C".
    Parse {
        /// The payload to parse.
        payload: String,
        /// Convert the result to this unit (C or F).
        #[arg(long)]
        to: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Check if JSON logging is requested (for production/container environments)
    let json_logging = std::env::var("MQTT_CLIMATE_LOG_JSON")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(false);

    let default_level = if args.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "mqtt_climate={0},mqtt_climate_cli={0}",
            default_level
        ))
    });

    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .compact()
            .init();
    }

    match args.command {
        Command::Run { config } => run(config).await,
        Command::Check { config } => check(config),
        Command::Parse { payload, to } => parse(&payload, to.as_deref()),
    }
}

async fn run(path: PathBuf) -> Result<()> {
    let host = HostConfig::load(&path)?;
    info!(
        "Hosting '{}' on {} ({})",
        host.climate.name,
        host.broker.full_broker_addr(),
        host.unit
    );

    let broker_addr = host.broker.full_broker_addr();
    let runtime = ClimateRuntime::start(&host.broker, host.climate, host.unit, |state| {
        match serde_json::to_string(state) {
            Ok(json) => info!("State update: {}", json),
            Err(e) => warn!("Failed to serialize state: {}", e),
        }
    })?;

    let interrupted = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl-C")?;
            true
        }
        _ = runtime.closed() => false,
    };

    if !interrupted {
        error!("MQTT event loop for {} stopped", broker_addr);
        bail!("Lost connection to MQTT broker {}", broker_addr);
    }

    info!("Shutting down");
    runtime.stop().await?;
    Ok(())
}

fn check(path: PathBuf) -> Result<()> {
    let host = HostConfig::load(&path)?;
    println!("Configuration OK: {}", path.display());
    println!("  unit:   {}", host.unit);
    println!("  broker: {}", host.broker.full_broker_addr());
    println!("{}", toml::to_string_pretty(&host.climate)?);
    Ok(())
}

fn parse(payload: &str, to: Option<&str>) -> Result<()> {
    let parsed = parse_temperature(payload)
        .with_context(|| format!("Not a temperature payload: {:?}", payload))?;

    match to {
        Some(unit) => {
            let unit: TemperatureUnit = unit.parse()?;
            let value = convert_temperature(parsed.value, parsed.unit, unit);
            println!("{} {}", value, unit);
        }
        None => println!("{} {}", parsed.value, parsed.unit),
    }
    Ok(())
}
