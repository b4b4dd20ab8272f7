//! Sensaur hub simulator - Main Entry Point
//!
//! Builds the hub from configuration, connects the MQTT transport, and drives
//! the polling loop until a shutdown signal arrives.

use clap::{Parser, Subcommand};
use sensaur_hub::config::HubConfig;
use sensaur_hub::device::Device;
use sensaur_hub::hub::{HubController, HubRunner};
use sensaur_hub::transport::mqtt::MqttTransport;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::{mpsc, watch};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Simulated Sensaur edge hub
#[derive(Parser)]
#[command(name = "sensaur-hub")]
#[command(about = "Simulated edge hub speaking MQTT to the Sensaur cloud service")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the hub simulation
    Run,
    /// Validate configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() {
    init_logging();

    let cli = Cli::parse();

    info!("Starting Sensaur hub simulator v{}", env!("CARGO_PKG_VERSION"));

    let config = match load_configuration(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Run => run_hub(config).await,
        Commands::Config { show } => handle_config_command(config, show),
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        process::exit(1);
    }

    info!("Application shutdown complete");
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info")
            .add_directive("rumqttc=warn".parse().expect("static directive"))
            .add_directive("tokio=warn".parse().expect("static directive"))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_target(false))
        .init();
}

fn load_configuration(config_path: &Option<PathBuf>) -> Result<HubConfig, Box<dyn std::error::Error>> {
    match config_path {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            Ok(HubConfig::load_from_file(path)?)
        }
        None => {
            let default_paths = ["hub.toml", "config/hub.toml"];

            for path_str in default_paths {
                let path = PathBuf::from(path_str);
                if path.exists() {
                    info!("Loading configuration from: {}", path.display());
                    return Ok(HubConfig::load_from_file(&path)?);
                }
            }

            error!("No configuration file found. Provide one with -c/--config or create hub.toml");
            process::exit(1);
        }
    }
}

async fn run_hub(config: HubConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!("Hub starting with id: {}", config.hub_id);

    // Transport events (ConnAck, inbound publishes) funnel into one channel
    // drained by the runner, so all state mutations happen in one place.
    let (event_tx, event_rx) = mpsc::channel(32);
    let transport = Arc::new(MqttTransport::connect(&config, event_tx).await?);
    let controller = Arc::new(HubController::new(&config, transport.clone()));

    // Devices are constructed from configuration and attached before the
    // broker acknowledges the connection; the announcement happens on connect.
    for specs in &config.devices {
        controller.add_device(Device::new(specs.clone())).await?;
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let runner = HubRunner::new(controller, event_rx, shutdown_rx);
    let mut runner_handle = tokio::spawn(runner.run());

    let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())?;
    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;

    info!("Hub is running; polling loop started");

    tokio::select! {
        _ = sigint.recv() => {
            info!("Received SIGINT, shutting down gracefully...");
        }
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down gracefully...");
        }
        result = &mut runner_handle => {
            // The loop only ends on its own when something went wrong.
            match result {
                Ok(Ok(())) => info!("Hub loop ended"),
                Ok(Err(e)) => {
                    error!("Hub loop failed: {}", e);
                    transport.disconnect().await?;
                    return Err(e.into());
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    let _ = shutdown_tx.send(true);
    if !runner_handle.is_finished() {
        if let Ok(result) = runner_handle.await {
            result?;
        }
    }
    transport.disconnect().await?;

    Ok(())
}

fn handle_config_command(
    config: HubConfig,
    show: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if show {
        println!("Current configuration:");
        println!("{}", toml::to_string_pretty(&config)?);
    }

    info!("Configuration validation complete");
    Ok(())
}
