//! hidremap daemon
//!
//! Grabs input devices and remaps keyboard and pointing events according
//! to the selected configuration profile, emitting the transformed events
//! through virtual uinput devices.

mod config_manager;
mod device;
mod device_manager;
mod engine;
mod hotplug;
mod ledger;
mod modifier_flags;
mod pointing_buttons;
mod types;
mod uinput;
mod virtual_device;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::config_manager::ConfigurationManager;
use crate::device_manager::DeviceManager;
use crate::engine::EventManipulator;
use crate::uinput::UinputClient;

#[derive(Parser, Debug)]
#[command(name = "hidremapd")]
#[command(about = "Keyboard and pointing device remapping daemon")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "~/.config/hidremap/config.kdl")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Expand tilde in config path
    let config_path: PathBuf = shellexpand::tilde(&args.config).into_owned().into();

    let config = hidremap_config::parse_config(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;

    // RUST_LOG overrides the configured log level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.global.log_level.as_str())),
        )
        .init();

    tracing::info!(
        "Loaded configuration from {} with {} profile(s)",
        config_path.display(),
        config.profiles.len()
    );

    let client = Arc::new(UinputClient::new()?);
    let engine = Arc::new(EventManipulator::new(client));

    config_manager::apply_config(&engine, &config);
    engine.initialize_virtual_hid_pointing();

    let manager = DeviceManager::new(engine.clone());
    let grabbed = manager.scan()?;
    tracing::info!("Grabbed {} device(s)", grabbed);

    {
        let manager = manager.clone();
        tokio::spawn(async move {
            if let Err(e) = hotplug::run(manager).await {
                tracing::error!("Hotplug monitoring stopped: {:#}", e);
            }
        });
    }

    tokio::spawn(ConfigurationManager::new(config_path, engine.clone()).run());

    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down...");
    engine.reset();

    Ok(())
}
