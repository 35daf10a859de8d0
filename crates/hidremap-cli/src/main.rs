//! hidremap CLI
//!
//! Configuration and inspection tool for hidremap.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::IntoDiagnostic;

#[derive(Parser, Debug)]
#[command(name = "hidremap")]
#[command(about = "Keyboard and pointing device remapping tool")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "~/.config/hidremap/config.kdl")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate the configuration file
    Validate {
        /// Print the parsed configuration as JSON
        #[arg(long)]
        json: bool,
    },

    /// List available input devices
    Devices {
        /// Print the device list as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> miette::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    // Expand tilde in config path
    let config_path: PathBuf = shellexpand::tilde(&cli.config).into_owned().into();

    match cli.command {
        Commands::Validate { json } => cmd_validate(&config_path, json),
        Commands::Devices { json } => cmd_devices(json),
    }
}

fn cmd_validate(config_path: &PathBuf, json: bool) -> miette::Result<()> {
    let config = hidremap_config::parse_config(config_path)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&config).into_diagnostic()?
        );
        return Ok(());
    }

    println!("Configuration is valid!");
    println!("  Profiles: {}", config.profiles.len());
    for profile in &config.profiles {
        let marker = if profile.selected { " (selected)" } else { "" };
        println!(
            "    - {}{}: {} simple remap(s), {} function key remap(s)",
            profile.name,
            marker,
            profile.simple_remap.len(),
            profile.fn_function_keys.len()
        );
    }

    Ok(())
}

fn cmd_devices(json: bool) -> miette::Result<()> {
    let mut devices = Vec::new();

    for entry in std::fs::read_dir("/dev/input").into_diagnostic()? {
        let entry = entry.into_diagnostic()?;
        let path = entry.path();

        if !path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with("event"))
            .unwrap_or(false)
        {
            continue;
        }

        // Skip devices we can't open
        let Ok(device) = evdev::Device::open(&path) else {
            continue;
        };

        let name = device.name().unwrap_or("Unknown").to_string();
        let id = device.input_id();
        let vendor_product = format!("{:04x}:{:04x}", id.vendor(), id.product());

        let is_keyboard = device.supported_events().contains(evdev::EventType::KEY)
            && device
                .supported_keys()
                .map(|keys| keys.contains(evdev::Key::KEY_A))
                .unwrap_or(false);
        let is_pointing = device
            .supported_keys()
            .map(|keys| keys.contains(evdev::Key::BTN_LEFT))
            .unwrap_or(false)
            || device
                .supported_relative_axes()
                .map(|axes| axes.contains(evdev::RelativeAxisType::REL_X))
                .unwrap_or(false);

        let device_type = match (is_keyboard, is_pointing) {
            (true, true) => "keyboard+pointing",
            (true, false) => "keyboard",
            (false, true) => "pointing",
            (false, false) => "other",
        };

        devices.push((path, name, vendor_product, device_type));
    }

    if json {
        let entries: Vec<serde_json::Value> = devices
            .iter()
            .map(|(path, name, vendor_product, device_type)| {
                serde_json::json!({
                    "path": path,
                    "name": name,
                    "id": vendor_product,
                    "type": device_type,
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&entries).into_diagnostic()?
        );
        return Ok(());
    }

    println!("Available input devices:\n");
    for (path, name, vendor_product, device_type) in &devices {
        println!("  {} [{}]", name, device_type);
        println!("    Path: {}", path.display());
        println!("    ID: {}", vendor_product);
        println!();
    }

    Ok(())
}
