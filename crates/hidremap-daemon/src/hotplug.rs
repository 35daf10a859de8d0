//! Hot-plug device monitoring via udev

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio_stream::StreamExt;
use tokio_udev::{AsyncMonitorSocket, EventType, MonitorBuilder};

use crate::device_manager::DeviceManager;

/// A device appearing or disappearing under /dev/input
#[derive(Debug, Clone)]
pub enum HotplugEvent {
    Add { devnode: PathBuf },
    Remove { devnode: PathBuf },
}

/// Watch the input subsystem and feed add/remove events to the device
/// manager. Runs until the udev socket closes.
pub async fn run(manager: DeviceManager) -> Result<()> {
    let monitor = MonitorBuilder::new()
        .context("Failed to create udev monitor")?
        .match_subsystem("input")
        .context("Failed to filter udev monitor to input subsystem")?
        .listen()
        .context("Failed to listen on udev monitor")?;
    let mut socket = AsyncMonitorSocket::new(monitor)
        .context("Failed to create async udev monitor socket")?;

    tracing::info!("Hotplug monitoring started");

    while let Some(event) = socket.next().await {
        let event = match event {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!("udev monitor error: {}", e);
                continue;
            }
        };

        let Some(devnode) = event.devnode().map(PathBuf::from) else {
            continue;
        };
        if !devnode
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with("event"))
            .unwrap_or(false)
        {
            continue;
        }

        match event.event_type() {
            EventType::Add => {
                // Give udev rules a moment to settle device node permissions.
                tokio::time::sleep(Duration::from_millis(100)).await;
                manager.handle_hotplug(HotplugEvent::Add { devnode });
            }
            EventType::Remove => {
                manager.handle_hotplug(HotplugEvent::Remove { devnode });
            }
            _ => {}
        }
    }

    Ok(())
}
