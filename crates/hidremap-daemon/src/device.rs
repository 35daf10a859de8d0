//! Device enumeration and capability checks

use std::path::PathBuf;

use anyhow::Result;
use evdev::Device;

use crate::uinput::{VIRTUAL_KEYBOARD_NAME, VIRTUAL_POINTING_NAME};

/// Information about an input device
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub path: PathBuf,
    pub name: String,
    pub vendor: u16,
    pub product: u16,
}

impl DeviceInfo {
    /// Get vendor:product string (e.g., "3434:0361")
    pub fn vendor_product(&self) -> String {
        format!("{:04x}:{:04x}", self.vendor, self.product)
    }
}

/// Enumerate all input devices
pub fn enumerate_devices() -> Result<Vec<(PathBuf, Device)>> {
    let mut devices = Vec::new();

    for entry in std::fs::read_dir("/dev/input")? {
        let entry = entry?;
        let path = entry.path();

        // Only look at event* devices
        if !path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with("event"))
            .unwrap_or(false)
        {
            continue;
        }

        match Device::open(&path) {
            Ok(device) => devices.push((path, device)),
            Err(e) => {
                tracing::debug!("Could not open {}: {}", path.display(), e);
            }
        }
    }

    Ok(devices)
}

/// Check if a device is a keyboard
pub fn is_keyboard(device: &Device) -> bool {
    device.supported_events().contains(evdev::EventType::KEY)
        && device
            .supported_keys()
            .map(|keys| keys.contains(evdev::Key::KEY_A))
            .unwrap_or(false)
}

/// Check if a device is a pointing device (mouse, trackball, ...)
pub fn is_pointing_device(device: &Device) -> bool {
    let has_buttons = device
        .supported_keys()
        .map(|keys| keys.contains(evdev::Key::BTN_LEFT))
        .unwrap_or(false);
    let has_axes = device
        .supported_relative_axes()
        .map(|axes| axes.contains(evdev::RelativeAxisType::REL_X))
        .unwrap_or(false);
    has_buttons || has_axes
}

/// Check if a device is one of our own virtual output devices. Grabbing
/// those would feed the daemon its own output.
pub fn is_own_virtual_device(device: &Device) -> bool {
    matches!(
        device.name(),
        Some(VIRTUAL_KEYBOARD_NAME) | Some(VIRTUAL_POINTING_NAME)
    )
}
