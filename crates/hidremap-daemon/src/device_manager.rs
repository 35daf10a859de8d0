//! Device grab lifecycle and event forwarding
//!
//! The manager grabs every keyboard and pointing device it is allowed to,
//! assigns each one an opaque [`DeviceId`], and runs one task per device
//! that translates its evdev events into engine calls. Events are withheld
//! while the engine reports itself not ready; the engine performs no
//! internal reconnect, so readiness is purely the grabber's gate.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use anyhow::{Context, Result};
use evdev::{Device, InputEvent, RelativeAxisType};
use parking_lot::Mutex;

use crate::device::{self, DeviceInfo};
use crate::engine::{EventManipulator, ReadyState};
use crate::hotplug::HotplugEvent;
use crate::types::{DeviceId, KeyCode, PointingButton, PointingEventKind};

struct Inner {
    grabbed: HashSet<PathBuf>,
    next_device_id: u64,
}

/// Manages grabbed input devices for the daemon.
#[derive(Clone)]
pub struct DeviceManager {
    engine: Arc<EventManipulator>,
    inner: Arc<Mutex<Inner>>,
}

impl DeviceManager {
    pub fn new(engine: Arc<EventManipulator>) -> Self {
        Self {
            engine,
            inner: Arc::new(Mutex::new(Inner {
                grabbed: HashSet::new(),
                next_device_id: 1,
            })),
        }
    }

    /// Grab every eligible device currently present. Returns the number of
    /// devices grabbed.
    pub fn scan(&self) -> Result<usize> {
        let mut count = 0;
        for (path, device) in device::enumerate_devices()? {
            match self.try_grab(&path, device) {
                Ok(true) => count += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!("Failed to grab {}: {:#}", path.display(), e);
                }
            }
        }
        Ok(count)
    }

    /// Handle a hotplug event by grabbing or noting the removal.
    pub fn handle_hotplug(&self, event: HotplugEvent) {
        match event {
            HotplugEvent::Add { devnode } => {
                tracing::info!("Device connected at {}", devnode.display());
                let device = match Device::open(&devnode) {
                    Ok(device) => device,
                    Err(e) => {
                        tracing::debug!("Could not open {}: {}", devnode.display(), e);
                        return;
                    }
                };
                if let Err(e) = self.try_grab(&devnode, device) {
                    tracing::warn!("Failed to grab {}: {:#}", devnode.display(), e);
                }
            }
            HotplugEvent::Remove { devnode } => {
                // The device task notices the removal itself when its event
                // stream errors out; nothing to do here beyond logging.
                tracing::info!("Device disconnected at {}", devnode.display());
            }
        }
    }

    /// Try to grab the device and spawn its event task.
    ///
    /// Returns `Ok(false)` when the device is not eligible (not a keyboard
    /// or pointing device, one of our own virtual devices, or already
    /// grabbed); that is not an error.
    fn try_grab(&self, path: &Path, mut dev: Device) -> Result<bool> {
        if self.inner.lock().grabbed.contains(path) {
            return Ok(false);
        }

        let name = dev.name().unwrap_or("Unknown").to_string();

        if device::is_own_virtual_device(&dev) {
            tracing::debug!("Skipping own virtual device '{}'", name);
            return Ok(false);
        }
        if !device::is_keyboard(&dev) && !device::is_pointing_device(&dev) {
            tracing::debug!("Skipping '{}': neither keyboard nor pointing device", name);
            return Ok(false);
        }

        dev.grab().with_context(|| {
            format!(
                "Failed to grab device '{}' for exclusive access. \
                 Is another application using this device?",
                name
            )
        })?;

        let device_id = {
            let mut inner = self.inner.lock();
            inner.grabbed.insert(path.to_path_buf());
            let id = DeviceId(inner.next_device_id);
            inner.next_device_id += 1;
            id
        };

        let id = dev.input_id();
        let info = DeviceInfo {
            path: path.to_path_buf(),
            name,
            vendor: id.vendor(),
            product: id.product(),
        };

        let stream = dev.into_event_stream().with_context(|| {
            format!("Failed to create event stream for {}", path.display())
        })?;

        tracing::info!(
            "Grabbed '{}' at {} as {}",
            info.name,
            info.path.display(),
            device_id
        );

        let manager = self.clone();
        tokio::spawn(manager.run_device(device_id, info, stream));

        Ok(true)
    }

    /// Per-device event loop. Ends when the device goes away.
    async fn run_device(self, device_id: DeviceId, info: DeviceInfo, mut stream: evdev::EventStream) {
        loop {
            match stream.next_event().await {
                Ok(event) => forward_event(&self.engine, device_id, event),
                Err(e) => {
                    tracing::info!("Device '{}' went away: {}", info.name, e);
                    break;
                }
            }
        }

        // Stop anything the removed device left held down, but keep an
        // engaged caps lock across the reconnect.
        self.engine.stop_key_repeat();
        self.engine.reset_modifier_flag_state();

        self.inner.lock().grabbed.remove(&info.path);
    }
}

/// Translate one evdev event into the matching engine call.
fn forward_event(engine: &EventManipulator, device_id: DeviceId, event: InputEvent) {
    match engine.is_ready() {
        ReadyState::Ready => {}
        state => {
            tracing::trace!("Engine not ready ({:?}); event dropped", state);
            return;
        }
    }

    let timestamp = timestamp_micros(&event);

    match event.event_type() {
        evdev::EventType::KEY => {
            let key = evdev::Key::new(event.code());

            if let Some(button) = PointingButton::from_evdev(key) {
                if event.value() == 2 {
                    return;
                }
                engine.handle_pointing_event(
                    device_id,
                    timestamp,
                    PointingEventKind::Button,
                    Some(button),
                    i64::from(event.value()),
                );
            } else if let Some(key_code) = KeyCode::from_evdev(key) {
                match event.value() {
                    0 => engine.handle_keyboard_event(device_id, timestamp, key_code, false),
                    1 => engine.handle_keyboard_event(device_id, timestamp, key_code, true),
                    // Auto-repeat is regenerated downstream.
                    _ => {}
                }
            } else {
                tracing::trace!("Unmapped key {:?}; dropped", key);
            }
        }
        evdev::EventType::RELATIVE => {
            let kind = match event.code() {
                c if c == RelativeAxisType::REL_X.0 => PointingEventKind::X,
                c if c == RelativeAxisType::REL_Y.0 => PointingEventKind::Y,
                c if c == RelativeAxisType::REL_WHEEL.0 => PointingEventKind::VerticalWheel,
                c if c == RelativeAxisType::REL_HWHEEL.0 => PointingEventKind::HorizontalWheel,
                _ => return,
            };
            engine.handle_pointing_event(device_id, timestamp, kind, None, i64::from(event.value()));
        }
        _ => {}
    }
}

fn timestamp_micros(event: &InputEvent) -> u64 {
    event
        .timestamp()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}
