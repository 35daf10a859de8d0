//! uinput-backed virtual-device client
//!
//! Implements [`VirtualHidDeviceClient`] on top of evdev's uinput support:
//! one virtual keyboard and one virtual pointing device, created on demand.
//! The engine's trait surface is infallible, so transport failures are
//! logged here and otherwise swallowed; the engine learns about a missing
//! virtual keyboard only through `is_virtual_keyboard_initialized`.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{AttributeSet, EventType, InputEvent, Key, RelativeAxisType};
use parking_lot::Mutex;

use crate::types::{KeyCode, PointingButton, UsagePage};
use crate::virtual_device::{KeyboardInit, PointingReport, VirtualHidDeviceClient};

pub const VIRTUAL_KEYBOARD_NAME: &str = "hidremap virtual keyboard";
pub const VIRTUAL_POINTING_NAME: &str = "hidremap virtual pointing";

const UINPUT_PATH: &str = "/dev/uinput";

struct KeyboardState {
    device: VirtualDevice,
    /// evdev codes currently held down, so a keyboard reset can release them.
    held: HashSet<u16>,
}

struct PointingState {
    device: VirtualDevice,
    /// Button bit field of the last posted report.
    buttons: u32,
}

/// Virtual keyboard + pointing devices behind the engine's client trait.
#[derive(Default)]
pub struct UinputClient {
    keyboard: Mutex<Option<KeyboardState>>,
    pointing: Mutex<Option<PointingState>>,
}

impl UinputClient {
    pub fn new() -> Result<Self> {
        if !Path::new(UINPUT_PATH).exists() {
            anyhow::bail!(
                "{} not available; is the uinput module loaded?",
                UINPUT_PATH
            );
        }
        Ok(Self::default())
    }

    fn build_keyboard() -> Result<VirtualDevice> {
        let mut keys = AttributeSet::<Key>::new();
        for code in 0..256u16 {
            keys.insert(Key::new(code));
        }
        // Media and vendor keys sit above the standard range.
        for key_code in KeyCode::ALL {
            if let Some(key) = key_code.evdev_key() {
                keys.insert(key);
            }
        }

        let device = VirtualDeviceBuilder::new()?
            .name(VIRTUAL_KEYBOARD_NAME)
            .with_keys(&keys)?
            .build()
            .context("Failed to create virtual keyboard device")?;
        Ok(device)
    }

    fn build_pointing() -> Result<VirtualDevice> {
        let mut buttons = AttributeSet::<Key>::new();
        for button in PointingButton::ALL {
            if let Some(key) = button.evdev_key() {
                buttons.insert(key);
            }
        }

        let mut axes = AttributeSet::<RelativeAxisType>::new();
        axes.insert(RelativeAxisType::REL_X);
        axes.insert(RelativeAxisType::REL_Y);
        axes.insert(RelativeAxisType::REL_WHEEL);
        axes.insert(RelativeAxisType::REL_HWHEEL);

        let device = VirtualDeviceBuilder::new()?
            .name(VIRTUAL_POINTING_NAME)
            .with_keys(&buttons)?
            .with_relative_axes(&axes)?
            .build()
            .context("Failed to create virtual pointing device")?;
        Ok(device)
    }

    fn release_all_buttons(pointing: &mut PointingState) {
        let mut events = Vec::new();
        for index in 0..32 {
            if pointing.buttons & (1 << index) == 0 {
                continue;
            }
            if let Some(key) = PointingButton::from_bit_index(index).and_then(|b| b.evdev_key()) {
                events.push(InputEvent::new(EventType::KEY, key.code(), 0));
            }
        }
        pointing.buttons = 0;

        if !events.is_empty() {
            events.push(syn());
            if let Err(e) = pointing.device.emit(&events) {
                tracing::warn!("Failed to release virtual pointing buttons: {}", e);
            }
        }
    }
}

fn syn() -> InputEvent {
    InputEvent::new(EventType::SYNCHRONIZATION, 0, 0)
}

impl VirtualHidDeviceClient for UinputClient {
    fn is_connected(&self) -> bool {
        Path::new(UINPUT_PATH).exists()
    }

    fn is_virtual_keyboard_initialized(&self) -> bool {
        self.keyboard.lock().is_some()
    }

    fn initialize_virtual_hid_keyboard(&self, init: KeyboardInit) {
        let mut keyboard = self.keyboard.lock();

        // Re-initialization replaces the device; any held keys die with it.
        match Self::build_keyboard() {
            Ok(device) => {
                tracing::info!(
                    "Virtual keyboard initialized (type {:?}, caps lock delay {} ms)",
                    init.keyboard_type,
                    init.caps_lock_delay_ms
                );
                *keyboard = Some(KeyboardState {
                    device,
                    held: HashSet::new(),
                });
            }
            Err(e) => {
                tracing::error!("Failed to initialize virtual keyboard: {:#}", e);
                *keyboard = None;
            }
        }
    }

    fn reset_virtual_hid_keyboard(&self) {
        let mut keyboard = self.keyboard.lock();
        let Some(keyboard) = keyboard.as_mut() else {
            return;
        };

        let mut events: Vec<InputEvent> = keyboard
            .held
            .drain()
            .map(|code| InputEvent::new(EventType::KEY, code, 0))
            .collect();
        if events.is_empty() {
            return;
        }
        events.push(syn());

        if let Err(e) = keyboard.device.emit(&events) {
            tracing::warn!("Failed to reset virtual keyboard: {}", e);
        }
    }

    fn initialize_virtual_hid_pointing(&self) {
        let mut pointing = self.pointing.lock();
        if pointing.is_some() {
            return;
        }

        match Self::build_pointing() {
            Ok(device) => {
                tracing::info!("Virtual pointing device initialized");
                *pointing = Some(PointingState { device, buttons: 0 });
            }
            Err(e) => {
                tracing::error!("Failed to initialize virtual pointing device: {:#}", e);
            }
        }
    }

    fn reset_virtual_hid_pointing(&self) {
        let mut pointing = self.pointing.lock();
        if let Some(pointing) = pointing.as_mut() {
            Self::release_all_buttons(pointing);
        }
    }

    fn terminate_virtual_hid_pointing(&self) {
        let mut pointing = self.pointing.lock();
        if let Some(mut state) = pointing.take() {
            Self::release_all_buttons(&mut state);
            tracing::debug!("Virtual pointing device terminated");
        }
    }

    fn dispatch_keyboard_event(&self, usage_page: UsagePage, usage: u32, pressed: bool) {
        let Some(key) = KeyCode::from_usage(usage_page, usage).and_then(|k| k.evdev_key()) else {
            tracing::debug!(
                "No evdev mapping for usage page {:?} usage {:#x}; dropped",
                usage_page,
                usage
            );
            return;
        };

        let mut keyboard = self.keyboard.lock();
        let Some(keyboard) = keyboard.as_mut() else {
            tracing::warn!("Keyboard event dropped: virtual keyboard not initialized");
            return;
        };

        if pressed {
            keyboard.held.insert(key.code());
        } else {
            keyboard.held.remove(&key.code());
        }

        let events = [
            InputEvent::new(EventType::KEY, key.code(), i32::from(pressed)),
            syn(),
        ];
        if let Err(e) = keyboard.device.emit(&events) {
            tracing::warn!("Failed to emit keyboard event: {}", e);
        }
    }

    fn post_pointing_report(&self, report: &PointingReport) {
        let mut pointing = self.pointing.lock();
        let Some(pointing) = pointing.as_mut() else {
            tracing::debug!("Pointing report dropped: virtual pointing not initialized");
            return;
        };

        let mut events = Vec::new();

        // The report carries a full button snapshot; uinput wants
        // transitions, so diff against the previous field.
        let bits = report.button_bits();
        let changed = bits ^ pointing.buttons;
        for index in 0..32 {
            if changed & (1 << index) == 0 {
                continue;
            }
            let Some(key) = PointingButton::from_bit_index(index).and_then(|b| b.evdev_key())
            else {
                tracing::trace!("Button bit {} has no evdev mapping; skipped", index);
                continue;
            };
            let value = i32::from(bits & (1 << index) != 0);
            events.push(InputEvent::new(EventType::KEY, key.code(), value));
        }
        pointing.buttons = bits;

        if report.x != 0 {
            events.push(InputEvent::new(
                EventType::RELATIVE,
                RelativeAxisType::REL_X.0,
                i32::from(report.x),
            ));
        }
        if report.y != 0 {
            events.push(InputEvent::new(
                EventType::RELATIVE,
                RelativeAxisType::REL_Y.0,
                i32::from(report.y),
            ));
        }
        if report.vertical_wheel != 0 {
            events.push(InputEvent::new(
                EventType::RELATIVE,
                RelativeAxisType::REL_WHEEL.0,
                i32::from(report.vertical_wheel),
            ));
        }
        if report.horizontal_wheel != 0 {
            events.push(InputEvent::new(
                EventType::RELATIVE,
                RelativeAxisType::REL_HWHEEL.0,
                i32::from(report.horizontal_wheel),
            ));
        }

        if events.is_empty() {
            return;
        }
        events.push(syn());

        if let Err(e) = pointing.device.emit(&events) {
            tracing::warn!("Failed to emit pointing report: {}", e);
        }
    }
}
