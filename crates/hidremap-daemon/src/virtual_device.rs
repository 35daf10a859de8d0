//! Virtual-device client interface
//!
//! The engine re-emits transformed events through this trait. The concrete
//! client (uinput-backed in this daemon, a recording mock in tests) is
//! injected and externally owned; the engine calls into it but does not
//! manage its connection lifecycle, and none of these calls can fail from
//! the engine's point of view. Transport errors are the implementation's
//! problem to log.

use hidremap_config::{KeyboardType, VirtualKeyboardConfig};

use crate::types::UsagePage;

/// Virtual keyboard hardware parameters applied on initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyboardInit {
    pub keyboard_type: KeyboardType,
    pub caps_lock_delay_ms: u64,
}

impl From<&VirtualKeyboardConfig> for KeyboardInit {
    fn from(config: &VirtualKeyboardConfig) -> Self {
        Self {
            keyboard_type: config.keyboard_type,
            caps_lock_delay_ms: config.caps_lock_delay_ms,
        }
    }
}

/// One complete pointing report.
///
/// The 4-byte button layout is a fixed wire contract: byte i carries bits
/// 8*i..8*i+7 of the button field. Every report carries the full button
/// snapshot, never a delta.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PointingReport {
    pub buttons: [u8; 4],
    pub x: i8,
    pub y: i8,
    pub vertical_wheel: i8,
    pub horizontal_wheel: i8,
}

impl PointingReport {
    pub fn set_buttons(&mut self, bits: u32) {
        self.buttons[0] = (bits & 0xff) as u8;
        self.buttons[1] = ((bits >> 8) & 0xff) as u8;
        self.buttons[2] = ((bits >> 16) & 0xff) as u8;
        self.buttons[3] = ((bits >> 24) & 0xff) as u8;
    }

    pub fn button_bits(&self) -> u32 {
        u32::from(self.buttons[0])
            | u32::from(self.buttons[1]) << 8
            | u32::from(self.buttons[2]) << 16
            | u32::from(self.buttons[3]) << 24
    }
}

/// Clamp an event's integer value into a signed report field.
pub fn clamp_axis(value: i64) -> i8 {
    value.clamp(i64::from(i8::MIN), i64::from(i8::MAX)) as i8
}

/// Downstream virtual-device transport.
pub trait VirtualHidDeviceClient: Send + Sync {
    fn is_connected(&self) -> bool;
    fn is_virtual_keyboard_initialized(&self) -> bool;

    fn initialize_virtual_hid_keyboard(&self, init: KeyboardInit);
    fn reset_virtual_hid_keyboard(&self);

    fn initialize_virtual_hid_pointing(&self);
    fn reset_virtual_hid_pointing(&self);
    fn terminate_virtual_hid_pointing(&self);

    fn dispatch_keyboard_event(&self, usage_page: UsagePage, usage: u32, pressed: bool);
    fn post_pointing_report(&self, report: &PointingReport);
}
