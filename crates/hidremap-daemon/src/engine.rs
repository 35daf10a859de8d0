//! Event manipulation engine
//!
//! Orchestrates the two-stage key transformation pipeline (simple remap,
//! then fn/function-row remap), extracts modifier semantics, enforces
//! emission-ordering timing, and rebuilds pointing reports. Raw events come
//! in from the device grabber, transformed events go out through the
//! injected [`VirtualHidDeviceClient`].
//!
//! All shared state lives behind per-structure locks held only across the
//! read/mutate step, never across a client call, so a slow dispatch cannot
//! stall unrelated lookups. Profile installation swaps a single `Arc`, so a
//! concurrently running lookup never observes a torn map.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::ledger::RemapLedger;
use crate::modifier_flags::{self, ModifierFlagState};
use crate::pointing_buttons::{self, PointingButtonState};
use crate::types::{DeviceId, KeyCode, ModifierFlag, PointingButton, PointingEventKind};
use crate::virtual_device::{clamp_axis, KeyboardInit, PointingReport, VirtualHidDeviceClient};

/// Delay inserted between two dispatches that share one source timestamp.
/// Exact timestamp equality is the trigger, not a tolerance window: it is
/// what distinguishes "one hardware report fanned out into several events"
/// from two independent reports.
const CONTINUOUS_EVENT_DELAY: Duration = Duration::from_millis(1);

/// Preconditions the grabber must check before forwarding events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    /// The device client is disconnected.
    DeviceClientNotConnected,
    /// The virtual keyboard has not been initialized yet (no profile applied).
    VirtualKeyboardNotInitialized,
    Ready,
}

/// Cached system-preference snapshot, updated by an external source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SystemPreferencesValues {
    /// System-wide "use F1-F12 as standard function keys" state.
    pub keyboard_fn_state: bool,
}

/// The two remap maps installed by a profile. Replaced wholesale behind an
/// `Arc`, never mutated in place.
#[derive(Default)]
struct RemapMaps {
    simple: HashMap<KeyCode, KeyCode>,
    fn_function_keys: HashMap<KeyCode, KeyCode>,
}

pub struct EventManipulator {
    client: Arc<dyn VirtualHidDeviceClient>,

    modifier_flags: ModifierFlagState,
    pointing_buttons: PointingButtonState,

    maps: Mutex<Arc<RemapMaps>>,
    system_preferences: Mutex<SystemPreferencesValues>,

    /// In-flight stage-A substitutions, keyed on the hardware key.
    applied_simple_remaps: RemapLedger,
    /// In-flight stage-B substitutions, keyed on stage A's output key.
    applied_fn_remaps: RemapLedger,

    last_timestamp: Mutex<u64>,
}

impl EventManipulator {
    pub fn new(client: Arc<dyn VirtualHidDeviceClient>) -> Self {
        Self {
            client,
            modifier_flags: ModifierFlagState::new(),
            pointing_buttons: PointingButtonState::new(),
            maps: Mutex::new(Arc::new(RemapMaps::default())),
            system_preferences: Mutex::new(SystemPreferencesValues::default()),
            applied_simple_remaps: RemapLedger::new(),
            applied_fn_remaps: RemapLedger::new(),
            last_timestamp: Mutex::new(0),
        }
    }

    /// Whether the engine can accept events. The engine performs no internal
    /// reconnect; callers must withhold events until `Ready`.
    pub fn is_ready(&self) -> ReadyState {
        if !self.client.is_connected() {
            return ReadyState::DeviceClientNotConnected;
        }
        if !self.client.is_virtual_keyboard_initialized() {
            return ReadyState::VirtualKeyboardNotInitialized;
        }
        ReadyState::Ready
    }

    /// Install a profile: resolve and swap in both remap maps and re-apply
    /// the virtual keyboard hardware parameters.
    pub fn set_profile(&self, profile: &hidremap_config::Profile) {
        let maps = Arc::new(RemapMaps {
            simple: resolve_key_map(&profile.simple_remap, "simple-remap"),
            fn_function_keys: resolve_key_map(&profile.fn_function_keys, "fn-function-keys"),
        });
        *self.maps.lock() = maps;

        self.client
            .initialize_virtual_hid_keyboard(KeyboardInit::from(&profile.virtual_keyboard));

        tracing::info!("Installed profile '{}'", profile.name);
    }

    /// Restore pass-through behavior (both maps empty). In-flight ledger
    /// entries survive so already-applied substitutions still invert
    /// correctly at release time.
    pub fn unset_profile(&self) {
        *self.maps.lock() = Arc::new(RemapMaps::default());
    }

    pub fn set_system_preferences_values(&self, values: SystemPreferencesValues) {
        *self.system_preferences.lock() = values;
    }

    pub fn set_caps_lock_state(&self, state: bool) {
        let operation = if state {
            modifier_flags::Operation::Lock
        } else {
            modifier_flags::Operation::Unlock
        };
        self.modifier_flags.manipulate(ModifierFlag::CapsLock, operation);
    }

    pub fn initialize_virtual_hid_pointing(&self) {
        self.client.initialize_virtual_hid_pointing();
    }

    pub fn terminate_virtual_hid_pointing(&self) {
        self.client.terminate_virtual_hid_pointing();
    }

    /// Release whatever the virtual keyboard is holding down.
    pub fn stop_key_repeat(&self) {
        self.client.reset_virtual_hid_keyboard();
    }

    /// Full reset: ledgers cleared, modifier counters zeroed and locks
    /// released, buttons released, virtual pointing torn down. The virtual
    /// keyboard is deliberately left initialized; re-initializing it is
    /// costly and its state is driven key by key regardless.
    pub fn reset(&self) {
        self.applied_simple_remaps.clear();
        self.applied_fn_remaps.clear();

        self.modifier_flags.reset();
        self.modifier_flags.unlock();

        self.reset_pointing_button_state();
        self.client.terminate_virtual_hid_pointing();
    }

    /// Discard transient modifier press state only. An engaged caps lock
    /// survives; used when a device reconnects.
    pub fn reset_modifier_flag_state(&self) {
        self.modifier_flags.reset();
    }

    /// Zero the button counters, flushing a zero-state report downstream
    /// only if a button was actually held.
    pub fn reset_pointing_button_state(&self) {
        let prior_bits = self.pointing_buttons.reset();
        if prior_bits != 0 {
            self.client.reset_virtual_hid_pointing();
        }
    }

    /// Keyboard pipeline: stage A (simple remap), stage B (fn/function-row
    /// remap on stage A's output), stage C (modifier extraction), dispatch.
    pub fn handle_keyboard_event(
        &self,
        device: DeviceId,
        timestamp: u64,
        key: KeyCode,
        pressed: bool,
    ) {
        let maps = Arc::clone(&self.maps.lock());

        // Stage A: simple remap. Releases invert whatever was applied at
        // press time, regardless of the current map.
        let mut key = key;
        if pressed {
            if let Some(&target) = maps.simple.get(&key) {
                self.applied_simple_remaps.add(device, key, target);
                key = target;
            }
        } else if let Some(target) = self.applied_simple_remaps.find(device, key) {
            self.applied_simple_remaps.remove(device, key);
            key = target;
        }

        // Stage B: fn/function-row remap, operating on stage A's output.
        if pressed {
            let mut substitution = None;

            if self.modifier_flags.pressed(ModifierFlag::Fn) {
                substitution = match key {
                    KeyCode::ReturnOrEnter => Some(KeyCode::KeypadEnter),
                    KeyCode::DeleteOrBackspace => Some(KeyCode::DeleteForward),
                    KeyCode::RightArrow => Some(KeyCode::End),
                    KeyCode::LeftArrow => Some(KeyCode::Home),
                    KeyCode::DownArrow => Some(KeyCode::PageDown),
                    KeyCode::UpArrow => Some(KeyCode::PageUp),
                    _ => None,
                };
            }

            if substitution.is_none() && key.is_function_key() {
                let keyboard_fn_state = self.system_preferences.lock().keyboard_fn_state;
                let fn_pressed = self.modifier_flags.pressed(ModifierFlag::Fn);

                // Physically holding fn inverts the system-wide F-row
                // behavior for that key.
                if (fn_pressed && keyboard_fn_state) || (!fn_pressed && !keyboard_fn_state) {
                    substitution = maps.fn_function_keys.get(&key).copied();
                }
            }

            if let Some(target) = substitution {
                self.applied_fn_remaps.add(device, key, target);
                key = target;
            }
        } else if let Some(target) = self.applied_fn_remaps.find(device, key) {
            self.applied_fn_remaps.remove(device, key);
            key = target;
        }

        // Stage C: modifier extraction. Modifier keys are reported on the
        // wire both as flag state and as key down/up; the key event still
        // goes out below with its own usage identifiers.
        if let Some(flag) = key.modifier_flag() {
            let operation = if pressed {
                modifier_flags::Operation::Increase
            } else {
                modifier_flags::Operation::Decrease
            };
            self.modifier_flags.manipulate(flag, operation);
        }

        self.post_key(key, pressed, timestamp);
    }

    /// Pointing pipeline: update button state or set one axis field, then
    /// dispatch a complete report carrying the full button snapshot.
    pub fn handle_pointing_event(
        &self,
        _device: DeviceId,
        _timestamp: u64,
        kind: PointingEventKind,
        button: Option<PointingButton>,
        value: i64,
    ) {
        let mut report = PointingReport::default();

        match kind {
            PointingEventKind::Button => {
                if let Some(button) = button {
                    let operation = if value != 0 {
                        pointing_buttons::Operation::Increase
                    } else {
                        pointing_buttons::Operation::Decrease
                    };
                    self.pointing_buttons.manipulate(button, operation);
                }
            }
            PointingEventKind::X => report.x = clamp_axis(value),
            PointingEventKind::Y => report.y = clamp_axis(value),
            PointingEventKind::VerticalWheel => report.vertical_wheel = clamp_axis(value),
            PointingEventKind::HorizontalWheel => report.horizontal_wheel = clamp_axis(value),
        }

        report.set_buttons(self.pointing_buttons.report_bits());
        self.client.post_pointing_report(&report);
    }

    fn post_key(&self, key: KeyCode, pressed: bool, timestamp: u64) {
        self.pace_dispatch(timestamp);
        self.client
            .dispatch_keyboard_event(key.usage_page(), key.usage(), pressed);
    }

    /// Guarantee a deterministic downstream ordering between a flag-change
    /// event and the key event it enables when both share one source
    /// timestamp. Without the delay an application can observe the key down
    /// before the flag change that was sent ahead of it.
    fn pace_dispatch(&self, timestamp: u64) {
        let continuous = {
            let mut last = self.last_timestamp.lock();
            if *last != timestamp {
                *last = timestamp;
                false
            } else {
                true
            }
        };

        if continuous {
            std::thread::sleep(CONTINUOUS_EVENT_DELAY);
        }
    }
}

/// Resolve a profile's name -> name map into key codes, warning about and
/// skipping names the key table does not know.
fn resolve_key_map(map: &HashMap<String, String>, context: &str) -> HashMap<KeyCode, KeyCode> {
    let mut resolved = HashMap::with_capacity(map.len());

    for (source, target) in map {
        let source_key = KeyCode::from_name(source);
        let target_key = KeyCode::from_name(target);

        match (source_key, target_key) {
            (Some(source_key), Some(target_key)) => {
                resolved.insert(source_key, target_key);
            }
            _ => {
                let unknown = if source_key.is_none() { source } else { target };
                tracing::warn!("Unknown key name '{}' in {}; entry skipped", unknown, context);
            }
        }
    }

    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    use hidremap_config::Profile;

    use crate::types::UsagePage;

    #[derive(Debug, Clone, PartialEq)]
    enum ClientCall {
        InitializeKeyboard(KeyboardInit),
        ResetKeyboard,
        InitializePointing,
        ResetPointing,
        TerminatePointing,
        KeyboardEvent {
            page: UsagePage,
            usage: u32,
            pressed: bool,
        },
        PointingReport(PointingReport),
    }

    #[derive(Default)]
    struct RecordingClient {
        calls: Mutex<Vec<ClientCall>>,
        disconnected: std::sync::atomic::AtomicBool,
        keyboard_initialized: std::sync::atomic::AtomicBool,
    }

    impl RecordingClient {
        fn calls(&self) -> Vec<ClientCall> {
            self.calls.lock().clone()
        }

        fn keyboard_events(&self) -> Vec<(u32, bool)> {
            self.calls()
                .into_iter()
                .filter_map(|c| match c {
                    ClientCall::KeyboardEvent { usage, pressed, .. } => Some((usage, pressed)),
                    _ => None,
                })
                .collect()
        }

        fn pointing_reports(&self) -> Vec<PointingReport> {
            self.calls()
                .into_iter()
                .filter_map(|c| match c {
                    ClientCall::PointingReport(r) => Some(r),
                    _ => None,
                })
                .collect()
        }

        fn clear(&self) {
            self.calls.lock().clear();
        }
    }

    impl VirtualHidDeviceClient for RecordingClient {
        fn is_connected(&self) -> bool {
            !self.disconnected.load(std::sync::atomic::Ordering::SeqCst)
        }

        fn is_virtual_keyboard_initialized(&self) -> bool {
            self.keyboard_initialized
                .load(std::sync::atomic::Ordering::SeqCst)
        }

        fn initialize_virtual_hid_keyboard(&self, init: KeyboardInit) {
            self.keyboard_initialized
                .store(true, std::sync::atomic::Ordering::SeqCst);
            self.calls.lock().push(ClientCall::InitializeKeyboard(init));
        }

        fn reset_virtual_hid_keyboard(&self) {
            self.calls.lock().push(ClientCall::ResetKeyboard);
        }

        fn initialize_virtual_hid_pointing(&self) {
            self.calls.lock().push(ClientCall::InitializePointing);
        }

        fn reset_virtual_hid_pointing(&self) {
            self.calls.lock().push(ClientCall::ResetPointing);
        }

        fn terminate_virtual_hid_pointing(&self) {
            self.calls.lock().push(ClientCall::TerminatePointing);
        }

        fn dispatch_keyboard_event(&self, usage_page: UsagePage, usage: u32, pressed: bool) {
            self.calls.lock().push(ClientCall::KeyboardEvent {
                page: usage_page,
                usage,
                pressed,
            });
        }

        fn post_pointing_report(&self, report: &PointingReport) {
            self.calls.lock().push(ClientCall::PointingReport(*report));
        }
    }

    const DEV: DeviceId = DeviceId(7);

    fn engine_with_client() -> (EventManipulator, Arc<RecordingClient>) {
        let client = Arc::new(RecordingClient::default());
        let engine = EventManipulator::new(client.clone());
        (engine, client)
    }

    fn profile_with_simple_remap(source: &str, target: &str) -> Profile {
        let mut profile = Profile {
            name: "test".to_string(),
            ..Profile::default()
        };
        profile
            .simple_remap
            .insert(source.to_string(), target.to_string());
        profile
    }

    #[test]
    fn test_is_ready_tri_state() {
        let (engine, client) = engine_with_client();

        client
            .disconnected
            .store(true, std::sync::atomic::Ordering::SeqCst);
        assert_eq!(engine.is_ready(), ReadyState::DeviceClientNotConnected);

        client
            .disconnected
            .store(false, std::sync::atomic::Ordering::SeqCst);
        assert_eq!(engine.is_ready(), ReadyState::VirtualKeyboardNotInitialized);

        engine.set_profile(&Profile::default());
        assert_eq!(engine.is_ready(), ReadyState::Ready);
    }

    #[test]
    fn test_set_profile_initializes_virtual_keyboard() {
        let (engine, client) = engine_with_client();
        let mut profile = Profile::default();
        profile.virtual_keyboard.caps_lock_delay_ms = 150;

        engine.set_profile(&profile);

        assert_eq!(
            client.calls(),
            vec![ClientCall::InitializeKeyboard(KeyboardInit {
                keyboard_type: hidremap_config::KeyboardType::Ansi,
                caps_lock_delay_ms: 150,
            })]
        );
    }

    #[test]
    fn test_simple_remap_press_and_release() {
        let (engine, client) = engine_with_client();
        engine.set_profile(&profile_with_simple_remap("caps_lock", "escape"));
        client.clear();

        engine.handle_keyboard_event(DEV, 1, KeyCode::CapsLock, true);
        engine.handle_keyboard_event(DEV, 2, KeyCode::CapsLock, false);

        assert_eq!(
            client.keyboard_events(),
            vec![
                (KeyCode::Escape.usage(), true),
                (KeyCode::Escape.usage(), false),
            ]
        );
        assert!(engine.applied_simple_remaps.is_empty());
    }

    #[test]
    fn test_release_inverts_press_time_substitution_after_unset_profile() {
        let (engine, client) = engine_with_client();
        engine.set_profile(&profile_with_simple_remap("a", "b"));
        client.clear();

        engine.handle_keyboard_event(DEV, 1, KeyCode::A, true);
        engine.unset_profile();
        engine.handle_keyboard_event(DEV, 2, KeyCode::A, false);

        // Release emits B, not A, even though the map is gone.
        assert_eq!(
            client.keyboard_events(),
            vec![(KeyCode::B.usage(), true), (KeyCode::B.usage(), false)]
        );
        assert!(engine.applied_simple_remaps.is_empty());

        // With the maps cleared, the next press passes through unchanged.
        client.clear();
        engine.handle_keyboard_event(DEV, 3, KeyCode::A, true);
        assert_eq!(client.keyboard_events(), vec![(KeyCode::A.usage(), true)]);
    }

    #[test]
    fn test_unmapped_key_passes_through() {
        let (engine, client) = engine_with_client();
        engine.set_profile(&profile_with_simple_remap("a", "b"));
        client.clear();

        engine.handle_keyboard_event(DEV, 1, KeyCode::Z, true);
        engine.handle_keyboard_event(DEV, 2, KeyCode::Z, false);

        assert_eq!(
            client.keyboard_events(),
            vec![(KeyCode::Z.usage(), true), (KeyCode::Z.usage(), false)]
        );
        assert!(engine.applied_simple_remaps.is_empty());
        assert!(engine.applied_fn_remaps.is_empty());
    }

    #[test]
    fn test_modifier_key_drives_flag_and_still_emits_key_event() {
        let (engine, client) = engine_with_client();
        engine.set_profile(&Profile::default());
        client.clear();

        engine.handle_keyboard_event(DEV, 1, KeyCode::LeftShift, true);
        assert!(engine.modifier_flags.pressed(ModifierFlag::Shift));
        assert_eq!(
            client.calls(),
            vec![ClientCall::KeyboardEvent {
                page: UsagePage::KeyboardOrKeypad,
                usage: KeyCode::LeftShift.usage(),
                pressed: true,
            }]
        );

        engine.handle_keyboard_event(DEV, 2, KeyCode::LeftShift, false);
        assert!(!engine.modifier_flags.pressed(ModifierFlag::Shift));
    }

    #[test]
    fn test_fn_arrow_substitution_and_release() {
        let (engine, client) = engine_with_client();
        engine.set_profile(&Profile::default());
        client.clear();

        engine.handle_keyboard_event(DEV, 1, KeyCode::Fn, true);
        engine.handle_keyboard_event(DEV, 2, KeyCode::LeftArrow, true);

        // fn is released before the arrow; the release must still invert to
        // home via the ledger, never left_arrow.
        engine.handle_keyboard_event(DEV, 3, KeyCode::Fn, false);
        engine.handle_keyboard_event(DEV, 4, KeyCode::LeftArrow, false);

        let events = client.keyboard_events();
        assert_eq!(
            events,
            vec![
                (KeyCode::Fn.usage(), true),
                (KeyCode::Home.usage(), true),
                (KeyCode::Fn.usage(), false),
                (KeyCode::Home.usage(), false),
            ]
        );
        assert!(engine.applied_fn_remaps.is_empty());
    }

    #[test]
    fn test_fn_substitution_applies_to_stage_a_output() {
        // Simple remap a -> up_arrow; with fn held, pressing A must land on
        // page_up, and its release must unwind both stages.
        let (engine, client) = engine_with_client();
        engine.set_profile(&profile_with_simple_remap("a", "up_arrow"));
        client.clear();

        engine.handle_keyboard_event(DEV, 1, KeyCode::Fn, true);
        engine.handle_keyboard_event(DEV, 2, KeyCode::A, true);
        engine.handle_keyboard_event(DEV, 3, KeyCode::A, false);

        let events = client.keyboard_events();
        assert_eq!(
            events,
            vec![
                (KeyCode::Fn.usage(), true),
                (KeyCode::PageUp.usage(), true),
                (KeyCode::PageUp.usage(), false),
            ]
        );
        assert!(engine.applied_simple_remaps.is_empty());
        assert!(engine.applied_fn_remaps.is_empty());
    }

    fn profile_with_f1_remap() -> Profile {
        let mut profile = Profile {
            name: "test".to_string(),
            ..Profile::default()
        };
        profile.fn_function_keys.insert(
            "f1".to_string(),
            "display_brightness_decrement".to_string(),
        );
        profile
    }

    #[test]
    fn test_function_row_remap_when_fn_not_held_and_state_disabled() {
        let (engine, client) = engine_with_client();
        engine.set_profile(&profile_with_f1_remap());
        engine.set_system_preferences_values(SystemPreferencesValues {
            keyboard_fn_state: false,
        });
        client.clear();

        engine.handle_keyboard_event(DEV, 1, KeyCode::F1, true);
        engine.handle_keyboard_event(DEV, 2, KeyCode::F1, false);

        assert_eq!(
            client.keyboard_events(),
            vec![
                (KeyCode::DisplayBrightnessDecrement.usage(), true),
                (KeyCode::DisplayBrightnessDecrement.usage(), false),
            ]
        );
    }

    #[test]
    fn test_function_row_passes_through_when_fn_held_and_state_disabled() {
        let (engine, client) = engine_with_client();
        engine.set_profile(&profile_with_f1_remap());
        engine.set_system_preferences_values(SystemPreferencesValues {
            keyboard_fn_state: false,
        });
        client.clear();

        engine.handle_keyboard_event(DEV, 1, KeyCode::Fn, true);
        engine.handle_keyboard_event(DEV, 2, KeyCode::F1, true);
        engine.handle_keyboard_event(DEV, 3, KeyCode::F1, false);

        let events = client.keyboard_events();
        assert_eq!(events[1], (KeyCode::F1.usage(), true));
        assert_eq!(events[2], (KeyCode::F1.usage(), false));
    }

    #[test]
    fn test_function_row_remap_when_fn_held_and_state_enabled() {
        let (engine, client) = engine_with_client();
        engine.set_profile(&profile_with_f1_remap());
        engine.set_system_preferences_values(SystemPreferencesValues {
            keyboard_fn_state: true,
        });
        client.clear();

        engine.handle_keyboard_event(DEV, 1, KeyCode::Fn, true);
        engine.handle_keyboard_event(DEV, 2, KeyCode::F1, true);

        assert_eq!(
            client.keyboard_events()[1],
            (KeyCode::DisplayBrightnessDecrement.usage(), true)
        );
    }

    #[test]
    fn test_caps_lock_state_locks_the_flag() {
        let (engine, _client) = engine_with_client();

        engine.set_caps_lock_state(true);
        assert!(engine.modifier_flags.pressed(ModifierFlag::CapsLock));

        // The lighter reset keeps the lock engaged.
        engine.reset_modifier_flag_state();
        assert!(engine.modifier_flags.pressed(ModifierFlag::CapsLock));

        engine.set_caps_lock_state(false);
        assert!(!engine.modifier_flags.pressed(ModifierFlag::CapsLock));
    }

    #[test]
    fn test_button_events_build_cumulative_reports() {
        let (engine, client) = engine_with_client();

        engine.handle_pointing_event(
            DEV,
            1,
            PointingEventKind::Button,
            Some(PointingButton::Button1),
            1,
        );
        engine.handle_pointing_event(
            DEV,
            2,
            PointingEventKind::Button,
            Some(PointingButton::Button2),
            1,
        );
        engine.handle_pointing_event(
            DEV,
            3,
            PointingEventKind::Button,
            Some(PointingButton::Button1),
            0,
        );

        let reports = client.pointing_reports();
        assert_eq!(reports[0].button_bits(), 0b01);
        assert_eq!(reports[1].button_bits(), 0b11);
        assert_eq!(reports[2].button_bits(), 0b10);
    }

    #[test]
    fn test_axis_event_carries_full_button_snapshot() {
        let (engine, client) = engine_with_client();

        engine.handle_pointing_event(
            DEV,
            1,
            PointingEventKind::Button,
            Some(PointingButton::Button1),
            1,
        );
        engine.handle_pointing_event(DEV, 2, PointingEventKind::X, None, -3);
        engine.handle_pointing_event(DEV, 3, PointingEventKind::VerticalWheel, None, 1000);

        let reports = client.pointing_reports();

        let x_report = reports[1];
        assert_eq!(x_report.x, -3);
        assert_eq!(x_report.y, 0);
        assert_eq!(x_report.button_bits(), 0b1, "snapshot, not delta");

        // Axis values clamp into the signed report field.
        assert_eq!(reports[2].vertical_wheel, i8::MAX);
        assert_eq!(reports[2].button_bits(), 0b1);
    }

    #[test]
    fn test_null_button_is_ignored_but_report_still_posted() {
        let (engine, client) = engine_with_client();

        engine.handle_pointing_event(DEV, 1, PointingEventKind::Button, None, 1);

        let reports = client.pointing_reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].button_bits(), 0);
    }

    #[test]
    fn test_reset_pointing_button_state_flushes_only_when_needed() {
        let (engine, client) = engine_with_client();

        // Nothing held: no flush.
        engine.reset_pointing_button_state();
        assert!(client.calls().is_empty());

        engine.handle_pointing_event(
            DEV,
            1,
            PointingEventKind::Button,
            Some(PointingButton::Button1),
            1,
        );
        client.clear();

        engine.reset_pointing_button_state();
        assert_eq!(client.calls(), vec![ClientCall::ResetPointing]);

        // Second reset: already all-zero, nothing flushed.
        client.clear();
        engine.reset_pointing_button_state();
        assert!(client.calls().is_empty());
    }

    #[test]
    fn test_reset_is_idempotent() {
        let (engine, client) = engine_with_client();
        engine.set_profile(&profile_with_simple_remap("a", "b"));

        engine.handle_keyboard_event(DEV, 1, KeyCode::A, true);
        engine.set_caps_lock_state(true);
        engine.handle_pointing_event(
            DEV,
            2,
            PointingEventKind::Button,
            Some(PointingButton::Button1),
            1,
        );
        client.clear();

        engine.reset();
        assert_eq!(
            client.calls(),
            vec![ClientCall::ResetPointing, ClientCall::TerminatePointing]
        );
        assert!(engine.applied_simple_remaps.is_empty());
        assert!(engine.applied_fn_remaps.is_empty());
        assert!(!engine.modifier_flags.pressed(ModifierFlag::CapsLock));

        // Second reset leaves identical state and flushes no zero report.
        client.clear();
        engine.reset();
        assert_eq!(client.calls(), vec![ClientCall::TerminatePointing]);
    }

    #[test]
    fn test_reset_leaves_virtual_keyboard_initialized() {
        let (engine, _client) = engine_with_client();
        engine.set_profile(&Profile::default());

        engine.reset();
        assert_eq!(engine.is_ready(), ReadyState::Ready);
    }

    #[test]
    fn test_stop_key_repeat_resets_virtual_keyboard() {
        let (engine, client) = engine_with_client();
        engine.stop_key_repeat();
        assert_eq!(client.calls(), vec![ClientCall::ResetKeyboard]);
    }

    #[test]
    fn test_equal_timestamps_are_paced_apart() {
        let (engine, client) = engine_with_client();

        engine.handle_keyboard_event(DEV, 42, KeyCode::LeftShift, true);
        let start = Instant::now();
        engine.handle_keyboard_event(DEV, 42, KeyCode::Tab, true);
        let elapsed = start.elapsed();

        assert!(
            elapsed >= CONTINUOUS_EVENT_DELAY,
            "same-timestamp dispatch must be delayed, got {:?}",
            elapsed
        );
        assert_eq!(client.keyboard_events().len(), 2);

        // A differing timestamp re-arms the baseline and dispatches
        // immediately; equality is the trigger, not proximity.
        engine.handle_keyboard_event(DEV, 43, KeyCode::Tab, false);
        let start = Instant::now();
        engine.handle_keyboard_event(DEV, 44, KeyCode::LeftShift, false);
        assert!(start.elapsed() < CONTINUOUS_EVENT_DELAY);
    }

    #[test]
    fn test_matched_pairs_leave_both_ledgers_empty() {
        let (engine, _client) = engine_with_client();
        let mut profile = profile_with_simple_remap("a", "b");
        profile
            .fn_function_keys
            .insert("f1".to_string(), "mute".to_string());
        engine.set_profile(&profile);

        for ts in 0..4u64 {
            engine.handle_keyboard_event(DEV, ts * 10 + 1, KeyCode::A, true);
            engine.handle_keyboard_event(DEV, ts * 10 + 2, KeyCode::F1, true);
            engine.handle_keyboard_event(DEV, ts * 10 + 3, KeyCode::F1, false);
            engine.handle_keyboard_event(DEV, ts * 10 + 4, KeyCode::A, false);
        }

        assert!(engine.applied_simple_remaps.is_empty());
        assert!(engine.applied_fn_remaps.is_empty());
    }

    #[test]
    fn test_unknown_key_names_in_profile_are_skipped() {
        let (engine, client) = engine_with_client();
        let mut profile = profile_with_simple_remap("caps_lock", "escape");
        profile
            .simple_remap
            .insert("bogus_key".to_string(), "escape".to_string());
        engine.set_profile(&profile);
        client.clear();

        engine.handle_keyboard_event(DEV, 1, KeyCode::CapsLock, true);
        assert_eq!(
            client.keyboard_events(),
            vec![(KeyCode::Escape.usage(), true)]
        );
    }
}
