//! Core key, button and device identity types
//!
//! [`KeyCode`] discriminants are wire-compatible with HID keyboard usages for
//! the standard block (0x04..=0xE7). Keys that live on other usage pages
//! (fn, media controls) sit in a private range starting at 0x1_0000 and carry
//! their real usage page/usage in the table below.

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

/// Opaque identifier of the originating physical device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceId(pub u64);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "device:{}", self.0)
    }
}

/// HID usage page carried on a dispatched keyboard event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum UsagePage {
    KeyboardOrKeypad = 0x0007,
    Consumer = 0x000c,
    AppleVendorTopCase = 0x00ff,
    AppleVendorKeyboard = 0xff01,
}

/// Normalized modifier semantic. Left/right hardware variants collapse into
/// one flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModifierFlag {
    CapsLock,
    Shift,
    Control,
    Option,
    Command,
    Fn,
}

macro_rules! define_key_codes {
    ($( $variant:ident = $value:expr, $name:literal, $page:ident, $usage:expr, $evdev:expr; )*) => {
        /// Hardware key identity.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u32)]
        pub enum KeyCode {
            $( $variant = $value, )*
        }

        impl KeyCode {
            pub const ALL: &'static [KeyCode] = &[ $( KeyCode::$variant, )* ];

            /// Configuration-facing name of this key.
            pub fn name(self) -> &'static str {
                match self { $( KeyCode::$variant => $name, )* }
            }

            pub fn usage_page(self) -> UsagePage {
                match self { $( KeyCode::$variant => UsagePage::$page, )* }
            }

            pub fn usage(self) -> u32 {
                match self { $( KeyCode::$variant => $usage, )* }
            }

            /// The evdev key this key code maps to, if any.
            pub fn evdev_key(self) -> Option<evdev::Key> {
                match self { $( KeyCode::$variant => $evdev, )* }
            }
        }
    };
}

use evdev::Key as Ev;

define_key_codes! {
    A = 0x04, "a", KeyboardOrKeypad, 0x04, Some(Ev::KEY_A);
    B = 0x05, "b", KeyboardOrKeypad, 0x05, Some(Ev::KEY_B);
    C = 0x06, "c", KeyboardOrKeypad, 0x06, Some(Ev::KEY_C);
    D = 0x07, "d", KeyboardOrKeypad, 0x07, Some(Ev::KEY_D);
    E = 0x08, "e", KeyboardOrKeypad, 0x08, Some(Ev::KEY_E);
    F = 0x09, "f", KeyboardOrKeypad, 0x09, Some(Ev::KEY_F);
    G = 0x0a, "g", KeyboardOrKeypad, 0x0a, Some(Ev::KEY_G);
    H = 0x0b, "h", KeyboardOrKeypad, 0x0b, Some(Ev::KEY_H);
    I = 0x0c, "i", KeyboardOrKeypad, 0x0c, Some(Ev::KEY_I);
    J = 0x0d, "j", KeyboardOrKeypad, 0x0d, Some(Ev::KEY_J);
    K = 0x0e, "k", KeyboardOrKeypad, 0x0e, Some(Ev::KEY_K);
    L = 0x0f, "l", KeyboardOrKeypad, 0x0f, Some(Ev::KEY_L);
    M = 0x10, "m", KeyboardOrKeypad, 0x10, Some(Ev::KEY_M);
    N = 0x11, "n", KeyboardOrKeypad, 0x11, Some(Ev::KEY_N);
    O = 0x12, "o", KeyboardOrKeypad, 0x12, Some(Ev::KEY_O);
    P = 0x13, "p", KeyboardOrKeypad, 0x13, Some(Ev::KEY_P);
    Q = 0x14, "q", KeyboardOrKeypad, 0x14, Some(Ev::KEY_Q);
    R = 0x15, "r", KeyboardOrKeypad, 0x15, Some(Ev::KEY_R);
    S = 0x16, "s", KeyboardOrKeypad, 0x16, Some(Ev::KEY_S);
    T = 0x17, "t", KeyboardOrKeypad, 0x17, Some(Ev::KEY_T);
    U = 0x18, "u", KeyboardOrKeypad, 0x18, Some(Ev::KEY_U);
    V = 0x19, "v", KeyboardOrKeypad, 0x19, Some(Ev::KEY_V);
    W = 0x1a, "w", KeyboardOrKeypad, 0x1a, Some(Ev::KEY_W);
    X = 0x1b, "x", KeyboardOrKeypad, 0x1b, Some(Ev::KEY_X);
    Y = 0x1c, "y", KeyboardOrKeypad, 0x1c, Some(Ev::KEY_Y);
    Z = 0x1d, "z", KeyboardOrKeypad, 0x1d, Some(Ev::KEY_Z);

    Num1 = 0x1e, "1", KeyboardOrKeypad, 0x1e, Some(Ev::KEY_1);
    Num2 = 0x1f, "2", KeyboardOrKeypad, 0x1f, Some(Ev::KEY_2);
    Num3 = 0x20, "3", KeyboardOrKeypad, 0x20, Some(Ev::KEY_3);
    Num4 = 0x21, "4", KeyboardOrKeypad, 0x21, Some(Ev::KEY_4);
    Num5 = 0x22, "5", KeyboardOrKeypad, 0x22, Some(Ev::KEY_5);
    Num6 = 0x23, "6", KeyboardOrKeypad, 0x23, Some(Ev::KEY_6);
    Num7 = 0x24, "7", KeyboardOrKeypad, 0x24, Some(Ev::KEY_7);
    Num8 = 0x25, "8", KeyboardOrKeypad, 0x25, Some(Ev::KEY_8);
    Num9 = 0x26, "9", KeyboardOrKeypad, 0x26, Some(Ev::KEY_9);
    Num0 = 0x27, "0", KeyboardOrKeypad, 0x27, Some(Ev::KEY_0);

    ReturnOrEnter = 0x28, "return_or_enter", KeyboardOrKeypad, 0x28, Some(Ev::KEY_ENTER);
    Escape = 0x29, "escape", KeyboardOrKeypad, 0x29, Some(Ev::KEY_ESC);
    DeleteOrBackspace = 0x2a, "delete_or_backspace", KeyboardOrKeypad, 0x2a, Some(Ev::KEY_BACKSPACE);
    Tab = 0x2b, "tab", KeyboardOrKeypad, 0x2b, Some(Ev::KEY_TAB);
    Spacebar = 0x2c, "spacebar", KeyboardOrKeypad, 0x2c, Some(Ev::KEY_SPACE);
    Hyphen = 0x2d, "hyphen", KeyboardOrKeypad, 0x2d, Some(Ev::KEY_MINUS);
    EqualSign = 0x2e, "equal_sign", KeyboardOrKeypad, 0x2e, Some(Ev::KEY_EQUAL);
    OpenBracket = 0x2f, "open_bracket", KeyboardOrKeypad, 0x2f, Some(Ev::KEY_LEFTBRACE);
    CloseBracket = 0x30, "close_bracket", KeyboardOrKeypad, 0x30, Some(Ev::KEY_RIGHTBRACE);
    Backslash = 0x31, "backslash", KeyboardOrKeypad, 0x31, Some(Ev::KEY_BACKSLASH);
    NonUsPound = 0x32, "non_us_pound", KeyboardOrKeypad, 0x32, None;
    Semicolon = 0x33, "semicolon", KeyboardOrKeypad, 0x33, Some(Ev::KEY_SEMICOLON);
    Quote = 0x34, "quote", KeyboardOrKeypad, 0x34, Some(Ev::KEY_APOSTROPHE);
    GraveAccentAndTilde = 0x35, "grave_accent_and_tilde", KeyboardOrKeypad, 0x35, Some(Ev::KEY_GRAVE);
    Comma = 0x36, "comma", KeyboardOrKeypad, 0x36, Some(Ev::KEY_COMMA);
    Period = 0x37, "period", KeyboardOrKeypad, 0x37, Some(Ev::KEY_DOT);
    Slash = 0x38, "slash", KeyboardOrKeypad, 0x38, Some(Ev::KEY_SLASH);
    CapsLock = 0x39, "caps_lock", KeyboardOrKeypad, 0x39, Some(Ev::KEY_CAPSLOCK);

    F1 = 0x3a, "f1", KeyboardOrKeypad, 0x3a, Some(Ev::KEY_F1);
    F2 = 0x3b, "f2", KeyboardOrKeypad, 0x3b, Some(Ev::KEY_F2);
    F3 = 0x3c, "f3", KeyboardOrKeypad, 0x3c, Some(Ev::KEY_F3);
    F4 = 0x3d, "f4", KeyboardOrKeypad, 0x3d, Some(Ev::KEY_F4);
    F5 = 0x3e, "f5", KeyboardOrKeypad, 0x3e, Some(Ev::KEY_F5);
    F6 = 0x3f, "f6", KeyboardOrKeypad, 0x3f, Some(Ev::KEY_F6);
    F7 = 0x40, "f7", KeyboardOrKeypad, 0x40, Some(Ev::KEY_F7);
    F8 = 0x41, "f8", KeyboardOrKeypad, 0x41, Some(Ev::KEY_F8);
    F9 = 0x42, "f9", KeyboardOrKeypad, 0x42, Some(Ev::KEY_F9);
    F10 = 0x43, "f10", KeyboardOrKeypad, 0x43, Some(Ev::KEY_F10);
    F11 = 0x44, "f11", KeyboardOrKeypad, 0x44, Some(Ev::KEY_F11);
    F12 = 0x45, "f12", KeyboardOrKeypad, 0x45, Some(Ev::KEY_F12);

    PrintScreen = 0x46, "print_screen", KeyboardOrKeypad, 0x46, Some(Ev::KEY_SYSRQ);
    ScrollLock = 0x47, "scroll_lock", KeyboardOrKeypad, 0x47, Some(Ev::KEY_SCROLLLOCK);
    Pause = 0x48, "pause", KeyboardOrKeypad, 0x48, Some(Ev::KEY_PAUSE);
    Insert = 0x49, "insert", KeyboardOrKeypad, 0x49, Some(Ev::KEY_INSERT);
    Home = 0x4a, "home", KeyboardOrKeypad, 0x4a, Some(Ev::KEY_HOME);
    PageUp = 0x4b, "page_up", KeyboardOrKeypad, 0x4b, Some(Ev::KEY_PAGEUP);
    DeleteForward = 0x4c, "delete_forward", KeyboardOrKeypad, 0x4c, Some(Ev::KEY_DELETE);
    End = 0x4d, "end", KeyboardOrKeypad, 0x4d, Some(Ev::KEY_END);
    PageDown = 0x4e, "page_down", KeyboardOrKeypad, 0x4e, Some(Ev::KEY_PAGEDOWN);
    RightArrow = 0x4f, "right_arrow", KeyboardOrKeypad, 0x4f, Some(Ev::KEY_RIGHT);
    LeftArrow = 0x50, "left_arrow", KeyboardOrKeypad, 0x50, Some(Ev::KEY_LEFT);
    DownArrow = 0x51, "down_arrow", KeyboardOrKeypad, 0x51, Some(Ev::KEY_DOWN);
    UpArrow = 0x52, "up_arrow", KeyboardOrKeypad, 0x52, Some(Ev::KEY_UP);

    KeypadNumLock = 0x53, "keypad_num_lock", KeyboardOrKeypad, 0x53, Some(Ev::KEY_NUMLOCK);
    KeypadSlash = 0x54, "keypad_slash", KeyboardOrKeypad, 0x54, Some(Ev::KEY_KPSLASH);
    KeypadAsterisk = 0x55, "keypad_asterisk", KeyboardOrKeypad, 0x55, Some(Ev::KEY_KPASTERISK);
    KeypadHyphen = 0x56, "keypad_hyphen", KeyboardOrKeypad, 0x56, Some(Ev::KEY_KPMINUS);
    KeypadPlus = 0x57, "keypad_plus", KeyboardOrKeypad, 0x57, Some(Ev::KEY_KPPLUS);
    KeypadEnter = 0x58, "keypad_enter", KeyboardOrKeypad, 0x58, Some(Ev::KEY_KPENTER);
    Keypad1 = 0x59, "keypad_1", KeyboardOrKeypad, 0x59, Some(Ev::KEY_KP1);
    Keypad2 = 0x5a, "keypad_2", KeyboardOrKeypad, 0x5a, Some(Ev::KEY_KP2);
    Keypad3 = 0x5b, "keypad_3", KeyboardOrKeypad, 0x5b, Some(Ev::KEY_KP3);
    Keypad4 = 0x5c, "keypad_4", KeyboardOrKeypad, 0x5c, Some(Ev::KEY_KP4);
    Keypad5 = 0x5d, "keypad_5", KeyboardOrKeypad, 0x5d, Some(Ev::KEY_KP5);
    Keypad6 = 0x5e, "keypad_6", KeyboardOrKeypad, 0x5e, Some(Ev::KEY_KP6);
    Keypad7 = 0x5f, "keypad_7", KeyboardOrKeypad, 0x5f, Some(Ev::KEY_KP7);
    Keypad8 = 0x60, "keypad_8", KeyboardOrKeypad, 0x60, Some(Ev::KEY_KP8);
    Keypad9 = 0x61, "keypad_9", KeyboardOrKeypad, 0x61, Some(Ev::KEY_KP9);
    Keypad0 = 0x62, "keypad_0", KeyboardOrKeypad, 0x62, Some(Ev::KEY_KP0);
    KeypadPeriod = 0x63, "keypad_period", KeyboardOrKeypad, 0x63, Some(Ev::KEY_KPDOT);
    NonUsBackslash = 0x64, "non_us_backslash", KeyboardOrKeypad, 0x64, Some(Ev::KEY_102ND);
    Application = 0x65, "application", KeyboardOrKeypad, 0x65, Some(Ev::KEY_COMPOSE);

    LeftControl = 0xe0, "left_control", KeyboardOrKeypad, 0xe0, Some(Ev::KEY_LEFTCTRL);
    LeftShift = 0xe1, "left_shift", KeyboardOrKeypad, 0xe1, Some(Ev::KEY_LEFTSHIFT);
    LeftOption = 0xe2, "left_option", KeyboardOrKeypad, 0xe2, Some(Ev::KEY_LEFTALT);
    LeftCommand = 0xe3, "left_command", KeyboardOrKeypad, 0xe3, Some(Ev::KEY_LEFTMETA);
    RightControl = 0xe4, "right_control", KeyboardOrKeypad, 0xe4, Some(Ev::KEY_RIGHTCTRL);
    RightShift = 0xe5, "right_shift", KeyboardOrKeypad, 0xe5, Some(Ev::KEY_RIGHTSHIFT);
    RightOption = 0xe6, "right_option", KeyboardOrKeypad, 0xe6, Some(Ev::KEY_RIGHTALT);
    RightCommand = 0xe7, "right_command", KeyboardOrKeypad, 0xe7, Some(Ev::KEY_RIGHTMETA);

    // Keys outside the standard keyboard usage block.
    Fn = 0x1_0000, "fn", AppleVendorTopCase, 0x0003, Some(Ev::KEY_FN);
    IlluminationDecrement = 0x1_0001, "illumination_decrement", AppleVendorTopCase, 0x0009, Some(Ev::KEY_KBDILLUMDOWN);
    IlluminationIncrement = 0x1_0002, "illumination_increment", AppleVendorTopCase, 0x0008, Some(Ev::KEY_KBDILLUMUP);
    MissionControl = 0x1_0003, "mission_control", AppleVendorKeyboard, 0x0010, Some(Ev::KEY_SCALE);
    Launchpad = 0x1_0004, "launchpad", AppleVendorKeyboard, 0x0004, Some(Ev::KEY_DASHBOARD);
    DisplayBrightnessDecrement = 0x1_0005, "display_brightness_decrement", Consumer, 0x70, Some(Ev::KEY_BRIGHTNESSDOWN);
    DisplayBrightnessIncrement = 0x1_0006, "display_brightness_increment", Consumer, 0x6f, Some(Ev::KEY_BRIGHTNESSUP);
    Rewind = 0x1_0007, "rewind", Consumer, 0xb4, Some(Ev::KEY_PREVIOUSSONG);
    PlayOrPause = 0x1_0008, "play_or_pause", Consumer, 0xcd, Some(Ev::KEY_PLAYPAUSE);
    Fastforward = 0x1_0009, "fastforward", Consumer, 0xb3, Some(Ev::KEY_NEXTSONG);
    Mute = 0x1_000a, "mute", Consumer, 0xe2, Some(Ev::KEY_MUTE);
    VolumeDecrement = 0x1_000b, "volume_decrement", Consumer, 0xea, Some(Ev::KEY_VOLUMEDOWN);
    VolumeIncrement = 0x1_000c, "volume_increment", Consumer, 0xe9, Some(Ev::KEY_VOLUMEUP);
    Eject = 0x1_000d, "eject", Consumer, 0xb8, Some(Ev::KEY_EJECTCD);
}

impl KeyCode {
    /// Look up a key by its configuration name.
    pub fn from_name(name: &str) -> Option<KeyCode> {
        static BY_NAME: OnceLock<HashMap<&'static str, KeyCode>> = OnceLock::new();
        BY_NAME
            .get_or_init(|| Self::ALL.iter().map(|k| (k.name(), *k)).collect())
            .get(name)
            .copied()
    }

    /// Look up a key by the evdev key reported by the grabber.
    pub fn from_evdev(key: evdev::Key) -> Option<KeyCode> {
        static BY_EVDEV: OnceLock<HashMap<u16, KeyCode>> = OnceLock::new();
        BY_EVDEV
            .get_or_init(|| {
                Self::ALL
                    .iter()
                    .filter_map(|k| k.evdev_key().map(|ev| (ev.code(), *k)))
                    .collect()
            })
            .get(&key.code())
            .copied()
    }

    /// Look up a key by its wire identity.
    pub fn from_usage(page: UsagePage, usage: u32) -> Option<KeyCode> {
        static BY_USAGE: OnceLock<HashMap<(UsagePage, u32), KeyCode>> = OnceLock::new();
        BY_USAGE
            .get_or_init(|| {
                Self::ALL
                    .iter()
                    .map(|k| ((k.usage_page(), k.usage()), *k))
                    .collect()
            })
            .get(&(page, usage))
            .copied()
    }

    /// The modifier semantic this key carries, if any.
    pub fn modifier_flag(self) -> Option<ModifierFlag> {
        match self {
            KeyCode::CapsLock => Some(ModifierFlag::CapsLock),
            KeyCode::LeftShift | KeyCode::RightShift => Some(ModifierFlag::Shift),
            KeyCode::LeftControl | KeyCode::RightControl => Some(ModifierFlag::Control),
            KeyCode::LeftOption | KeyCode::RightOption => Some(ModifierFlag::Option),
            KeyCode::LeftCommand | KeyCode::RightCommand => Some(ModifierFlag::Command),
            KeyCode::Fn => Some(ModifierFlag::Fn),
            _ => None,
        }
    }

    /// Whether this key sits in the hardware F1-F12 usage range.
    pub fn is_function_key(self) -> bool {
        let value = self as u32;
        (KeyCode::F1 as u32..=KeyCode::F12 as u32).contains(&value)
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

macro_rules! define_pointing_buttons {
    ($( $variant:ident = $bit:expr ),* $(,)?) => {
        /// Pointer button identity. The ordinal is the button's bit position
        /// in the wire report's 4-byte button field.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u32)]
        pub enum PointingButton {
            $( $variant = $bit, )*
        }

        impl PointingButton {
            pub const ALL: &'static [PointingButton] = &[ $( PointingButton::$variant, )* ];
        }
    };
}

define_pointing_buttons! {
    Button1 = 0, Button2 = 1, Button3 = 2, Button4 = 3,
    Button5 = 4, Button6 = 5, Button7 = 6, Button8 = 7,
    Button9 = 8, Button10 = 9, Button11 = 10, Button12 = 11,
    Button13 = 12, Button14 = 13, Button15 = 14, Button16 = 15,
    Button17 = 16, Button18 = 17, Button19 = 18, Button20 = 19,
    Button21 = 20, Button22 = 21, Button23 = 22, Button24 = 23,
    Button25 = 24, Button26 = 25, Button27 = 26, Button28 = 27,
    Button29 = 28, Button30 = 29, Button31 = 30, Button32 = 31,
}

impl PointingButton {
    /// Bit position in the wire report button field.
    pub fn bit(self) -> u32 {
        1 << (self as u32)
    }

    /// Map an evdev BTN_* key to a button identity.
    pub fn from_evdev(key: evdev::Key) -> Option<PointingButton> {
        match key {
            Ev::BTN_LEFT => Some(PointingButton::Button1),
            Ev::BTN_RIGHT => Some(PointingButton::Button2),
            Ev::BTN_MIDDLE => Some(PointingButton::Button3),
            Ev::BTN_SIDE => Some(PointingButton::Button4),
            Ev::BTN_EXTRA => Some(PointingButton::Button5),
            Ev::BTN_FORWARD => Some(PointingButton::Button6),
            Ev::BTN_BACK => Some(PointingButton::Button7),
            Ev::BTN_TASK => Some(PointingButton::Button8),
            _ => None,
        }
    }

    /// The evdev key used when re-emitting this button, if it has one.
    pub fn evdev_key(self) -> Option<evdev::Key> {
        match self {
            PointingButton::Button1 => Some(Ev::BTN_LEFT),
            PointingButton::Button2 => Some(Ev::BTN_RIGHT),
            PointingButton::Button3 => Some(Ev::BTN_MIDDLE),
            PointingButton::Button4 => Some(Ev::BTN_SIDE),
            PointingButton::Button5 => Some(Ev::BTN_EXTRA),
            PointingButton::Button6 => Some(Ev::BTN_FORWARD),
            PointingButton::Button7 => Some(Ev::BTN_BACK),
            PointingButton::Button8 => Some(Ev::BTN_TASK),
            _ => None,
        }
    }

    pub fn from_bit_index(index: u32) -> Option<PointingButton> {
        Self::ALL.get(index as usize).copied()
    }
}

/// Sub-event kinds of the pointing pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointingEventKind {
    Button,
    X,
    Y,
    VerticalWheel,
    HorizontalWheel,
}
