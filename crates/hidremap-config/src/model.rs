//! Configuration data model

use std::collections::HashMap;

use serde::Serialize;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize)]
pub struct Config {
    pub global: GlobalConfig,
    pub profiles: Vec<Profile>,
}

impl Config {
    /// The profile the daemon should activate.
    ///
    /// Returns the profile marked `selected=true`, falling back to the first
    /// profile in document order when none is marked.
    pub fn selected_profile(&self) -> Option<&Profile> {
        self.profiles
            .iter()
            .find(|p| p.selected)
            .or_else(|| self.profiles.first())
    }
}

/// Global settings
#[derive(Debug, Clone, Serialize)]
pub struct GlobalConfig {
    pub log_level: LogLevel,
    /// System-wide "use F1-F12 as function keys" preference. Physically
    /// holding fn inverts this for the function row.
    pub keyboard_fn_state: bool,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            keyboard_fn_state: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive string accepted by tracing's `EnvFilter`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(format!("Unknown log level: {}", s)),
        }
    }
}

/// A named profile containing remapping rules
///
/// Key names are kept as strings here; the daemon resolves them to key codes
/// when the profile is installed and warns about names it does not know.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Profile {
    pub name: String,
    /// Whether this is the active profile
    pub selected: bool,
    /// Simple 1:1 key remaps (source key -> target key)
    pub simple_remap: HashMap<String, String>,
    /// Function-row remaps applied when the fn gate is satisfied
    /// (F1 -> display_brightness_decrement and friends)
    pub fn_function_keys: HashMap<String, String>,
    /// Virtual keyboard initialization parameters
    pub virtual_keyboard: VirtualKeyboardConfig,
}

/// Virtual keyboard hardware parameters, re-applied on every profile install
#[derive(Debug, Clone, Serialize)]
pub struct VirtualKeyboardConfig {
    pub keyboard_type: KeyboardType,
    pub caps_lock_delay_ms: u64,
}

impl Default for VirtualKeyboardConfig {
    fn default() -> Self {
        Self {
            keyboard_type: KeyboardType::Ansi,
            caps_lock_delay_ms: 0,
        }
    }
}

/// Physical layout reported by the virtual keyboard
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum KeyboardType {
    #[default]
    Ansi,
    Iso,
    Jis,
}

impl std::str::FromStr for KeyboardType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ansi" => Ok(Self::Ansi),
            "iso" => Ok(Self::Iso),
            "jis" => Ok(Self::Jis),
            _ => Err(format!("Unknown keyboard type: {}", s)),
        }
    }
}
