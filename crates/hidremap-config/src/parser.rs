//! KDL configuration parser

use std::path::Path;

use crate::error::ConfigError;
use crate::model::*;

/// Parse a configuration file from the given path
pub fn parse_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config_str(&content)
}

/// Parse configuration from a string
pub fn parse_config_str(content: &str) -> Result<Config, ConfigError> {
    let doc: kdl::KdlDocument = content.parse().map_err(|e: kdl::KdlError| {
        // kdl uses an older miette version, so extract offset/len manually
        let offset = e.span.offset();
        let len = e.span.len();
        let span = miette::SourceSpan::from((offset, len));
        ConfigError::ParseError {
            src: content.to_string(),
            span,
            source: e,
        }
    })?;

    let mut config = Config::default();

    for node in doc.nodes() {
        match node.name().value() {
            "global" => {
                config.global = parse_global(node)?;
            }
            "profile" => {
                config.profiles.push(parse_profile(node)?);
            }
            name => {
                tracing::warn!("Unknown top-level node: {}", name);
            }
        }
    }

    validate(&mut config)?;

    Ok(config)
}

fn validate(config: &mut Config) -> Result<(), ConfigError> {
    for (i, profile) in config.profiles.iter().enumerate() {
        if config.profiles[..i].iter().any(|p| p.name == profile.name) {
            return Err(ConfigError::DuplicateProfile {
                name: profile.name.clone(),
            });
        }
    }

    // At most one selected profile; first one wins.
    let mut seen_selected = false;
    for profile in &mut config.profiles {
        if profile.selected {
            if seen_selected {
                tracing::warn!(
                    "Multiple profiles marked selected; ignoring selected on '{}'",
                    profile.name
                );
                profile.selected = false;
            }
            seen_selected = true;
        }
    }

    Ok(())
}

fn parse_global(node: &kdl::KdlNode) -> Result<GlobalConfig, ConfigError> {
    let mut global = GlobalConfig::default();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "log-level" => {
                    if let Some(val) = first_string_entry(child) {
                        global.log_level = val
                            .parse()
                            .map_err(|e| ConfigError::Invalid { message: e })?;
                    }
                }
                "keyboard-fn-state" => {
                    if let Some(entry) = child.entries().first() {
                        if let Some(val) = entry.value().as_bool() {
                            global.keyboard_fn_state = val;
                        }
                    }
                }
                name => {
                    tracing::warn!("Unknown global config option: {}", name);
                }
            }
        }
    }

    Ok(global)
}

fn parse_profile(node: &kdl::KdlNode) -> Result<Profile, ConfigError> {
    let name = node
        .entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
        .ok_or_else(|| ConfigError::MissingField {
            field: "profile name (e.g., `profile \"default\" { ... }`)".to_string(),
        })?;

    let selected = node
        .entries()
        .iter()
        .find(|e| e.name().map(|n| n.value()) == Some("selected"))
        .and_then(|e| e.value().as_bool())
        .unwrap_or(false);

    let mut profile = Profile {
        name,
        selected,
        ..Profile::default()
    };

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "virtual-keyboard" => {
                    profile.virtual_keyboard = parse_virtual_keyboard(child)?;
                }
                "simple-remap" => {
                    profile.simple_remap = parse_key_value_block(child)?;
                }
                "fn-function-keys" => {
                    profile.fn_function_keys = parse_key_value_block(child)?;
                }
                name => {
                    tracing::warn!("Unknown profile option: {}", name);
                }
            }
        }
    }

    Ok(profile)
}

fn parse_virtual_keyboard(node: &kdl::KdlNode) -> Result<VirtualKeyboardConfig, ConfigError> {
    let mut vk = VirtualKeyboardConfig::default();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "keyboard-type" => {
                    if let Some(val) = first_string_entry(child) {
                        vk.keyboard_type = val
                            .parse()
                            .map_err(|e| ConfigError::Invalid { message: e })?;
                    }
                }
                "caps-lock-delay-ms" => {
                    if let Some(entry) = child.entries().first() {
                        match entry.value().as_i64() {
                            Some(val) if val >= 0 => vk.caps_lock_delay_ms = val as u64,
                            _ => {
                                return Err(ConfigError::Invalid {
                                    message: "caps-lock-delay-ms must be a non-negative integer"
                                        .to_string(),
                                });
                            }
                        }
                    }
                }
                name => {
                    tracing::warn!("Unknown virtual-keyboard option: {}", name);
                }
            }
        }
    }

    Ok(vk)
}

/// Parse a block of `source "target"` child nodes into a map.
///
/// Used for both `simple-remap` and `fn-function-keys`. Key names are not
/// validated here; the daemon resolves them against its key table and warns
/// about unknown names when the profile is installed.
fn parse_key_value_block(
    node: &kdl::KdlNode,
) -> Result<std::collections::HashMap<String, String>, ConfigError> {
    let mut map = std::collections::HashMap::new();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            let source = child.name().value().to_string();
            let target = first_string_entry(child).ok_or_else(|| ConfigError::Invalid {
                message: format!(
                    "{} entry '{}' is missing a target key (e.g., `{} \"escape\"`)",
                    node.name().value(),
                    source,
                    source
                ),
            })?;

            if map.insert(source.clone(), target).is_some() {
                tracing::warn!(
                    "Duplicate {} entry for '{}'; last one wins",
                    node.name().value(),
                    source
                );
            }
        }
    }

    Ok(map)
}

fn first_string_entry(node: &kdl::KdlNode) -> Option<String> {
    node.entries()
        .first()
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
global {
    log-level "debug"
    keyboard-fn-state true
}

profile "default" selected=true {
    virtual-keyboard {
        keyboard-type "iso"
        caps-lock-delay-ms 120
    }
    simple-remap {
        caps_lock "escape"
        grave_accent_and_tilde "non_us_backslash"
    }
    fn-function-keys {
        f1 "display_brightness_decrement"
        f10 "mute"
    }
}

profile "gaming" {
    simple-remap {
        escape "caps_lock"
    }
}
"#;

    #[test]
    fn test_parse_sample_config() {
        let config = parse_config_str(SAMPLE).unwrap();

        assert_eq!(config.global.log_level, LogLevel::Debug);
        assert!(config.global.keyboard_fn_state);
        assert_eq!(config.profiles.len(), 2);

        let default = config.selected_profile().unwrap();
        assert_eq!(default.name, "default");
        assert!(default.selected);
        assert_eq!(default.virtual_keyboard.keyboard_type, KeyboardType::Iso);
        assert_eq!(default.virtual_keyboard.caps_lock_delay_ms, 120);
        assert_eq!(
            default.simple_remap.get("caps_lock").map(String::as_str),
            Some("escape")
        );
        assert_eq!(
            default.fn_function_keys.get("f10").map(String::as_str),
            Some("mute")
        );
    }

    #[test]
    fn test_selected_profile_falls_back_to_first() {
        let config = parse_config_str(
            r#"
profile "a" { }
profile "b" { }
"#,
        )
        .unwrap();

        assert_eq!(config.selected_profile().unwrap().name, "a");
    }

    #[test]
    fn test_multiple_selected_profiles_first_wins() {
        let config = parse_config_str(
            r#"
profile "a" selected=true { }
profile "b" selected=true { }
"#,
        )
        .unwrap();

        assert_eq!(config.selected_profile().unwrap().name, "a");
        assert!(!config.profiles[1].selected);
    }

    #[test]
    fn test_duplicate_profile_names_rejected() {
        let result = parse_config_str(
            r#"
profile "default" { }
profile "default" { }
"#,
        );

        assert!(matches!(
            result,
            Err(ConfigError::DuplicateProfile { name }) if name == "default"
        ));
    }

    #[test]
    fn test_profile_without_name_rejected() {
        let result = parse_config_str("profile { }");
        assert!(matches!(result, Err(ConfigError::MissingField { .. })));
    }

    #[test]
    fn test_remap_entry_without_target_rejected() {
        let result = parse_config_str(
            r#"
profile "default" {
    simple-remap {
        caps_lock
    }
}
"#,
        );
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_invalid_kdl_reports_parse_error() {
        let result = parse_config_str("profile \"default\" {");
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn test_negative_caps_lock_delay_rejected() {
        let result = parse_config_str(
            r#"
profile "default" {
    virtual-keyboard {
        caps-lock-delay-ms -5
    }
}
"#,
        );
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_empty_config_is_valid() {
        let config = parse_config_str("").unwrap();
        assert!(config.profiles.is_empty());
        assert!(config.selected_profile().is_none());
    }

    #[test]
    fn test_parse_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = parse_config(file.path()).unwrap();
        assert_eq!(config.profiles.len(), 2);
    }

    #[test]
    fn test_missing_file_reports_io_error() {
        let result = parse_config(Path::new("/nonexistent/hidremap/config.kdl"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
