//! Configuration loading and live reload
//!
//! Polls the configuration file every 100ms and reloads when it changes.
//! A change is only acted on once it has been stable for one poll tick, so
//! an editor that writes the file in several steps does not trigger a
//! half-written reload. A reload that fails to parse keeps the previous
//! configuration in effect.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use hidremap_config::Config;

use crate::engine::{EventManipulator, SystemPreferencesValues};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Identity of the config file at one point in time. Two snapshots compare
/// equal when nothing observable about the file changed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct FileSnapshot {
    modified: Option<SystemTime>,
    len: Option<u64>,
    /// Parent directory mtime, so an atomic rename into place is noticed
    /// even when the new file carries an older timestamp.
    dir_modified: Option<SystemTime>,
}

impl FileSnapshot {
    fn capture(path: &PathBuf) -> Self {
        let meta = std::fs::metadata(path).ok();
        let dir_meta = path.parent().and_then(|p| std::fs::metadata(p).ok());
        Self {
            modified: meta.as_ref().and_then(|m| m.modified().ok()),
            len: meta.map(|m| m.len()),
            dir_modified: dir_meta.and_then(|m| m.modified().ok()),
        }
    }
}

/// Watches the configuration file and pushes changes into the engine.
pub struct ConfigurationManager {
    path: PathBuf,
    engine: Arc<EventManipulator>,
}

impl ConfigurationManager {
    pub fn new(path: PathBuf, engine: Arc<EventManipulator>) -> Self {
        Self { path, engine }
    }

    /// Poll loop. Runs until the task is dropped.
    pub async fn run(self) {
        let mut applied = FileSnapshot::capture(&self.path);
        let mut pending: Option<FileSnapshot> = None;

        let mut interval = tokio::time::interval(POLL_INTERVAL);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;

            let current = FileSnapshot::capture(&self.path);
            if current == applied {
                pending = None;
                continue;
            }

            // Reload only once the file has held still for a full tick.
            match &pending {
                Some(snapshot) if *snapshot == current => {
                    self.reload();
                    applied = current;
                    pending = None;
                }
                _ => {
                    pending = Some(current);
                }
            }
        }
    }

    fn reload(&self) {
        tracing::info!("Configuration changed, reloading {}", self.path.display());
        match hidremap_config::parse_config(&self.path) {
            Ok(config) => apply_config(&self.engine, &config),
            Err(e) => {
                tracing::warn!("Reload failed, keeping previous configuration: {}", e);
            }
        }
    }
}

/// Push a parsed configuration into the engine: system preferences first,
/// then the selected profile (or pass-through when none is selected).
pub fn apply_config(engine: &EventManipulator, config: &Config) {
    engine.set_system_preferences_values(SystemPreferencesValues {
        keyboard_fn_state: config.global.keyboard_fn_state,
    });

    match config.selected_profile() {
        Some(profile) => engine.set_profile(profile),
        None => {
            tracing::warn!("No profile selected; events pass through unmodified");
            engine.unset_profile();
        }
    }
}
