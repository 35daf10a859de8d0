//! Remap tracking ledger
//!
//! Records which (device, source key) pairs are currently substituted, so a
//! release can invert exactly the substitution applied at the matching press
//! even if the configuration changed in between. The engine owns two
//! independent instances, one per pipeline stage, because a key's "source"
//! identity differs per stage.

use parking_lot::Mutex;

use crate::types::{DeviceId, KeyCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LedgerEntry {
    device: DeviceId,
    source: KeyCode,
    target: KeyCode,
}

/// Duplicate-tolerant (device, source) -> target record with linear-scan,
/// first-match lookup.
///
/// Duplicates can occur when a source key is seen pressed twice without an
/// intervening release; `find`/`remove` resolve to the earliest matching
/// entry, which is correct for the single-press-per-key common case.
#[derive(Default)]
pub struct RemapLedger {
    entries: Mutex<Vec<LedgerEntry>>,
}

impl RemapLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, device: DeviceId, source: KeyCode, target: KeyCode) {
        self.entries.lock().push(LedgerEntry {
            device,
            source,
            target,
        });
    }

    /// The recorded target for the earliest matching entry, if any.
    pub fn find(&self, device: DeviceId, source: KeyCode) -> Option<KeyCode> {
        self.entries
            .lock()
            .iter()
            .find(|e| e.device == device && e.source == source)
            .map(|e| e.target)
    }

    /// Delete the first matching entry only.
    pub fn remove(&self, device: DeviceId, source: KeyCode) {
        let mut entries = self.entries.lock();
        if let Some(index) = entries
            .iter()
            .position(|e| e.device == device && e.source == source)
        {
            entries.remove(index);
        }
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
