//! Modifier-flag state machine
//!
//! Tracks which modifier semantics are currently active. Each flag carries a
//! press reference count (driven by key down/up) and, independently, a sticky
//! lock bit (used for caps lock). The two are deliberately separate so a
//! transient reset can discard in-flight press state without disengaging an
//! engaged caps lock.

use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;

use crate::types::ModifierFlag;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Increase,
    Decrease,
    Lock,
    Unlock,
}

#[derive(Default)]
struct Inner {
    counts: HashMap<ModifierFlag, u32>,
    locked: HashSet<ModifierFlag>,
}

/// Reference-counted + sticky-lock modifier tracking.
///
/// Callable concurrently from multiple device-callback contexts.
#[derive(Default)]
pub struct ModifierFlagState {
    inner: Mutex<Inner>,
}

impl ModifierFlagState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn manipulate(&self, flag: ModifierFlag, operation: Operation) {
        let mut inner = self.inner.lock();
        match operation {
            Operation::Increase => {
                *inner.counts.entry(flag).or_insert(0) += 1;
            }
            Operation::Decrease => {
                // Clamp at zero; flaky hardware can deliver a release without
                // a matching press.
                let count = inner.counts.entry(flag).or_insert(0);
                *count = count.saturating_sub(1);
            }
            Operation::Lock => {
                inner.locked.insert(flag);
            }
            Operation::Unlock => {
                inner.locked.remove(&flag);
            }
        }
    }

    /// True iff the flag's press count is nonzero or its lock bit is set.
    pub fn pressed(&self, flag: ModifierFlag) -> bool {
        let inner = self.inner.lock();
        inner.counts.get(&flag).copied().unwrap_or(0) > 0 || inner.locked.contains(&flag)
    }

    /// Zero all press counts. Lock bits are untouched.
    pub fn reset(&self) {
        self.inner.lock().counts.clear();
    }

    /// Clear all sticky lock bits.
    pub fn unlock(&self) {
        self.inner.lock().locked.clear();
    }
}
