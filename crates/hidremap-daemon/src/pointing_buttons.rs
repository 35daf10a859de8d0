//! Pointing-button state machine
//!
//! Reference-counted tracking of held pointer buttons, exposed as the packed
//! bit field the wire report carries. Overlapping increments from multiple
//! logical sources are supported; a button's report bit is set iff its
//! counter is nonzero.

use parking_lot::Mutex;

use crate::types::PointingButton;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Increase,
    Decrease,
}

/// Per-button reference counts behind a single lock.
#[derive(Default)]
pub struct PointingButtonState {
    counts: Mutex<[u32; PointingButton::ALL.len()]>,
}

impl PointingButtonState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn manipulate(&self, button: PointingButton, operation: Operation) {
        let mut counts = self.counts.lock();
        let count = &mut counts[button as usize];
        match operation {
            Operation::Increase => *count += 1,
            Operation::Decrease => *count = count.saturating_sub(1),
        }
    }

    /// Packed button bit field; bit ordering matches the wire report's
    /// button-byte layout.
    pub fn report_bits(&self) -> u32 {
        let counts = self.counts.lock();
        let mut bits = 0;
        for button in PointingButton::ALL {
            if counts[*button as usize] > 0 {
                bits |= button.bit();
            }
        }
        bits
    }

    /// Zero all counters, returning the prior bit field so the caller can
    /// decide whether a zero-state report still needs to be flushed.
    pub fn reset(&self) -> u32 {
        let mut counts = self.counts.lock();
        let mut bits = 0;
        for button in PointingButton::ALL {
            if counts[*button as usize] > 0 {
                bits |= button.bit();
            }
        }
        *counts = [0; PointingButton::ALL.len()];
        bits
    }
}
