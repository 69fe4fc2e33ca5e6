//! Headset button edge tracking.
//!
//! Buttons are identified by their range slot. Only edges reach the sink:
//! reporting the button that is already held is a no-op, and releasing
//! with nothing held reports nothing.

use platform::AccessorySink;

use crate::config::MicdRange;

/// Pressed state of every button range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ButtonReporter {
    pressed: u8,
}

impl ButtonReporter {
    /// No button held.
    pub const fn new() -> Self {
        Self { pressed: 0 }
    }

    /// Whether range `slot` is held.
    pub fn is_pressed(&self, slot: usize) -> bool {
        slot_bit(slot).is_some_and(|bit| self.pressed & bit != 0)
    }

    /// Whether any button is held.
    pub const fn any_pressed(&self) -> bool {
        self.pressed != 0
    }

    /// Hold range `slot` and release every other button.
    pub fn press<S: AccessorySink>(&mut self, sink: &mut S, ranges: &[MicdRange], slot: usize) {
        let Some(bit) = slot_bit(slot) else {
            return;
        };
        self.release_matching(sink, ranges, !bit);
        if self.pressed & bit == 0 {
            if let Some(range) = ranges.get(slot) {
                debug!("Key {} pressed", range.key.name());
                sink.report_key(range.key, true);
                self.pressed |= bit;
            }
        }
    }

    /// Release every held button.
    pub fn release_all<S: AccessorySink>(&mut self, sink: &mut S, ranges: &[MicdRange]) {
        self.release_matching(sink, ranges, u8::MAX);
    }

    fn release_matching<S: AccessorySink>(&mut self, sink: &mut S, ranges: &[MicdRange], mask: u8) {
        for (slot, range) in ranges.iter().enumerate() {
            let Some(bit) = slot_bit(slot) else {
                break;
            };
            if self.pressed & bit & mask != 0 {
                debug!("Key {} released", range.key.name());
                sink.report_key(range.key, false);
                self.pressed &= !bit;
            }
        }
    }
}

fn slot_bit(slot: usize) -> Option<u8> {
    u32::try_from(slot)
        .ok()
        .and_then(|shift| 1u8.checked_shl(shift))
}
