//! Accessory event sink
//!
//! The detection engine never talks to an input subsystem directly. Every
//! classification, key edge and measurement goes through [`AccessorySink`],
//! which a board implements on top of its own event plumbing (an embassy
//! channel, a UI model, a USB HID report, ...).

use crate::input::Key;

/// What is plugged into the jack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HeadsetState {
    /// Jack empty
    #[default]
    NoHeadset = 0,
    /// Headphones with microphone
    Headset = 1,
    /// Headphones only (or line load)
    HeadsetNoMic = 2,
}

impl HeadsetState {
    /// Stable name for log output.
    pub const fn name(self) -> &'static str {
        match self {
            Self::NoHeadset => "no-headset",
            Self::Headset => "headset",
            Self::HeadsetNoMic => "headset-no-mic",
        }
    }
}

/// Receiver of accessory events.
///
/// Calls arrive with the detection lock held; implementations must not call
/// back into the detection controller.
pub trait AccessorySink {
    /// Jack classification changed.
    fn report_state(&mut self, state: HeadsetState);

    /// Headset button edge.
    fn report_key(&mut self, key: Key, pressed: bool);

    /// A batch of `report_key` calls is complete.
    fn sync(&mut self) {}

    /// Measured headphone impedance in ohms (`0x7FFF` means open circuit).
    fn hp_impedance(&mut self, _ohms: u32) {}

    /// Microphone detection result.
    fn mic_detected(&mut self, _present: bool) {}
}

impl<T: AccessorySink + ?Sized> AccessorySink for &mut T {
    fn report_state(&mut self, state: HeadsetState) {
        (**self).report_state(state);
    }

    fn report_key(&mut self, key: Key, pressed: bool) {
        (**self).report_key(key, pressed);
    }

    fn sync(&mut self) {
        (**self).sync();
    }

    fn hp_impedance(&mut self, ohms: u32) {
        (**self).hp_impedance(ohms);
    }

    fn mic_detected(&mut self, present: bool) {
        (**self).mic_detected(present);
    }
}
