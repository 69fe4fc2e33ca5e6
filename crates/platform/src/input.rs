//! Key codes reported for headset buttons

/// Keys a headset button range can be mapped to.
///
/// `Btn0`..`Btn7` are the generic button codes used by the default range
/// table; the named keys let a board map ranges to media functions instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Key {
    /// Generic button 0
    Btn0,
    /// Generic button 1
    Btn1,
    /// Generic button 2
    Btn2,
    /// Generic button 3
    Btn3,
    /// Generic button 4
    Btn4,
    /// Generic button 5
    Btn5,
    /// Generic button 6
    Btn6,
    /// Generic button 7
    Btn7,
    /// Play/pause (hook) button
    Media,
    /// Volume up
    VolumeUp,
    /// Volume down
    VolumeDown,
    /// Voice assistant
    VoiceCommand,
}

impl Key {
    /// Stable name for log output.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Btn0 => "BTN_0",
            Self::Btn1 => "BTN_1",
            Self::Btn2 => "BTN_2",
            Self::Btn3 => "BTN_3",
            Self::Btn4 => "BTN_4",
            Self::Btn5 => "BTN_5",
            Self::Btn6 => "BTN_6",
            Self::Btn7 => "BTN_7",
            Self::Media => "MEDIA",
            Self::VolumeUp => "VOLUME_UP",
            Self::VolumeDown => "VOLUME_DOWN",
            Self::VoiceCommand => "VOICE_COMMAND",
        }
    }
}
