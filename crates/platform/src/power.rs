//! Supply abstractions: MICVDD regulator and microphone bias
//!
//! The headset microphone is powered from one of the codec's MICBIAS
//! generators, which in turn run from the MICVDD charge pump / LDO. While a
//! measurement is in progress MICVDD must be regulated; otherwise it may be
//! put in bypass to save power.

/// Switchable regulator with an optional bypass mode.
pub trait Regulator {
    /// Error type
    type Error: core::fmt::Debug;

    /// Enable the supply.
    fn enable(&mut self) -> Result<(), Self::Error>;

    /// Drop one enable reference.
    fn disable(&mut self) -> Result<(), Self::Error>;

    /// Allow (or forbid) the regulator to bypass its output stage.
    fn allow_bypass(&mut self, allow: bool) -> Result<(), Self::Error>;
}

/// Which bias generator feeds the microphone.
///
/// Platform data encodes these as 1..=3 for MICBIAS1..3 and 0 for MICVDD.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MicBiasSource {
    /// MICVDD directly (no bias generator)
    Micvdd,
    /// MICBIAS1
    MicBias1,
    /// MICBIAS2
    MicBias2,
    /// MICBIAS3
    MicBias3,
}

impl MicBiasSource {
    /// Decode the platform-data bias number. Out-of-range numbers are rejected.
    pub const fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Self::Micvdd),
            1 => Some(Self::MicBias1),
            2 => Some(Self::MicBias2),
            3 => Some(Self::MicBias3),
            _ => None,
        }
    }

    /// Platform-data bias number.
    pub const fn index(self) -> u8 {
        match self {
            Self::Micvdd => 0,
            Self::MicBias1 => 1,
            Self::MicBias2 => 2,
            Self::MicBias3 => 3,
        }
    }
}

/// Microphone bias control.
pub trait MicBias {
    /// Error type
    type Error: core::fmt::Debug;

    /// Force the bias on regardless of audio path demand.
    fn force_enable(&mut self, source: MicBiasSource) -> Result<(), Self::Error>;

    /// Release a forced bias.
    fn disable(&mut self, source: MicBiasSource) -> Result<(), Self::Error>;
}
