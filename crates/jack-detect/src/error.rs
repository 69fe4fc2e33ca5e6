//! Error types.

use thiserror::Error;

/// Jack detection errors.
///
/// None of these are fatal: a failed sample leaves the current detection
/// state in place and the next interrupt is handled normally. Only
/// [`JackError::Config`] aborts construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum JackError {
    /// Codec register read or write failed
    #[error("codec register access failed")]
    Bus,
    /// Detection status was not valid
    #[error("detection status invalid")]
    InvalidMeasurement,
    /// Polarity or ID GPIO could not be driven
    #[error("GPIO write failed")]
    Gpio,
    /// MICVDD or mic bias control failed
    #[error("supply control failed")]
    Supply,
    /// Interrupt arrived while no matching detection was running
    #[error("interrupt arrived in the wrong detection mode")]
    Spurious,
    /// Headphone measurement skipped: impedance fixed by configuration
    #[error("headphone impedance fixed by configuration")]
    FixedImpedance,
    /// Entry point called from inside an accessory callback
    #[error("jack detection re-entered")]
    Busy,
    /// Configuration rejected at construction
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Configuration errors, reported by [`JackConfig::validate`](crate::JackConfig::validate).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Button ranges must be sorted by ascending `max_ohms`
    #[error("button ranges must be sorted")]
    UnsortedRanges,
    /// More button ranges than level slots
    #[error("too many button ranges")]
    TooManyRanges,
    /// A range maximum is above the highest button level
    #[error("unsupported button level {0} ohms")]
    UnsupportedLevel(u32),
    /// At least one polarity mode is required
    #[error("no polarity modes configured")]
    NoPolarityModes,
    /// Polarity mode bias number is not MICVDD or MICBIAS1..3
    #[error("unsupported mic bias {0}")]
    UnsupportedBias(u8),
}
