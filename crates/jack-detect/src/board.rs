//! Board resources the detection engine drives.
//!
//! A [`Board`] names the concrete driver types once so the controller can be
//! generic over a single parameter instead of six. The instances live in
//! [`Peripherals`], which the controller owns for its lifetime.

use embedded_hal::digital::OutputPin;
use platform::{AccessorySink, MicBias, RegisterMap, Regulator, WorkQueue};

/// Deferred work items.
///
/// At most one of each is pending. The owner of the [`WorkQueue`] calls
/// [`JackDetect::run_work`](crate::JackDetect::run_work) when one fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Work {
    /// Active detection state timed out
    StateTimeout,
    /// Debounce after insertion elapsed; start accessory identification
    AccIdStart,
    /// Debounce after a MICDET interrupt elapsed; sample the mic contact
    MicdDetect,
    /// Post-insertion mic delay elapsed; enter the initial detection state
    MicdStart,
}

impl Work {
    /// Every work item, in a fixed order.
    pub const ALL: [Self; 4] = [
        Self::StateTimeout,
        Self::AccIdStart,
        Self::MicdDetect,
        Self::MicdStart,
    ];

    pub(crate) const fn bit(self) -> u8 {
        match self {
            Self::StateTimeout => 0x1,
            Self::AccIdStart => 0x2,
            Self::MicdDetect => 0x4,
            Self::MicdStart => 0x8,
        }
    }

    /// Stable name for log output.
    pub const fn name(self) -> &'static str {
        match self {
            Self::StateTimeout => "state-timeout",
            Self::AccIdStart => "acc-id-start",
            Self::MicdDetect => "micd-detect",
            Self::MicdStart => "micd-start",
        }
    }
}

/// Driver types for one board.
pub trait Board {
    /// Codec register access
    type Regmap: RegisterMap;
    /// Polarity switch and accessory-ID GPIOs
    type Pin: OutputPin;
    /// MICVDD supply
    type Micvdd: Regulator;
    /// Mic bias generators
    type Bias: MicBias;
    /// Deferred work scheduler
    type Work: WorkQueue<Work>;
    /// Accessory event receiver
    type Sink: AccessorySink;
}

/// Driver instances owned by the controller.
pub struct Peripherals<B: Board> {
    /// Codec register map
    pub regmap: B::Regmap,
    /// MICVDD supply
    pub micvdd: B::Micvdd,
    /// Mic bias control
    pub micbias: B::Bias,
    /// External polarity switch, driven with each mode's `gpio` level
    pub polarity_gpio: Option<B::Pin>,
    /// Switches the mic contact into HPDET during accessory identification
    pub id_gpio: Option<B::Pin>,
    /// Deferred work scheduler
    pub work: B::Work,
    /// Accessory event receiver
    pub sink: B::Sink,
}
