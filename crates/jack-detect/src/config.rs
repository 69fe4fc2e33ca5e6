//! Board configuration and codec identity.
//!
//! [`JackConfig`] carries the board-specific tuning that the detection
//! engine cannot discover from the codec: button resistor ladder, polarity
//! switching, timing and the optional detection variants. [`Codec`]
//! identifies the silicon, from which the analog block revisions are derived.

use platform::{Key, MicBiasSource};

use crate::error::ConfigError;
use crate::levels::{level_for_max, MAX_MICD_RANGE};
use crate::state::DetectionState;

/// Default time the microphone state waits before giving up, in ms.
pub const DEFAULT_MICD_TIMEOUT_MS: u32 = 2000;

/// Short-circuit threshold used when none is configured, in ohms.
pub const DEFAULT_SHORT_CIRCUIT_OHMS: u32 = 4;

/// Headphone loads at or below this are driven with the low-impedance patch.
pub const HP_LOW_IMPEDANCE_LIMIT: u32 = 13;

/// Maximum number of polarity modes.
pub const MAX_MICD_MODES: usize = 4;

/// One button range: a ladder resistance and the key it reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MicdRange {
    /// Highest resistance (ohms) that still selects this button.
    pub max_ohms: u32,
    /// Key reported while the button is held.
    pub key: Key,
}

/// One jack polarity configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MicdMode {
    /// Swap the accessory detect sense and ground contacts (`ACCDET_SRC`).
    pub src: bool,
    /// Bias number: 0 = MICVDD, 1..=3 = MICBIAS1..3.
    pub bias: u8,
    /// Level driven on the external polarity switch GPIO.
    pub gpio: bool,
}

/// Which headphone channel is measured after mic detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HpdetChannel {
    /// HPL
    #[default]
    Left,
    /// HPR
    Right,
}

const DEFAULT_RANGES: [MicdRange; 6] = [
    MicdRange { max_ohms: 11, key: Key::Btn0 },
    MicdRange { max_ohms: 28, key: Key::Btn1 },
    MicdRange { max_ohms: 54, key: Key::Btn2 },
    MicdRange { max_ohms: 100, key: Key::Btn3 },
    MicdRange { max_ohms: 186, key: Key::Btn4 },
    MicdRange { max_ohms: 430, key: Key::Btn5 },
];

const DEFAULT_MODES: [MicdMode; 2] = [
    MicdMode { src: true, bias: 1, gpio: false },
    MicdMode { src: false, bias: 2, gpio: true },
];

/// Jack detection configuration.
///
/// `Default` gives the standard CTIA/OMTP setup: two polarity modes on
/// MICBIAS1/MICBIAS2, six button ranges and a 2 s microphone timeout.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct JackConfig {
    /// Microphone detection timeout in ms (0 selects the default).
    pub micd_timeout_ms: u32,
    /// Debounce applied to MICDET interrupts while detecting, in ms.
    pub micd_detect_debounce_ms: u32,
    /// MICD_BIAS_STARTTIME field value (0 leaves the hardware default).
    pub micd_bias_start_time: u32,
    /// MICD_RATE field value (0 leaves the hardware default).
    pub micd_rate: u32,
    /// MICD_DBTIME field value (0 leaves the hardware default).
    pub micd_dbtime: u32,
    /// Keep the mic bias forced on after each pulse.
    pub micd_force_micbias: bool,
    /// Keep the mic bias forced on only during initial detection.
    pub micd_force_micbias_initial: bool,
    /// Read the raw ADC and classify in software during initial detection.
    pub micd_software_compare: bool,
    /// Mic state reported when the mic contact reads open circuit.
    pub micd_open_circuit_declare: bool,
    /// Button ranges, ascending by `max_ohms`.
    pub micd_ranges: heapless::Vec<MicdRange, MAX_MICD_RANGE>,
    /// Polarity modes tried in order during mic detection.
    pub micd_modes: heapless::Vec<MicdMode, MAX_MICD_MODES>,
    /// Headphone loads at or below this are treated as shorted (0 selects 4 Ω).
    pub hpdet_short_circuit_ohms: u32,
    /// Run a moisture check first; loads at or above this are ignored.
    pub hpdet_moisture_ohms: Option<u32>,
    /// Channel measured after mic detection.
    pub hpdet_channel: HpdetChannel,
    /// Identify the accessory with the headphone detect block.
    pub hpdet_acc_id: bool,
    /// Measure the first accessory-ID reading instead of assuming 32 Ω.
    pub hpdet_acc_id_line: bool,
    /// A GPIO is available to switch the mic contact into HPDET.
    pub hpdet_id_gpio: bool,
    /// External series resistance subtracted from every HPDET reading.
    pub hpdet_ext_res_ohms: u32,
    /// Skip headphone measurement and assume this load.
    pub fixed_hpdet_ohms: Option<u32>,
    /// Override the state entered on insertion.
    pub custom_initial_state: Option<DetectionState>,
    /// Jack switch reads low when a plug is present.
    pub jd_invert: bool,
    /// Detect the jack through the mic clamp comparator and GPIO5.
    pub jd_gpio5: bool,
    /// Disable the GPIO5 pull-up.
    pub jd_gpio5_nopull: bool,
    /// Delay before starting mic detection after insertion, in ms.
    pub init_mic_delay_ms: u32,
    /// GP_SWITCH_1 mode (0 leaves the hardware default).
    pub gpsw: u32,
}

impl Default for JackConfig {
    fn default() -> Self {
        Self {
            micd_timeout_ms: 0,
            micd_detect_debounce_ms: 0,
            micd_bias_start_time: 0,
            micd_rate: 0,
            micd_dbtime: 0,
            micd_force_micbias: false,
            micd_force_micbias_initial: false,
            micd_software_compare: false,
            micd_open_circuit_declare: false,
            micd_ranges: DEFAULT_RANGES.iter().copied().collect(),
            micd_modes: DEFAULT_MODES.iter().copied().collect(),
            hpdet_short_circuit_ohms: 0,
            hpdet_moisture_ohms: None,
            hpdet_channel: HpdetChannel::Left,
            hpdet_acc_id: false,
            hpdet_acc_id_line: false,
            hpdet_id_gpio: false,
            hpdet_ext_res_ohms: 0,
            fixed_hpdet_ohms: None,
            custom_initial_state: None,
            jd_invert: false,
            jd_gpio5: false,
            jd_gpio5_nopull: false,
            init_mic_delay_ms: 0,
            gpsw: 0,
        }
    }
}

impl JackConfig {
    /// Check ranges and modes.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.micd_modes.is_empty() {
            return Err(ConfigError::NoPolarityModes);
        }
        for mode in &self.micd_modes {
            if MicBiasSource::from_index(mode.bias).is_none() {
                return Err(ConfigError::UnsupportedBias(mode.bias));
            }
        }
        if self.micd_ranges.len() > MAX_MICD_RANGE {
            return Err(ConfigError::TooManyRanges);
        }
        if self
            .micd_ranges
            .windows(2)
            .any(|pair| matches!(pair, [a, b] if a.max_ohms > b.max_ohms))
        {
            return Err(ConfigError::UnsortedRanges);
        }
        for range in &self.micd_ranges {
            if level_for_max(range.max_ohms).is_none() {
                return Err(ConfigError::UnsupportedLevel(range.max_ohms));
            }
        }
        Ok(())
    }

    /// Microphone timeout with the default applied.
    pub fn micd_timeout(&self) -> u32 {
        if self.micd_timeout_ms == 0 {
            DEFAULT_MICD_TIMEOUT_MS
        } else {
            self.micd_timeout_ms
        }
    }

    /// Short-circuit threshold, kept below the low-impedance limit.
    pub fn short_circuit_ohms(&self) -> u32 {
        match self.hpdet_short_circuit_ohms {
            0 => DEFAULT_SHORT_CIRCUIT_OHMS,
            ohms if ohms >= HP_LOW_IMPEDANCE_LIMIT => HP_LOW_IMPEDANCE_LIMIT.saturating_sub(1),
            ohms => ohms,
        }
    }

    /// Bias feeding the microphone in the first polarity mode.
    pub(crate) fn primary_bias(&self) -> MicBiasSource {
        self.micd_modes
            .first()
            .and_then(|mode| MicBiasSource::from_index(mode.bias))
            .unwrap_or(MicBiasSource::Micvdd)
    }

    /// `ACCDET_SRC` bits of the first polarity mode.
    pub(crate) fn primary_src(&self) -> u32 {
        match self.micd_modes.first() {
            Some(mode) if mode.src => crate::registers::ACCDET_SRC,
            _ => 0,
        }
    }
}

/// Codec family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CodecKind {
    /// WM5102
    Wm5102,
    /// WM5110
    Wm5110,
    /// WM8280
    Wm8280,
    /// WM8998
    Wm8998,
    /// WM1814
    Wm1814,
}

impl CodecKind {
    /// Stable name for log output.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Wm5102 => "WM5102",
            Self::Wm5110 => "WM5110",
            Self::Wm8280 => "WM8280",
            Self::Wm8998 => "WM8998",
            Self::Wm1814 => "WM1814",
        }
    }
}

/// Headphone detect IP revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HpdetIp {
    /// Direct ohms readout
    Rev0,
    /// DAC value with per-range conversion factors
    RevB,
    /// Half-ohm readout with min/max ranges
    RevC,
}

/// Codec identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Codec {
    /// Family
    pub kind: CodecKind,
    /// Silicon revision (0 = rev A)
    pub revision: u8,
}

/// Analog block features derived from [`Codec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Capabilities {
    /// Rev-A MICD needs the test-key workaround around every start / stop.
    pub micd_reva: bool,
    /// Mic clamp comparator available.
    pub micd_clamp: bool,
    /// Headphone detect revision.
    pub hpdet_ip: HpdetIp,
}

impl Codec {
    /// Derive analog capabilities from family and revision.
    pub const fn capabilities(&self) -> Capabilities {
        let none = Capabilities {
            micd_reva: false,
            micd_clamp: false,
            hpdet_ip: HpdetIp::Rev0,
        };
        match (self.kind, self.revision) {
            (CodecKind::Wm5102, 0) => Capabilities {
                micd_reva: true,
                ..none
            },
            (CodecKind::Wm5102, _) => Capabilities {
                micd_clamp: true,
                hpdet_ip: HpdetIp::RevB,
                ..none
            },
            (CodecKind::Wm5110 | CodecKind::Wm8280, 0..=2) => none,
            (CodecKind::Wm5110 | CodecKind::Wm8280, _)
            | (CodecKind::Wm8998 | CodecKind::Wm1814, _) => Capabilities {
                micd_clamp: true,
                hpdet_ip: HpdetIp::RevC,
                ..none
            },
        }
    }
}
