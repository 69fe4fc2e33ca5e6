//! Impedance classification.
//!
//! Two independent conversions:
//!
//! - MICD: hardware status words ([`MicdStatus`]) are used as-is; the
//!   software-compare path turns a raw ADC code into the same status encoding
//!   through [`classify_adc_code`], so downstream code handles both alike.
//! - HPDET: raw headphone-detect results are converted to ohms by
//!   [`classify_hp_impedance`], which also decides when the hardware must
//!   move to a higher impedance range and measure again.

use crate::config::HpdetIp;
use crate::levels::ohms_for_code;
use crate::registers::{
    micd_lvl, HP_DACVAL_MASK, HP_LVL_B_MASK, HP_LVL_MASK, MICDET_ADCVAL_MASK, MICD_LVL_0_TO_7,
    MICD_LVL_0_TO_8, MICD_LVL_1_TO_7, MICD_LVL_MASK, MICD_LVL_SHIFT, MICD_STS, MICD_VALID,
};

/// Highest impedance HPDET reports; also the out-of-range sentinel.
pub const HPDET_MAX_OHMS: u32 = 10_000;

/// Impedance reported to the sink for an open jack.
pub const HP_Z_OPEN: u32 = 0x7FFF;

/// Mic contact at or below this is a plain headphone (sleeve shorted).
pub const QUICK_HEADPHONE_MAX_OHM: u32 = 3;
/// Highest impedance still read as a low-impedance (wrong polarity) load.
pub const MICROPHONE_MIN_OHM: u32 = 1257;
/// Highest impedance read as a microphone.
pub const MICROPHONE_MAX_OHM: u32 = 30_000;

/// Mic detect status word (`MIC_DETECT_3` layout).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MicdStatus(pub u32);

impl MicdStatus {
    /// Accessory present on the mic contact.
    pub const fn present(self) -> bool {
        self.0 & MICD_STS != 0
    }

    /// Hardware marked the status as valid.
    pub const fn valid(self) -> bool {
        self.0 & MICD_VALID != 0
    }

    /// Any of `LVL_0` .. `LVL_8` set.
    pub const fn has_level(self) -> bool {
        self.0 & MICD_LVL_0_TO_8 != 0
    }

    /// A button level (`LVL_0` .. `LVL_7`) is set.
    pub const fn has_button_level(self) -> bool {
        self.0 & MICD_LVL_0_TO_7 != 0
    }

    /// Low impedance on the mic contact (`LVL_1` .. `LVL_7`).
    pub const fn is_low_impedance(self) -> bool {
        self.0 & MICD_LVL_1_TO_7 != 0
    }

    /// Microphone impedance (`LVL_8`).
    pub const fn is_high_impedance(self) -> bool {
        self.0 & micd_lvl(8) != 0
    }

    /// Level bits shifted down so bit `n` is `LVL_n`.
    pub const fn levels(self) -> u32 {
        (self.0 & MICD_LVL_MASK) >> MICD_LVL_SHIFT
    }

    /// Index of the lowest set level, if any.
    pub const fn button_index(self) -> Option<u32> {
        let levels = self.levels();
        if levels == 0 {
            None
        } else {
            Some(levels.trailing_zeros())
        }
    }
}

/// Synthetic mic contact buckets produced by the software-compare path,
/// ordered by impedance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MicBucket {
    /// Sleeve shorted: plain headphone
    QuickHeadphone,
    /// Low impedance: polarity probably reversed
    LowImpedance,
    /// Microphone
    Microphone,
    /// Nothing on the mic contact
    Open,
}

impl MicBucket {
    /// Status word the hardware would have reported for this bucket.
    pub const fn status(self) -> MicdStatus {
        match self {
            Self::QuickHeadphone => MicdStatus(MICD_STS | micd_lvl(0)),
            Self::LowImpedance => MicdStatus(MICD_STS | micd_lvl(1)),
            Self::Microphone => MicdStatus(MICD_STS | micd_lvl(8)),
            Self::Open => MicdStatus(micd_lvl(8)),
        }
    }

    /// Stable name for log output.
    pub const fn name(self) -> &'static str {
        match self {
            Self::QuickHeadphone => "quick-headphone",
            Self::LowImpedance => "low-impedance",
            Self::Microphone => "microphone",
            Self::Open => "open",
        }
    }
}

/// Bucket for a mic contact impedance.
pub const fn bucket_for_ohms(ohms: u32) -> MicBucket {
    if ohms <= QUICK_HEADPHONE_MAX_OHM {
        MicBucket::QuickHeadphone
    } else if ohms <= MICROPHONE_MIN_OHM {
        MicBucket::LowImpedance
    } else if ohms <= MICROPHONE_MAX_OHM {
        MicBucket::Microphone
    } else {
        MicBucket::Open
    }
}

/// Classify a raw `MIC_DETECT_4` ADC code.
pub fn classify_adc_code(raw: u32) -> (MicBucket, MicdStatus) {
    let bucket = bucket_for_ohms(ohms_for_code(raw & MICDET_ADCVAL_MASK));
    (bucket, bucket.status())
}

/// Revision B range: valid readings are `threshold..RANGE_B_MAX`.
#[derive(Debug, Clone, Copy)]
struct RangeB {
    threshold: u32,
    factor_a: u32,
    factor_b: u32,
}

const RANGES_B: [RangeB; 3] = [
    RangeB { threshold: 100, factor_a: 5528, factor_b: 362_464 },
    RangeB { threshold: 169, factor_a: 11084, factor_b: 6_186_851 },
    RangeB { threshold: 169, factor_a: 11065, factor_b: 65_460_395 },
];

/// Upper bound (exclusive) of a valid revision B DAC value.
pub const RANGE_B_MAX: u32 = 0x3FB;

/// Revision C range in ohms.
#[derive(Debug, Clone, Copy)]
struct RangeC {
    min: u32,
    max: u32,
}

const RANGES_C: [RangeC; 4] = [
    RangeC { min: 0, max: 30 },
    RangeC { min: 8, max: 100 },
    RangeC { min: 100, max: 1000 },
    RangeC { min: 1000, max: 10_000 },
];

/// Result of one headphone impedance conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HpImpedance {
    /// Impedance in ohms, before external resistor compensation
    Ohms(u32),
    /// Reading outside the active range: measure again in range `next`
    Rerange(u32),
    /// Top range exhausted; reported as [`HPDET_MAX_OHMS`] without compensation
    OutOfRange,
}

/// Number of impedance ranges for a headphone detect revision.
pub const fn range_count(ip: HpdetIp) -> u32 {
    match ip {
        HpdetIp::Rev0 => 1,
        HpdetIp::RevB => 3,
        HpdetIp::RevC => 4,
    }
}

/// Convert a raw headphone detect value measured in `range`.
///
/// `raw` is the `HEADPHONE_DETECT_2` level (revisions 0 and C) or the
/// `HP_DACVAL` value (revision B).
pub fn classify_hp_impedance(raw: u32, ip: HpdetIp, range: u32) -> HpImpedance {
    match ip {
        HpdetIp::Rev0 => HpImpedance::Ohms(raw & HP_LVL_MASK),
        HpdetIp::RevB => classify_rev_b(raw & HP_DACVAL_MASK, range),
        HpdetIp::RevC => classify_rev_c(raw, range),
    }
}

fn classify_rev_b(val: u32, range: u32) -> HpImpedance {
    let Some(params) = usize::try_from(range).ok().and_then(|r| RANGES_B.get(r)) else {
        return HpImpedance::OutOfRange;
    };
    let out_of_bounds = val < params.threshold || val >= RANGE_B_MAX;
    if out_of_bounds {
        if range.saturating_add(1) < range_count(HpdetIp::RevB) {
            return HpImpedance::Rerange(range.saturating_add(1));
        }
        return HpImpedance::OutOfRange;
    }
    val.checked_mul(100)
        .and_then(|scaled| scaled.checked_sub(params.factor_a))
        .and_then(|denominator| params.factor_b.checked_div(denominator))
        .map_or(HpImpedance::OutOfRange, HpImpedance::Ohms)
}

fn classify_rev_c(raw: u32, range: u32) -> HpImpedance {
    let Some(params) = usize::try_from(range).ok().and_then(|r| RANGES_C.get(r)) else {
        return HpImpedance::OutOfRange;
    };
    // Half-ohm steps.
    let ohms = (raw & HP_LVL_B_MASK) / 2;
    if ohms >= params.max && range.saturating_add(1) < range_count(HpdetIp::RevC) {
        return HpImpedance::Rerange(range.saturating_add(1));
    }
    if range > 0 && ohms < params.min {
        return HpImpedance::Ohms(params.min);
    }
    HpImpedance::Ohms(ohms)
}

/// Subtract an external series resistor.
///
/// A resistor at or above the measurement means the reading is not
/// trustworthy; it is logged and returned unchanged.
pub fn compensate_ext_res(ohms: u32, ext_res: u32) -> u32 {
    if ext_res == 0 {
        return ohms;
    }
    match ohms.checked_sub(ext_res) {
        Some(compensated) if compensated > 0 => {
            debug!("Compensating for external {} ohm resistor", ext_res);
            compensated
        }
        _ => {
            error!("External resistor ({}) >= measurement ({})", ext_res, ohms);
            ohms
        }
    }
}
