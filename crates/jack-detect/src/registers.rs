//! Arizona register addresses and field definitions used by jack detection.
//!
//! Reference: WM5102 / WM5110 / WM8998 datasheets, register map sections
//! "Accessory detect", "Headphone detect", "Mic detect" and "Always-on
//! domain". Only the fields touched by the detection engine are listed.

/// Output enables: headphone output stages.
pub const OUTPUT_ENABLES_1: u32 = 0x400;
/// OUT1L output stage enable.
pub const OUT1L_ENA: u32 = 0x0002;
/// OUT1R output stage enable.
pub const OUT1R_ENA: u32 = 0x0001;

/// HP1L output driver control.
pub const HP_CTRL_1L: u32 = 0x225;
/// HP1R output driver control.
pub const HP_CTRL_1R: u32 = 0x226;
/// Remove the HP1 output short (WM5102 clamp).
pub const RMV_SHRT_HP1L: u32 = 0x4000;
/// HP1 output follower enable (WM5110 / WM8280 clamp).
pub const HP1L_FLWR: u32 = 0x0004;
/// HP1 input short (WM5110 / WM8280 clamp).
pub const HP1L_SHRTI: u32 = 0x0002;
/// HP1 output short (WM5110 / WM8280 clamp).
pub const HP1L_SHRTO: u32 = 0x0001;

/// Accessory detect mode.
pub const ACCESSORY_DETECT_MODE_1: u32 = 0x293;
/// Accessory detect source select (swaps the sense / ground contacts).
pub const ACCDET_SRC: u32 = 0x2000;
/// Accessory detect mode field.
pub const ACCDET_MODE_MASK: u32 = 0x0007;

/// Rev-A MICD workaround register, written through the test key.
pub const MICD_REVA_PATCH: u32 = 0x294;
/// Test key register.
pub const TEST_KEY: u32 = 0x80;
/// Test key value unlocking [`MICD_REVA_PATCH`].
pub const TEST_KEY_UNLOCK: u32 = 0x3;

/// Headphone detect control.
pub const HEADPHONE_DETECT_1: u32 = 0x29B;
/// Impedance range select field.
pub const HP_IMPEDANCE_RANGE_MASK: u32 = 0x0600;
/// Impedance range select shift.
pub const HP_IMPEDANCE_RANGE_SHIFT: u32 = 9;
/// Start a headphone measurement.
pub const HP_POLL: u32 = 0x0001;

/// Headphone detect result.
pub const HEADPHONE_DETECT_2: u32 = 0x29C;
/// Measurement complete (IP revision 0).
pub const HP_DONE: u32 = 0x0080;
/// Result in ohms (IP revision 0).
pub const HP_LVL_MASK: u32 = 0x007F;
/// Measurement complete (IP revisions B and C).
pub const HP_DONE_B: u32 = 0x8000;
/// Result in half-ohm steps (IP revision C).
pub const HP_LVL_B_MASK: u32 = 0x7FFF;

/// Headphone detect DAC value (IP revision B).
pub const HP_DACVAL: u32 = 0x29F;
/// DAC value field.
pub const HP_DACVAL_MASK: u32 = 0x03FF;

/// Mic detect clamp control.
pub const MICD_CLAMP_CONTROL: u32 = 0x2A2;
/// Clamp mode field.
pub const MICD_CLAMP_MODE_MASK: u32 = 0x000F;
/// Clamp active while JD1 is low.
pub const MICD_CLAMP_MODE_JDL: u32 = 0x4;
/// Clamp active while JD1 is high.
pub const MICD_CLAMP_MODE_JDH: u32 = 0x5;
/// Clamp active while JD1 is low or GPIO5 is high.
pub const MICD_CLAMP_MODE_JDL_GP5H: u32 = 0x9;
/// Clamp active while JD1 is high or GPIO5 is high.
pub const MICD_CLAMP_MODE_JDH_GP5H: u32 = 0xB;

/// Mic detect control.
pub const MIC_DETECT_1: u32 = 0x2A3;
/// Bias start-up time field.
pub const MICD_BIAS_STARTTIME_MASK: u32 = 0xF000;
/// Bias start-up time shift.
pub const MICD_BIAS_STARTTIME_SHIFT: u32 = 12;
/// Detection rate field.
pub const MICD_RATE_MASK: u32 = 0x0F00;
/// Detection rate shift.
pub const MICD_RATE_SHIFT: u32 = 8;
/// Bias source field.
pub const MICD_BIAS_SRC_MASK: u32 = 0x0030;
/// Bias source shift.
pub const MICD_BIAS_SRC_SHIFT: u32 = 4;
/// Debounce time field.
pub const MICD_DBTIME_MASK: u32 = 0x0002;
/// Debounce time shift.
pub const MICD_DBTIME_SHIFT: u32 = 1;
/// Mic detect enable.
pub const MICD_ENA: u32 = 0x0001;

/// Mic detect level select (which button slots raise MICDET).
pub const MIC_DETECT_2: u32 = 0x2A4;
/// Level select field.
pub const MICD_LVL_SEL_MASK: u32 = 0x00FF;
/// Level select value with every button slot disabled.
pub const MICD_LVL_SEL_DEFAULT: u32 = 0x81;

/// Mic detect status.
pub const MIC_DETECT_3: u32 = 0x2A5;
/// Level bits LVL_0..LVL_8.
pub const MICD_LVL_MASK: u32 = 0x07FC;
/// Level bits shift.
pub const MICD_LVL_SHIFT: u32 = 2;
/// Status is valid.
pub const MICD_VALID: u32 = 0x0002;
/// Accessory present.
pub const MICD_STS: u32 = 0x0001;

/// Button threshold slots 6 and 7.
pub const MIC_DETECT_LEVEL_1: u32 = 0x2A6;
/// Button threshold slots 4 and 5.
pub const MIC_DETECT_LEVEL_2: u32 = 0x2A7;
/// Button threshold slots 2 and 3.
pub const MIC_DETECT_LEVEL_3: u32 = 0x2A8;
/// Button threshold slots 0 and 1.
pub const MIC_DETECT_LEVEL_4: u32 = 0x2A9;

/// Mic detect ADC result (software compare).
pub const MIC_DETECT_4: u32 = 0x2AB;
/// ADC value field.
pub const MICDET_ADCVAL_MASK: u32 = 0x007F;

/// General purpose switch.
pub const GP_SWITCH_1: u32 = 0x2C8;
/// Switch mode field.
pub const SW1_MODE_MASK: u32 = 0x0003;

/// Jack detect analogue control.
pub const JACK_DETECT_ANALOGUE: u32 = 0x2D3;
/// JD1 comparator enable.
pub const JD1_ENA: u32 = 0x0001;

/// HP1 short-circuit protection.
pub const HP1_SHORT_CIRCUIT_CTRL: u32 = 0x4A0;
/// Short-circuit protection enable.
pub const HP1_SC_ENA: u32 = 0x1000;

/// GPIO5 control.
pub const GPIO5_CTRL: u32 = 0xC04;
/// GPIO5 as jack-detect input: direction in, pull-up, debounce.
pub const GPIO5_JD_INPUT: u32 = 0xC101;
/// GPIO pull-up enable.
pub const GPN_PU: u32 = 0x4000;

/// Always-on wake and trigger status (write 1 to clear).
pub const AOD_WKUP_AND_TRIG: u32 = 0xD00;
/// MICD clamp falling trigger status.
pub const MICD_CLAMP_FALL_TRIG_STS: u32 = 0x0080;
/// MICD clamp rising trigger status.
pub const MICD_CLAMP_RISE_TRIG_STS: u32 = 0x0040;
/// JD1 falling trigger status.
pub const JD1_FALL_TRIG_STS: u32 = 0x0002;
/// JD1 rising trigger status.
pub const JD1_RISE_TRIG_STS: u32 = 0x0001;

/// Always-on raw interrupt status.
pub const AOD_IRQ_RAW_STATUS: u32 = 0xD0C;
/// MICD clamp comparator state.
pub const MICD_CLAMP_STS: u32 = 0x0008;
/// JD1 comparator state.
pub const JD1_STS: u32 = 0x0001;

/// Jack detect debounce control.
pub const JACK_DETECT_DEBOUNCE: u32 = 0xD0E;
/// MICD clamp debounce enable.
pub const MICD_CLAMP_DB: u32 = 0x0002;
/// JD1 debounce enable.
pub const JD1_DB: u32 = 0x0001;

/// Accessory detect hardware modes written to [`ACCDET_MODE_MASK`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AccdetMode {
    /// Mic detect
    Mic = 0,
    /// Headphone detect, left channel
    Hpl = 1,
    /// Headphone detect, right channel
    Hpr = 2,
    /// Headphone detect, mic contact
    Hpm = 4,
    /// Mic detect through the ADC (software compare)
    Adc = 7,
}

impl AccdetMode {
    /// Register field value.
    pub const fn bits(self) -> u32 {
        self as u32
    }

    /// Whether this mode measures headphone impedance.
    pub const fn is_hpdet(self) -> bool {
        matches!(self, Self::Hpl | Self::Hpr | Self::Hpm)
    }

    /// Whether this mode runs the mic detect comparator.
    pub const fn is_micd(self) -> bool {
        matches!(self, Self::Mic | Self::Adc)
    }

    /// Stable name for log output.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Mic => "MIC",
            Self::Hpl => "HPL",
            Self::Hpr => "HPR",
            Self::Hpm => "HPM",
            Self::Adc => "ADC",
        }
    }
}

/// Level bit `n` of [`MIC_DETECT_3`] (`LVL_0` .. `LVL_8`).
#[allow(clippy::arithmetic_side_effects)] // n <= 8 at every call site
pub const fn micd_lvl(n: u32) -> u32 {
    (1 << MICD_LVL_SHIFT) << n
}

/// `LVL_0` .. `LVL_7`: a button is held.
pub const MICD_LVL_0_TO_7: u32 = micd_lvl(0)
    | micd_lvl(1)
    | micd_lvl(2)
    | micd_lvl(3)
    | micd_lvl(4)
    | micd_lvl(5)
    | micd_lvl(6)
    | micd_lvl(7);
/// `LVL_1` .. `LVL_7`: low impedance on the mic contact.
pub const MICD_LVL_1_TO_7: u32 = MICD_LVL_0_TO_7 & !micd_lvl(0);
/// `LVL_0` .. `LVL_8`: any level reported.
pub const MICD_LVL_0_TO_8: u32 = MICD_LVL_0_TO_7 | micd_lvl(8);
