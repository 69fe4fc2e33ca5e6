//! MICD level table and button threshold slot programming.
//!
//! The mic detect comparator compares the mic contact against up to eight
//! programmable thresholds ("slots"). Each slot holds a 6-bit code indexing
//! [`MICD_LEVELS`]. Slots live two per register, even slots in the high byte:
//!
//! ```text
//! LEVEL_4: [slot 0 | slot 1]   LEVEL_3: [slot 2 | slot 3]
//! LEVEL_2: [slot 4 | slot 5]   LEVEL_1: [slot 6 | slot 7]
//! ```

use platform::RegisterMap;

use crate::config::MicdRange;
use crate::error::JackError;
use crate::registers::{
    MIC_DETECT_2, MIC_DETECT_LEVEL_1, MIC_DETECT_LEVEL_2, MIC_DETECT_LEVEL_3, MIC_DETECT_LEVEL_4,
    MICD_LVL_SEL_DEFAULT, MICD_LVL_SEL_MASK,
};

/// Ohm value of each MICD level code, ascending. The last entry is the
/// microphone ceiling and is not usable as a button threshold.
pub const MICD_LEVELS: [u32; 65] = [
    3, 6, 8, 11, 13, 16, 18, 21, 23, 26, 28, 31, 34, 36, 39, 41, 44, 46, 49, 52, 54, 57, 60, 62,
    65, 67, 70, 73, 75, 78, 81, 83, 89, 94, 100, 105, 111, 116, 122, 127, 139, 150, 161, 173, 186,
    196, 209, 220, 245, 270, 295, 321, 348, 375, 402, 430, 489, 550, 614, 681, 752, 903, 1071,
    1257, 30000,
];

/// Number of [`MICD_LEVELS`] entries valid as button thresholds.
pub const NUM_BUTTON_LEVELS: usize = 64;

/// Number of button threshold slots.
pub const MAX_MICD_RANGE: usize = 8;

/// Code written to slots with no button assigned.
pub const UNUSED_SLOT_CODE: u32 = 0x3F;

const SLOT_REGISTERS: [u32; 4] = [
    MIC_DETECT_LEVEL_4,
    MIC_DETECT_LEVEL_3,
    MIC_DETECT_LEVEL_2,
    MIC_DETECT_LEVEL_1,
];

/// Ohms for an ADC / level code, `u32::MAX` past the end of the table.
pub fn ohms_for_code(code: u32) -> u32 {
    usize::try_from(code)
        .ok()
        .and_then(|i| MICD_LEVELS.get(i))
        .copied()
        .unwrap_or(u32::MAX)
}

/// Smallest button level whose ohms reach `max_ohms`.
pub fn level_for_max(max_ohms: u32) -> Option<usize> {
    MICD_LEVELS
        .iter()
        .take(NUM_BUTTON_LEVELS)
        .position(|&ohms| ohms >= max_ohms)
}

/// Register, mask and shift holding threshold slot `index`.
pub fn slot_location(index: usize) -> Option<(u32, u32, u32)> {
    let reg = *SLOT_REGISTERS.get(index / 2)?;
    if index % 2 == 0 {
        Some((reg, 0x3F00, 8))
    } else {
        Some((reg, 0x003F, 0))
    }
}

fn set_slot<R: RegisterMap>(regmap: &mut R, index: usize, code: u32) -> Result<(), JackError> {
    let (reg, mask, shift) = slot_location(index).ok_or(JackError::InvalidMeasurement)?;
    regmap
        .update_bits(reg, mask, code.wrapping_shl(shift))
        .map_err(|_| JackError::Bus)
}

/// Program one threshold slot per range, disable the rest.
///
/// Ranges must already be validated (ascending, representable).
pub fn program_button_levels<R: RegisterMap>(
    regmap: &mut R,
    ranges: &[MicdRange],
) -> Result<(), JackError> {
    regmap
        .update_bits(MIC_DETECT_2, MICD_LVL_SEL_MASK, MICD_LVL_SEL_DEFAULT)
        .map_err(|_| JackError::Bus)?;

    for (index, range) in ranges.iter().enumerate().take(MAX_MICD_RANGE) {
        let level = level_for_max(range.max_ohms).ok_or(crate::error::ConfigError::UnsupportedLevel(
            range.max_ohms,
        ))?;
        debug!("{} ohms for MICD threshold {}", MICD_LEVELS.get(level).copied().unwrap_or(0), index);
        #[allow(clippy::cast_possible_truncation)] // level < 64
        set_slot(regmap, index, level as u32)?;
        let enable = 1u32.wrapping_shl(index as u32);
        regmap
            .update_bits(MIC_DETECT_2, enable, enable)
            .map_err(|_| JackError::Bus)?;
    }

    for index in ranges.len()..MAX_MICD_RANGE {
        set_slot(regmap, index, UNUSED_SLOT_CODE)?;
    }
    Ok(())
}

/// Read back the code held by every threshold slot.
pub fn read_button_levels<R: RegisterMap>(
    regmap: &mut R,
) -> Result<[u32; MAX_MICD_RANGE], JackError> {
    let mut codes = [0u32; MAX_MICD_RANGE];
    for (index, code) in codes.iter_mut().enumerate() {
        let (reg, mask, shift) = slot_location(index).ok_or(JackError::InvalidMeasurement)?;
        let val = regmap.read(reg).map_err(|_| JackError::Bus)?;
        *code = (val & mask).wrapping_shr(shift);
    }
    Ok(codes)
}
