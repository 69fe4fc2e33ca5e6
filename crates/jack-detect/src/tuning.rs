//! Headphone output tuning for the measured load.
//!
//! WM5110-class and WM1814 output stages carry a register patch for low
//! impedance loads. The patch is only rewritten when the load crosses the
//! threshold, so repeated measurements of the same headphone are free.

use platform::RegisterMap;

use crate::config::{CodecKind, HP_LOW_IMPEDANCE_LIMIT};
use crate::registers::{HP1_SC_ENA, HP1_SHORT_CIRCUIT_CTRL};

/// Patch currently applied to the headphone output stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ImpedanceLevel {
    /// Normal loads (power-on state)
    #[default]
    Normal,
    /// Loads at or below the low-impedance limit
    Low,
}

/// WM1814 switches to the low patch below this load, in ohms.
const WM1814_LOW_IMPEDANCE_BELOW: u32 = 15;

const WM5110_LOW_IMPEDANCE_PATCH: [(u32, u32); 31] = [
    (0x460, 0x0C21),
    (0x461, 0xA000),
    (0x462, 0x0C41),
    (0x463, 0x50E5),
    (0x464, 0x0C41),
    (0x465, 0x4040),
    (0x466, 0x0C41),
    (0x467, 0x3940),
    (0x468, 0x0C41),
    (0x469, 0x2418),
    (0x46A, 0x0846),
    (0x46B, 0x1990),
    (0x46C, 0x08C6),
    (0x46D, 0x1450),
    (0x46E, 0x04CE),
    (0x46F, 0x1020),
    (0x470, 0x04CE),
    (0x471, 0x0CD0),
    (0x472, 0x04CE),
    (0x473, 0x0A30),
    (0x474, 0x044E),
    (0x475, 0x0660),
    (0x476, 0x044E),
    (0x477, 0x0510),
    (0x478, 0x04CE),
    (0x479, 0x0400),
    (0x47A, 0x04CE),
    (0x47B, 0x0330),
    (0x47C, 0x05DF),
    (0x47D, 0x0001),
    (0x47E, 0x07FF),
];

const WM5110_NORMAL_IMPEDANCE_PATCH: [(u32, u32); 31] = [
    (0x460, 0x0C40),
    (0x461, 0xA000),
    (0x462, 0x0C42),
    (0x463, 0x50E5),
    (0x464, 0x0842),
    (0x465, 0x4040),
    (0x466, 0x0842),
    (0x467, 0x3940),
    (0x468, 0x0846),
    (0x469, 0x2418),
    (0x46A, 0x0442),
    (0x46B, 0x1990),
    (0x46C, 0x04C6),
    (0x46D, 0x1450),
    (0x46E, 0x04CE),
    (0x46F, 0x1020),
    (0x470, 0x04CE),
    (0x471, 0x0CD0),
    (0x472, 0x04CE),
    (0x473, 0x0A30),
    (0x474, 0x044E),
    (0x475, 0x0660),
    (0x476, 0x044E),
    (0x477, 0x0510),
    (0x478, 0x04CE),
    (0x479, 0x0400),
    (0x47A, 0x04CE),
    (0x47B, 0x0330),
    (0x47C, 0x05DF),
    (0x47D, 0x0001),
    (0x47E, 0x07FF),
];

/// Written after either WM5110 patch.
const WM5110_PATCH_TAIL: (u32, u32) = (0x483, 0x0021);

const WM1814_LOW_IMPEDANCE_PATCH: [(u32, u32); 3] =
    [(0x46C, 0x0C01), (0x46E, 0x0C01), (0x470, 0x0C01)];

const WM1814_NORMAL_IMPEDANCE_PATCH: [(u32, u32); 3] =
    [(0x46C, 0x0801), (0x46E, 0x0801), (0x470, 0x0801)];

/// Register writes selecting `level` on `kind`; empty for codecs without
/// a tunable output stage.
pub fn patch_for(kind: CodecKind, level: ImpedanceLevel) -> &'static [(u32, u32)] {
    match (kind, level) {
        (CodecKind::Wm5110, ImpedanceLevel::Low) => &WM5110_LOW_IMPEDANCE_PATCH,
        (CodecKind::Wm5110, ImpedanceLevel::Normal) => &WM5110_NORMAL_IMPEDANCE_PATCH,
        (CodecKind::Wm1814, ImpedanceLevel::Low) => &WM1814_LOW_IMPEDANCE_PATCH,
        (CodecKind::Wm1814, ImpedanceLevel::Normal) => &WM1814_NORMAL_IMPEDANCE_PATCH,
        _ => &[],
    }
}

/// Whether `kind` has a tunable headphone output.
pub const fn is_tunable(kind: CodecKind) -> bool {
    matches!(kind, CodecKind::Wm5110 | CodecKind::Wm1814)
}

fn write_patch<R: RegisterMap>(regmap: &mut R, kind: CodecKind, level: ImpedanceLevel) {
    let mut failed = false;
    for &(reg, val) in patch_for(kind, level) {
        failed |= regmap.write(reg, val).is_err();
    }
    if kind == CodecKind::Wm5110 {
        let (reg, val) = WM5110_PATCH_TAIL;
        failed |= regmap.write(reg, val).is_err();
    }
    if failed {
        warn!("Failed to apply {} impedance patch", kind.name());
    }
}

fn set_short_circuit_protection<R: RegisterMap>(regmap: &mut R, kind: CodecKind, enable: bool) {
    if kind != CodecKind::Wm5110 {
        return;
    }
    let val = if enable { HP1_SC_ENA } else { 0 };
    if regmap.update_bits(HP1_SHORT_CIRCUIT_CTRL, HP1_SC_ENA, val).is_err() {
        warn!("Failed to update HP1 short-circuit protection");
    }
}

/// Level a measured load should run with, `None` for shorted outputs.
pub fn level_for_load(kind: CodecKind, short_circuit_ohms: u32, ohms: u32) -> Option<ImpedanceLevel> {
    if ohms <= short_circuit_ohms {
        return None;
    }
    let low = match kind {
        CodecKind::Wm1814 => ohms < WM1814_LOW_IMPEDANCE_BELOW,
        _ => ohms <= HP_LOW_IMPEDANCE_LIMIT,
    };
    Some(if low {
        ImpedanceLevel::Low
    } else {
        ImpedanceLevel::Normal
    })
}

/// Retune the output stage for a measured load.
///
/// Shorted loads only warn. Codecs without a tunable output are left alone.
pub fn tune_headphone<R: RegisterMap>(
    regmap: &mut R,
    kind: CodecKind,
    short_circuit_ohms: u32,
    current: &mut ImpedanceLevel,
    ohms: u32,
) {
    if !is_tunable(kind) {
        return;
    }
    let Some(level) = level_for_load(kind, short_circuit_ohms, ohms) else {
        warn!("Possible HP short, disabling");
        return;
    };
    if level == *current {
        return;
    }
    *current = level;
    match level {
        ImpedanceLevel::Low => {
            debug!("Applying low impedance tuning for {} ohms", ohms);
            set_short_circuit_protection(regmap, kind, false);
        }
        ImpedanceLevel::Normal => {
            debug!("Applying normal impedance tuning for {} ohms", ohms);
            set_short_circuit_protection(regmap, kind, true);
        }
    }
    write_patch(regmap, kind, level);
}
