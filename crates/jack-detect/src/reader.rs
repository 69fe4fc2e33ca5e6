//! Register-level sampling of the mic detect and headphone detect blocks.

use platform::RegisterMap;

use crate::classifier::{
    classify_adc_code, classify_hp_impedance, compensate_ext_res, HpImpedance, MicdStatus,
    HPDET_MAX_OHMS,
};
use crate::config::HpdetIp;
use crate::error::JackError;
use crate::registers::{
    HEADPHONE_DETECT_1, HEADPHONE_DETECT_2, HP_DACVAL, HP_DONE, HP_DONE_B,
    HP_IMPEDANCE_RANGE_MASK, HP_IMPEDANCE_RANGE_SHIFT, MICD_ENA, MIC_DETECT_1,
    MIC_DETECT_3, MIC_DETECT_4,
};

/// Status reads before giving up on a level.
const MICD_POLL_ATTEMPTS: usize = 10;

/// Sample the mic contact.
///
/// With `software_compare` the comparator is paused and the raw ADC value is
/// classified in software; otherwise `MIC_DETECT_3` is polled until the
/// hardware reports a level.
pub fn read_micd<R: RegisterMap>(
    regmap: &mut R,
    software_compare: bool,
) -> Result<MicdStatus, JackError> {
    if software_compare {
        read_micd_adc(regmap)
    } else {
        poll_micd_status(regmap)
    }
}

fn read_micd_adc<R: RegisterMap>(regmap: &mut R) -> Result<MicdStatus, JackError> {
    let was_enabled = regmap
        .update_bits_check(MIC_DETECT_1, MICD_ENA, 0)
        .map_err(|_| {
            error!("Failed to disable MICD for ADC read");
            JackError::Bus
        })?;

    let raw = regmap.read(MIC_DETECT_4).map_err(|_| {
        error!("Failed to read MICDET_ADCVAL");
        JackError::Bus
    })?;
    let (bucket, status) = classify_adc_code(raw);
    debug!("MICDET_ADCVAL: {} ({})", raw, bucket.name());

    if was_enabled {
        regmap
            .update_bits(MIC_DETECT_1, MICD_ENA, MICD_ENA)
            .map_err(|_| JackError::Bus)?;
    }
    Ok(status)
}

fn poll_micd_status<R: RegisterMap>(regmap: &mut R) -> Result<MicdStatus, JackError> {
    for _ in 0..MICD_POLL_ATTEMPTS {
        let status = MicdStatus(regmap.read(MIC_DETECT_3).map_err(|_| {
            error!("Failed to read MICDET");
            JackError::Bus
        })?);
        debug!("MICDET: {}", status.0);
        if !status.valid() {
            warn!("Microphone detection state invalid");
            return Err(JackError::InvalidMeasurement);
        }
        if status.has_level() {
            return Ok(status);
        }
    }
    error!("Failed to get valid MICDET value");
    Err(JackError::InvalidMeasurement)
}

/// Outcome of one headphone detect sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HpdetRead {
    /// Impedance in ohms, external resistor already subtracted
    Done(u32),
    /// Measurement incomplete or moved to a new range; wait for the next IRQ
    Pending,
}

/// Sample the headphone detect result.
///
/// Moves the block to the next impedance range when the reading falls
/// outside the active one; the running poll picks up the new range.
pub fn read_hpdet<R: RegisterMap>(
    regmap: &mut R,
    ip: HpdetIp,
    ext_res_ohms: u32,
) -> Result<HpdetRead, JackError> {
    let status = regmap.read(HEADPHONE_DETECT_2).map_err(|_| {
        error!("Failed to read HPDET status");
        JackError::Bus
    })?;

    let done = match ip {
        HpdetIp::Rev0 => status & HP_DONE != 0,
        HpdetIp::RevB | HpdetIp::RevC => status & HP_DONE_B != 0,
    };
    if !done {
        error!("HPDET did not complete: {}", status);
        return Ok(HpdetRead::Pending);
    }

    let raw = match ip {
        HpdetIp::RevB => match regmap.read(HP_DACVAL) {
            Ok(val) => val,
            Err(_) => {
                error!("Failed to read HP value");
                return Ok(HpdetRead::Pending);
            }
        },
        HpdetIp::Rev0 | HpdetIp::RevC => status,
    };

    let range = match ip {
        HpdetIp::Rev0 => 0,
        HpdetIp::RevB | HpdetIp::RevC => {
            let ctrl = regmap.read(HEADPHONE_DETECT_1).map_err(|_| JackError::Bus)?;
            (ctrl & HP_IMPEDANCE_RANGE_MASK) >> HP_IMPEDANCE_RANGE_SHIFT
        }
    };

    match classify_hp_impedance(raw, ip, range) {
        HpImpedance::Ohms(ohms) => {
            debug!("HP impedance {} ohms", ohms);
            Ok(HpdetRead::Done(compensate_ext_res(ohms, ext_res_ohms)))
        }
        HpImpedance::Rerange(next) => {
            debug!("Moving to HPDET range {}", next);
            regmap
                .update_bits(
                    HEADPHONE_DETECT_1,
                    HP_IMPEDANCE_RANGE_MASK,
                    next.wrapping_shl(HP_IMPEDANCE_RANGE_SHIFT),
                )
                .map_err(|_| JackError::Bus)?;
            Ok(HpdetRead::Pending)
        }
        HpImpedance::OutOfRange => {
            debug!("Measurement out of range");
            Ok(HpdetRead::Done(HPDET_MAX_OHMS))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::registers::{micd_lvl, HP_POLL, MICD_STS, MICD_VALID};
    use platform::mocks::MockRegmap;

    #[test]
    fn poll_returns_first_status_with_a_level() {
        let mut map = MockRegmap::new();
        map.queue_read(MIC_DETECT_3, MICD_VALID);
        map.queue_read(MIC_DETECT_3, MICD_VALID | MICD_STS | micd_lvl(8));
        let status = read_micd(&mut map, false).unwrap();
        assert!(status.is_high_impedance());
        assert_eq!(map.read_count(MIC_DETECT_3), 2);
    }

    #[test]
    fn poll_rejects_invalid_status() {
        let mut map = MockRegmap::new();
        map.set(MIC_DETECT_3, MICD_STS | micd_lvl(8));
        assert_eq!(read_micd(&mut map, false), Err(JackError::InvalidMeasurement));
    }

    #[test]
    fn poll_gives_up_after_ten_reads() {
        let mut map = MockRegmap::new();
        map.set(MIC_DETECT_3, MICD_VALID | MICD_STS);
        assert_eq!(read_micd(&mut map, false), Err(JackError::InvalidMeasurement));
        assert_eq!(map.read_count(MIC_DETECT_3), 10);
    }

    #[test]
    fn adc_read_pauses_and_restores_comparator() {
        let mut map = MockRegmap::new();
        map.set(MIC_DETECT_1, MICD_ENA);
        map.set(MIC_DETECT_4, 64);
        let status = read_micd(&mut map, true).unwrap();
        assert!(status.present() && status.is_high_impedance());
        assert_eq!(map.writes_to(MIC_DETECT_1), vec![0, MICD_ENA]);
    }

    #[test]
    fn adc_read_leaves_disabled_comparator_off() {
        let mut map = MockRegmap::new();
        map.set(MIC_DETECT_4, 0);
        read_micd(&mut map, true).unwrap();
        assert!(map.writes_to(MIC_DETECT_1).is_empty());
        assert_eq!(map.get(MIC_DETECT_1), 0);
    }

    #[test]
    fn rev0_requires_done() {
        let mut map = MockRegmap::new();
        map.set(HEADPHONE_DETECT_2, 32);
        assert_eq!(read_hpdet(&mut map, HpdetIp::Rev0, 0), Ok(HpdetRead::Pending));
        map.set(HEADPHONE_DETECT_2, HP_DONE | 32);
        assert_eq!(read_hpdet(&mut map, HpdetIp::Rev0, 0), Ok(HpdetRead::Done(32)));
    }

    #[test]
    fn rev_c_escalates_range_keeping_poll() {
        let mut map = MockRegmap::new();
        map.set(HEADPHONE_DETECT_1, HP_POLL);
        map.set(HEADPHONE_DETECT_2, HP_DONE_B | 80);
        assert_eq!(read_hpdet(&mut map, HpdetIp::RevC, 0), Ok(HpdetRead::Pending));
        assert_eq!(map.get(HEADPHONE_DETECT_1), (1 << HP_IMPEDANCE_RANGE_SHIFT) | HP_POLL);
    }

    #[test]
    fn rev_c_applies_external_resistor() {
        let mut map = MockRegmap::new();
        map.set(HEADPHONE_DETECT_2, HP_DONE_B | 64);
        assert_eq!(read_hpdet(&mut map, HpdetIp::RevC, 12), Ok(HpdetRead::Done(20)));
    }

    #[test]
    fn rev_b_reads_dac_value() {
        let mut map = MockRegmap::new();
        map.set(HEADPHONE_DETECT_2, HP_DONE_B);
        map.set(HP_DACVAL, 200);
        assert_eq!(read_hpdet(&mut map, HpdetIp::RevB, 0), Ok(HpdetRead::Done(25)));
    }

    #[test]
    fn rev_b_exhausted_range_reports_max_without_compensation() {
        let mut map = MockRegmap::new();
        map.set(HEADPHONE_DETECT_1, 2 << HP_IMPEDANCE_RANGE_SHIFT);
        map.set(HEADPHONE_DETECT_2, HP_DONE_B);
        map.set(HP_DACVAL, 50);
        assert_eq!(
            read_hpdet(&mut map, HpdetIp::RevB, 100),
            Ok(HpdetRead::Done(HPDET_MAX_OHMS))
        );
    }

    #[test]
    fn rev_b_dac_read_failure_waits() {
        let mut map = MockRegmap::new();
        map.set(HEADPHONE_DETECT_2, HP_DONE_B);
        map.fail_on(HP_DACVAL);
        assert_eq!(read_hpdet(&mut map, HpdetIp::RevB, 0), Ok(HpdetRead::Pending));
    }
}
