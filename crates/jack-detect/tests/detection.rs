//! End-to-end detection sequences against the mock board.
//!
//! Every test drives the controller the way board glue does: jack status,
//! MICDET / HPDET interrupts with the result pre-loaded into the mock
//! register map, and fired work items.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

mod common;

use common::{fire, jack, jack_with, set_reg, TestJack, WM5110_REV_A};
use jack_detect::registers::{
    micd_lvl, AccdetMode, ACCDET_MODE_MASK, ACCESSORY_DETECT_MODE_1, AOD_IRQ_RAW_STATUS,
    AOD_WKUP_AND_TRIG, HEADPHONE_DETECT_2, HP1_SC_ENA, HP1_SHORT_CIRCUIT_CTRL, HP_DONE,
    JACK_DETECT_ANALOGUE, JD1_ENA, JD1_STS, MIC_DETECT_1, MIC_DETECT_3, MIC_DETECT_4, MICD_ENA,
    MICD_STS, MICD_VALID, OUT1L_ENA, OUT1R_ENA, OUTPUT_ENABLES_1,
};
use jack_detect::tuning::patch_for;
use jack_detect::{
    CodecKind, ConfigError, DetectionState, ImpedanceLevel, JackConfig, JackError,
    Reading, Work,
};
use platform::mocks::MockPin;
use platform::{HeadsetState, Key};

const MIC: u32 = MICD_VALID | MICD_STS | micd_lvl(8);
const HEADPHONE: u32 = MICD_VALID | MICD_STS | micd_lvl(0);
const REVERSED: u32 = MICD_VALID | MICD_STS | micd_lvl(1);

fn states(jack: &TestJack) -> Vec<HeadsetState> {
    jack.with_peripherals(|hw| hw.sink.states()).unwrap()
}

fn keys(jack: &TestJack) -> Vec<(Key, bool)> {
    jack.with_peripherals(|hw| hw.sink.keys()).unwrap()
}

fn micvdd_enables(jack: &TestJack) -> u32 {
    jack.with_peripherals(|hw| hw.micvdd.enable_count()).unwrap()
}

fn id_gpio_level(jack: &TestJack) -> Option<bool> {
    jack.with_peripherals(|hw| hw.id_gpio.as_ref().and_then(MockPin::level))
        .unwrap()
}

fn reg(jack: &TestJack, reg: u32) -> u32 {
    jack.with_peripherals(|hw| hw.regmap.get(reg)).unwrap()
}

fn active(jack: &TestJack) -> Option<DetectionState> {
    jack.active_state().unwrap()
}

fn micdet(jack: &TestJack, status: u32) {
    set_reg(jack, MIC_DETECT_3, status);
    jack.on_micdet().unwrap();
}

fn hpdet(jack: &TestJack, ohms: u32) {
    set_reg(jack, HEADPHONE_DETECT_2, HP_DONE | ohms);
    jack.on_hpdet().unwrap();
}

/// Insert and run through to a headset with microphone, measuring `ohms`.
fn insert_headset(jack: &TestJack, ohms: u32) {
    jack.on_jack_status(JD1_STS).unwrap();
    micdet(jack, MIC);
    hpdet(jack, ohms);
}

// ── Insertion / removal ─────────────────────────────────────────────────────

#[test]
fn insertion_starts_microphone_detection_with_timeout() {
    let jack = jack();
    jack.on_jack_status(JD1_STS).unwrap();

    assert_eq!(active(&jack), Some(DetectionState::MicdMicrophone));
    assert!(jack.is_pending(Work::StateTimeout).unwrap());
    let delay = jack
        .with_peripherals(|hw| hw.work.delay_of(Work::StateTimeout))
        .unwrap();
    assert_eq!(delay, Some(2000));
    assert_eq!(micvdd_enables(&jack), 1);
    assert!(states(&jack).is_empty());
}

#[test]
fn jack_edge_reads_status_and_clears_triggers() {
    let jack = jack();
    set_reg(&jack, AOD_IRQ_RAW_STATUS, JD1_STS);
    jack.on_jack_edge().unwrap();

    assert_eq!(active(&jack), Some(DetectionState::MicdMicrophone));
    let trig_writes = jack
        .with_peripherals(|hw| hw.regmap.writes_to(AOD_WKUP_AND_TRIG))
        .unwrap();
    assert!(!trig_writes.is_empty());
}

#[test]
fn inverted_jack_detect_treats_low_as_present() {
    let config = JackConfig {
        jd_invert: true,
        ..JackConfig::default()
    };
    let jack = jack_with(config, WM5110_REV_A);
    jack.on_jack_status(0).unwrap();
    assert_eq!(active(&jack), Some(DetectionState::MicdMicrophone));
}

#[test]
fn headset_with_mic_is_measured_then_monitored_for_buttons() {
    let jack = jack();
    jack.on_jack_status(JD1_STS).unwrap();

    micdet(&jack, MIC);
    assert_eq!(active(&jack), Some(DetectionState::HpdetLeft));
    assert!(jack.mic_detected().unwrap());
    assert!(jack.is_clamped().unwrap());

    hpdet(&jack, 32);
    assert_eq!(active(&jack), Some(DetectionState::MicdButton));
    assert_eq!(jack.headset_state().unwrap(), HeadsetState::Headset);
    assert_eq!(jack.hp_impedance().unwrap(), 32);
    assert!(!jack.is_clamped().unwrap());
    assert_eq!(states(&jack), [HeadsetState::Headset]);
}

#[test]
fn headphone_without_mic_reports_and_goes_idle() {
    let jack = jack();
    jack.on_jack_status(JD1_STS).unwrap();
    micdet(&jack, HEADPHONE);
    hpdet(&jack, 32);

    assert_eq!(active(&jack), None);
    assert_eq!(states(&jack), [HeadsetState::HeadsetNoMic]);
    assert!(!jack.mic_detected().unwrap());
    assert_eq!(micvdd_enables(&jack), 0);
}

#[test]
fn removal_resets_everything() {
    let jack = jack();
    insert_headset(&jack, 32);
    micdet(&jack, MICD_VALID | MICD_STS | micd_lvl(1));

    jack.on_jack_status(0).unwrap();

    assert_eq!(active(&jack), None);
    assert_eq!(jack.headset_state().unwrap(), HeadsetState::NoHeadset);
    assert_eq!(jack.hp_impedance().unwrap(), 0);
    assert!(!jack.mic_detected().unwrap());
    assert_eq!(
        states(&jack),
        [HeadsetState::Headset, HeadsetState::NoHeadset]
    );
    assert_eq!(keys(&jack), [(Key::Btn1, true), (Key::Btn1, false)]);
    let impedances = jack.with_peripherals(|hw| hw.sink.impedances()).unwrap();
    assert_eq!(impedances.last(), Some(&0x7FFF));
    assert_eq!(micvdd_enables(&jack), 0);
    for work in Work::ALL {
        assert!(!jack.is_pending(work).unwrap());
    }
}

#[test]
fn removal_during_headphone_measurement_releases_clamp() {
    let jack = jack();
    jack.on_jack_status(JD1_STS).unwrap();
    micdet(&jack, MIC);
    assert_eq!(active(&jack), Some(DetectionState::HpdetLeft));
    assert!(jack.is_clamped().unwrap());

    jack.on_jack_status(0).unwrap();

    assert_eq!(active(&jack), None);
    assert!(!jack.is_clamped().unwrap());
    assert!(!jack.is_pending(Work::StateTimeout).unwrap());
    assert_eq!(states(&jack), [HeadsetState::NoHeadset]);
    let impedances = jack.with_peripherals(|hw| hw.sink.impedances()).unwrap();
    assert_eq!(impedances, [0x7FFF]);

    // A measurement finishing after the plug left has nowhere to go.
    set_reg(&jack, HEADPHONE_DETECT_2, HP_DONE | 32);
    assert_eq!(jack.on_hpdet(), Err(JackError::Spurious));
    assert_eq!(states(&jack), [HeadsetState::NoHeadset]);
}

#[test]
fn removal_during_identification_drops_id_gpio_and_readings() {
    let jack = id_gpio_jack();
    jack.on_detection_ready(Reading::Hpdet(32)).unwrap();
    assert_eq!(id_gpio_level(&jack), Some(true));

    jack.on_jack_status(0).unwrap();

    assert_eq!(active(&jack), None);
    assert_eq!(id_gpio_level(&jack), Some(false));
    assert!(!jack.is_clamped().unwrap());
    assert_eq!(
        reg(&jack, ACCESSORY_DETECT_MODE_1) & ACCDET_MODE_MASK,
        AccdetMode::Mic.bits()
    );

    // The next insertion starts identification from its first reading.
    jack.on_jack_status(JD1_STS).unwrap();
    fire(&jack, Work::AccIdStart);
    jack.on_detection_ready(Reading::Hpdet(32)).unwrap();
    assert_eq!(active(&jack), Some(DetectionState::HpdetAccId));
    assert_eq!(
        reg(&jack, ACCESSORY_DETECT_MODE_1) & ACCDET_MODE_MASK,
        AccdetMode::Hpr.bits()
    );

    // Pulled again before identification starts.
    jack.on_jack_status(0).unwrap();
    jack.on_jack_status(JD1_STS).unwrap();
    assert!(jack.is_pending(Work::AccIdStart).unwrap());
    jack.on_jack_status(0).unwrap();
    assert!(!jack.is_pending(Work::AccIdStart).unwrap());
}

#[test]
fn mic_delay_defers_initial_state() {
    let config = JackConfig {
        init_mic_delay_ms: 100,
        ..JackConfig::default()
    };
    let jack = jack_with(config, WM5110_REV_A);
    jack.on_jack_status(JD1_STS).unwrap();

    assert_eq!(active(&jack), None);
    assert!(!jack.is_pending(Work::StateTimeout).unwrap());
    let delay = jack
        .with_peripherals(|hw| hw.work.delay_of(Work::MicdStart))
        .unwrap();
    assert_eq!(delay, Some(100));

    // A bounce while waiting keeps the start armed.
    jack.on_jack_status(JD1_STS).unwrap();
    assert!(jack.is_pending(Work::MicdStart).unwrap());

    fire(&jack, Work::MicdStart);
    assert_eq!(active(&jack), Some(DetectionState::MicdMicrophone));
    assert!(jack.is_pending(Work::StateTimeout).unwrap());
}

#[test]
fn removal_before_mic_delay_cancels_start() {
    let config = JackConfig {
        init_mic_delay_ms: 100,
        ..JackConfig::default()
    };
    let jack = jack_with(config, WM5110_REV_A);
    jack.on_jack_status(JD1_STS).unwrap();
    jack.on_jack_status(0).unwrap();

    assert!(!jack.is_pending(Work::MicdStart).unwrap());
    jack.run_work(Work::MicdStart).unwrap();
    assert_eq!(active(&jack), None);
    assert_eq!(micvdd_enables(&jack), 0);
}

#[test]
fn micvdd_failure_aborts_microphone_detection() {
    let jack = jack();
    jack.with_peripherals(|hw| hw.micvdd.fail_enable(true)).unwrap();

    assert_eq!(
        jack.set_state(Some(DetectionState::MicdMicrophone)),
        Err(JackError::Supply)
    );
    assert_eq!(active(&jack), None);
    assert_eq!(reg(&jack, MIC_DETECT_1) & MICD_ENA, 0);
    assert!(jack.with_peripherals(|hw| hw.micvdd.bypass_allowed()).unwrap());

    // Insertion survives the failure and stays idle.
    jack.on_jack_status(JD1_STS).unwrap();
    assert_eq!(active(&jack), None);
    assert!(!jack.is_pending(Work::StateTimeout).unwrap());
}

#[test]
fn duplicate_jack_status_rearms_pending_work() {
    let jack = jack();
    jack.on_jack_status(JD1_STS).unwrap();
    jack.on_jack_status(JD1_STS).unwrap();

    assert_eq!(active(&jack), Some(DetectionState::MicdMicrophone));
    assert!(jack.is_pending(Work::StateTimeout).unwrap());
    assert_eq!(micvdd_enables(&jack), 1);
    assert!(states(&jack).is_empty());
}

#[test]
fn duplicate_jack_status_rearms_accessory_identification() {
    let config = JackConfig {
        hpdet_acc_id: true,
        ..JackConfig::default()
    };
    let jack = jack_with(config, WM5110_REV_A);
    jack.on_jack_status(JD1_STS).unwrap();
    jack.on_jack_status(JD1_STS).unwrap();

    assert!(jack.is_pending(Work::AccIdStart).unwrap());
    assert_eq!(active(&jack), None);
}

// ── Microphone detection ────────────────────────────────────────────────────

#[test]
fn microphone_timeout_moves_to_headphone_measurement() {
    let jack = jack();
    jack.on_jack_status(JD1_STS).unwrap();
    fire(&jack, Work::StateTimeout);

    assert_eq!(active(&jack), Some(DetectionState::HpdetLeft));
    assert!(!jack.is_pending(Work::StateTimeout).unwrap());
    assert!(states(&jack).is_empty());
}

#[test]
fn cancelled_timeout_is_ignored_when_it_fires() {
    let jack = jack();
    jack.on_jack_status(JD1_STS).unwrap();
    micdet(&jack, MIC);

    jack.run_work(Work::StateTimeout).unwrap();
    assert_eq!(active(&jack), Some(DetectionState::HpdetLeft));
}

#[test]
fn reversed_polarity_flips_until_the_bound() {
    let jack = jack();
    jack.on_jack_status(JD1_STS).unwrap();

    // Two polarity modes: twenty flips before giving up.
    for _ in 0..20 {
        micdet(&jack, REVERSED);
        assert_eq!(active(&jack), Some(DetectionState::MicdMicrophone));
    }
    micdet(&jack, REVERSED);
    assert_eq!(active(&jack), Some(DetectionState::HpdetLeft));
    assert!(!jack.mic_detected().unwrap());

    let history = jack
        .with_peripherals(|hw| hw.polarity_gpio.as_ref().map(|pin| pin.history().to_vec()))
        .unwrap()
        .unwrap();
    // Two writes at bring-up, one per flip.
    assert_eq!(history.len(), 22);
    assert_eq!(history.last(), Some(&false));
}

#[test]
fn open_circuit_declared_as_mic_when_configured() {
    let config = JackConfig {
        micd_open_circuit_declare: true,
        ..JackConfig::default()
    };
    let jack = jack_with(config, WM5110_REV_A);
    jack.on_jack_status(JD1_STS).unwrap();
    micdet(&jack, MICD_VALID | micd_lvl(8));

    assert!(jack.mic_detected().unwrap());
    assert_eq!(active(&jack), Some(DetectionState::HpdetLeft));
}

#[test]
fn mic_debounce_defers_sampling() {
    let config = JackConfig {
        micd_detect_debounce_ms: 30,
        ..JackConfig::default()
    };
    let jack = jack_with(config, WM5110_REV_A);
    jack.on_jack_status(JD1_STS).unwrap();
    micdet(&jack, MIC);

    assert_eq!(active(&jack), Some(DetectionState::MicdMicrophone));
    let delay = jack
        .with_peripherals(|hw| hw.work.delay_of(Work::MicdDetect))
        .unwrap();
    assert_eq!(delay, Some(30));

    fire(&jack, Work::MicdDetect);
    assert_eq!(active(&jack), Some(DetectionState::HpdetLeft));
}

#[test]
fn software_compare_classifies_adc_value() {
    let config = JackConfig {
        micd_software_compare: true,
        ..JackConfig::default()
    };
    let jack = jack_with(config, WM5110_REV_A);
    jack.on_jack_status(JD1_STS).unwrap();
    assert_eq!(
        reg(&jack, ACCESSORY_DETECT_MODE_1) & ACCDET_MODE_MASK,
        AccdetMode::Adc.bits()
    );

    set_reg(&jack, MIC_DETECT_4, 64);
    jack.on_micdet().unwrap();
    assert!(jack.mic_detected().unwrap());
    assert_eq!(active(&jack), Some(DetectionState::HpdetLeft));
}

// ── Buttons ─────────────────────────────────────────────────────────────────

#[test]
fn held_button_reports_one_press_and_one_release() {
    let jack = jack();
    insert_headset(&jack, 32);

    micdet(&jack, MICD_VALID | MICD_STS | micd_lvl(1));
    micdet(&jack, MICD_VALID | MICD_STS | micd_lvl(1));
    micdet(&jack, MIC);

    assert_eq!(keys(&jack), [(Key::Btn1, true), (Key::Btn1, false)]);
}

#[test]
fn moving_between_buttons_releases_the_first() {
    let jack = jack();
    insert_headset(&jack, 32);

    micdet(&jack, MICD_VALID | MICD_STS | micd_lvl(0));
    micdet(&jack, MICD_VALID | MICD_STS | micd_lvl(2));

    assert_eq!(
        keys(&jack),
        [(Key::Btn0, true), (Key::Btn0, false), (Key::Btn2, true)]
    );
}

#[test]
fn level_beyond_configured_ranges_releases_buttons() {
    let jack = jack();
    insert_headset(&jack, 32);

    micdet(&jack, MICD_VALID | MICD_STS | micd_lvl(3));
    // Six ranges configured: LVL_7 has no key.
    micdet(&jack, MICD_VALID | MICD_STS | micd_lvl(7));

    assert_eq!(keys(&jack), [(Key::Btn3, true), (Key::Btn3, false)]);
}

// ── Headphone measurement ───────────────────────────────────────────────────

#[test]
fn low_impedance_load_applies_patch_once() {
    let jack = jack();
    insert_headset(&jack, 10);

    let low = patch_for(CodecKind::Wm5110, ImpedanceLevel::Low);
    for &(r, val) in low {
        assert_eq!(reg(&jack, r), val);
    }
    assert_eq!(reg(&jack, HP1_SHORT_CIRCUIT_CTRL) & HP1_SC_ENA, 0);
    let (first, _) = low[0];
    let writes = jack.with_peripherals(|hw| hw.regmap.writes_to(first)).unwrap();
    assert_eq!(writes.len(), 1);

    // Removal reports open circuit, which runs at normal impedance.
    jack.on_jack_status(0).unwrap();
    for &(r, val) in patch_for(CodecKind::Wm5110, ImpedanceLevel::Normal) {
        assert_eq!(reg(&jack, r), val);
    }
    assert_eq!(reg(&jack, HP1_SHORT_CIRCUIT_CTRL) & HP1_SC_ENA, HP1_SC_ENA);
}

#[test]
fn normal_load_leaves_patch_untouched() {
    let jack = jack();
    insert_headset(&jack, 32);

    let (first, _) = patch_for(CodecKind::Wm5110, ImpedanceLevel::Normal)[0];
    let writes = jack.with_peripherals(|hw| hw.regmap.writes_to(first)).unwrap();
    assert!(writes.is_empty());
}

#[test]
fn output_enables_wait_for_the_clamp_release() {
    let jack = jack();
    jack.on_jack_status(JD1_STS).unwrap();
    micdet(&jack, HEADPHONE);
    assert!(jack.is_clamped().unwrap());

    jack.set_output_enables(OUT1L_ENA | OUT1R_ENA).unwrap();
    assert_eq!(reg(&jack, OUTPUT_ENABLES_1), 0);

    hpdet(&jack, 32);
    assert_eq!(reg(&jack, OUTPUT_ENABLES_1), OUT1L_ENA | OUT1R_ENA);
}

#[test]
fn shorted_load_keeps_outputs_off() {
    let jack = jack();
    jack.on_jack_status(JD1_STS).unwrap();
    micdet(&jack, HEADPHONE);
    jack.set_output_enables(OUT1L_ENA | OUT1R_ENA).unwrap();

    hpdet(&jack, 2);
    assert_eq!(reg(&jack, OUTPUT_ENABLES_1), 0);
    assert_eq!(jack.hp_impedance().unwrap(), 2);
}

#[test]
fn fixed_impedance_skips_measurement() {
    let config = JackConfig {
        fixed_hpdet_ohms: Some(32),
        ..JackConfig::default()
    };
    let jack = jack_with(config, WM5110_REV_A);
    jack.on_jack_status(JD1_STS).unwrap();
    micdet(&jack, MIC);

    assert_eq!(active(&jack), None);
    assert_eq!(jack.hp_impedance().unwrap(), 32);
    assert_eq!(states(&jack), [HeadsetState::Headset]);
    assert!(!jack.is_clamped().unwrap());
}

#[test]
fn fixed_impedance_timeout_reports_headphone() {
    let config = JackConfig {
        fixed_hpdet_ohms: Some(32),
        ..JackConfig::default()
    };
    let jack = jack_with(config, WM5110_REV_A);
    jack.on_jack_status(JD1_STS).unwrap();
    fire(&jack, Work::StateTimeout);

    assert_eq!(states(&jack), [HeadsetState::HeadsetNoMic]);
    assert_eq!(active(&jack), None);
}

#[test]
fn spurious_hpdet_is_rejected_and_timeout_kept() {
    let jack = jack();
    jack.on_jack_status(JD1_STS).unwrap();

    assert_eq!(jack.on_hpdet(), Err(JackError::Spurious));
    assert_eq!(
        jack.on_detection_ready(Reading::Hpdet(32)),
        Err(JackError::Spurious)
    );
    assert_eq!(active(&jack), Some(DetectionState::MicdMicrophone));
    assert!(jack.is_pending(Work::StateTimeout).unwrap());
}

#[test]
fn spurious_micdet_while_idle_is_rejected() {
    let jack = jack();
    set_reg(&jack, MIC_DETECT_3, MIC);
    assert_eq!(jack.on_micdet(), Err(JackError::Spurious));
    assert_eq!(active(&jack), None);
    assert!(states(&jack).is_empty());
}

#[test]
fn debounced_micdet_after_mic_detection_is_rejected() {
    let config = JackConfig {
        micd_detect_debounce_ms: 20,
        ..JackConfig::default()
    };
    let jack = jack_with(config, WM5110_REV_A);
    jack.on_jack_status(JD1_STS).unwrap();
    set_reg(&jack, MIC_DETECT_3, MIC);
    jack.on_micdet().unwrap();
    jack.set_state(Some(DetectionState::HpdetLeft)).unwrap();

    let due = jack.with_peripherals(|hw| hw.work.take(Work::MicdDetect)).unwrap();
    assert!(due);
    assert_eq!(jack.run_work(Work::MicdDetect), Err(JackError::Spurious));
    assert_eq!(active(&jack), Some(DetectionState::HpdetLeft));
}

// ── Moisture ────────────────────────────────────────────────────────────────

fn moisture_jack() -> TestJack {
    let config = JackConfig {
        hpdet_moisture_ohms: Some(1000),
        ..JackConfig::default()
    };
    let jack = jack_with(config, WM5110_REV_A);
    jack.on_jack_status(JD1_STS).unwrap();
    jack
}

#[test]
fn moisture_reading_above_limit_is_ignored() {
    let jack = moisture_jack();
    assert_eq!(active(&jack), Some(DetectionState::HpdetMoisture));
    assert!(!jack.is_clamped().unwrap());

    jack.on_detection_ready(Reading::Hpdet(5000)).unwrap();
    assert_eq!(active(&jack), None);
    assert!(states(&jack).is_empty());
}

#[test]
fn dry_jack_continues_to_mic_detection() {
    let jack = moisture_jack();
    jack.on_detection_ready(Reading::Hpdet(200)).unwrap();
    assert_eq!(active(&jack), Some(DetectionState::MicdMicrophone));
}

// ── Accessory identification ────────────────────────────────────────────────

#[test]
fn accessory_identification_starts_after_debounce() {
    let config = JackConfig {
        hpdet_acc_id: true,
        ..JackConfig::default()
    };
    let jack = jack_with(config, WM5110_REV_A);
    jack.on_jack_status(JD1_STS).unwrap();

    assert_eq!(active(&jack), None);
    let delay = jack
        .with_peripherals(|hw| hw.work.delay_of(Work::AccIdStart))
        .unwrap();
    assert_eq!(delay, Some(500));

    // Without line identification the headphone load is assumed; the mic
    // contact is checked next.
    fire(&jack, Work::AccIdStart);
    assert_eq!(active(&jack), Some(DetectionState::MicdMicrophone));
    assert!(jack.is_pending(Work::StateTimeout).unwrap());
}

#[test]
fn open_circuit_identification_is_retried_once() {
    let config = JackConfig {
        hpdet_acc_id: true,
        hpdet_acc_id_line: true,
        ..JackConfig::default()
    };
    let jack = jack_with(config, WM5110_REV_A);
    jack.on_jack_status(JD1_STS).unwrap();
    fire(&jack, Work::AccIdStart);
    assert_eq!(active(&jack), Some(DetectionState::HpdetAccId));

    jack.on_detection_ready(Reading::Hpdet(10_000)).unwrap();
    assert_eq!(active(&jack), Some(DetectionState::HpdetAccId));

    jack.on_detection_ready(Reading::Hpdet(10_000)).unwrap();
    assert_eq!(active(&jack), Some(DetectionState::MicdMicrophone));
}

fn id_gpio_jack() -> TestJack {
    let config = JackConfig {
        hpdet_acc_id: true,
        hpdet_acc_id_line: true,
        hpdet_id_gpio: true,
        ..JackConfig::default()
    };
    let jack = jack_with(config, WM5110_REV_A);
    jack.on_jack_status(JD1_STS).unwrap();
    fire(&jack, Work::AccIdStart);
    jack
}

#[test]
fn id_gpio_low_second_reading_is_headphone() {
    let jack = id_gpio_jack();
    jack.on_detection_ready(Reading::Hpdet(32)).unwrap();
    assert_eq!(active(&jack), Some(DetectionState::HpdetAccId));
    assert_eq!(
        reg(&jack, ACCESSORY_DETECT_MODE_1) & ACCDET_MODE_MASK,
        AccdetMode::Hpr.bits()
    );

    jack.on_detection_ready(Reading::Hpdet(20)).unwrap();
    assert_eq!(active(&jack), None);
    assert_eq!(states(&jack), [HeadsetState::HeadsetNoMic]);

    let history = jack
        .with_peripherals(|hw| hw.id_gpio.as_ref().map(|pin| pin.history().to_vec()))
        .unwrap()
        .unwrap();
    assert_eq!(history, [false, true, false]);
}

#[test]
fn id_gpio_high_second_reading_is_microphone() {
    let jack = id_gpio_jack();
    jack.on_detection_ready(Reading::Hpdet(32)).unwrap();
    jack.on_detection_ready(Reading::Hpdet(1000)).unwrap();
    assert_eq!(active(&jack), Some(DetectionState::MicdMicrophone));
}

#[test]
fn repeated_identification_starts_from_fresh_readings() {
    let jack = id_gpio_jack();
    jack.on_detection_ready(Reading::Hpdet(32)).unwrap();
    jack.on_detection_ready(Reading::Hpdet(20)).unwrap();
    assert_eq!(active(&jack), None);

    for _ in 0..2 {
        jack.set_state(Some(DetectionState::HpdetAccId)).unwrap();
        jack.on_detection_ready(Reading::Hpdet(32)).unwrap();
        assert_eq!(active(&jack), Some(DetectionState::HpdetAccId));
        assert_eq!(
            reg(&jack, ACCESSORY_DETECT_MODE_1) & ACCDET_MODE_MASK,
            AccdetMode::Hpr.bits()
        );

        jack.on_detection_ready(Reading::Hpdet(1000)).unwrap();
        assert_eq!(active(&jack), Some(DetectionState::MicdMicrophone));
        jack.set_state(None).unwrap();
    }
}

#[test]
fn open_circuit_retry_is_available_on_each_identification() {
    let config = JackConfig {
        hpdet_acc_id: true,
        hpdet_acc_id_line: true,
        ..JackConfig::default()
    };
    let jack = jack_with(config, WM5110_REV_A);
    for _ in 0..2 {
        jack.set_state(Some(DetectionState::HpdetAccId)).unwrap();
        jack.on_detection_ready(Reading::Hpdet(10_000)).unwrap();
        assert_eq!(active(&jack), Some(DetectionState::HpdetAccId));
        jack.on_detection_ready(Reading::Hpdet(10_000)).unwrap();
        assert_eq!(active(&jack), Some(DetectionState::MicdMicrophone));
        jack.set_state(None).unwrap();
    }
}

// ── Direct control ──────────────────────────────────────────────────────────

#[test]
fn reentering_the_active_state_is_a_noop() {
    let jack = jack();
    jack.set_state(Some(DetectionState::MicdButton)).unwrap();
    jack.set_state(Some(DetectionState::MicdButton)).unwrap();
    assert_eq!(micvdd_enables(&jack), 1);

    jack.set_state(None).unwrap();
    assert_eq!(micvdd_enables(&jack), 0);
    assert_eq!(active(&jack), None);
}

#[test]
fn invalid_configs_are_rejected() {
    let mut no_modes = JackConfig::default();
    no_modes.micd_modes.clear();
    let err = TestJack::new(common::peripherals(), no_modes, WM5110_REV_A).err();
    assert_eq!(err, Some(JackError::Config(ConfigError::NoPolarityModes)));

    let mut unsorted = JackConfig::default();
    unsorted.micd_ranges.reverse();
    let err = TestJack::new(common::peripherals(), unsorted, WM5110_REV_A).err();
    assert_eq!(err, Some(JackError::Config(ConfigError::UnsortedRanges)));
}

#[test]
fn shutdown_disables_jack_detect() {
    let jack = jack();
    jack.on_jack_status(JD1_STS).unwrap();
    assert_eq!(reg(&jack, JACK_DETECT_ANALOGUE) & JD1_ENA, JD1_ENA);

    let mut hw = jack.shutdown();
    assert_eq!(hw.regmap.get(JACK_DETECT_ANALOGUE) & JD1_ENA, 0);
    assert_eq!(hw.micvdd.enable_count(), 0);
    assert!(!hw.work.take(Work::StateTimeout));
}
