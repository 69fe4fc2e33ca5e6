//! Per-controller detection session: mutable state plus the hardware helpers
//! shared by every detection state.
//!
//! Everything here runs with the controller lock held.

use embedded_hal::digital::{OutputPin, PinState};
use platform::{AccessorySink, HeadsetState, MicBias, RegisterMap, Regulator, WorkQueue};

use crate::board::{Board, Peripherals, Work};
use crate::buttons::ButtonReporter;
use crate::classifier::HP_Z_OPEN;
use crate::config::{Capabilities, Codec, CodecKind, JackConfig};
use crate::error::JackError;
use crate::levels::program_button_levels;
use crate::reader::{read_hpdet, read_micd, HpdetRead};
use crate::registers::{
    AccdetMode, ACCDET_MODE_MASK, ACCDET_SRC, ACCESSORY_DETECT_MODE_1, AOD_IRQ_RAW_STATUS,
    AOD_WKUP_AND_TRIG, GP_SWITCH_1, GPIO5_CTRL, GPIO5_JD_INPUT, GPN_PU, HEADPHONE_DETECT_1,
    HP1L_FLWR, HP1L_SHRTI, HP1L_SHRTO, HP_CTRL_1L, HP_CTRL_1R, HP_IMPEDANCE_RANGE_MASK, HP_POLL,
    JACK_DETECT_ANALOGUE, JACK_DETECT_DEBOUNCE, JD1_DB, JD1_ENA, JD1_FALL_TRIG_STS,
    JD1_RISE_TRIG_STS, JD1_STS, MICD_BIAS_SRC_MASK, MICD_BIAS_SRC_SHIFT,
    MICD_BIAS_STARTTIME_MASK, MICD_BIAS_STARTTIME_SHIFT, MICD_CLAMP_CONTROL, MICD_CLAMP_DB,
    MICD_CLAMP_FALL_TRIG_STS, MICD_CLAMP_MODE_JDH, MICD_CLAMP_MODE_JDH_GP5H, MICD_CLAMP_MODE_JDL,
    MICD_CLAMP_MODE_JDL_GP5H, MICD_CLAMP_MODE_MASK, MICD_CLAMP_RISE_TRIG_STS, MICD_CLAMP_STS,
    MICD_DBTIME_MASK, MICD_DBTIME_SHIFT, MICD_ENA, MICD_RATE_MASK, MICD_RATE_SHIFT,
    MICD_REVA_PATCH, MIC_DETECT_1, OUT1L_ENA, OUT1R_ENA, OUTPUT_ENABLES_1, RMV_SHRT_HP1L,
    SW1_MODE_MASK, TEST_KEY, TEST_KEY_UNLOCK,
};
use crate::state::{DetectionState, Outcome, Reading};
use crate::tuning::{tune_headphone, ImpedanceLevel};

/// Debounce between insertion and accessory identification, in ms.
pub const HPDET_DEBOUNCE_MS: u32 = 500;

/// MICD_REVA_PATCH value while mic detection runs.
const REVA_MICD_RUNNING: u32 = 0;
/// MICD_REVA_PATCH value while mic detection is idle.
const REVA_MICD_IDLE: u32 = 2;

/// Every always-on trigger status bit the jack interrupt can raise.
const JACK_TRIGGERS: u32 =
    MICD_CLAMP_FALL_TRIG_STS | MICD_CLAMP_RISE_TRIG_STS | JD1_FALL_TRIG_STS | JD1_RISE_TRIG_STS;

pub(crate) struct Session<B: Board> {
    pub(crate) hw: Peripherals<B>,
    pub(crate) config: JackConfig,
    pub(crate) codec: Codec,
    pub(crate) caps: Capabilities,
    pub(crate) short_circuit_ohms: u32,

    pub(crate) state: Option<DetectionState>,
    pub(crate) last_jackdet: Option<u32>,
    pub(crate) micd_mode: usize,
    pub(crate) mic: bool,
    pub(crate) detecting: bool,
    pub(crate) jack_flips: u32,
    pub(crate) hpdet_retried: bool,
    pub(crate) readings: heapless::Vec<u32, 3>,

    pub(crate) hp_level: ImpedanceLevel,
    pub(crate) hp_impedance: u32,
    pub(crate) hp_clamp: bool,
    pub(crate) hp_ena: u32,

    pending: u8,
    pub(crate) headset: HeadsetState,
    pub(crate) buttons: ButtonReporter,
}

impl<B: Board> Session<B> {
    pub(crate) fn new(hw: Peripherals<B>, config: JackConfig, codec: Codec) -> Self {
        let short_circuit_ohms = config.short_circuit_ohms();
        Self {
            hw,
            config,
            codec,
            caps: codec.capabilities(),
            short_circuit_ohms,
            state: None,
            last_jackdet: None,
            micd_mode: 0,
            mic: false,
            detecting: false,
            jack_flips: 0,
            hpdet_retried: false,
            readings: heapless::Vec::new(),
            hp_level: ImpedanceLevel::Normal,
            hp_impedance: 0,
            hp_clamp: false,
            hp_ena: 0,
            pending: 0,
            headset: HeadsetState::NoHeadset,
            buttons: ButtonReporter::new(),
        }
    }

    // ── Deferred work ───────────────────────────────────────────────────────

    pub(crate) fn schedule(&mut self, work: Work, delay_ms: u32) {
        self.pending |= work.bit();
        self.hw.work.schedule(work, delay_ms);
    }

    /// Cancel `work`; returns whether it was pending.
    pub(crate) fn cancel(&mut self, work: Work) -> bool {
        let was_pending = self.is_pending(work);
        self.pending &= !work.bit();
        self.hw.work.cancel(work);
        was_pending
    }

    pub(crate) fn is_pending(&self, work: Work) -> bool {
        self.pending & work.bit() != 0
    }

    /// Claim a fired work item; `false` when it was cancelled since scheduling.
    pub(crate) fn take_pending(&mut self, work: Work) -> bool {
        let was_pending = self.is_pending(work);
        self.pending &= !work.bit();
        was_pending
    }

    /// Arm the active state's timeout, if it declares one.
    pub(crate) fn start_timeout(&mut self) {
        if let Some(state) = self.state {
            if state.has_timeout() {
                let ms = self.config.micd_timeout();
                self.schedule(Work::StateTimeout, ms);
            }
        }
    }

    // ── State machine ───────────────────────────────────────────────────────

    /// Leave the active state and enter `new`.
    ///
    /// Re-entering the active state is a no-op. If `new` fails to start the
    /// session goes idle, unless its entry action already moved on.
    pub(crate) fn set_state(&mut self, new: Option<DetectionState>) -> Result<(), JackError> {
        if new == self.state {
            return Ok(());
        }
        self.cancel(Work::StateTimeout);
        if let Some(old) = self.state {
            self.exit_state(old);
        }
        self.state = new;
        let Some(state) = new else {
            debug!("Detection idle");
            return Ok(());
        };
        debug!("Entering {}", state.name());
        let ret = self.enter_state(state);
        if let Err(err) = ret {
            if self.state == Some(state) {
                debug!("{} failed to start", state.name());
                self.state = None;
            }
            return Err(err);
        }
        Ok(())
    }

    /// [`set_state`](Self::set_state) for transitions with no caller to
    /// report to; a failure is logged and the session is left as it ended up.
    pub(crate) fn move_to(&mut self, new: Option<DetectionState>) {
        if let Err(err) = self.set_state(new) {
            let name = new.map_or("idle", DetectionState::name);
            warn!("Entering {} failed: {}", name, err);
        }
    }

    /// Hand a reading to `state`, restarting it when asked to retry.
    pub(crate) fn deliver(&mut self, state: DetectionState, reading: Reading) {
        match self.state_reading(state, reading) {
            Ok(Outcome::Retry) => self.restart_state(state),
            Ok(_) => {}
            Err(_) => debug!("Reading dropped in {}", state.name()),
        }
    }

    pub(crate) fn report(&mut self, state: HeadsetState) {
        info!("Accessory: {}", state.name());
        self.headset = state;
        self.hw.sink.report_state(state);
    }

    // ── Interrupt bottom halves ─────────────────────────────────────────────

    /// Jack presence changed (or bounced).
    pub(crate) fn handle_jackdet(&mut self, raw: u32) {
        let cancelled_acc_id = self.cancel(Work::AccIdStart);
        let cancelled_timeout = self.cancel(Work::StateTimeout);
        let cancelled_mic_start = self.cancel(Work::MicdStart);

        let (mask, present) = if self.config.jd_gpio5 {
            let present = if self.config.jd_invert { MICD_CLAMP_STS } else { 0 };
            (MICD_CLAMP_STS, present)
        } else {
            let present = if self.config.jd_invert { 0 } else { JD1_STS };
            (JD1_STS, present)
        };

        let val = raw & mask;
        if self.last_jackdet == Some(val) {
            debug!("Suppressing duplicate JACKDET");
            if cancelled_acc_id {
                self.schedule(Work::AccIdStart, HPDET_DEBOUNCE_MS);
            }
            if cancelled_timeout {
                self.start_timeout();
            }
            if cancelled_mic_start {
                self.schedule(Work::MicdStart, self.config.init_mic_delay_ms);
            }
        } else {
            self.last_jackdet = Some(val);
            if val == present {
                self.jack_inserted();
            } else {
                self.jack_removed();
            }
        }

        if self.hw.regmap.write(AOD_WKUP_AND_TRIG, JACK_TRIGGERS).is_err() {
            warn!("Failed to clear jack trigger status");
        }
    }

    fn jack_inserted(&mut self) {
        info!("Detected jack");
        if self.config.hpdet_acc_id {
            self.schedule(Work::AccIdStart, HPDET_DEBOUNCE_MS);
        } else {
            self.mic = false;
            self.jack_flips = 0;
            if self.config.init_mic_delay_ms > 0 {
                self.schedule(Work::MicdStart, self.config.init_mic_delay_ms);
            } else {
                self.start_initial_state();
            }
        }

        if self
            .hw
            .regmap
            .update_bits(JACK_DETECT_DEBOUNCE, MICD_CLAMP_DB | JD1_DB, 0)
            .is_err()
        {
            warn!("Failed to drop jack debounce");
        }
    }

    /// Enter the configured first detection state and arm its timeout.
    fn start_initial_state(&mut self) {
        let initial = if let Some(custom) = self.config.custom_initial_state {
            custom
        } else if self.config.hpdet_moisture_ohms.is_some() {
            DetectionState::HpdetMoisture
        } else {
            DetectionState::MicdMicrophone
        };
        self.move_to(Some(initial));
        self.start_timeout();
    }

    fn jack_removed(&mut self) {
        info!("Detected jack removal");
        self.readings.clear();
        self.mic = false;
        self.hpdet_retried = false;
        self.hp_impedance = 0;
        self.cancel(Work::MicdDetect);
        self.move_to(None);

        self.buttons
            .release_all(&mut self.hw.sink, &self.config.micd_ranges);
        self.hw.sink.sync();

        self.report(HeadsetState::NoHeadset);

        if self
            .hw
            .regmap
            .update_bits(
                JACK_DETECT_DEBOUNCE,
                MICD_CLAMP_DB | JD1_DB,
                MICD_CLAMP_DB | JD1_DB,
            )
            .is_err()
        {
            warn!("Failed to restore jack debounce");
        }

        self.tune(HP_Z_OPEN);
        self.hw.sink.hp_impedance(HP_Z_OPEN);
        self.hw.sink.mic_detected(false);
    }

    /// Mic detect interrupt: sample now or after the configured debounce.
    pub(crate) fn handle_micdet(&mut self) -> Result<(), JackError> {
        self.cancel(Work::MicdDetect);
        let debounce = if self.detecting {
            self.config.micd_detect_debounce_ms
        } else {
            0
        };
        if debounce > 0 {
            self.schedule(Work::MicdDetect, debounce);
            Ok(())
        } else {
            self.handle_micd()
        }
    }

    /// Sample the mic contact and hand the status to the active MICD state.
    pub(crate) fn handle_micd(&mut self) -> Result<(), JackError> {
        self.cancel(Work::StateTimeout);

        let Some(state) = self.state.filter(|s| s.mode().is_micd()) else {
            warn!("Spurious MICDET IRQ");
            self.start_timeout();
            return Err(JackError::Spurious);
        };

        let software_compare = self.detecting && self.config.micd_software_compare;
        match read_micd(&mut self.hw.regmap, software_compare) {
            Ok(status) => self.deliver(state, Reading::Micd(status)),
            Err(_) => debug!("MICDET sample dropped"),
        }
        self.start_timeout();
        Ok(())
    }

    /// Sample the headphone detect result and hand it to the active HPDET state.
    pub(crate) fn handle_hpdet(&mut self) -> Result<(), JackError> {
        self.cancel(Work::StateTimeout);

        let Some(state) = self.state.filter(|s| s.mode().is_hpdet()) else {
            warn!("Spurious HPDET IRQ");
            self.start_timeout();
            return Err(JackError::Spurious);
        };

        match read_hpdet(
            &mut self.hw.regmap,
            self.caps.hpdet_ip,
            self.config.hpdet_ext_res_ohms,
        ) {
            Ok(HpdetRead::Done(ohms)) => self.deliver(state, Reading::Hpdet(ohms)),
            Ok(HpdetRead::Pending) => {}
            Err(_) => debug!("HPDET sample dropped"),
        }
        self.start_timeout();
        Ok(())
    }

    /// Reading pushed by the host; routed like an interrupt-driven sample.
    pub(crate) fn handle_reading(&mut self, reading: Reading) -> Result<(), JackError> {
        self.cancel(Work::StateTimeout);

        let matches = |s: &DetectionState| match reading {
            Reading::Micd(_) => s.mode().is_micd(),
            Reading::Hpdet(_) => s.mode().is_hpdet(),
        };
        let Some(state) = self.state.filter(matches) else {
            warn!("Reading arrived with no matching detection running");
            self.start_timeout();
            return Err(JackError::Spurious);
        };
        self.deliver(state, reading);
        self.start_timeout();
        Ok(())
    }

    /// Run a fired work item.
    pub(crate) fn run_work(&mut self, work: Work) -> Result<(), JackError> {
        if !self.take_pending(work) {
            debug!("Ignoring stale {}", work.name());
            return Ok(());
        }
        match work {
            Work::StateTimeout => {
                if let Some(state) = self.state {
                    self.state_timeout(state);
                }
                self.start_timeout();
            }
            Work::AccIdStart => {
                self.mic = false;
                self.jack_flips = 0;
                self.move_to(Some(DetectionState::HpdetAccId));
                self.start_timeout();
            }
            Work::MicdDetect => return self.handle_micd(),
            Work::MicdStart => self.start_initial_state(),
        }
        Ok(())
    }

    // ── Hardware helpers ────────────────────────────────────────────────────

    /// Clamp (or release) the headphone outputs around a measurement.
    pub(crate) fn clamp(&mut self, clamp: bool) {
        let (mask, val) = match self.codec.kind {
            CodecKind::Wm1814 | CodecKind::Wm8998 => (0, 0),
            CodecKind::Wm5110 | CodecKind::Wm8280 => {
                let val = if clamp { HP1L_SHRTO } else { HP1L_FLWR | HP1L_SHRTI };
                (HP1L_SHRTO | HP1L_FLWR | HP1L_SHRTI, val)
            }
            CodecKind::Wm5102 => (RMV_SHRT_HP1L, if clamp { RMV_SHRT_HP1L } else { 0 }),
        };

        self.hp_clamp = clamp;
        let regmap = &mut self.hw.regmap;

        // Output stages stay off while clamped.
        if clamp
            && regmap
                .update_bits(OUTPUT_ENABLES_1, OUT1L_ENA | OUT1R_ENA, 0)
                .is_err()
        {
            warn!("Failed to disable headphone outputs");
        }

        if mask != 0 {
            for reg in [HP_CTRL_1L, HP_CTRL_1R] {
                if regmap.update_bits(reg, mask, val).is_err() {
                    warn!("Failed to do clamp");
                }
            }
        }

        if !clamp
            && self.hp_impedance > self.short_circuit_ohms
            && regmap
                .update_bits(OUTPUT_ENABLES_1, OUT1L_ENA | OUT1R_ENA, self.hp_ena)
                .is_err()
        {
            warn!("Failed to restore headphone outputs");
        }
    }

    /// Record the outputs the audio path wants; applied unless clamped.
    pub(crate) fn set_output_enables(&mut self, enables: u32) -> Result<(), JackError> {
        self.hp_ena = enables & (OUT1L_ENA | OUT1R_ENA);
        if self.hp_clamp {
            return Ok(());
        }
        self.hw
            .regmap
            .update_bits(OUTPUT_ENABLES_1, OUT1L_ENA | OUT1R_ENA, self.hp_ena)
            .map_err(|_| JackError::Bus)
    }

    /// Select polarity mode `mode` (wrapping over the configured modes).
    pub(crate) fn set_mode(&mut self, mode: usize) -> Result<(), JackError> {
        let mode = mode.checked_rem(self.config.micd_modes.len()).unwrap_or(0);
        let Some(cfg) = self.config.micd_modes.get(mode).copied() else {
            return Err(JackError::Config(crate::error::ConfigError::NoPolarityModes));
        };

        if let Some(pin) = self.hw.polarity_gpio.as_mut() {
            pin.set_state(PinState::from(cfg.gpio))
                .map_err(|_| JackError::Gpio)?;
        }
        self.hw
            .regmap
            .update_bits(
                MIC_DETECT_1,
                MICD_BIAS_SRC_MASK,
                u32::from(cfg.bias).wrapping_shl(MICD_BIAS_SRC_SHIFT),
            )
            .map_err(|_| JackError::Bus)?;
        let src = if cfg.src { ACCDET_SRC } else { 0 };
        self.hw
            .regmap
            .update_bits(ACCESSORY_DETECT_MODE_1, ACCDET_SRC, src)
            .map_err(|_| JackError::Bus)?;

        self.micd_mode = mode;
        debug!("Set jack polarity to {}", mode);
        Ok(())
    }

    /// Force the primary mic bias on, then drop it again unless configured
    /// to stay forced.
    pub(crate) fn pulse_micbias(&mut self) {
        let bias = self.config.primary_bias();
        if self.hw.micbias.force_enable(bias).is_err() {
            warn!("Failed to enable mic bias {}", bias.index());
        }

        if self.config.micd_force_micbias_initial && self.detecting {
            return;
        }

        if !self.config.micd_force_micbias && self.hw.micbias.disable(bias).is_err() {
            warn!("Failed to disable mic bias {}", bias.index());
        }
    }

    fn write_reva_patch(&mut self, val: u32) {
        if !self.caps.micd_reva {
            return;
        }
        let regmap = &mut self.hw.regmap;
        let patched = regmap
            .write(TEST_KEY, TEST_KEY_UNLOCK)
            .and_then(|()| regmap.write(MICD_REVA_PATCH, val))
            .and_then(|()| regmap.write(TEST_KEY, 0));
        if patched.is_err() {
            warn!("Failed to apply rev A MICD patch");
        }
    }

    /// Power and start mic detection in `mode`.
    ///
    /// Fails with [`JackError::Supply`] when MICVDD cannot be enabled; the
    /// detection hardware is left untouched.
    pub(crate) fn micd_start(&mut self, mode: AccdetMode) -> Result<(), JackError> {
        if self.hw.micvdd.enable().is_err() {
            error!("Failed to enable MICVDD");
            return Err(JackError::Supply);
        }

        self.write_reva_patch(REVA_MICD_RUNNING);

        let mode = if self.detecting && self.config.micd_software_compare {
            AccdetMode::Adc
        } else {
            mode
        };
        if self
            .hw
            .regmap
            .update_bits(ACCESSORY_DETECT_MODE_1, ACCDET_MODE_MASK, mode.bits())
            .is_err()
        {
            warn!("Failed to set MICD mode {}", mode.name());
        }

        self.pulse_micbias();

        if self
            .hw
            .regmap
            .update_bits(MIC_DETECT_1, MICD_ENA, MICD_ENA)
            .is_err()
        {
            warn!("Failed to enable MICD");
        }
        Ok(())
    }

    /// Stop mic detection and drop its supplies.
    pub(crate) fn micd_stop(&mut self) {
        if self
            .hw
            .regmap
            .update_bits(MIC_DETECT_1, MICD_ENA, 0)
            .is_err()
        {
            warn!("Failed to disable MICD");
        }

        let bias = self.config.primary_bias();
        if self.hw.micbias.disable(bias).is_err() {
            warn!("Failed to disable mic bias {}", bias.index());
        }

        self.write_reva_patch(REVA_MICD_IDLE);

        if self
            .hw
            .regmap
            .update_bits(ACCESSORY_DETECT_MODE_1, ACCDET_MODE_MASK, AccdetMode::Mic.bits())
            .is_err()
        {
            warn!("Failed to reset accessory detect mode");
        }

        if self.hw.micvdd.disable().is_err() {
            warn!("Failed to disable MICVDD");
        }
    }

    /// Clamp and start a headphone measurement in `mode`.
    ///
    /// With a fixed impedance configured nothing is measured: the value is
    /// reported and [`JackError::FixedImpedance`] returned.
    pub(crate) fn hpdet_start(&mut self, mode: AccdetMode) -> Result<(), JackError> {
        if let Some(ohms) = self.config.fixed_hpdet_ohms {
            debug!("Using fixed headphone impedance {} ohms", ohms);
            self.set_headphone_impedance(ohms);
            return Err(JackError::FixedImpedance);
        }

        self.clamp(true);

        let started = self
            .hw
            .regmap
            .update_bits(ACCESSORY_DETECT_MODE_1, ACCDET_MODE_MASK, mode.bits())
            .and_then(|()| self.hw.regmap.update_bits(HEADPHONE_DETECT_1, HP_POLL, HP_POLL));
        if started.is_err() {
            error!("Can't start HPDET measurement in {}", mode.name());
            self.clamp(false);
            return Err(JackError::Bus);
        }
        Ok(())
    }

    /// Stop headphone measurement and release the clamp.
    pub(crate) fn hpdet_stop(&mut self) {
        let reset = self
            .hw
            .regmap
            .update_bits(HEADPHONE_DETECT_1, HP_IMPEDANCE_RANGE_MASK | HP_POLL, 0)
            .and_then(|()| {
                self.hw.regmap.update_bits(
                    ACCESSORY_DETECT_MODE_1,
                    ACCDET_MODE_MASK,
                    AccdetMode::Mic.bits(),
                )
            });
        if reset.is_err() {
            warn!("Failed to reset HPDET");
        }
        self.clamp(false);
    }

    /// Store a measured impedance, notify the sink and retune the outputs.
    pub(crate) fn set_headphone_impedance(&mut self, ohms: u32) {
        self.hp_impedance = ohms;
        self.hw.sink.hp_impedance(ohms);
        self.tune(ohms);
    }

    fn tune(&mut self, ohms: u32) {
        tune_headphone(
            &mut self.hw.regmap,
            self.codec.kind,
            self.short_circuit_ohms,
            &mut self.hp_level,
            ohms,
        );
    }

    pub(crate) fn has_id_gpio(&self) -> bool {
        self.config.hpdet_id_gpio && self.hw.id_gpio.is_some()
    }

    pub(crate) fn set_id_gpio(&mut self, high: bool) {
        if !self.config.hpdet_id_gpio {
            return;
        }
        if let Some(pin) = self.hw.id_gpio.as_mut() {
            if pin.set_state(PinState::from(high)).is_err() {
                warn!("Failed to drive ID GPIO");
            }
        }
    }

    // ── Bring-up / teardown ─────────────────────────────────────────────────

    /// Program the detection hardware from the configuration.
    pub(crate) fn init(&mut self) -> Result<(), JackError> {
        info!(
            "Jack detection on {} rev {}",
            self.codec.kind.name(),
            self.codec.revision
        );
        let config = &self.config;
        let regmap = &mut self.hw.regmap;
        let bus = |_| JackError::Bus;

        if config.gpsw > 0 {
            regmap
                .update_bits(GP_SWITCH_1, SW1_MODE_MASK, config.gpsw)
                .map_err(bus)?;
        }

        if let Some(first) = config.micd_modes.first() {
            if let Some(pin) = self.hw.polarity_gpio.as_mut() {
                pin.set_state(PinState::from(first.gpio))
                    .map_err(|_| JackError::Gpio)?;
            }
        }
        if config.hpdet_id_gpio {
            if let Some(pin) = self.hw.id_gpio.as_mut() {
                pin.set_low().map_err(|_| JackError::Gpio)?;
            }
        }

        for (value, mask, shift) in [
            (config.micd_bias_start_time, MICD_BIAS_STARTTIME_MASK, MICD_BIAS_STARTTIME_SHIFT),
            (config.micd_rate, MICD_RATE_MASK, MICD_RATE_SHIFT),
            (config.micd_dbtime, MICD_DBTIME_MASK, MICD_DBTIME_SHIFT),
        ] {
            if value > 0 {
                regmap
                    .update_bits(MIC_DETECT_1, mask, value.wrapping_shl(shift))
                    .map_err(bus)?;
            }
        }

        program_button_levels(regmap, &config.micd_ranges)?;

        if self.caps.micd_clamp {
            let clamp_mode = if config.jd_gpio5 {
                let mut gpio5 = GPIO5_JD_INPUT;
                if config.jd_gpio5_nopull {
                    gpio5 &= !GPN_PU;
                }
                regmap.write(GPIO5_CTRL, gpio5).map_err(bus)?;
                if config.jd_invert {
                    MICD_CLAMP_MODE_JDH_GP5H
                } else {
                    MICD_CLAMP_MODE_JDL_GP5H
                }
            } else if config.jd_invert {
                MICD_CLAMP_MODE_JDH
            } else {
                MICD_CLAMP_MODE_JDL
            };
            regmap
                .update_bits(MICD_CLAMP_CONTROL, MICD_CLAMP_MODE_MASK, clamp_mode)
                .map_err(bus)?;
            regmap
                .update_bits(JACK_DETECT_DEBOUNCE, MICD_CLAMP_DB, MICD_CLAMP_DB)
                .map_err(bus)?;
        }

        self.set_mode(0)?;

        let regmap = &mut self.hw.regmap;
        regmap
            .update_bits(JACK_DETECT_DEBOUNCE, JD1_DB, JD1_DB)
            .map_err(bus)?;
        regmap
            .update_bits(JACK_DETECT_ANALOGUE, JD1_ENA, JD1_ENA)
            .map_err(bus)?;

        if self.hw.micvdd.allow_bypass(true).is_err() {
            warn!("Failed to set MICVDD to bypass");
        }
        Ok(())
    }

    /// Disable detection hardware and drop pending work.
    pub(crate) fn shutdown(&mut self) {
        self.move_to(None);
        for work in Work::ALL {
            self.cancel(work);
        }
        let regmap = &mut self.hw.regmap;
        let disabled = regmap
            .update_bits(MICD_CLAMP_CONTROL, MICD_CLAMP_MODE_MASK, 0)
            .and_then(|()| regmap.update_bits(JACK_DETECT_ANALOGUE, JD1_ENA, 0));
        if disabled.is_err() {
            warn!("Failed to disable jack detection");
        }
    }

    /// Read the raw jack status register.
    pub(crate) fn read_jack_status(&mut self) -> Result<u32, JackError> {
        self.hw.regmap.read(AOD_IRQ_RAW_STATUS).map_err(|_| {
            error!("Failed to read jackdet status");
            JackError::Bus
        })
    }
}
