//! Detection states.
//!
//! Each state owns a slice of the detection sequence: what it switches on when
//! entered, how it interprets a reading, what it tears down when left, and
//! optionally what happens when it times out or must re-measure.
//!
//! ```text
//!              insert
//!                │
//!   ┌────────────┼──────────────────┐
//!   ▼            ▼                  ▼
//! HpdetMoisture  MicdMicrophone ◄── HpdetAccId (after 500 ms)
//!   │   ▲           │ (mic / no mic / timeout)
//!   └───┘           ▼
//!              HpdetLeft / HpdetRight
//!                   │ mic
//!                   ▼
//!               MicdButton
//! ```
//!
//! The behaviour lives in `impl Session` below so every state shares the
//! session's hardware helpers; dispatch is a `match` on [`DetectionState`].

use platform::{AccessorySink, HeadsetState, RegisterMap, Regulator};

use crate::board::Board;
use crate::classifier::{MicdStatus, HPDET_MAX_OHMS};
use crate::config::HpdetChannel;
use crate::error::JackError;
use crate::registers::{
    AccdetMode, ACCDET_MODE_MASK, ACCDET_SRC, ACCESSORY_DETECT_MODE_1, HEADPHONE_DETECT_1,
    HP_IMPEDANCE_RANGE_MASK, HP_POLL,
};
use crate::session::Session;

/// Headphone reading synthesized for the first accessory-ID sample when line
/// outputs are not identified.
const ACC_ID_ASSUMED_HP_OHMS: u32 = 32;

/// Second accessory-ID reading above which the mic contact holds a microphone.
const ACC_ID_MIC_MIN_OHMS: u32 = 50;

/// One step of the detection sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DetectionState {
    /// Measure the jack for moisture before trusting the insertion
    HpdetMoisture,
    /// Measure the left headphone channel
    HpdetLeft,
    /// Measure the right headphone channel
    HpdetRight,
    /// Identify the accessory with the headphone detect block
    HpdetAccId,
    /// Watch the mic contact for button presses
    MicdButton,
    /// Decide whether a microphone is present
    MicdMicrophone,
}

impl DetectionState {
    /// Accessory detect mode the state runs the hardware in.
    pub const fn mode(self) -> AccdetMode {
        match self {
            Self::HpdetMoisture | Self::HpdetLeft | Self::HpdetAccId => AccdetMode::Hpl,
            Self::HpdetRight => AccdetMode::Hpr,
            Self::MicdButton | Self::MicdMicrophone => AccdetMode::Mic,
        }
    }

    /// Whether the state declares a timeout.
    pub const fn has_timeout(self) -> bool {
        matches!(self, Self::MicdMicrophone)
    }

    /// Whether the state can re-arm its measurement after a retry.
    pub const fn has_restart(self) -> bool {
        matches!(self, Self::HpdetAccId)
    }

    /// Headphone measurement state for a channel.
    pub const fn hpdet_for(channel: HpdetChannel) -> Self {
        match channel {
            HpdetChannel::Left => Self::HpdetLeft,
            HpdetChannel::Right => Self::HpdetRight,
        }
    }

    /// Stable name for log output.
    pub const fn name(self) -> &'static str {
        match self {
            Self::HpdetMoisture => "hpdet-moisture",
            Self::HpdetLeft => "hpdet-left",
            Self::HpdetRight => "hpdet-right",
            Self::HpdetAccId => "hpdet-acc-id",
            Self::MicdButton => "micd-button",
            Self::MicdMicrophone => "micd-microphone",
        }
    }
}

/// A sample handed to the active state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Reading {
    /// Mic detect status (hardware or software-compare encoding)
    Micd(MicdStatus),
    /// Headphone impedance in ohms
    Hpdet(u32),
}

/// What a state made of a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Outcome {
    /// Hardware reconfigured; measure again through the state's restart hook
    Retry,
    /// Reading consumed, waiting for the next one
    NeedMoreData,
    /// Detection step complete; carries the classification if one was reported
    Finalize(Option<HeadsetState>),
}

impl<B: Board> Session<B> {
    /// Entry action.
    pub(crate) fn enter_state(&mut self, state: DetectionState) -> Result<(), JackError> {
        match state {
            DetectionState::HpdetMoisture => {
                let ret = self.hpdet_start(state.mode());
                self.clamp(false);
                ret
            }
            DetectionState::HpdetLeft | DetectionState::HpdetRight => {
                self.hpdet_start(state.mode())
            }
            DetectionState::HpdetAccId => self.acc_id_start(),
            DetectionState::MicdButton => self.micd_start(state.mode()),
            DetectionState::MicdMicrophone => {
                self.detecting = true;
                if self.hw.micvdd.allow_bypass(false).is_err() {
                    error!("Failed to regulate MICVDD");
                }
                let ret = self.micd_start(state.mode());
                if ret.is_err() {
                    if self.hw.micvdd.allow_bypass(true).is_err() {
                        error!("Failed to bypass MICVDD");
                    }
                    self.detecting = false;
                }
                ret
            }
        }
    }

    /// Exit action.
    pub(crate) fn exit_state(&mut self, state: DetectionState) {
        match state {
            DetectionState::HpdetMoisture
            | DetectionState::HpdetLeft
            | DetectionState::HpdetRight => self.hpdet_stop(),
            DetectionState::HpdetAccId => self.acc_id_stop(),
            DetectionState::MicdButton => self.micd_stop(),
            DetectionState::MicdMicrophone => {
                self.micd_stop();
                if self.hw.micvdd.allow_bypass(true).is_err() {
                    error!("Failed to bypass MICVDD");
                }
                self.detecting = false;
            }
        }
    }

    /// Interpret a reading in `state`.
    pub(crate) fn state_reading(
        &mut self,
        state: DetectionState,
        reading: Reading,
    ) -> Result<Outcome, JackError> {
        match (state, reading) {
            (DetectionState::HpdetMoisture, Reading::Hpdet(ohms)) => Ok(self.moisture_reading(ohms)),
            (DetectionState::HpdetLeft | DetectionState::HpdetRight, Reading::Hpdet(ohms)) => {
                Ok(self.hpdet_reading(ohms))
            }
            (DetectionState::HpdetAccId, Reading::Hpdet(ohms)) => self.acc_id_reading(ohms),
            (DetectionState::MicdButton, Reading::Micd(status)) => Ok(self.button_reading(status)),
            (DetectionState::MicdMicrophone, Reading::Micd(status)) => Ok(self.mic_reading(status)),
            _ => {
                warn!("Reading does not match state {}", state.name());
                Err(JackError::Spurious)
            }
        }
    }

    /// Re-arm the measurement after [`Outcome::Retry`].
    pub(crate) fn restart_state(&mut self, state: DetectionState) {
        if state.has_restart() {
            self.hpdet_restart();
        }
    }

    /// Timeout action.
    pub(crate) fn state_timeout(&mut self, state: DetectionState) {
        if state == DetectionState::MicdMicrophone {
            debug!("MICD timed out, reporting HP");
            let hpdet = DetectionState::hpdet_for(self.config.hpdet_channel);
            if self.set_state(Some(hpdet)).is_err() {
                self.report(HeadsetState::HeadsetNoMic);
            }
        }
    }

    fn moisture_reading(&mut self, ohms: u32) -> Outcome {
        let limit = self.config.hpdet_moisture_ohms.unwrap_or(u32::MAX);
        if ohms < limit {
            self.move_to(Some(DetectionState::MicdMicrophone));
        } else {
            warn!("Jack detection due to moisture, ignoring ({} ohms)", ohms);
            self.move_to(None);
        }
        Outcome::Finalize(None)
    }

    fn hpdet_reading(&mut self, ohms: u32) -> Outcome {
        self.set_headphone_impedance(ohms);
        if self.mic {
            self.report(HeadsetState::Headset);
            self.move_to(Some(DetectionState::MicdButton));
            Outcome::Finalize(Some(HeadsetState::Headset))
        } else {
            self.report(HeadsetState::HeadsetNoMic);
            self.move_to(None);
            Outcome::Finalize(Some(HeadsetState::HeadsetNoMic))
        }
    }

    fn mic_reading(&mut self, status: MicdStatus) -> Outcome {
        if !status.present() {
            warn!("Detected open circuit");
            self.mic = self.config.micd_open_circuit_declare;
        } else if status.is_high_impedance() {
            debug!("Detected headset");
            self.mic = true;
        } else if status.is_low_impedance() {
            let modes = u32::try_from(self.config.micd_modes.len()).unwrap_or(u32::MAX);
            if self.jack_flips >= modes.saturating_mul(10) {
                debug!("Detected HP/line");
            } else {
                // Low impedance on the mic contact: probably the wrong polarity.
                let next = self.micd_mode.wrapping_add(1);
                if self.set_mode(next).is_err() {
                    warn!("Failed to flip jack polarity");
                }
                self.jack_flips = self.jack_flips.saturating_add(1);
                return Outcome::NeedMoreData;
            }
        } else {
            debug!("Headphone detected");
        }

        let hpdet = DetectionState::hpdet_for(self.config.hpdet_channel);
        let reported = if self.set_state(Some(hpdet)).is_err() {
            let state = if self.mic {
                HeadsetState::Headset
            } else {
                HeadsetState::HeadsetNoMic
            };
            self.report(state);
            Some(state)
        } else {
            None
        };
        self.hw.sink.mic_detected(self.mic);
        Outcome::Finalize(reported)
    }

    fn button_reading(&mut self, status: MicdStatus) -> Outcome {
        if status.has_button_level() {
            debug!("Mic button detected");
            let slot = status
                .button_index()
                .and_then(|index| usize::try_from(index).ok())
                .filter(|slot| *slot < self.config.micd_ranges.len());
            match slot {
                Some(slot) => {
                    self.buttons
                        .press(&mut self.hw.sink, &self.config.micd_ranges, slot);
                }
                None => {
                    self.buttons
                        .release_all(&mut self.hw.sink, &self.config.micd_ranges);
                    warn!("Button level {} out of range", status.levels());
                }
            }
            self.hw.sink.sync();
        } else {
            debug!("Mic button released");
            self.buttons
                .release_all(&mut self.hw.sink, &self.config.micd_ranges);
            self.hw.sink.sync();
            self.pulse_micbias();
        }
        Outcome::Finalize(None)
    }

    fn acc_id_start(&mut self) -> Result<(), JackError> {
        debug!("Starting identification via HPDET");
        self.readings.clear();
        self.hpdet_retried = false;
        self.clamp(true);

        let src = self.config.primary_src();
        let started = self
            .hw
            .regmap
            .update_bits(
                ACCESSORY_DETECT_MODE_1,
                ACCDET_SRC | ACCDET_MODE_MASK,
                src | AccdetMode::Hpl.bits(),
            )
            .and_then(|()| {
                if self.config.hpdet_acc_id_line {
                    self.hw.regmap.update_bits(HEADPHONE_DETECT_1, HP_POLL, HP_POLL)
                } else {
                    Ok(())
                }
            });
        if started.is_err() {
            error!("Failed to start HPDET identification");
            self.clamp(false);
            self.report(HeadsetState::HeadsetNoMic);
            return Err(JackError::Bus);
        }

        if !self.config.hpdet_acc_id_line {
            // Line outputs are not identified: take the headphone load as given.
            if let Ok(Outcome::Retry) = self.acc_id_reading(ACC_ID_ASSUMED_HP_OHMS) {
                if self.state == Some(DetectionState::HpdetAccId) {
                    self.hpdet_restart();
                }
            }
        }
        Ok(())
    }

    fn acc_id_reading(&mut self, ohms: u32) -> Result<Outcome, JackError> {
        if self.readings.push(ohms).is_err() {
            warn!("Too many HPDET readings, dropping {}", ohms);
            return Err(JackError::InvalidMeasurement);
        }

        let src = self.config.primary_src();
        if self.has_id_gpio() && self.readings.len() == 1 {
            debug!("Measuring mic");
            self.hw
                .regmap
                .update_bits(
                    ACCESSORY_DETECT_MODE_1,
                    ACCDET_SRC | ACCDET_MODE_MASK,
                    src | AccdetMode::Hpr.bits(),
                )
                .map_err(|_| JackError::Bus)?;
            self.set_id_gpio(true);
            return Ok(Outcome::Retry);
        }

        let first = self.readings.first().copied().unwrap_or(0);
        let second = self.readings.get(1).copied().unwrap_or(0);
        debug!("HPDET measured {} {}", first, second);

        // Slow insertion can read open circuit; measure once more.
        if first >= HPDET_MAX_OHMS && !self.hpdet_retried {
            debug!("Retrying high impedance");
            self.readings.clear();
            self.hpdet_retried = true;
            self.hw
                .regmap
                .update_bits(
                    ACCESSORY_DETECT_MODE_1,
                    ACCDET_SRC | ACCDET_MODE_MASK,
                    src | AccdetMode::Hpl.bits(),
                )
                .map_err(|_| JackError::Bus)?;
            return Ok(Outcome::Retry);
        }

        if !self.has_id_gpio() || second > ACC_ID_MIC_MIN_OHMS {
            debug!("Detected mic");
            self.move_to(Some(DetectionState::MicdMicrophone));
            Ok(Outcome::Finalize(None))
        } else {
            debug!("Detected headphone");
            self.report(HeadsetState::HeadsetNoMic);
            self.move_to(None);
            Ok(Outcome::Finalize(Some(HeadsetState::HeadsetNoMic)))
        }
    }

    fn acc_id_stop(&mut self) {
        let src = self.config.primary_src();
        if self
            .hw
            .regmap
            .update_bits(ACCESSORY_DETECT_MODE_1, ACCDET_SRC, src)
            .is_err()
        {
            warn!("Failed to restore jack polarity");
        }
        self.set_id_gpio(false);
        self.hpdet_stop();
    }

    /// Reset the impedance range and poll again.
    pub(crate) fn hpdet_restart(&mut self) {
        let reset = self
            .hw
            .regmap
            .update_bits(HEADPHONE_DETECT_1, HP_IMPEDANCE_RANGE_MASK | HP_POLL, 0)
            .and_then(|()| self.hw.regmap.update_bits(HEADPHONE_DETECT_1, HP_POLL, HP_POLL));
        if reset.is_err() {
            warn!("Failed to restart HPDET");
        }
    }
}
