//! Jack detection controller.
//!
//! [`JackDetect`] is the only entry point. Every operation takes the session
//! lock for its whole duration, so jack edges, detection interrupts and fired
//! work never interleave. Calls made from inside an [`AccessorySink`]
//! callback (which runs with the lock held) fail with [`JackError::Busy`].
//!
//! [`AccessorySink`]: platform::AccessorySink

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use platform::HeadsetState;

use crate::board::{Board, Peripherals, Work};
use crate::config::{Codec, JackConfig};
use crate::error::JackError;
use crate::session::Session;
use crate::state::{DetectionState, Reading};

/// Jack detection and accessory identification for one headphone jack.
///
/// `M` is the raw mutex guarding the session: `CriticalSectionRawMutex` when
/// interrupt handlers call in directly, `NoopRawMutex` when a single task
/// (such as [`run`](crate::runner::run)) owns the controller.
pub struct JackDetect<M: RawMutex, B: Board> {
    session: Mutex<M, RefCell<Session<B>>>,
}

impl<M: RawMutex, B: Board> JackDetect<M, B> {
    /// Validate `config`, program the detection hardware and arm jack detect.
    pub fn new(
        peripherals: Peripherals<B>,
        config: JackConfig,
        codec: Codec,
    ) -> Result<Self, JackError> {
        config.validate().map_err(|err| {
            error!("Rejecting jack detection config: {}", err);
            JackError::Config(err)
        })?;

        let mut session = Session::new(peripherals, config, codec);
        session.init()?;
        Ok(Self {
            session: Mutex::new(RefCell::new(session)),
        })
    }

    fn with_session<R>(&self, f: impl FnOnce(&mut Session<B>) -> R) -> Result<R, JackError> {
        self.session.lock(|cell| {
            let mut session = cell.try_borrow_mut().map_err(|_| JackError::Busy)?;
            Ok(f(&mut session))
        })
    }

    /// Jack detect interrupt: read the raw jack status and act on it.
    pub fn on_jack_edge(&self) -> Result<(), JackError> {
        self.with_session(|s| {
            let raw = s.read_jack_status()?;
            s.handle_jackdet(raw);
            Ok(())
        })?
    }

    /// Jack status bits delivered by the host instead of read from the codec.
    pub fn on_jack_status(&self, raw: u32) -> Result<(), JackError> {
        self.with_session(|s| s.handle_jackdet(raw))
    }

    /// Mic detect interrupt.
    pub fn on_micdet(&self) -> Result<(), JackError> {
        self.with_session(Session::handle_micdet)?
    }

    /// Headphone detect interrupt.
    pub fn on_hpdet(&self) -> Result<(), JackError> {
        self.with_session(Session::handle_hpdet)?
    }

    /// A reading sampled by the host, handed to the active state.
    pub fn on_detection_ready(&self, reading: Reading) -> Result<(), JackError> {
        self.with_session(|s| s.handle_reading(reading))?
    }

    /// Run a fired work item. Items cancelled since scheduling are ignored.
    ///
    /// A debounced mic sample that lands outside mic detection returns
    /// [`JackError::Spurious`], like [`on_micdet`](Self::on_micdet).
    pub fn run_work(&self, work: Work) -> Result<(), JackError> {
        self.with_session(|s| s.run_work(work))?
    }

    /// Move to `state` directly (`None` stops detection).
    pub fn set_state(&self, state: Option<DetectionState>) -> Result<(), JackError> {
        self.with_session(|s| s.set_state(state))?
    }

    /// Last reported accessory.
    pub fn headset_state(&self) -> Result<HeadsetState, JackError> {
        self.with_session(|s| s.headset)
    }

    /// Last measured headphone impedance in ohms (0 when nothing measured).
    pub fn hp_impedance(&self) -> Result<u32, JackError> {
        self.with_session(|s| s.hp_impedance)
    }

    /// Active detection state.
    pub fn active_state(&self) -> Result<Option<DetectionState>, JackError> {
        self.with_session(|s| s.state)
    }

    /// Whether a microphone was detected on the current accessory.
    pub fn mic_detected(&self) -> Result<bool, JackError> {
        self.with_session(|s| s.mic)
    }

    /// Whether the headphone outputs are clamped for a measurement.
    pub fn is_clamped(&self) -> Result<bool, JackError> {
        self.with_session(|s| s.hp_clamp)
    }

    /// Whether `work` is scheduled.
    pub fn is_pending(&self, work: Work) -> Result<bool, JackError> {
        self.with_session(|s| s.is_pending(work))
    }

    /// Headphone output enables (`OUT1L_ENA` / `OUT1R_ENA`) wanted by the
    /// audio path. Deferred while the outputs are clamped.
    pub fn set_output_enables(&self, enables: u32) -> Result<(), JackError> {
        self.with_session(|s| s.set_output_enables(enables))?
    }

    /// Borrow the board drivers under the session lock.
    pub fn with_peripherals<R>(
        &self,
        f: impl FnOnce(&mut Peripherals<B>) -> R,
    ) -> Result<R, JackError> {
        self.with_session(|s| f(&mut s.hw))
    }

    /// Stop detection, disable jack detect and hand the drivers back.
    pub fn shutdown(self) -> Peripherals<B> {
        let mut session = self.session.into_inner().into_inner();
        session.shutdown();
        session.hw
    }
}
