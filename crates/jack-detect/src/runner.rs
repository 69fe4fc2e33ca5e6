//! Async driver for boards without a kernel-style work queue.
//!
//! Interrupt handlers push a [`JackIrq`] into a channel with
//! [`try_send_irq`]; a single task runs [`run`], which drains the channel and
//! fires [`TimerQueue`] deadlines on the embassy timer.
//!
//! ```text
//! EXTI / codec IRQ ──try_send_irq──► Channel<JackIrq> ──► run() ──► JackDetect
//!                                                          ▲
//!                            TimerQueue deadlines ─────────┘
//! ```

use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::{Receiver, Sender};
use embassy_time::{Duration, Instant, Timer};
use platform::WorkQueue;

use crate::board::{Board, Work};
use crate::controller::JackDetect;

/// Depth of the interrupt channel.
pub const IRQ_CHANNEL_DEPTH: usize = 8;

/// Codec interrupt lines feeding the detection engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum JackIrq {
    /// Jack detect (or GPIO5 clamp) edge
    JackEdge,
    /// Mic detect measurement ready
    MicDetect,
    /// Headphone detect measurement ready
    HeadphoneDetect,
}

impl JackIrq {
    /// Stable name for log output.
    pub const fn name(self) -> &'static str {
        match self {
            Self::JackEdge => "jackdet",
            Self::MicDetect => "micdet",
            Self::HeadphoneDetect => "hpdet",
        }
    }
}

/// Queue an interrupt without blocking; returns `false` when the channel is
/// full and the interrupt was dropped.
///
/// Safe to call from interrupt context with a `CriticalSectionRawMutex`
/// channel.
pub fn try_send_irq<M: RawMutex, const N: usize>(
    tx: &Sender<'_, M, JackIrq, N>,
    irq: JackIrq,
) -> bool {
    match tx.try_send(irq) {
        Ok(()) => true,
        Err(_) => {
            warn!("Jack IRQ channel full, dropped {}", irq.name());
            false
        }
    }
}

/// [`WorkQueue`] backed by embassy-time deadlines, one slot per [`Work`].
#[derive(Debug, Default)]
pub struct TimerQueue {
    deadlines: [Option<Instant>; Work::ALL.len()],
}

impl TimerQueue {
    /// Create with nothing scheduled.
    pub const fn new() -> Self {
        Self {
            deadlines: [None; Work::ALL.len()],
        }
    }

    fn slot(&mut self, work: Work) -> Option<&mut Option<Instant>> {
        let index = Work::ALL.iter().position(|w| *w == work)?;
        self.deadlines.get_mut(index)
    }

    /// Earliest pending deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.iter().flatten().min().copied()
    }

    /// Deadline of `work`, if scheduled.
    pub fn deadline_of(&self, work: Work) -> Option<Instant> {
        let index = Work::ALL.iter().position(|w| *w == work)?;
        self.deadlines.get(index).copied().flatten()
    }

    /// Remove and return the earliest item due at or before `now`.
    pub fn take_expired(&mut self, now: Instant) -> Option<Work> {
        let (work, slot) = Work::ALL
            .iter()
            .zip(self.deadlines.iter_mut())
            .filter(|(_, at)| at.is_some_and(|at| at <= now))
            .min_by_key(|(_, at)| **at)?;
        *slot = None;
        Some(*work)
    }
}

impl WorkQueue<Work> for TimerQueue {
    fn schedule(&mut self, work: Work, delay_ms: u32) {
        let at = Instant::now()
            .checked_add(Duration::from_millis(u64::from(delay_ms)))
            .unwrap_or(Instant::MAX);
        if let Some(slot) = self.slot(work) {
            *slot = Some(at);
        }
    }

    fn cancel(&mut self, work: Work) {
        if let Some(slot) = self.slot(work) {
            *slot = None;
        }
    }
}

fn dispatch<M: RawMutex, B: Board>(jack: &JackDetect<M, B>, irq: JackIrq) {
    let handled = match irq {
        JackIrq::JackEdge => jack.on_jack_edge(),
        JackIrq::MicDetect => jack.on_micdet(),
        JackIrq::HeadphoneDetect => jack.on_hpdet(),
    };
    if let Err(err) = handled {
        debug!("{} IRQ: {}", irq.name(), err);
    }
}

fn fire_expired<M: RawMutex, B: Board<Work = TimerQueue>>(jack: &JackDetect<M, B>) {
    let now = Instant::now();
    while let Ok(Some(work)) = jack.with_peripherals(|hw| hw.work.take_expired(now)) {
        if let Err(err) = jack.run_work(work) {
            warn!("{} failed: {}", work.name(), err);
        }
    }
}

/// Drive `jack` from `irqs` and its own timer deadlines. Never returns.
pub async fn run<M, B, R, const N: usize>(
    jack: &JackDetect<M, B>,
    irqs: Receiver<'_, R, JackIrq, N>,
) where
    M: RawMutex,
    R: RawMutex,
    B: Board<Work = TimerQueue>,
{
    info!("Jack detection task started");
    loop {
        let deadline = jack
            .with_peripherals(|hw| hw.work.next_deadline())
            .ok()
            .flatten();
        let expiry = async {
            match deadline {
                Some(at) => Timer::at(at).await,
                None => core::future::pending().await,
            }
        };

        match select(irqs.receive(), expiry).await {
            Either::First(irq) => dispatch(jack, irq),
            Either::Second(()) => fire_expired(jack),
        }
    }
}
