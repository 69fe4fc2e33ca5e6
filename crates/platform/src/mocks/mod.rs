//! Mock implementations for testing
//!
//! This module provides mock implementations of all platform traits
//! for use in unit and integration tests.

#![cfg(any(test, feature = "std"))]

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::vec::Vec;

use crate::accessory::{AccessorySink, HeadsetState};
use crate::input::Key;
use crate::power::{MicBias, MicBiasSource, Regulator};
use crate::regmap::RegisterMap;
use crate::work::WorkQueue;

/// Error injected by the mocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockBusError;

/// In-memory register map.
///
/// Reads return the next queued value for a register if one was queued with
/// [`queue_read`](Self::queue_read), otherwise the stored value (0 when the
/// register was never written). Every write is logged.
#[derive(Debug, Default)]
pub struct MockRegmap {
    regs: BTreeMap<u32, u32>,
    queued: BTreeMap<u32, VecDeque<u32>>,
    writes: Vec<(u32, u32)>,
    reads: Vec<u32>,
    failing: BTreeSet<u32>,
}

impl MockRegmap {
    /// Create an empty register map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a register without logging a write.
    pub fn set(&mut self, reg: u32, val: u32) {
        self.regs.insert(reg, val);
    }

    /// Current stored value.
    pub fn get(&self, reg: u32) -> u32 {
        self.regs.get(&reg).copied().unwrap_or(0)
    }

    /// Queue a one-shot value returned by the next read of `reg`.
    pub fn queue_read(&mut self, reg: u32, val: u32) {
        self.queued.entry(reg).or_default().push_back(val);
    }

    /// Make every access to `reg` fail until [`clear_failures`](Self::clear_failures).
    pub fn fail_on(&mut self, reg: u32) {
        self.failing.insert(reg);
    }

    /// Stop injecting failures.
    pub fn clear_failures(&mut self) {
        self.failing.clear();
    }

    /// All writes in order.
    pub fn writes(&self) -> &[(u32, u32)] {
        &self.writes
    }

    /// Values written to `reg`, in order.
    pub fn writes_to(&self, reg: u32) -> Vec<u32> {
        self.writes
            .iter()
            .filter(|(r, _)| *r == reg)
            .map(|(_, v)| *v)
            .collect()
    }

    /// Number of reads of `reg`.
    pub fn read_count(&self, reg: u32) -> usize {
        self.reads.iter().filter(|r| **r == reg).count()
    }

    /// Forget the write and read logs.
    pub fn clear_log(&mut self) {
        self.writes.clear();
        self.reads.clear();
    }
}

impl RegisterMap for MockRegmap {
    type Error = MockBusError;

    fn read(&mut self, reg: u32) -> Result<u32, Self::Error> {
        if self.failing.contains(&reg) {
            return Err(MockBusError);
        }
        self.reads.push(reg);
        if let Some(val) = self.queued.get_mut(&reg).and_then(VecDeque::pop_front) {
            return Ok(val);
        }
        Ok(self.get(reg))
    }

    fn write(&mut self, reg: u32, val: u32) -> Result<(), Self::Error> {
        if self.failing.contains(&reg) {
            return Err(MockBusError);
        }
        self.writes.push((reg, val));
        self.regs.insert(reg, val);
        Ok(())
    }
}

/// Output pin that records its level history.
#[derive(Debug, Default)]
pub struct MockPin {
    levels: Vec<bool>,
}

impl MockPin {
    /// Create a pin that has never been driven.
    pub fn new() -> Self {
        Self::default()
    }

    /// Last driven level (`None` if never driven).
    pub fn level(&self) -> Option<bool> {
        self.levels.last().copied()
    }

    /// Every level driven, in order.
    pub fn history(&self) -> &[bool] {
        &self.levels
    }
}

impl embedded_hal::digital::ErrorType for MockPin {
    type Error = core::convert::Infallible;
}

impl embedded_hal::digital::OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.levels.push(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.levels.push(true);
        Ok(())
    }
}

/// Reference-counted regulator.
#[derive(Debug, Default)]
pub struct MockRegulator {
    enables: u32,
    bypass: bool,
    fail_enable: bool,
}

impl MockRegulator {
    /// Create a disabled regulator with bypass forbidden.
    pub fn new() -> Self {
        Self::default()
    }

    /// Outstanding enable references.
    pub fn enable_count(&self) -> u32 {
        self.enables
    }

    /// Whether bypass is currently allowed.
    pub fn bypass_allowed(&self) -> bool {
        self.bypass
    }

    /// Make [`Regulator::enable`] fail.
    pub fn fail_enable(&mut self, fail: bool) {
        self.fail_enable = fail;
    }
}

impl Regulator for MockRegulator {
    type Error = MockBusError;

    fn enable(&mut self) -> Result<(), Self::Error> {
        if self.fail_enable {
            return Err(MockBusError);
        }
        self.enables = self.enables.saturating_add(1);
        Ok(())
    }

    fn disable(&mut self) -> Result<(), Self::Error> {
        self.enables = self.enables.saturating_sub(1);
        Ok(())
    }

    fn allow_bypass(&mut self, allow: bool) -> Result<(), Self::Error> {
        self.bypass = allow;
        Ok(())
    }
}

/// Mic bias control that records forced sources.
#[derive(Debug, Default)]
pub struct MockBias {
    forced: BTreeSet<u8>,
    pulses: usize,
}

impl MockBias {
    /// Create with every bias released.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `source` is currently forced on.
    pub fn is_forced(&self, source: MicBiasSource) -> bool {
        self.forced.contains(&source.index())
    }

    /// Number of force-enable calls.
    pub fn force_count(&self) -> usize {
        self.pulses
    }
}

impl MicBias for MockBias {
    type Error = MockBusError;

    fn force_enable(&mut self, source: MicBiasSource) -> Result<(), Self::Error> {
        self.forced.insert(source.index());
        self.pulses = self.pulses.saturating_add(1);
        Ok(())
    }

    fn disable(&mut self, source: MicBiasSource) -> Result<(), Self::Error> {
        self.forced.remove(&source.index());
        Ok(())
    }
}

/// Work queue that only records what is pending; tests fire items by hand.
#[derive(Debug)]
pub struct MockWorkQueue<W> {
    pending: Vec<(W, u32)>,
    scheduled: usize,
}

impl<W> Default for MockWorkQueue<W> {
    fn default() -> Self {
        Self {
            pending: Vec::new(),
            scheduled: 0,
        }
    }
}

impl<W: Copy + PartialEq> MockWorkQueue<W> {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `work` is pending.
    pub fn is_pending(&self, work: W) -> bool {
        self.pending.iter().any(|(w, _)| *w == work)
    }

    /// Delay `work` was last scheduled with.
    pub fn delay_of(&self, work: W) -> Option<u32> {
        self.pending.iter().find(|(w, _)| *w == work).map(|(_, d)| *d)
    }

    /// Remove `work` from the queue as if it fired; returns whether it was pending.
    pub fn take(&mut self, work: W) -> bool {
        let before = self.pending.len();
        self.pending.retain(|(w, _)| *w != work);
        self.pending.len() != before
    }

    /// Total number of `schedule` calls.
    pub fn schedule_count(&self) -> usize {
        self.scheduled
    }
}

impl<W: Copy + PartialEq> WorkQueue<W> for MockWorkQueue<W> {
    fn schedule(&mut self, work: W, delay_ms: u32) {
        self.pending.retain(|(w, _)| *w != work);
        self.pending.push((work, delay_ms));
        self.scheduled = self.scheduled.saturating_add(1);
    }

    fn cancel(&mut self, work: W) {
        self.pending.retain(|(w, _)| *w != work);
    }
}

/// Event recorded by [`RecordingSink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkEvent {
    /// `report_state`
    State(HeadsetState),
    /// `report_key`
    Key(Key, bool),
    /// `sync`
    Sync,
    /// `hp_impedance`
    Impedance(u32),
    /// `mic_detected`
    Mic(bool),
}

/// Accessory sink that records every call.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Vec<SinkEvent>,
}

impl RecordingSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// All events in order.
    pub fn events(&self) -> &[SinkEvent] {
        &self.events
    }

    /// Headset states reported, in order.
    pub fn states(&self) -> Vec<HeadsetState> {
        self.events
            .iter()
            .filter_map(|e| match e {
                SinkEvent::State(s) => Some(*s),
                _ => None,
            })
            .collect()
    }

    /// Key edges reported, in order.
    pub fn keys(&self) -> Vec<(Key, bool)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                SinkEvent::Key(k, p) => Some((*k, *p)),
                _ => None,
            })
            .collect()
    }

    /// Impedances reported, in order.
    pub fn impedances(&self) -> Vec<u32> {
        self.events
            .iter()
            .filter_map(|e| match e {
                SinkEvent::Impedance(z) => Some(*z),
                _ => None,
            })
            .collect()
    }

    /// Most recent headset state.
    pub fn last_state(&self) -> Option<HeadsetState> {
        self.states().last().copied()
    }

    /// Forget recorded events.
    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl AccessorySink for RecordingSink {
    fn report_state(&mut self, state: HeadsetState) {
        self.events.push(SinkEvent::State(state));
    }

    fn report_key(&mut self, key: Key, pressed: bool) {
        self.events.push(SinkEvent::Key(key, pressed));
    }

    fn sync(&mut self) {
        self.events.push(SinkEvent::Sync);
    }

    fn hp_impedance(&mut self, ohms: u32) {
        self.events.push(SinkEvent::Impedance(ohms));
    }

    fn mic_detected(&mut self, present: bool) {
        self.events.push(SinkEvent::Mic(present));
    }
}
