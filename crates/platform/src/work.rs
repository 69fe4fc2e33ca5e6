//! Deferred work abstraction
//!
//! The detection engine needs three kinds of delayed callbacks (a state
//! timeout, a debounced re-read and a delayed accessory-ID start). A
//! [`WorkQueue`] only schedules and cancels them; the owner of the queue calls
//! back into the engine when a work item fires.

/// Delayed work scheduler.
///
/// Scheduling an item that is already pending replaces its deadline.
/// Cancelling an item that is not pending is a no-op.
pub trait WorkQueue<W> {
    /// Run `work` after `delay_ms` milliseconds.
    fn schedule(&mut self, work: W, delay_ms: u32);

    /// Drop a pending `work` item.
    fn cancel(&mut self, work: W);
}

impl<W, T: WorkQueue<W> + ?Sized> WorkQueue<W> for &mut T {
    fn schedule(&mut self, work: W, delay_ms: u32) {
        (**self).schedule(work, delay_ms);
    }

    fn cancel(&mut self, work: W) {
        (**self).cancel(work);
    }
}
