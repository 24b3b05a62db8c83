//! Cancellable Timers
//!
//! A small queue of one-shot timers keyed by generational handles. Nothing
//! runs on its own: the owner polls the queue with the current time and acts
//! on whatever is due. A cancelled or already-fired [`TimerId`] is simply
//! stale; cancelling it again is a no-op.

use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Handle to a scheduled timer
    pub struct TimerId;
}

#[derive(Debug)]
struct Timer<A> {
    deadline: f64,
    seq: u64,
    action: A,
}

/// One-shot timers carrying an action of type `A`
#[derive(Debug)]
pub struct TimerQueue<A> {
    timers: SlotMap<TimerId, Timer<A>>,
    next_seq: u64,
}

impl<A> TimerQueue<A> {
    pub fn new() -> Self {
        Self {
            timers: SlotMap::with_key(),
            next_seq: 0,
        }
    }

    /// Schedule `action` to become due at `deadline` (seconds)
    pub fn schedule(&mut self, deadline: f64, action: A) -> TimerId {
        let seq = self.next_seq;
        self.next_seq += 1;
        let id = self.timers.insert(Timer {
            deadline,
            seq,
            action,
        });
        log::trace!("timer {:?} scheduled for t={:.4}", id, deadline);
        id
    }

    /// Cancel a timer, returning its action if it was still pending
    pub fn cancel(&mut self, id: TimerId) -> Option<A> {
        let timer = self.timers.remove(id)?;
        log::trace!("timer {:?} cancelled (was due t={:.4})", id, timer.deadline);
        Some(timer.action)
    }

    /// Cancel every pending timer, returning how many were dropped
    pub fn cancel_all(&mut self) -> usize {
        let n = self.timers.len();
        self.timers.clear();
        n
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.timers.contains_key(id)
    }

    /// Earliest pending deadline
    pub fn next_deadline(&self) -> Option<f64> {
        self.timers
            .values()
            .map(|t| t.deadline)
            .min_by(|a, b| a.total_cmp(b))
    }

    /// Remove and return the earliest timer due at or before `now`.
    ///
    /// Timers with equal deadlines fire in scheduling order.
    pub fn pop_due(&mut self, now: f64) -> Option<(TimerId, A)> {
        let id = self
            .timers
            .iter()
            .filter(|(_, t)| t.deadline <= now)
            .min_by(|(_, a), (_, b)| a.deadline.total_cmp(&b.deadline).then(a.seq.cmp(&b.seq)))
            .map(|(id, _)| id)?;
        let timer = self.timers.remove(id)?;
        log::trace!("timer {:?} fired (due t={:.4}, now t={:.4})", id, timer.deadline, now);
        Some((id, timer.action))
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}

impl<A> Default for TimerQueue<A> {
    fn default() -> Self {
        Self::new()
    }
}
