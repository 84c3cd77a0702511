// Holdfast Timer Service
// Cancelable one-shot timers, drained by the engine in deadline order

use std::collections::{BTreeMap, HashMap};

use crate::event::Timestamp;
use crate::Key;

/// Identifies one scheduled timer. Handles are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

/// What a timer means to the engine when it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerToken {
    /// Tapping term of a tap/hold key
    TapHold(Key),
    /// Tapping term of the layer key
    LayerTerm,
    /// Hold-to-activate threshold of a secondary key
    SecondaryHold(Key),
}

/// A timer that reached its deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fired {
    pub handle: TimerHandle,
    pub deadline: Timestamp,
    pub token: TimerToken,
}

/// Schedules single cancelable delayed callbacks.
///
/// The engine pulls due timers with [`TimerService::pop_due`] one at a time, so
/// a firing may cancel timers that share its deadline before they are popped.
pub trait TimerService {
    fn schedule(&mut self, deadline: Timestamp, token: TimerToken) -> TimerHandle;

    /// Cancel a pending timer.
    ///
    /// Returns false when the timer already fired or was already canceled; that
    /// case is a no-op.
    fn cancel(&mut self, handle: TimerHandle) -> bool;

    /// Earliest pending deadline
    fn next_deadline(&self) -> Option<Timestamp>;

    /// Remove and return the earliest timer whose deadline is `<= now`.
    ///
    /// Timers with equal deadlines come out in scheduling order.
    fn pop_due(&mut self, now: Timestamp) -> Option<Fired>;

    /// Cancel everything
    fn clear(&mut self);
}

/// Deterministic in-memory timer queue
#[derive(Debug, Default)]
pub struct TimerQueue {
    next_id: u64,
    by_deadline: BTreeMap<(Timestamp, TimerHandle), TimerToken>,
    deadlines: HashMap<TimerHandle, Timestamp>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.deadlines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.deadlines.contains_key(&handle)
    }
}

impl TimerService for TimerQueue {
    fn schedule(&mut self, deadline: Timestamp, token: TimerToken) -> TimerHandle {
        let handle = TimerHandle(self.next_id);
        self.next_id += 1;
        self.by_deadline.insert((deadline, handle), token);
        self.deadlines.insert(handle, deadline);
        log::trace!("timer {:?} scheduled for {} ({:?})", handle, deadline, token);
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) -> bool {
        match self.deadlines.remove(&handle) {
            Some(deadline) => {
                self.by_deadline.remove(&(deadline, handle));
                log::trace!("timer {:?} canceled", handle);
                true
            }
            None => false,
        }
    }

    fn next_deadline(&self) -> Option<Timestamp> {
        self.by_deadline.keys().next().map(|&(deadline, _)| deadline)
    }

    fn pop_due(&mut self, now: Timestamp) -> Option<Fired> {
        let (&(deadline, handle), _) = self.by_deadline.iter().next()?;
        if deadline > now {
            return None;
        }
        let token = self.by_deadline.remove(&(deadline, handle))?;
        self.deadlines.remove(&handle);
        Some(Fired {
            handle,
            deadline,
            token,
        })
    }

    fn clear(&mut self) {
        self.by_deadline.clear();
        self.deadlines.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(ms: u64) -> Timestamp {
        Timestamp::from_millis(ms)
    }

    #[test]
    fn test_pop_due_in_deadline_order() {
        let mut timers = TimerQueue::new();
        let late = timers.schedule(ms(200), TimerToken::LayerTerm);
        let early = timers.schedule(ms(100), TimerToken::TapHold(Key::LEFT_CTRL));

        assert_eq!(timers.next_deadline(), Some(ms(100)));
        assert!(timers.pop_due(ms(99)).is_none());

        let fired = timers.pop_due(ms(250)).unwrap();
        assert_eq!(fired.handle, early);
        assert_eq!(fired.deadline, ms(100));
        let fired = timers.pop_due(ms(250)).unwrap();
        assert_eq!(fired.handle, late);
        assert!(timers.pop_due(ms(250)).is_none());
        assert!(timers.is_empty());
    }

    #[test]
    fn test_equal_deadlines_fire_in_schedule_order() {
        let mut timers = TimerQueue::new();
        let first = timers.schedule(ms(150), TimerToken::SecondaryHold(Key::J));
        let second = timers.schedule(ms(150), TimerToken::LayerTerm);

        assert_eq!(timers.pop_due(ms(150)).unwrap().handle, first);
        assert_eq!(timers.pop_due(ms(150)).unwrap().handle, second);
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let mut timers = TimerQueue::new();
        let handle = timers.schedule(ms(150), TimerToken::LayerTerm);

        assert!(timers.cancel(handle));
        assert!(!timers.cancel(handle));
        assert!(timers.pop_due(ms(1000)).is_none());
        assert_eq!(timers.next_deadline(), None);
    }

    #[test]
    fn test_cancel_after_fire_is_noop() {
        let mut timers = TimerQueue::new();
        let handle = timers.schedule(ms(10), TimerToken::LayerTerm);
        let other = timers.schedule(ms(20), TimerToken::LayerTerm);

        assert_eq!(timers.pop_due(ms(10)).unwrap().handle, handle);
        assert!(!timers.cancel(handle));
        assert!(timers.is_pending(other));
        assert_eq!(timers.len(), 1);
    }
}
