// Holdfast Tap/Hold Controller
// Two-outcome keys: a quick tap emits one combo, a hold latches a modifier

use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::combo::Combo;
use crate::event::Timestamp;
use crate::modifier::Modifier;
use crate::timer::{TimerHandle, TimerService, TimerToken};
use crate::Key;

/// Configuration of one tap/hold key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TapHoldBinding {
    /// Physical key that triggers the behavior
    pub trigger: Key,
    pub tapping_term_ms: u64,
    /// Emitted once if the key is released before the tapping term
    pub tap: Combo,
    /// Latched once the tapping term elapses or another key interrupts
    pub hold: Modifier,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapHoldState {
    Idle,
    /// Down, waiting for the tapping term
    Pending { since: Timestamp, timer: TimerHandle },
    /// Resolved as hold. `asserted` tells whether the modifier reached the sink.
    Held { asserted: bool },
}

/// Outcome of releasing a tap/hold key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TapHoldResult {
    /// Short press, emit the tap combo
    Tap(Combo),
    /// Hold ended. Carries the modifier to release if it was asserted.
    HoldRelease(Option<Modifier>),
}

/// State machine for one tap/hold key.
///
/// The hold modifier is lazy: resolving to Held only latches it. The engine
/// asserts it through [`TapHoldController::take_latched`] right before the next
/// key output that needs it, so a bare hold never reaches the sink.
#[derive(Debug, Clone)]
pub struct TapHoldController {
    binding: TapHoldBinding,
    state: TapHoldState,
}

impl TapHoldController {
    pub fn new(binding: TapHoldBinding) -> Self {
        Self {
            binding,
            state: TapHoldState::Idle,
        }
    }

    pub fn binding(&self) -> &TapHoldBinding {
        &self.binding
    }

    pub fn state(&self) -> TapHoldState {
        self.state
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, TapHoldState::Pending { .. })
    }

    /// Key went down: start the tapping-term timer
    pub fn press(&mut self, now: Timestamp, timers: &mut dyn TimerService) {
        if let TapHoldState::Pending { timer, .. } = self.state {
            timers.cancel(timer);
        }
        let timer = timers.schedule(
            now.after(self.binding.tapping_term_ms),
            TimerToken::TapHold(self.binding.trigger),
        );
        self.state = TapHoldState::Pending { since: now, timer };
        log::debug!("{}: pending (tap {})", self.binding.trigger, self.binding.tap);
    }

    /// Tapping-term timer fired. Returns true if this moved the key to Held.
    pub fn on_timer(&mut self, handle: TimerHandle) -> bool {
        match self.state {
            TapHoldState::Pending { timer, .. } if timer == handle => {
                self.state = TapHoldState::Held { asserted: false };
                log::debug!("{}: held, latched {}", self.binding.trigger, self.binding.hold);
                true
            }
            _ => false,
        }
    }

    /// Another key went down while this one is pending: resolve as hold now
    pub fn interrupt(&mut self, timers: &mut dyn TimerService) -> bool {
        if let TapHoldState::Pending { timer, .. } = self.state {
            timers.cancel(timer);
            self.state = TapHoldState::Held { asserted: false };
            log::debug!(
                "{}: interrupted, latched {}",
                self.binding.trigger,
                self.binding.hold
            );
            return true;
        }
        false
    }

    /// Hand out the hold modifier if it is latched but not yet asserted
    pub fn take_latched(&mut self) -> Option<Modifier> {
        match self.state {
            TapHoldState::Held { asserted: false } => {
                self.state = TapHoldState::Held { asserted: true };
                Some(self.binding.hold)
            }
            _ => None,
        }
    }

    /// Key went up
    pub fn release(&mut self, timers: &mut dyn TimerService) -> Option<TapHoldResult> {
        let state = std::mem::replace(&mut self.state, TapHoldState::Idle);
        match state {
            TapHoldState::Idle => None,
            TapHoldState::Pending { timer, .. } => {
                timers.cancel(timer);
                Some(TapHoldResult::Tap(self.binding.tap.clone()))
            }
            TapHoldState::Held { asserted } => Some(TapHoldResult::HoldRelease(
                asserted.then_some(self.binding.hold),
            )),
        }
    }

    /// Drop any state without emitting anything
    pub fn reset(&mut self) {
        self.state = TapHoldState::Idle;
    }
}

/// All tap/hold keys, keyed by trigger in configuration order
#[derive(Debug, Clone, Default)]
pub struct TapHoldSet {
    controllers: IndexMap<Key, TapHoldController>,
}

impl TapHoldSet {
    pub fn new(bindings: impl IntoIterator<Item = TapHoldBinding>) -> Self {
        let controllers = bindings
            .into_iter()
            .map(|binding| (binding.trigger, TapHoldController::new(binding)))
            .collect();
        Self { controllers }
    }

    pub fn is_trigger(&self, key: Key) -> bool {
        self.controllers.contains_key(&key)
    }

    pub fn get(&self, key: Key) -> Option<&TapHoldController> {
        self.controllers.get(&key)
    }

    pub fn get_mut(&mut self, key: Key) -> Option<&mut TapHoldController> {
        self.controllers.get_mut(&key)
    }

    /// Resolve every pending controller other than `except` to hold
    pub fn interrupt_others(&mut self, except: Key, timers: &mut dyn TimerService) {
        for (trigger, controller) in self.controllers.iter_mut() {
            if *trigger != except {
                controller.interrupt(timers);
            }
        }
    }

    /// Every latched modifier not yet asserted, in configuration order
    pub fn take_latched(&mut self) -> SmallVec<[Modifier; 2]> {
        self.controllers
            .values_mut()
            .filter_map(TapHoldController::take_latched)
            .collect()
    }

    pub fn reset(&mut self) {
        self.controllers.values_mut().for_each(TapHoldController::reset);
    }
}
