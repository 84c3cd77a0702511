// Holdfast Layer Key Controller
// Tap-vs-momentary-layer disambiguation for the layer key, with buffered replay

pub mod buffer;
pub mod dispatch;

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::combo::Combo;
use crate::event::Timestamp;
use crate::timer::{TimerHandle, TimerService, TimerToken};
use crate::Key;

pub use buffer::{BufferError, BufferLayout, BufferSlot, WaitingBuffer};
pub use dispatch::{DispatchEntry, DispatchGroup, LayerDispatchTable};

/// Configuration of the layer key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerBinding {
    pub key: Key,
    pub tapping_term_ms: u64,
    /// Added to the tapping term for the secondary-key hold threshold
    pub hold_activation_extra_ms: u64,
    /// Emitted first when the buffer is replayed
    pub tap: Combo,
    /// Whether releasing an armed secondary key during Pending activates the layer
    pub release_activation: bool,
}

impl LayerBinding {
    /// How long a secondary key must stay down to activate the layer
    pub fn hold_threshold_ms(&self) -> u64 {
        self.tapping_term_ms
            .saturating_add(self.hold_activation_extra_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerPhase {
    Idle,
    Pending,
    Active,
}

impl fmt::Display for LayerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerPhase::Idle => write!(f, "idle"),
            LayerPhase::Pending => write!(f, "pending"),
            LayerPhase::Active => write!(f, "active"),
        }
    }
}

/// The ambiguity window. Everything here lives and dies with one episode.
#[derive(Debug, Clone)]
pub struct Pending {
    since: Timestamp,
    term_timer: TimerHandle,
    armed: HashSet<Key>,
    buffer: WaitingBuffer,
}

impl Pending {
    pub fn since(&self) -> Timestamp {
        self.since
    }

    /// Secondary keys pressed exactly once so far
    pub fn is_armed(&self, key: Key) -> bool {
        self.armed.contains(&key)
    }

    pub fn armed_len(&self) -> usize {
        self.armed.len()
    }

    pub fn buffer(&self) -> &WaitingBuffer {
        &self.buffer
    }
}

#[derive(Debug, Clone, Default)]
pub enum LayerState {
    #[default]
    Idle,
    Pending(Pending),
    Active,
}

impl LayerState {
    pub fn phase(&self) -> LayerPhase {
        match self {
            LayerState::Idle => LayerPhase::Idle,
            LayerState::Pending(_) => LayerPhase::Pending,
            LayerState::Active => LayerPhase::Active,
        }
    }

    pub fn pending(&self) -> Option<&Pending> {
        match self {
            LayerState::Pending(pending) => Some(pending),
            _ => None,
        }
    }
}

/// Everything that can move the layer state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerInput {
    LayerDown,
    LayerUp,
    TermElapsed(TimerHandle),
    /// First press of a key the buffer intercepts
    Press(Key),
    /// Another press of an armed secondary key
    SecondPress(Key),
    /// Release of a key whose press this controller consumed
    Release(Key),
    HoldElapsed(Key, TimerHandle),
}

/// What the engine must emit after a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerOutput {
    /// Handled, nothing to emit
    None,
    /// Input did not apply to the current state
    Ignored,
    /// Press recorded in the waiting buffer
    Buffered { slot: u8 },
    /// Press dropped by the waiting buffer
    Dropped(BufferError),
    /// Early release: the layer tap output, then the buffered keys
    Replay { tap: Combo, keys: Vec<Key> },
    /// Press `output` for the held secondary `key`
    Press { key: Key, output: Key },
    /// Tap `output` once on behalf of `key`
    Tap { key: Key, output: Key },
}

/// Owns the single LayerState and waiting buffer. Nothing else writes them.
#[derive(Debug)]
pub struct LayerKeyController {
    binding: LayerBinding,
    dispatch: LayerDispatchTable,
    layout: Arc<BufferLayout>,
    state: LayerState,
    /// Hold-to-activate timers of secondary keys still down
    holds: HashMap<Key, TimerHandle>,
}

impl LayerKeyController {
    /// Dispatch sources are always buffered, appended to `layout` if missing
    pub fn new(binding: LayerBinding, dispatch: LayerDispatchTable, layout: BufferLayout) -> Self {
        let layout = Arc::new(layout.with_keys(dispatch.sources()));
        Self {
            binding,
            dispatch,
            layout,
            state: LayerState::Idle,
            holds: HashMap::new(),
        }
    }

    pub fn binding(&self) -> &LayerBinding {
        &self.binding
    }

    pub fn key(&self) -> Key {
        self.binding.key
    }

    pub fn dispatch(&self) -> &LayerDispatchTable {
        &self.dispatch
    }

    pub fn layout(&self) -> &BufferLayout {
        &self.layout
    }

    pub fn state(&self) -> &LayerState {
        &self.state
    }

    pub fn phase(&self) -> LayerPhase {
        self.state.phase()
    }

    /// Whether `key` has a hold-to-activate timer running
    pub fn has_hold_timer(&self, key: Key) -> bool {
        self.holds.contains_key(&key)
    }

    /// Forget the hold timer of `key`, e.g. once a repeat already pressed its output
    pub fn cancel_hold(&mut self, key: Key, timers: &mut dyn TimerService) {
        if let Some(handle) = self.holds.remove(&key) {
            timers.cancel(handle);
        }
    }

    /// Run one input through the state machine
    pub fn step(
        &mut self,
        input: LayerInput,
        now: Timestamp,
        timers: &mut dyn TimerService,
    ) -> LayerOutput {
        let before = self.state.phase();
        let state = std::mem::take(&mut self.state);
        let (next, output) = self.transition(state, input, now, timers);

        if matches!(next, LayerState::Idle) {
            for (_, handle) in self.holds.drain() {
                timers.cancel(handle);
            }
        }
        if next.phase() != before {
            log::debug!("layer {}: {} -> {} on {:?}", self.binding.key, before, next.phase(), input);
        }
        self.state = next;
        output
    }

    /// The layer transition function.
    ///
    /// Pending -> Active has three guards evaluated here: a second press of an
    /// armed key, a secondary hold timer, and the release of an armed key.
    fn transition(
        &mut self,
        state: LayerState,
        input: LayerInput,
        now: Timestamp,
        timers: &mut dyn TimerService,
    ) -> (LayerState, LayerOutput) {
        match (state, input) {
            (LayerState::Idle, LayerInput::LayerDown) => {
                let term_timer = timers.schedule(
                    now.after(self.binding.tapping_term_ms),
                    TimerToken::LayerTerm,
                );
                let pending = Pending {
                    since: now,
                    term_timer,
                    armed: HashSet::new(),
                    buffer: WaitingBuffer::new(Arc::clone(&self.layout)),
                };
                (LayerState::Pending(pending), LayerOutput::None)
            }

            (LayerState::Pending(mut pending), LayerInput::LayerUp) => {
                timers.cancel(pending.term_timer);
                let keys = pending.buffer.replay();
                let tap = self.binding.tap.clone();
                (LayerState::Idle, LayerOutput::Replay { tap, keys })
            }

            (LayerState::Active, LayerInput::LayerUp) => (LayerState::Idle, LayerOutput::None),

            (LayerState::Pending(pending), LayerInput::TermElapsed(handle))
                if handle == pending.term_timer =>
            {
                // Buffer and armed set drop with `pending`. Secondary hold timers stay.
                (LayerState::Active, LayerOutput::None)
            }

            (LayerState::Pending(mut pending), LayerInput::Press(key)) => {
                match pending.buffer.record(key) {
                    Ok(slot) => {
                        if self.dispatch.is_mapped(key) && pending.armed.insert(key) {
                            let handle = timers.schedule(
                                now.after(self.binding.hold_threshold_ms()),
                                TimerToken::SecondaryHold(key),
                            );
                            if let Some(old) = self.holds.insert(key, handle) {
                                timers.cancel(old);
                            }
                        }
                        (LayerState::Pending(pending), LayerOutput::Buffered { slot })
                    }
                    Err(err) => (LayerState::Pending(pending), LayerOutput::Dropped(err)),
                }
            }

            (LayerState::Pending(pending), LayerInput::SecondPress(key))
                if pending.armed.contains(&key) =>
            {
                match self.dispatch.mapping(key) {
                    Some(output) => {
                        let next = self.activate(pending, key, now, timers);
                        (next, LayerOutput::Press { key, output })
                    }
                    None => (LayerState::Pending(pending), LayerOutput::Ignored),
                }
            }

            (LayerState::Pending(pending), LayerInput::Release(key)) => {
                self.cancel_hold(key, timers);
                let output = self.dispatch.mapping(key);
                match output {
                    Some(output) if self.binding.release_activation && pending.armed.contains(&key) => {
                        let next = self.activate(pending, key, now, timers);
                        (next, LayerOutput::Tap { key, output })
                    }
                    _ => (LayerState::Pending(pending), LayerOutput::None),
                }
            }

            (LayerState::Pending(pending), LayerInput::HoldElapsed(key, handle))
                if self.holds.get(&key) == Some(&handle) =>
            {
                self.holds.remove(&key);
                match self.dispatch.mapping(key) {
                    Some(output) => {
                        let next = self.activate(pending, key, now, timers);
                        (next, LayerOutput::Press { key, output })
                    }
                    None => (LayerState::Pending(pending), LayerOutput::Ignored),
                }
            }

            // A secondary key held across a timer-based activation
            (LayerState::Active, LayerInput::HoldElapsed(key, handle))
                if self.holds.get(&key) == Some(&handle) =>
            {
                self.holds.remove(&key);
                match self.dispatch.mapping(key) {
                    Some(output) => (LayerState::Active, LayerOutput::Press { key, output }),
                    None => (LayerState::Active, LayerOutput::Ignored),
                }
            }

            // Its buffered press went with the buffer on activation
            (LayerState::Active, LayerInput::Release(key)) => {
                self.cancel_hold(key, timers);
                (LayerState::Active, LayerOutput::None)
            }

            (LayerState::Idle, LayerInput::Release(_)) => (LayerState::Idle, LayerOutput::None),

            (state, input) => {
                log::debug!("layer {}: {:?} ignored while {}", self.binding.key, input, state.phase());
                (state, LayerOutput::Ignored)
            }
        }
    }

    /// Pending -> Active driven by secondary key `by`
    fn activate(
        &mut self,
        pending: Pending,
        by: Key,
        now: Timestamp,
        timers: &mut dyn TimerService,
    ) -> LayerState {
        timers.cancel(pending.term_timer);
        for (_, handle) in self.holds.drain() {
            timers.cancel(handle);
        }
        log::debug!(
            "layer {}: activated by {} after {}ms",
            self.binding.key,
            by,
            now.since(pending.since)
        );
        LayerState::Active
    }

    /// Drop all state and timers without emitting anything
    pub fn reset(&mut self, timers: &mut dyn TimerService) {
        if let LayerState::Pending(pending) = std::mem::take(&mut self.state) {
            timers.cancel(pending.term_timer);
        }
        for (_, handle) in self.holds.drain() {
            timers.cancel(handle);
        }
    }
}
