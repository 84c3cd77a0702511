// Holdfast Engine
// Owns every controller and the timer service, serializes timers with input,
// and writes the synthesized stream to the output sink
//
// Event flow for one physical event:
// - fire every timer due at or before the event's timestamp, each at its deadline
// - Down of a key already down: OS repeat, re-run the dispatch lookup
// - fresh Down: interrupt pending tap/hold keys, then route through the bus
// - Up: delivered to whoever consumed the matching Down

use std::collections::HashMap;

use smallvec::SmallVec;

use crate::combo::Combo;
use crate::event::{Edge, Output, OutputEvent, PhysicalEvent, Timestamp};
use crate::layer::{
    BufferLayout, LayerBinding, LayerDispatchTable, LayerInput, LayerKeyController, LayerOutput,
    LayerPhase, LayerState,
};
use crate::modifier::Modifier;
use crate::output::{HeldOutputs, OutputSink};
use crate::tap_hold::{TapHoldBinding, TapHoldResult, TapHoldSet};
use crate::timer::{Fired, TimerQueue, TimerService, TimerToken};
use crate::transform::bus::{self, Handler, Route};
use crate::Key;

/// Resolved runtime configuration, immutable once the engine is built
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub tap_holds: Vec<TapHoldBinding>,
    pub layer: LayerBinding,
    /// Keys the waiting buffer intercepts. Dispatch sources are added on top.
    pub buffer: BufferLayout,
    pub dispatch: LayerDispatchTable,
}

impl Default for EngineConfig {
    fn default() -> Self {
        crate::config::keymap::default_engine_config()
    }
}

/// Counters for inputs the engine dropped or ignored instead of failing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Presses lost to waiting-buffer overflow
    pub dropped_presses: u64,
    /// Malformed input: Up with no Down, or time going backwards
    pub ignored_events: u64,
    /// Timer firings that no longer applied to any state
    pub stale_timers: u64,
}

/// The single-threaded remapping engine.
///
/// Feed it physical events with [`Engine::process`] and, when no input
/// arrives, call [`Engine::tick`] by [`Engine::next_deadline`].
#[derive(Debug)]
pub struct Engine<T: TimerService = TimerQueue> {
    tap_holds: TapHoldSet,
    layer: LayerKeyController,
    timers: T,
    /// Route of every physical key currently down
    routes: HashMap<Key, Route>,
    held: HeldOutputs,
    last_time: Option<Timestamp>,
    stats: EngineStats,
}

impl Engine<TimerQueue> {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_timers(config, TimerQueue::new())
    }
}

impl<T: TimerService> Engine<T> {
    /// Build an engine on a custom timer service
    pub fn with_timers(config: EngineConfig, timers: T) -> Self {
        let EngineConfig {
            tap_holds,
            layer,
            buffer,
            dispatch,
        } = config;
        log::info!(
            "engine: layer key {}, {} tap/hold key(s), {} dispatch mapping(s)",
            layer.key,
            tap_holds.len(),
            dispatch.len()
        );
        Self {
            tap_holds: TapHoldSet::new(tap_holds),
            layer: LayerKeyController::new(layer, dispatch, buffer),
            timers,
            routes: HashMap::new(),
            held: HeldOutputs::new(),
            last_time: None,
            stats: EngineStats::default(),
        }
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    pub fn layer_phase(&self) -> LayerPhase {
        self.layer.phase()
    }

    pub fn layer_state(&self) -> &LayerState {
        self.layer.state()
    }

    /// Time of the latest event or tick the engine accepted
    pub fn last_time(&self) -> Option<Timestamp> {
        self.last_time
    }

    /// Earliest pending timer deadline, if any
    pub fn next_deadline(&self) -> Option<Timestamp> {
        self.timers.next_deadline()
    }

    /// Handle one physical event
    pub fn process(&mut self, event: &PhysicalEvent, sink: &mut dyn OutputSink) {
        if let Some(last) = self.last_time {
            if event.time < last {
                log::warn!("ignoring {}: time went backwards (last {})", event, last);
                self.stats.ignored_events += 1;
                return;
            }
        }

        self.fire_due(event.time, sink);
        self.last_time = Some(event.time);

        if !event.modifiers.is_empty() {
            log::trace!("{} with {} physical modifier(s) down", event, event.modifiers.len());
        }

        match event.edge {
            Edge::Down => self.on_down(event.key, event.time, sink),
            Edge::Up => self.on_up(event.key, event.time, sink),
        }
    }

    /// Fire timers due at `now` with no input to carry them
    pub fn tick(&mut self, now: Timestamp, sink: &mut dyn OutputSink) {
        if let Some(last) = self.last_time {
            if now < last {
                log::warn!("ignoring tick at {}: time went backwards (last {})", now, last);
                self.stats.ignored_events += 1;
                return;
            }
        }
        self.fire_due(now, sink);
        self.last_time = Some(now);
    }

    /// Cancel every timer, release everything still down at the sink, reset all state.
    ///
    /// Calling it again is a no-op.
    pub fn shutdown(&mut self, now: Timestamp, sink: &mut dyn OutputSink) {
        self.layer.reset(&mut self.timers);
        self.tap_holds.reset();
        self.timers.clear();
        self.routes.clear();

        let held = self.held.drain_release_order();
        if !held.is_empty() {
            log::info!("engine shutdown: releasing {} held output(s)", held.len());
        }
        for output in held {
            log::trace!("emit {} up (shutdown)", output);
            sink.emit(OutputEvent::new(output, Edge::Up, now));
        }
    }

    fn fire_due(&mut self, now: Timestamp, sink: &mut dyn OutputSink) {
        while let Some(fired) = self.timers.pop_due(now) {
            self.on_timer(fired, sink);
        }
    }

    fn on_timer(&mut self, fired: Fired, sink: &mut dyn OutputSink) {
        let Fired {
            handle,
            deadline,
            token,
        } = fired;

        let applied = match token {
            TimerToken::TapHold(trigger) => self
                .tap_holds
                .get_mut(trigger)
                .is_some_and(|controller| controller.on_timer(handle)),
            TimerToken::LayerTerm => {
                let output = self
                    .layer
                    .step(LayerInput::TermElapsed(handle), deadline, &mut self.timers);
                self.apply_layer_output(output, deadline, sink)
            }
            TimerToken::SecondaryHold(key) => {
                let output = self.layer.step(
                    LayerInput::HoldElapsed(key, handle),
                    deadline,
                    &mut self.timers,
                );
                self.apply_layer_output(output, deadline, sink)
            }
        };

        if !applied {
            log::warn!("stale timer {:?} ({:?}) at {}", handle, token, deadline);
            self.stats.stale_timers += 1;
        }
    }

    fn on_down(&mut self, key: Key, now: Timestamp, sink: &mut dyn OutputSink) {
        if let Some(route) = self.routes.get(&key).copied() {
            self.on_repeat(key, route, now, sink);
            return;
        }

        // Another key going down settles every pending tap/hold key as hold
        self.tap_holds.interrupt_others(key, &mut self.timers);

        let handler = bus::route_press(key, &self.layer, &self.tap_holds);
        log::debug!("{} down at {} -> {:?}", key, now, handler);

        match handler {
            Handler::LayerKey => {
                self.routes.insert(key, Route::LayerKey);
                let output = self.layer.step(LayerInput::LayerDown, now, &mut self.timers);
                self.apply_layer_output(output, now, sink);
            }
            Handler::SecondPress => {
                self.routes.insert(key, Route::Swallowed);
                let output = self
                    .layer
                    .step(LayerInput::SecondPress(key), now, &mut self.timers);
                self.apply_layer_output(output, now, sink);
            }
            Handler::Dispatch(output) => {
                self.routes.insert(key, Route::Layer(output));
                self.press(Output::Key(output), now, sink);
            }
            Handler::TapHold => {
                self.routes.insert(key, Route::TapHold);
                if let Some(controller) = self.tap_holds.get_mut(key) {
                    controller.press(now, &mut self.timers);
                }
            }
            Handler::Buffer => {
                self.routes.insert(key, Route::Swallowed);
                let output = self.layer.step(LayerInput::Press(key), now, &mut self.timers);
                self.apply_layer_output(output, now, sink);
            }
            Handler::Passthrough => {
                self.routes.insert(key, Route::Passthrough);
                self.press(Output::Key(key), now, sink);
            }
        }
    }

    /// OS repeat of a key already down. The dispatch answer is recomputed
    /// against the current layer phase on every repeat.
    fn on_repeat(&mut self, key: Key, route: Route, now: Timestamp, sink: &mut dyn OutputSink) {
        let desired = self.layer.dispatch().lookup(self.layer.phase(), key);

        match (route, desired) {
            (Route::Layer(current), Some(output)) => {
                if current != output {
                    self.release(Output::Key(current), now, sink);
                    self.routes.insert(key, Route::Layer(output));
                }
                self.press(Output::Key(output), now, sink);
            }
            (Route::Layer(current), None) => {
                self.release(Output::Key(current), now, sink);
                self.routes.insert(key, Route::Passthrough);
                self.press(Output::Key(key), now, sink);
            }
            (Route::Passthrough, Some(output)) => {
                self.release(Output::Key(key), now, sink);
                self.routes.insert(key, Route::Layer(output));
                self.press(Output::Key(output), now, sink);
            }
            (Route::Passthrough, None) => self.press(Output::Key(key), now, sink),
            (Route::Swallowed, Some(output)) => {
                // Held through a timer activation: the repeat already engages it
                self.layer.cancel_hold(key, &mut self.timers);
                self.routes.insert(key, Route::Layer(output));
                self.press(Output::Key(output), now, sink);
            }
            (Route::Swallowed, None) | (Route::TapHold | Route::LayerKey, _) => {
                log::trace!("{} repeat swallowed ({:?})", key, route);
            }
        }
    }

    fn on_up(&mut self, key: Key, now: Timestamp, sink: &mut dyn OutputSink) {
        let Some(route) = self.routes.remove(&key) else {
            log::warn!("ignoring {} up at {}: key is not down", key, now);
            self.stats.ignored_events += 1;
            return;
        };
        log::debug!("{} up at {} ({:?})", key, now, route);

        match route {
            Route::LayerKey => {
                let output = self.layer.step(LayerInput::LayerUp, now, &mut self.timers);
                self.apply_layer_output(output, now, sink);
            }
            Route::Swallowed => {
                let output = self.layer.step(LayerInput::Release(key), now, &mut self.timers);
                self.apply_layer_output(output, now, sink);
            }
            Route::Layer(output) => self.release(Output::Key(output), now, sink),
            Route::Passthrough => self.release(Output::Key(key), now, sink),
            Route::TapHold => {
                let timers = &mut self.timers;
                let result = self
                    .tap_holds
                    .get_mut(key)
                    .and_then(|controller| controller.release(timers));
                match result {
                    Some(TapHoldResult::Tap(combo)) => self.tap_combo(&combo, now, sink),
                    Some(TapHoldResult::HoldRelease(Some(modifier))) => {
                        self.release(Output::Modifier(modifier), now, sink)
                    }
                    Some(TapHoldResult::HoldRelease(None)) | None => {}
                }
            }
        }
    }

    /// Emit what a layer transition asks for. Returns false if the input was ignored.
    fn apply_layer_output(
        &mut self,
        output: LayerOutput,
        now: Timestamp,
        sink: &mut dyn OutputSink,
    ) -> bool {
        match output {
            LayerOutput::None | LayerOutput::Buffered { .. } => {}
            LayerOutput::Ignored => return false,
            LayerOutput::Dropped(err) => {
                log::warn!("dropping press at {}: {}", now, err);
                self.stats.dropped_presses += 1;
            }
            LayerOutput::Replay { tap, keys } => {
                log::debug!("replaying {} then {} buffered key(s)", tap, keys.len());
                self.tap_combo(&tap, now, sink);
                for key in keys {
                    self.tap(key, now, sink);
                }
            }
            LayerOutput::Press { key, output } => {
                self.routes.insert(key, Route::Layer(output));
                self.press(Output::Key(output), now, sink);
            }
            LayerOutput::Tap { output, .. } => self.tap(output, now, sink),
        }
        true
    }

    /// Assert every latched tap/hold modifier
    fn assert_latched(&mut self, now: Timestamp, sink: &mut dyn OutputSink) {
        let latched: SmallVec<[Modifier; 2]> = self.tap_holds.take_latched();
        for modifier in latched {
            self.emit(Output::Modifier(modifier), Edge::Down, now, sink);
        }
    }

    /// Press an output, asserting latched modifiers first if it is a regular key
    fn press(&mut self, output: Output, now: Timestamp, sink: &mut dyn OutputSink) {
        if let Output::Key(key) = output {
            if !Modifier::is_key_modifier(key) {
                self.assert_latched(now, sink);
            }
        }
        self.emit(output, Edge::Down, now, sink);
    }

    fn release(&mut self, output: Output, now: Timestamp, sink: &mut dyn OutputSink) {
        self.emit(output, Edge::Up, now, sink);
    }

    fn tap(&mut self, key: Key, now: Timestamp, sink: &mut dyn OutputSink) {
        self.press(Output::Key(key), now, sink);
        self.release(Output::Key(key), now, sink);
    }

    /// Tap a combo. Modifiers already down are neither pressed nor released.
    fn tap_combo(&mut self, combo: &Combo, now: Timestamp, sink: &mut dyn OutputSink) {
        self.assert_latched(now, sink);

        let mut pressed: SmallVec<[Modifier; 2]> = SmallVec::new();
        for &modifier in combo.modifiers() {
            if !self.held.is_modifier_down(modifier) {
                self.emit(Output::Modifier(modifier), Edge::Down, now, sink);
                pressed.push(modifier);
            }
        }
        self.tap(combo.key(), now, sink);
        for modifier in pressed.into_iter().rev() {
            self.emit(Output::Modifier(modifier), Edge::Up, now, sink);
        }
    }

    fn emit(&mut self, output: Output, edge: Edge, now: Timestamp, sink: &mut dyn OutputSink) {
        match edge {
            Edge::Down => {
                self.held.press(output);
            }
            Edge::Up => {
                if !self.held.release(output) {
                    log::debug!("skipping {} up: not down at the sink", output);
                    return;
                }
            }
        }
        log::trace!("emit {} {} at {}", output, edge, now);
        sink.emit(OutputEvent::new(output, edge, now));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::{DispatchGroup, LayerDispatchTable};

    fn config() -> EngineConfig {
        EngineConfig {
            tap_holds: vec![TapHoldBinding {
                trigger: Key::LEFT_CTRL,
                tapping_term_ms: 150,
                tap: Combo::key_only(Key::ESC),
                hold: Modifier::LeftCtrl,
            }],
            layer: LayerBinding {
                key: Key::F,
                tapping_term_ms: 150,
                hold_activation_extra_ms: 10,
                tap: Combo::key_only(Key::F),
                release_activation: true,
            },
            buffer: BufferLayout::new(Key::F, [Key::SPACE], &[Key::O], 3),
            dispatch: LayerDispatchTable::new()
                .with_group(DispatchGroup::Navigation, [(Key::J, Key::DOWN)]),
        }
    }

    fn run(engine: &mut Engine, events: &[PhysicalEvent]) -> Vec<OutputEvent> {
        let mut out = Vec::new();
        for event in events {
            engine.process(event, &mut out);
        }
        out
    }

    fn keys_down(out: &[OutputEvent]) -> Vec<Output> {
        out.iter()
            .filter(|event| event.edge == Edge::Down)
            .map(|event| event.action)
            .collect()
    }

    #[test]
    fn test_passthrough() {
        let mut engine = Engine::new(config());
        let out = run(&mut engine, &[PhysicalEvent::down(Key::A, 0), PhysicalEvent::up(Key::A, 10)]);
        assert_eq!(
            out,
            vec![
                OutputEvent::new(Key::A, Edge::Down, Timestamp::from_millis(0)),
                OutputEvent::new(Key::A, Edge::Up, Timestamp::from_millis(10)),
            ]
        );
    }

    #[test]
    fn test_timer_fires_before_later_event() {
        let mut engine = Engine::new(config());
        let out = run(
            &mut engine,
            &[PhysicalEvent::down(Key::F, 0), PhysicalEvent::down(Key::J, 200)],
        );
        // Layer term at 150 fired first, so J dispatches
        assert_eq!(keys_down(&out), vec![Output::Key(Key::DOWN)]);
        assert_eq!(engine.layer_phase(), LayerPhase::Active);
    }

    #[test]
    fn test_tick_activates_layer() {
        let mut engine = Engine::new(config());
        let mut out = Vec::new();
        engine.process(&PhysicalEvent::down(Key::F, 0), &mut out);
        assert_eq!(engine.next_deadline(), Some(Timestamp::from_millis(150)));

        engine.tick(Timestamp::from_millis(149), &mut out);
        assert_eq!(engine.layer_phase(), LayerPhase::Pending);
        engine.tick(Timestamp::from_millis(150), &mut out);
        assert_eq!(engine.layer_phase(), LayerPhase::Active);
        assert!(out.is_empty());
    }

    #[test]
    fn test_backwards_time_ignored() {
        let mut engine = Engine::new(config());
        let out = run(
            &mut engine,
            &[PhysicalEvent::down(Key::A, 100), PhysicalEvent::down(Key::B, 50)],
        );
        assert_eq!(keys_down(&out), vec![Output::Key(Key::A)]);
        assert_eq!(engine.stats().ignored_events, 1);
    }

    #[test]
    fn test_backwards_tick_ignored() {
        let mut engine = Engine::new(config());
        let mut out = Vec::new();
        engine.process(&PhysicalEvent::down(Key::F, 100), &mut out);

        engine.tick(Timestamp::from_millis(50), &mut out);
        assert_eq!(engine.stats().ignored_events, 1);
        assert_eq!(engine.last_time(), Some(Timestamp::from_millis(100)));
        assert_eq!(engine.layer_phase(), LayerPhase::Pending);
    }

    #[test]
    fn test_combo_skips_modifier_held_as_plain_key() {
        let mut config = config();
        config.tap_holds.push(TapHoldBinding {
            trigger: Key::CAPSLOCK,
            tapping_term_ms: 150,
            tap: Combo::from_single(Modifier::RightCtrl, Key::C),
            hold: Modifier::LeftAlt,
        });
        let mut engine = Engine::new(config);
        let out = run(
            &mut engine,
            &[
                PhysicalEvent::down(Key::RIGHT_CTRL, 0),
                PhysicalEvent::down(Key::CAPSLOCK, 10),
                PhysicalEvent::up(Key::CAPSLOCK, 20),
                PhysicalEvent::up(Key::RIGHT_CTRL, 30),
            ],
        );
        let actions: Vec<(Output, Edge)> = out.iter().map(|e| (e.action, e.edge)).collect();
        assert_eq!(
            actions,
            vec![
                (Output::Key(Key::RIGHT_CTRL), Edge::Down),
                (Output::Key(Key::C), Edge::Down),
                (Output::Key(Key::C), Edge::Up),
                (Output::Key(Key::RIGHT_CTRL), Edge::Up),
            ]
        );
    }

    #[test]
    fn test_latched_ctrl_asserted_before_key() {
        let mut engine = Engine::new(config());
        let out = run(
            &mut engine,
            &[
                PhysicalEvent::down(Key::LEFT_CTRL, 0),
                PhysicalEvent::down(Key::C, 20),
                PhysicalEvent::up(Key::C, 40),
                PhysicalEvent::up(Key::LEFT_CTRL, 60),
            ],
        );
        let actions: Vec<(Output, Edge)> = out.iter().map(|e| (e.action, e.edge)).collect();
        assert_eq!(
            actions,
            vec![
                (Output::Modifier(Modifier::LeftCtrl), Edge::Down),
                (Output::Key(Key::C), Edge::Down),
                (Output::Key(Key::C), Edge::Up),
                (Output::Modifier(Modifier::LeftCtrl), Edge::Up),
            ]
        );
    }

    #[test]
    fn test_shutdown_releases_held_outputs() {
        let mut engine = Engine::new(config());
        let mut out = run(
            &mut engine,
            &[PhysicalEvent::down(Key::LEFT_CTRL, 0), PhysicalEvent::down(Key::A, 10)],
        );
        out.clear();

        engine.shutdown(Timestamp::from_millis(20), &mut out);
        let released: Vec<Output> = out.iter().map(|e| e.action).collect();
        assert_eq!(
            released,
            vec![Output::Key(Key::A), Output::Modifier(Modifier::LeftCtrl)]
        );
        assert!(out.iter().all(|e| e.edge == Edge::Up));
        assert_eq!(engine.next_deadline(), None);

        out.clear();
        engine.shutdown(Timestamp::from_millis(30), &mut out);
        assert!(out.is_empty());
    }
}
