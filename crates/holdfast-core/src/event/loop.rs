// Holdfast Event Loop
// Serializes physical input and timer deadlines into one queue feeding the engine

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use super::{Edge, PhysicalEvent, Timestamp};
use crate::output::OutputSink;
use crate::timer::{TimerQueue, TimerService};
use crate::transform::Engine;
use crate::Key;

/// Result type for event loop operations
pub type EventLoopResult<T> = Result<T, EventLoopError>;

/// Errors that can occur in event loop
#[derive(Debug, thiserror::Error)]
pub enum EventLoopError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Input source error: {0}")]
    Source(String),
}

/// What one wait on an input source produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Polled {
    Event(PhysicalEvent),
    /// The deadline passed with no input. Carries the current time.
    TimedOut(Timestamp),
    /// No more input will come. Carries the current time.
    Closed(Timestamp),
}

/// A capture source the loop can block on
pub trait InputSource {
    /// Wait for the next event, but not past `deadline` if one is given
    fn next_event(&mut self, deadline: Option<Timestamp>) -> EventLoopResult<Polled>;
}

/// Monotonic millisecond clock shared by a capture thread and its input source
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    origin: Instant,
}

impl Clock {
    pub fn start() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    pub fn now(&self) -> Timestamp {
        let ms = u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX);
        Timestamp::from_millis(ms)
    }

    /// Stamp an edge with the current time
    pub fn stamp(&self, key: Key, edge: Edge) -> PhysicalEvent {
        PhysicalEvent::new(key, edge, self.now())
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::start()
    }
}

/// Pre-recorded, time-ordered input.
///
/// Time is virtual: a wait returns the deadline itself when the next event is
/// later, so timers fire exactly on schedule. After the last event, pending
/// deadlines still drain before the source reports closed.
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    events: VecDeque<PhysicalEvent>,
    now: Timestamp,
}

impl ScriptedInput {
    pub fn new(events: impl IntoIterator<Item = PhysicalEvent>) -> Self {
        Self {
            events: events.into_iter().collect(),
            now: Timestamp::default(),
        }
    }

    pub fn push(&mut self, event: PhysicalEvent) {
        self.events.push_back(event);
    }

    pub fn remaining(&self) -> usize {
        self.events.len()
    }
}

impl InputSource for ScriptedInput {
    fn next_event(&mut self, deadline: Option<Timestamp>) -> EventLoopResult<Polled> {
        let next_time = self.events.front().map(|event| event.time);
        let polled = match (next_time, deadline) {
            (Some(time), Some(deadline)) if deadline < time => {
                self.now = self.now.max(deadline);
                Polled::TimedOut(deadline)
            }
            (Some(_), _) => match self.events.pop_front() {
                Some(event) => {
                    self.now = self.now.max(event.time);
                    Polled::Event(event)
                }
                None => Polled::Closed(self.now),
            },
            (None, Some(deadline)) => {
                self.now = self.now.max(deadline);
                Polled::TimedOut(deadline)
            }
            (None, None) => Polled::Closed(self.now),
        };
        Ok(polled)
    }
}

/// Events pushed by a capture thread over a channel.
///
/// The capture side stamps events with the same [`Clock`]; timeouts are
/// measured against it.
#[derive(Debug)]
pub struct ChannelInput {
    receiver: Receiver<PhysicalEvent>,
    clock: Clock,
}

impl ChannelInput {
    pub fn new(receiver: Receiver<PhysicalEvent>, clock: Clock) -> Self {
        Self { receiver, clock }
    }

    /// Create an unbounded channel and the input reading from it
    pub fn channel(clock: Clock) -> (Sender<PhysicalEvent>, Self) {
        let (sender, receiver) = crossbeam_channel::unbounded();
        (sender, Self::new(receiver, clock))
    }

    pub fn clock(&self) -> Clock {
        self.clock
    }
}

impl InputSource for ChannelInput {
    fn next_event(&mut self, deadline: Option<Timestamp>) -> EventLoopResult<Polled> {
        let Some(deadline) = deadline else {
            return Ok(match self.receiver.recv() {
                Ok(event) => Polled::Event(event),
                Err(_) => Polled::Closed(self.clock.now()),
            });
        };

        let wait = Duration::from_millis(deadline.since(self.clock.now()));
        Ok(match self.receiver.recv_timeout(wait) {
            Ok(event) => Polled::Event(event),
            Err(RecvTimeoutError::Timeout) => Polled::TimedOut(self.clock.now().max(deadline)),
            Err(RecvTimeoutError::Disconnected) => Polled::Closed(self.clock.now()),
        })
    }
}

/// Drives an [`Engine`] from an [`InputSource`] until the source closes
#[derive(Debug)]
pub struct EventLoop<T: TimerService = TimerQueue> {
    engine: Engine<T>,
}

impl<T: TimerService> EventLoop<T> {
    pub fn new(engine: Engine<T>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Engine<T> {
        &self.engine
    }

    pub fn into_engine(self) -> Engine<T> {
        self.engine
    }

    /// Run until the source closes or fails.
    ///
    /// Returns the number of input events processed. On close or failure the
    /// engine is shut down, so nothing stays held at the sink.
    pub fn run<I, S>(&mut self, source: &mut I, sink: &mut S) -> EventLoopResult<usize>
    where
        I: InputSource + ?Sized,
        S: OutputSink,
    {
        let mut processed = 0;
        loop {
            let deadline = self.engine.next_deadline();
            let polled = match source.next_event(deadline) {
                Ok(polled) => polled,
                Err(err) => {
                    log::warn!("input source failed after {} event(s): {}", processed, err);
                    // Releases go out at the last accepted time
                    let now = self.engine.last_time().unwrap_or_default();
                    self.engine.shutdown(now, sink);
                    return Err(err);
                }
            };

            match polled {
                Polled::Event(event) => {
                    self.engine.process(&event, sink);
                    processed += 1;
                }
                Polled::TimedOut(now) => self.engine.tick(now, sink),
                Polled::Closed(now) => {
                    log::info!("input closed after {} event(s)", processed);
                    self.engine.shutdown(now, sink);
                    return Ok(processed);
                }
            }
        }
    }
}
