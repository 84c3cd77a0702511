// Holdfast Events
// Timestamped physical input edges and synthesized output edges

pub mod r#loop;

use std::fmt;

use smallvec::SmallVec;

use crate::{Key, Modifier};

pub use r#loop::{
    ChannelInput, Clock, EventLoop, EventLoopError, EventLoopResult, InputSource, Polled,
    ScriptedInput,
};

/// Direction of a key edge.
///
/// A repeat is just another Down for a key that is already down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Edge {
    Down,
    Up,
}

impl Edge {
    pub fn is_down(self) -> bool {
        matches!(self, Edge::Down)
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Edge::Down => write!(f, "down"),
            Edge::Up => write!(f, "up"),
        }
    }
}

/// Milliseconds on the capture source's monotonic clock
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const fn from_millis(ms: u64) -> Self {
        Timestamp(ms)
    }

    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// The instant `ms` milliseconds later
    pub const fn after(self, ms: u64) -> Self {
        Timestamp(self.0.saturating_add(ms))
    }

    /// Milliseconds elapsed since `earlier`, zero if `earlier` is in the future
    pub const fn since(self, earlier: Timestamp) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// One edge read from the physical keyboard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhysicalEvent {
    pub key: Key,
    pub edge: Edge,
    pub time: Timestamp,
    /// Physical modifier keys the capture source reports as held.
    ///
    /// Informational only: no mapping looks at it.
    pub modifiers: SmallVec<[Key; 4]>,
}

impl PhysicalEvent {
    pub fn new(key: Key, edge: Edge, time: Timestamp) -> Self {
        Self {
            key,
            edge,
            time,
            modifiers: SmallVec::new(),
        }
    }

    pub fn down(key: Key, ms: u64) -> Self {
        Self::new(key, Edge::Down, Timestamp::from_millis(ms))
    }

    pub fn up(key: Key, ms: u64) -> Self {
        Self::new(key, Edge::Up, Timestamp::from_millis(ms))
    }

    pub fn with_modifiers(mut self, modifiers: impl IntoIterator<Item = Key>) -> Self {
        self.modifiers = modifiers.into_iter().collect();
        self
    }
}

impl fmt::Display for PhysicalEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} @{}", self.key, self.edge, self.time)
    }
}

/// What an output edge acts on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Output {
    Key(Key),
    Modifier(Modifier),
}

impl Output {
    pub fn is_modifier(self) -> bool {
        match self {
            Output::Modifier(_) => true,
            Output::Key(key) => Modifier::is_key_modifier(key),
        }
    }
}

impl From<Key> for Output {
    fn from(key: Key) -> Self {
        Output::Key(key)
    }
}

impl From<Modifier> for Output {
    fn from(modifier: Modifier) -> Self {
        Output::Modifier(modifier)
    }
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Output::Key(key) => write!(f, "{}", key),
            Output::Modifier(modifier) => write!(f, "{}", modifier),
        }
    }
}

/// One synthesized edge handed to the output sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutputEvent {
    pub action: Output,
    pub edge: Edge,
    pub time: Timestamp,
}

impl OutputEvent {
    pub fn new(action: impl Into<Output>, edge: Edge, time: Timestamp) -> Self {
        Self {
            action: action.into(),
            edge,
            time,
        }
    }
}

impl fmt::Display for OutputEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} @{}", self.action, self.edge, self.time)
    }
}
