// Holdfast Combo Type
// An output keystroke: a key plus the modifiers held while it is tapped

use std::fmt;

use smallvec::SmallVec;

use crate::modifier::Modifier;
use crate::Key;

/// A key combination emitted as a single tap, e.g. `Shift-9` for "(".
///
/// Modifiers keep their declaration order; they are pressed in that order and
/// released in reverse.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Combo {
    modifiers: SmallVec<[Modifier; 2]>,
    key: Key,
}

impl Combo {
    /// Create a new Combo from modifiers and a key
    ///
    /// Duplicate modifiers are dropped, keeping the first occurrence.
    pub fn new(modifiers: impl IntoIterator<Item = Modifier>, key: Key) -> Self {
        let mut unique: SmallVec<[Modifier; 2]> = SmallVec::new();
        for modifier in modifiers {
            if !unique.contains(&modifier) {
                unique.push(modifier);
            }
        }
        Self {
            modifiers: unique,
            key,
        }
    }

    /// A bare key with no modifiers
    pub fn key_only(key: Key) -> Self {
        Self {
            modifiers: SmallVec::new(),
            key,
        }
    }

    /// Create a Combo from a single modifier and key
    pub fn from_single(modifier: Modifier, key: Key) -> Self {
        Self::new([modifier], key)
    }

    pub fn modifiers(&self) -> &[Modifier] {
        &self.modifiers
    }

    pub fn key(&self) -> Key {
        self.key
    }
}

impl From<Key> for Combo {
    fn from(key: Key) -> Self {
        Combo::key_only(key)
    }
}

impl fmt::Display for Combo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for modifier in &self.modifiers {
            write!(f, "{}-", modifier)?;
        }
        write!(f, "{}", self.key)
    }
}
