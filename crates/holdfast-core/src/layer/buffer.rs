// Holdfast Waiting Buffer
// Slotted recorder for keys pressed while the layer key is undecided

use std::sync::Arc;

use indexmap::IndexMap;
use thiserror::Error;

use crate::Key;

/// Why a press could not be recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BufferError {
    #[error("{0} is not a buffered key")]
    NotBuffered(Key),
    #[error("{key} pressed more than {capacity} time(s) while waiting")]
    Overflow { key: Key, capacity: u8 },
}

/// Which keys are buffered, how many slots each has, and the replay order.
///
/// Iteration order is the canonical replay order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BufferLayout {
    capacity: IndexMap<Key, u8>,
}

impl BufferLayout {
    /// Build a layout: letters first (alphabetically, minus `exclude`), then
    /// `extra` in the given order. Keys in `multi_slot` get `multi_slot_count`
    /// slots, every other key gets one.
    pub fn new(
        exclude: Key,
        extra: impl IntoIterator<Item = Key>,
        multi_slot: &[Key],
        multi_slot_count: u8,
    ) -> Self {
        let mut capacity = IndexMap::new();
        let keys = Key::letters().chain(extra).filter(|&key| key != exclude);
        for key in keys {
            let slots = if multi_slot.contains(&key) {
                multi_slot_count.max(1)
            } else {
                1
            };
            capacity.entry(key).or_insert(slots);
        }
        Self { capacity }
    }

    /// Append single-slot entries for keys not already in the layout
    pub fn with_keys(mut self, keys: impl IntoIterator<Item = Key>) -> Self {
        for key in keys {
            self.capacity.entry(key).or_insert(1);
        }
        self
    }

    pub fn contains(&self, key: Key) -> bool {
        self.capacity.contains_key(&key)
    }

    pub fn capacity(&self, key: Key) -> Option<u8> {
        self.capacity.get(&key).copied()
    }

    /// Buffered keys in replay order
    pub fn keys(&self) -> impl Iterator<Item = Key> + '_ {
        self.capacity.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.capacity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capacity.is_empty()
    }
}

/// One (key, slot) cell of the buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferSlot {
    pub key: Key,
    pub slot_index: u8,
    pub filled: bool,
}

/// Per-episode buffer. Created when the layer key goes down.
///
/// Slots fill append-only: slot `i` of a key is only filled once slot `i - 1`
/// is, so a per-key fill count is the whole state.
#[derive(Debug, Clone)]
pub struct WaitingBuffer {
    layout: Arc<BufferLayout>,
    filled: Vec<u8>,
}

impl WaitingBuffer {
    pub fn new(layout: Arc<BufferLayout>) -> Self {
        let filled = vec![0; layout.len()];
        Self { layout, filled }
    }

    /// Record a press in the next free slot of `key`.
    ///
    /// Returns the slot index used.
    pub fn record(&mut self, key: Key) -> Result<u8, BufferError> {
        let (index, _, &capacity) = self
            .layout
            .capacity
            .get_full(&key)
            .ok_or(BufferError::NotBuffered(key))?;
        let count = &mut self.filled[index];
        if *count >= capacity {
            return Err(BufferError::Overflow { key, capacity });
        }
        let slot = *count;
        *count += 1;
        Ok(slot)
    }

    /// Number of filled slots for `key`
    pub fn recorded(&self, key: Key) -> u8 {
        self.layout
            .capacity
            .get_index_of(&key)
            .map(|index| self.filled[index])
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.filled.iter().all(|&count| count == 0)
    }

    /// Every slot with its fill state, in replay order
    pub fn slots(&self) -> impl Iterator<Item = BufferSlot> + '_ {
        self.layout
            .capacity
            .iter()
            .zip(&self.filled)
            .flat_map(|((&key, &capacity), &count)| {
                (0..capacity).map(move |slot_index| BufferSlot {
                    key,
                    slot_index,
                    filled: slot_index < count,
                })
            })
    }

    /// Recorded keys in canonical order, each repeated once per filled slot.
    ///
    /// Clears the buffer.
    pub fn replay(&mut self) -> Vec<Key> {
        let keys = self
            .slots()
            .filter(|slot| slot.filled)
            .map(|slot| slot.key)
            .collect();
        self.clear();
        keys
    }

    pub fn clear(&mut self) {
        self.filled.iter_mut().for_each(|count| *count = 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> Arc<BufferLayout> {
        Arc::new(BufferLayout::new(
            Key::F,
            [Key::SPACE, Key::ENTER, Key::COMMA],
            &[Key::E, Key::O],
            3,
        ))
    }

    #[test]
    fn test_layout_order_letters_then_extra() {
        let layout = layout();
        let keys: Vec<Key> = layout.keys().collect();
        assert_eq!(keys.len(), 25 + 3);
        assert_eq!(keys[0], Key::A);
        assert!(!layout.contains(Key::F));
        assert_eq!(&keys[25..], &[Key::SPACE, Key::ENTER, Key::COMMA]);
        assert_eq!(layout.capacity(Key::O), Some(3));
        assert_eq!(layout.capacity(Key::J), Some(1));
        assert_eq!(layout.capacity(Key::TAB), None);
    }

    #[test]
    fn test_with_keys_appends_missing_only() {
        let layout = BufferLayout::new(Key::F, [Key::SPACE], &[], 3)
            .with_keys([Key::J, Key::KEY_1]);
        let keys: Vec<Key> = layout.keys().collect();
        assert_eq!(keys.last(), Some(&Key::KEY_1));
        assert_eq!(layout.len(), 25 + 2);
    }

    #[test]
    fn test_single_slot_keeps_first_press() {
        let mut buffer = WaitingBuffer::new(layout());
        assert_eq!(buffer.record(Key::A), Ok(0));
        assert_eq!(
            buffer.record(Key::A),
            Err(BufferError::Overflow {
                key: Key::A,
                capacity: 1
            })
        );
        assert_eq!(buffer.recorded(Key::A), 1);
        assert_eq!(buffer.replay(), vec![Key::A]);
    }

    #[test]
    fn test_multi_slot_fills_in_order() {
        let mut buffer = WaitingBuffer::new(layout());
        assert_eq!(buffer.record(Key::O), Ok(0));
        assert_eq!(buffer.record(Key::O), Ok(1));
        assert_eq!(buffer.record(Key::O), Ok(2));
        assert!(matches!(
            buffer.record(Key::O),
            Err(BufferError::Overflow { capacity: 3, .. })
        ));

        let o_slots: Vec<BufferSlot> = buffer.slots().filter(|s| s.key == Key::O).collect();
        assert_eq!(o_slots.len(), 3);
        assert!(o_slots.iter().all(|s| s.filled));
    }

    #[test]
    fn test_replay_uses_canonical_order() {
        let mut buffer = WaitingBuffer::new(layout());
        buffer.record(Key::SPACE).unwrap();
        buffer.record(Key::I).unwrap();
        buffer.record(Key::E).unwrap();
        buffer.record(Key::D).unwrap();
        buffer.record(Key::E).unwrap();

        assert_eq!(
            buffer.replay(),
            vec![Key::D, Key::E, Key::E, Key::I, Key::SPACE]
        );
        assert!(buffer.is_empty());
        assert!(buffer.replay().is_empty());
    }

    #[test]
    fn test_unbuffered_key_rejected() {
        let mut buffer = WaitingBuffer::new(layout());
        assert_eq!(buffer.record(Key::F), Err(BufferError::NotBuffered(Key::F)));
        assert_eq!(buffer.record(Key::TAB), Err(BufferError::NotBuffered(Key::TAB)));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_clear_resets_every_slot() {
        let mut buffer = WaitingBuffer::new(layout());
        buffer.record(Key::O).unwrap();
        buffer.record(Key::COMMA).unwrap();
        buffer.clear();
        assert!(buffer.slots().all(|slot| !slot.filled));
        assert_eq!(buffer.record(Key::O), Ok(0));
    }
}
