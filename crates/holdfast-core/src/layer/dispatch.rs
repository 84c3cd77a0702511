// Holdfast Layer Dispatch Table
// Static secondary-key -> output mapping, consulted only while the layer is active

use indexmap::IndexMap;
use strum_macros::Display;

use super::LayerPhase;
use crate::Key;

/// The two halves of the layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum DispatchGroup {
    Navigation,
    FunctionRow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchEntry {
    pub output: Key,
    pub group: DispatchGroup,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerDispatchTable {
    entries: IndexMap<Key, DispatchEntry>,
}

impl LayerDispatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a mapping
    pub fn insert(&mut self, group: DispatchGroup, source: Key, output: Key) {
        self.entries.insert(source, DispatchEntry { output, group });
    }

    pub fn with_group(
        mut self,
        group: DispatchGroup,
        pairs: impl IntoIterator<Item = (Key, Key)>,
    ) -> Self {
        for (source, output) in pairs {
            self.insert(group, source, output);
        }
        self
    }

    /// Whether `key` has a mapping at all, regardless of layer state
    pub fn is_mapped(&self, key: Key) -> bool {
        self.entries.contains_key(&key)
    }

    /// The mapping of `key`, regardless of layer state
    pub fn mapping(&self, key: Key) -> Option<Key> {
        self.entries.get(&key).map(|entry| entry.output)
    }

    pub fn entry(&self, key: Key) -> Option<&DispatchEntry> {
        self.entries.get(&key)
    }

    /// Per-event lookup: the mapped output if the layer is active, else None.
    ///
    /// Takes the current phase explicitly and keeps no state, so every Down,
    /// OS repeats included, gets the same answer for the same phase.
    pub fn lookup(&self, phase: LayerPhase, key: Key) -> Option<Key> {
        match phase {
            LayerPhase::Active => self.mapping(key),
            LayerPhase::Idle | LayerPhase::Pending => None,
        }
    }

    /// Source keys in insertion order
    pub fn sources(&self) -> impl Iterator<Item = Key> + '_ {
        self.entries.keys().copied()
    }

    /// Source keys of one group
    pub fn group(&self, group: DispatchGroup) -> impl Iterator<Item = (Key, Key)> + '_ {
        self.entries
            .iter()
            .filter(move |(_, entry)| entry.group == group)
            .map(|(&source, entry)| (source, entry.output))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> LayerDispatchTable {
        LayerDispatchTable::new()
            .with_group(
                DispatchGroup::Navigation,
                [(Key::H, Key::LEFT), (Key::J, Key::DOWN)],
            )
            .with_group(DispatchGroup::FunctionRow, [(Key::KEY_1, Key::F1)])
    }

    #[test]
    fn test_lookup_only_when_active() {
        let table = table();
        assert_eq!(table.lookup(LayerPhase::Active, Key::J), Some(Key::DOWN));
        assert_eq!(table.lookup(LayerPhase::Pending, Key::J), None);
        assert_eq!(table.lookup(LayerPhase::Idle, Key::J), None);
        assert_eq!(table.lookup(LayerPhase::Active, Key::A), None);
    }

    #[test]
    fn test_lookup_is_repeatable() {
        let table = table();
        let answers: Vec<_> = (0..5)
            .map(|_| table.lookup(LayerPhase::Active, Key::KEY_1))
            .collect();
        assert!(answers.iter().all(|&a| a == Some(Key::F1)));
    }

    #[test]
    fn test_groups() {
        let table = table();
        assert!(table.is_mapped(Key::H));
        assert_eq!(table.entry(Key::KEY_1).unwrap().group, DispatchGroup::FunctionRow);
        let nav: Vec<_> = table.group(DispatchGroup::Navigation).collect();
        assert_eq!(nav, vec![(Key::H, Key::LEFT), (Key::J, Key::DOWN)]);
        assert_eq!(DispatchGroup::FunctionRow.to_string(), "function_row");
    }
}
