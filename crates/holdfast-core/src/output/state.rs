// Holdfast Held Output State
// Which outputs the sink currently has down

use indexmap::IndexSet;

use crate::event::Output;
use crate::Modifier;

/// Outputs pressed at the sink and not yet released, in press order
#[derive(Debug, Clone, Default)]
pub struct HeldOutputs {
    held: IndexSet<Output>,
}

impl HeldOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a press. Returns false if the output was already down (a repeat).
    pub fn press(&mut self, output: Output) -> bool {
        self.held.insert(output)
    }

    /// Record a release. Returns false if the output was not down.
    pub fn release(&mut self, output: Output) -> bool {
        self.held.shift_remove(&output)
    }

    pub fn is_held(&self, output: Output) -> bool {
        self.held.contains(&output)
    }

    /// Whether `modifier` is down at the sink, as a modifier or as its plain key
    pub fn is_modifier_down(&self, modifier: Modifier) -> bool {
        self.is_held(Output::Modifier(modifier)) || self.is_held(Output::Key(modifier.key()))
    }

    /// Empty the set, returning its contents in release order:
    /// keys newest first, then modifiers newest first.
    pub fn drain_release_order(&mut self) -> Vec<Output> {
        let (modifiers, keys): (Vec<Output>, Vec<Output>) =
            self.held.drain(..).rev().partition(|output| output.is_modifier());
        keys.into_iter().chain(modifiers).collect()
    }

    pub fn len(&self) -> usize {
        self.held.len()
    }

    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }
}
