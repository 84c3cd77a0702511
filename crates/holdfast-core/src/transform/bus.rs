// Holdfast Key Event Bus
// First-match-wins routing of fresh key presses, and the memory of who took each press

use crate::layer::{LayerKeyController, LayerPhase};
use crate::tap_hold::TapHoldSet;
use crate::Key;

/// Which controller a fresh Down goes to, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    /// The layer key's own press
    LayerKey,
    /// Armed secondary key pressed again while the layer is pending
    SecondPress,
    /// Layer active and the key has a mapping
    Dispatch(Key),
    /// Trigger of a tap/hold key
    TapHold,
    /// Intercepted by the waiting buffer
    Buffer,
    Passthrough,
}

/// Where a pressed key's later events (repeats and the Up) are delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Forwarded unchanged
    Passthrough,
    /// Consumed by the layer controller, nothing reached the sink
    Swallowed,
    /// The mapped output is down at the sink
    Layer(Key),
    TapHold,
    LayerKey,
}

/// Resolve the handler of a Down for a key that is not currently down
pub fn route_press(key: Key, layer: &LayerKeyController, tap_holds: &TapHoldSet) -> Handler {
    if key == layer.key() {
        return Handler::LayerKey;
    }

    let phase = layer.phase();
    let armed = layer
        .state()
        .pending()
        .is_some_and(|pending| pending.is_armed(key));
    if armed {
        return Handler::SecondPress;
    }

    if let Some(output) = layer.dispatch().lookup(phase, key) {
        return Handler::Dispatch(output);
    }

    if tap_holds.is_trigger(key) {
        return Handler::TapHold;
    }

    if phase == LayerPhase::Pending && layer.layout().contains(key) {
        return Handler::Buffer;
    }

    Handler::Passthrough
}
