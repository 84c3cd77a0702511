// Holdfast Built-in Keymap
// The default bindings used when no configuration overrides them

use crate::combo::Combo;
use crate::layer::{BufferLayout, DispatchGroup, LayerBinding, LayerDispatchTable};
use crate::modifier::Modifier;
use crate::tap_hold::TapHoldBinding;
use crate::transform::EngineConfig;
use crate::Key;

pub const DEFAULT_TAPPING_TERM_MS: u64 = 150;
pub const DEFAULT_HOLD_ACTIVATION_EXTRA_MS: u64 = 10;
pub const DEFAULT_MULTI_SLOT_COUNT: u8 = 3;
pub const DEFAULT_LAYER_KEY: Key = Key::F;

/// Letters typed doubled often enough to need more than one slot
pub const DEFAULT_MULTI_SLOT_KEYS: &[Key] = &[Key::E, Key::O, Key::P, Key::S, Key::Z];

/// Non-letter keys the waiting buffer intercepts, in replay order
pub const DEFAULT_EXTRA_BUFFERED_KEYS: &[Key] = &[
    Key::SPACE,
    Key::ENTER,
    Key::COMMA,
    Key::DOT,
    Key::SLASH,
    Key::SEMICOLON,
    Key::APOSTROPHE,
    Key::LEFT_BRACE,
    Key::RIGHT_BRACE,
    Key::KEY_1,
    Key::KEY_2,
    Key::KEY_3,
    Key::KEY_4,
    Key::KEY_5,
    Key::KEY_6,
    Key::KEY_7,
    Key::KEY_8,
    Key::KEY_9,
    Key::KEY_0,
    Key::MINUS,
    Key::EQUAL,
    Key::BACKSLASH,
    Key::GRAVE,
];

pub const DEFAULT_NAVIGATION: &[(Key, Key)] = &[
    (Key::H, Key::LEFT),
    (Key::J, Key::DOWN),
    (Key::K, Key::UP),
    (Key::L, Key::RIGHT),
    (Key::U, Key::PAGE_UP),
    (Key::D, Key::PAGE_DOWN),
];

pub const DEFAULT_FUNCTION_ROW: &[(Key, Key)] = &[
    (Key::KEY_1, Key::F1),
    (Key::KEY_2, Key::F2),
    (Key::KEY_3, Key::F3),
    (Key::KEY_4, Key::F4),
    (Key::KEY_5, Key::F5),
    (Key::KEY_6, Key::F6),
    (Key::KEY_7, Key::F7),
    (Key::KEY_8, Key::F8),
    (Key::KEY_9, Key::F9),
    (Key::KEY_0, Key::F10),
    (Key::MINUS, Key::F11),
    (Key::EQUAL, Key::F12),
    (Key::BACKSLASH, Key::INSERT),
    (Key::GRAVE, Key::DELETE),
];

/// Ctrl taps Esc, the shifts tap parentheses
pub fn default_tap_holds(tapping_term_ms: u64) -> Vec<TapHoldBinding> {
    vec![
        TapHoldBinding {
            trigger: Key::LEFT_CTRL,
            tapping_term_ms,
            tap: Combo::key_only(Key::ESC),
            hold: Modifier::LeftCtrl,
        },
        TapHoldBinding {
            trigger: Key::LEFT_SHIFT,
            tapping_term_ms,
            tap: Combo::from_single(Modifier::LeftShift, Key::KEY_9),
            hold: Modifier::LeftShift,
        },
        TapHoldBinding {
            trigger: Key::RIGHT_SHIFT,
            tapping_term_ms,
            tap: Combo::from_single(Modifier::RightShift, Key::KEY_0),
            hold: Modifier::RightShift,
        },
    ]
}

pub fn default_dispatch() -> LayerDispatchTable {
    LayerDispatchTable::new()
        .with_group(DispatchGroup::Navigation, DEFAULT_NAVIGATION.iter().copied())
        .with_group(DispatchGroup::FunctionRow, DEFAULT_FUNCTION_ROW.iter().copied())
}

pub fn default_engine_config() -> EngineConfig {
    EngineConfig {
        tap_holds: default_tap_holds(DEFAULT_TAPPING_TERM_MS),
        layer: LayerBinding {
            key: DEFAULT_LAYER_KEY,
            tapping_term_ms: DEFAULT_TAPPING_TERM_MS,
            hold_activation_extra_ms: DEFAULT_HOLD_ACTIVATION_EXTRA_MS,
            tap: Combo::key_only(DEFAULT_LAYER_KEY),
            release_activation: true,
        },
        buffer: BufferLayout::new(
            DEFAULT_LAYER_KEY,
            DEFAULT_EXTRA_BUFFERED_KEYS.iter().copied(),
            DEFAULT_MULTI_SLOT_KEYS,
            DEFAULT_MULTI_SLOT_COUNT,
        ),
        dispatch: default_dispatch(),
    }
}
