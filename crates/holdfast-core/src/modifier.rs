// Holdfast Modifier Type
// The physical modifier keys an output stream can assert (Shift, Ctrl, Alt, Meta)

use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

use crate::Key;

/// A side-specific modifier.
///
/// Parsing accepts the canonical name plus the usual short aliases, case
/// insensitively. Generic names ("Ctrl", "Shift", ...) resolve to the left key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum Modifier {
    #[strum(to_string = "LCtrl", serialize = "LC", serialize = "Ctrl", serialize = "C", serialize = "Control", serialize = "left_ctrl", serialize = "left_control")]
    LeftCtrl,
    #[strum(to_string = "RCtrl", serialize = "RC", serialize = "right_ctrl", serialize = "right_control")]
    RightCtrl,
    #[strum(to_string = "LShift", serialize = "Shift", serialize = "left_shift")]
    LeftShift,
    #[strum(to_string = "RShift", serialize = "right_shift")]
    RightShift,
    #[strum(to_string = "LAlt", serialize = "LA", serialize = "Alt", serialize = "Opt", serialize = "Option", serialize = "left_alt", serialize = "left_option")]
    LeftAlt,
    #[strum(to_string = "RAlt", serialize = "RA", serialize = "ROpt", serialize = "right_alt", serialize = "right_option")]
    RightAlt,
    #[strum(to_string = "LMeta", serialize = "Meta", serialize = "Super", serialize = "Win", serialize = "Cmd", serialize = "left_meta", serialize = "left_command")]
    LeftMeta,
    #[strum(to_string = "RMeta", serialize = "RCmd", serialize = "right_meta", serialize = "right_command")]
    RightMeta,
}

impl Modifier {
    /// The physical key that carries this modifier
    pub const fn key(self) -> Key {
        match self {
            Modifier::LeftCtrl => Key::LEFT_CTRL,
            Modifier::RightCtrl => Key::RIGHT_CTRL,
            Modifier::LeftShift => Key::LEFT_SHIFT,
            Modifier::RightShift => Key::RIGHT_SHIFT,
            Modifier::LeftAlt => Key::LEFT_ALT,
            Modifier::RightAlt => Key::RIGHT_ALT,
            Modifier::LeftMeta => Key::LEFT_META,
            Modifier::RightMeta => Key::RIGHT_META,
        }
    }

    /// The modifier carried by a physical key, if any
    pub fn from_key(key: Key) -> Option<Modifier> {
        Modifier::iter().find(|m| m.key() == key)
    }

    /// Parse a modifier alias such as "Ctrl" or "RShift"
    pub fn from_alias(alias: &str) -> Option<Modifier> {
        alias.trim().parse().ok()
    }

    /// Check whether a key is a modifier key
    pub fn is_key_modifier(key: Key) -> bool {
        is_key_modifier_code(key.code())
    }
}

const MODIFIER_KEY_CODES: &[u16] = &[
    29, 97, // L_CONTROL, R_CONTROL
    42, 54, // L_SHIFT, R_SHIFT
    56, 100, // L_ALT, R_ALT
    125, 126, // L_META, R_META
];

/// Check if a key code is a modifier without going through the enum
#[inline]
pub const fn is_key_modifier_code(code: u16) -> bool {
    let mut i = 0;
    while i < MODIFIER_KEY_CODES.len() {
        if MODIFIER_KEY_CODES[i] == code {
            return true;
        }
        i += 1;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_alias() {
        assert_eq!(Modifier::from_alias("Ctrl"), Some(Modifier::LeftCtrl));
        assert_eq!(Modifier::from_alias("ctrl"), Some(Modifier::LeftCtrl));
        assert_eq!(Modifier::from_alias("RShift"), Some(Modifier::RightShift));
        assert_eq!(Modifier::from_alias("left_shift"), Some(Modifier::LeftShift));
        assert_eq!(Modifier::from_alias("right_option"), Some(Modifier::RightAlt));
        assert_eq!(Modifier::from_alias("Hyper"), None);
    }

    #[test]
    fn test_key_round_trip() {
        for modifier in Modifier::iter() {
            assert_eq!(Modifier::from_key(modifier.key()), Some(modifier));
            assert!(Modifier::is_key_modifier(modifier.key()));
        }
        assert_eq!(Modifier::from_key(Key::A), None);
    }

    #[test]
    fn test_is_key_modifier_code() {
        assert!(is_key_modifier_code(29));
        assert!(is_key_modifier_code(126));
        assert!(!is_key_modifier_code(30));
        assert!(!Modifier::is_key_modifier(Key::SPACE));
    }

    #[test]
    fn test_display_uses_short_alias() {
        assert_eq!(Modifier::LeftShift.to_string(), "LShift");
    }
}
