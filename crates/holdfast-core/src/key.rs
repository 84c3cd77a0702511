// Holdfast Key Type
// Key identifiers using Linux input-event-codes.h numbering

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

include!(concat!(env!("OUT_DIR"), "/key_codes.rs"));

impl Key {
    /// Get the raw numeric code value
    pub fn code(self) -> u16 {
        self.0
    }

    /// Get the canonical name of this key, or "UNKNOWN"
    pub fn name(self) -> &'static str {
        key_name(self.0)
    }

    /// Whether this key is one of the 26 letter keys
    pub fn is_letter(self) -> bool {
        let name = self.name();
        name.len() == 1 && name.as_bytes()[0].is_ascii_uppercase()
    }

    /// Letter keys A through Z, in alphabetical order
    pub fn letters() -> impl Iterator<Item = Key> {
        ('a'..='z').filter_map(ascii_to_key)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Key {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        key_from_name(s).ok_or_else(|| format!("Unknown key: {}", s))
    }
}

/// Display name for a key code
pub fn key_name(code: u16) -> &'static str {
    static BY_CODE: OnceLock<HashMap<u16, &'static str>> = OnceLock::new();
    BY_CODE
        .get_or_init(|| KEY_NAMES.iter().map(|&(name, code)| (code, name)).collect())
        .get(&code)
        .copied()
        .unwrap_or("UNKNOWN")
}

/// Look up a key by canonical name or alias, case-insensitively
pub fn key_from_name(name: &str) -> Option<Key> {
    static BY_NAME: OnceLock<HashMap<&'static str, u16>> = OnceLock::new();
    let map = BY_NAME.get_or_init(|| {
        KEY_NAMES
            .iter()
            .chain(KEY_ALIASES.iter())
            .map(|&(name, code)| (name, code))
            .collect()
    });
    map.get(name.trim().to_uppercase().as_str())
        .map(|&code| Key(code))
}

/// Unshifted ASCII character to key mapping
pub fn ascii_to_key(c: char) -> Option<Key> {
    let key = match c.to_ascii_lowercase() {
        'a' => Key::A,
        'b' => Key::B,
        'c' => Key::C,
        'd' => Key::D,
        'e' => Key::E,
        'f' => Key::F,
        'g' => Key::G,
        'h' => Key::H,
        'i' => Key::I,
        'j' => Key::J,
        'k' => Key::K,
        'l' => Key::L,
        'm' => Key::M,
        'n' => Key::N,
        'o' => Key::O,
        'p' => Key::P,
        'q' => Key::Q,
        'r' => Key::R,
        's' => Key::S,
        't' => Key::T,
        'u' => Key::U,
        'v' => Key::V,
        'w' => Key::W,
        'x' => Key::X,
        'y' => Key::Y,
        'z' => Key::Z,
        '1' => Key::KEY_1,
        '2' => Key::KEY_2,
        '3' => Key::KEY_3,
        '4' => Key::KEY_4,
        '5' => Key::KEY_5,
        '6' => Key::KEY_6,
        '7' => Key::KEY_7,
        '8' => Key::KEY_8,
        '9' => Key::KEY_9,
        '0' => Key::KEY_0,
        ';' => Key::SEMICOLON,
        '\'' => Key::APOSTROPHE,
        '=' => Key::EQUAL,
        '-' => Key::MINUS,
        '`' => Key::GRAVE,
        '[' => Key::LEFT_BRACE,
        ']' => Key::RIGHT_BRACE,
        ',' => Key::COMMA,
        '.' => Key::DOT,
        '/' => Key::SLASH,
        ' ' => Key::SPACE,
        '\n' => Key::ENTER,
        '\\' => Key::BACKSLASH,
        _ => return None,
    };
    Some(key)
}

/// Inverse of [`ascii_to_key`] for keys that type a character without Shift
pub fn key_to_ascii(key: Key) -> Option<char> {
    let name = key.name();
    if key.is_letter() {
        return name.chars().next().map(|c| c.to_ascii_lowercase());
    }
    let c = match key {
        Key::KEY_1 => '1',
        Key::KEY_2 => '2',
        Key::KEY_3 => '3',
        Key::KEY_4 => '4',
        Key::KEY_5 => '5',
        Key::KEY_6 => '6',
        Key::KEY_7 => '7',
        Key::KEY_8 => '8',
        Key::KEY_9 => '9',
        Key::KEY_0 => '0',
        Key::SEMICOLON => ';',
        Key::APOSTROPHE => '\'',
        Key::EQUAL => '=',
        Key::MINUS => '-',
        Key::GRAVE => '`',
        Key::LEFT_BRACE => '[',
        Key::RIGHT_BRACE => ']',
        Key::COMMA => ',',
        Key::DOT => '.',
        Key::SLASH => '/',
        Key::SPACE => ' ',
        Key::ENTER => '\n',
        Key::BACKSLASH => '\\',
        _ => return None,
    };
    Some(c)
}
