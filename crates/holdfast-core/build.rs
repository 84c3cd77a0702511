use std::env;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

/// Every key the engine knows by name: (constant name, Linux input-event code, aliases).
///
/// Aliases are matched case-insensitively by `key_from_name`, so they are stored
/// upper-cased here.
const KEY_TABLE: &[(&str, u16, &[&str])] = &[
    ("ESC", 1, &["ESCAPE"]),
    ("KEY_1", 2, &["1"]),
    ("KEY_2", 3, &["2"]),
    ("KEY_3", 4, &["3"]),
    ("KEY_4", 5, &["4"]),
    ("KEY_5", 6, &["5"]),
    ("KEY_6", 7, &["6"]),
    ("KEY_7", 8, &["7"]),
    ("KEY_8", 9, &["8"]),
    ("KEY_9", 10, &["9"]),
    ("KEY_0", 11, &["0"]),
    ("MINUS", 12, &["HYPHEN", "-"]),
    ("EQUAL", 13, &["EQUAL_SIGN", "="]),
    ("BACKSPACE", 14, &[]),
    ("TAB", 15, &[]),
    ("Q", 16, &[]),
    ("W", 17, &[]),
    ("E", 18, &[]),
    ("R", 19, &[]),
    ("T", 20, &[]),
    ("Y", 21, &[]),
    ("U", 22, &[]),
    ("I", 23, &[]),
    ("O", 24, &[]),
    ("P", 25, &[]),
    ("LEFT_BRACE", 26, &["OPEN_BRACKET", "["]),
    ("RIGHT_BRACE", 27, &["CLOSE_BRACKET", "]"]),
    ("ENTER", 28, &["RETURN", "RETURN_OR_ENTER"]),
    ("LEFT_CTRL", 29, &["LEFT_CONTROL", "LCTRL"]),
    ("A", 30, &[]),
    ("S", 31, &[]),
    ("D", 32, &[]),
    ("F", 33, &[]),
    ("G", 34, &[]),
    ("H", 35, &[]),
    ("J", 36, &[]),
    ("K", 37, &[]),
    ("L", 38, &[]),
    ("SEMICOLON", 39, &[";"]),
    ("APOSTROPHE", 40, &["QUOTE", "'"]),
    ("GRAVE", 41, &["GRAVE_ACCENT_AND_TILDE", "BACKTICK", "`"]),
    ("LEFT_SHIFT", 42, &["LSHIFT"]),
    ("BACKSLASH", 43, &["\\"]),
    ("Z", 44, &[]),
    ("X", 45, &[]),
    ("C", 46, &[]),
    ("V", 47, &[]),
    ("B", 48, &[]),
    ("N", 49, &[]),
    ("M", 50, &[]),
    ("COMMA", 51, &[","]),
    ("DOT", 52, &["PERIOD", "."]),
    ("SLASH", 53, &["/"]),
    ("RIGHT_SHIFT", 54, &["RSHIFT"]),
    ("LEFT_ALT", 56, &["LEFT_OPTION", "LALT"]),
    ("SPACE", 57, &["SPACEBAR"]),
    ("CAPSLOCK", 58, &["CAPS_LOCK"]),
    ("F1", 59, &[]),
    ("F2", 60, &[]),
    ("F3", 61, &[]),
    ("F4", 62, &[]),
    ("F5", 63, &[]),
    ("F6", 64, &[]),
    ("F7", 65, &[]),
    ("F8", 66, &[]),
    ("F9", 67, &[]),
    ("F10", 68, &[]),
    ("F11", 87, &[]),
    ("F12", 88, &[]),
    ("RIGHT_CTRL", 97, &["RIGHT_CONTROL", "RCTRL"]),
    ("RIGHT_ALT", 100, &["RIGHT_OPTION", "RALT"]),
    ("HOME", 102, &[]),
    ("UP", 103, &["UP_ARROW"]),
    ("PAGE_UP", 104, &["PAGEUP"]),
    ("LEFT", 105, &["LEFT_ARROW"]),
    ("RIGHT", 106, &["RIGHT_ARROW"]),
    ("END", 107, &[]),
    ("DOWN", 108, &["DOWN_ARROW"]),
    ("PAGE_DOWN", 109, &["PAGEDOWN"]),
    ("INSERT", 110, &[]),
    ("DELETE", 111, &["DELETE_FORWARD"]),
    ("LEFT_META", 125, &["LEFT_COMMAND", "LMETA", "SUPER"]),
    ("RIGHT_META", 126, &["RIGHT_COMMAND", "RMETA"]),
];

fn main() -> io::Result<()> {
    let out_dir = env::var("OUT_DIR").map_err(io::Error::other)?;
    let dest_path = Path::new(&out_dir).join("key_codes.rs");
    let mut f = File::create(&dest_path)?;

    writeln!(
        f,
        r#"
/// A single physical or logical key.
///
/// Newtype over the Linux input-event code. Codes outside the named table are
/// still valid keys; the engine passes them through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Key(pub u16);

impl From<u16> for Key {{
    fn from(code: u16) -> Self {{
        Key(code)
    }}
}}

impl From<Key> for u16 {{
    fn from(key: Key) -> Self {{
        key.0
    }}
}}
"#
    )?;

    writeln!(f, "#[allow(missing_docs)]\nimpl Key {{")?;
    for (name, code, _) in KEY_TABLE {
        writeln!(f, "    pub const {name}: Key = Key({code});")?;
    }
    writeln!(f, "}}\n")?;

    writeln!(f, "const KEY_NAMES: &[(&str, u16)] = &[")?;
    for (name, code, _) in KEY_TABLE {
        writeln!(f, "    ({name:?}, {code}),")?;
    }
    writeln!(f, "];\n")?;

    writeln!(f, "const KEY_ALIASES: &[(&str, u16)] = &[")?;
    for (_, code, aliases) in KEY_TABLE {
        for alias in aliases.iter() {
            writeln!(f, "    ({alias:?}, {code}),")?;
        }
    }
    writeln!(f, "];")?;

    println!("cargo:rerun-if-changed=build.rs");
    Ok(())
}
