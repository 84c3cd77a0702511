// Holdfast Config API
// TOML configuration, combo string parsing and the built-in keymap

pub mod combo_parser;
pub mod keymap;
pub mod parser;

pub use combo_parser::{parse_combo_string, ComboParseError};
pub use keymap::default_engine_config;
pub use parser::{Config, ConfigError, ConfigToml};
