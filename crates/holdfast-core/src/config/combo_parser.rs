// Holdfast Config - Combo String Parser
// Parses combo strings like "Shift-9" into a Combo

use thiserror::Error;

use crate::key::key_from_name;
use crate::{Combo, Modifier};

/// Errors that can occur during combo parsing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComboParseError {
    #[error("combo string cannot be empty")]
    EmptyInput,
    #[error("unknown key name: '{0}'")]
    UnknownKey(String),
    #[error("unknown modifier: '{0}'")]
    UnknownModifier(String),
    #[error("combo string cannot end with hyphen")]
    TrailingHyphen,
}

/// Parse a combo string like "Ctrl-Shift-A" into modifiers and key
///
/// The last hyphen-separated part is the key; everything before it must be a
/// modifier alias. Matching is case-insensitive.
///
/// # Examples
/// ```
/// use holdfast_core::config::parse_combo_string;
/// use holdfast_core::{Key, Modifier};
/// let combo = parse_combo_string("Shift-9").unwrap();
/// assert_eq!(combo.modifiers(), &[Modifier::LeftShift]);
/// assert_eq!(combo.key(), Key::KEY_9);
/// ```
pub fn parse_combo_string(exp: &str) -> Result<Combo, ComboParseError> {
    let trimmed = exp.trim();
    if trimmed.is_empty() {
        return Err(ComboParseError::EmptyInput);
    }
    if trimmed.len() > 1 && trimmed.ends_with('-') {
        return Err(ComboParseError::TrailingHyphen);
    }
    // A lone "-" names the minus key
    if trimmed == "-" {
        return Ok(Combo::key_only(crate::Key::MINUS));
    }

    let mut parts: Vec<&str> = trimmed.split('-').map(str::trim).collect();
    let key_str = match parts.pop() {
        Some(key_str) if !key_str.is_empty() => key_str,
        _ => return Err(ComboParseError::EmptyInput),
    };
    let key =
        key_from_name(key_str).ok_or_else(|| ComboParseError::UnknownKey(key_str.to_string()))?;

    let modifiers = parts
        .into_iter()
        .map(|alias| {
            Modifier::from_alias(alias)
                .ok_or_else(|| ComboParseError::UnknownModifier(alias.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Combo::new(modifiers, key))
}
