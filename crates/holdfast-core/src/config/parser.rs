// Holdfast Config Parser - TOML with Serde
// Parses configuration from TOML, overlaying the built-in keymap

use std::collections::HashSet;
use std::fs;
use std::ops::RangeInclusive;
use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;

use super::combo_parser::{parse_combo_string, ComboParseError};
use super::keymap;
use crate::layer::{BufferLayout, DispatchGroup, LayerBinding, LayerDispatchTable};
use crate::tap_hold::TapHoldBinding;
use crate::transform::EngineConfig;
use crate::{Combo, Key, Modifier};

const TAPPING_TERM_RANGE: RangeInclusive<u64> = 1..=5000;
const HOLD_EXTRA_RANGE: RangeInclusive<u64> = 0..=5000;
const SLOT_COUNT_RANGE: RangeInclusive<u8> = 1..=8;

/// Configuration parser errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Invalid modifier: {0}")]
    InvalidModifier(String),

    #[error("Invalid combo string '{combo}': {source}")]
    InvalidCombo {
        combo: String,
        #[source]
        source: ComboParseError,
    },

    #[error("Timeout value out of range: {name} = {value} (allowed {min}..={max})")]
    TimeoutOutOfRange {
        name: &'static str,
        value: u64,
        min: u64,
        max: u64,
    },

    #[error("Slot count out of range: {0} (allowed 1..=8)")]
    SlotCountOutOfRange(u8),

    #[error("Duplicate tap/hold trigger: {0}")]
    DuplicateTrigger(Key),

    #[error("Layer key {key} is also {role}")]
    LayerKeyConflict { key: Key, role: &'static str },
}

/// Main configuration structure (root TOML table)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigToml {
    #[serde(default)]
    pub timing: Option<TimingConfig>,

    /// Tap/hold keys. When present, replaces the built-in set entirely.
    #[serde(default)]
    pub tap_hold: Option<Vec<TapHoldTomlEntry>>,

    #[serde(default)]
    pub layer: Option<LayerConfig>,

    #[serde(default)]
    pub buffer: Option<BufferConfig>,

    #[serde(default)]
    pub dispatch: Option<DispatchConfig>,
}

/// Timing settings (milliseconds)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimingConfig {
    pub tapping_term_ms: Option<u64>,
    /// Added to the tapping term for secondary-key hold activation
    pub hold_activation_extra_ms: Option<u64>,
}

/// One `[[tap_hold]]` entry
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TapHoldTomlEntry {
    pub trigger: String,
    /// Combo string emitted on tap, e.g. "Shift-9"
    pub tap: String,
    /// Modifier latched on hold
    pub hold: String,
    pub tapping_term_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayerConfig {
    pub key: Option<String>,
    pub tap: Option<String>,
    pub release_activation: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BufferConfig {
    pub multi_slot_keys: Option<Vec<String>>,
    pub multi_slot_count: Option<u8>,
    /// Non-letter keys to buffer, in replay order
    pub extra_keys: Option<Vec<String>>,
}

/// `source = "target"` tables. Each one present replaces its built-in group.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    pub navigation: Option<IndexMap<String, String>>,
    pub function_row: Option<IndexMap<String, String>>,
}

/// Resolved and validated configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub tapping_term_ms: u64,
    pub hold_activation_extra_ms: u64,
    pub tap_holds: Vec<TapHoldBinding>,
    pub layer_key: Key,
    /// Emitted first on buffer replay
    pub layer_tap: Combo,
    pub release_activation: bool,
    pub multi_slot_keys: Vec<Key>,
    pub multi_slot_count: u8,
    pub extra_keys: Vec<Key>,
    pub navigation: Vec<(Key, Key)>,
    pub function_row: Vec<(Key, Key)>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tapping_term_ms: keymap::DEFAULT_TAPPING_TERM_MS,
            hold_activation_extra_ms: keymap::DEFAULT_HOLD_ACTIVATION_EXTRA_MS,
            tap_holds: keymap::default_tap_holds(keymap::DEFAULT_TAPPING_TERM_MS),
            layer_key: keymap::DEFAULT_LAYER_KEY,
            layer_tap: Combo::key_only(keymap::DEFAULT_LAYER_KEY),
            release_activation: true,
            multi_slot_keys: keymap::DEFAULT_MULTI_SLOT_KEYS.to_vec(),
            multi_slot_count: keymap::DEFAULT_MULTI_SLOT_COUNT,
            extra_keys: keymap::DEFAULT_EXTRA_BUFFERED_KEYS.to_vec(),
            navigation: keymap::DEFAULT_NAVIGATION.to_vec(),
            function_row: keymap::DEFAULT_FUNCTION_ROW.to_vec(),
        }
    }
}

impl Config {
    /// Parse a TOML configuration file
    pub fn from_toml_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;
        log::info!("loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let toml_config: ConfigToml =
            toml::from_str(content).map_err(|e| ConfigError::TomlParse(e.to_string()))?;
        toml_config.to_config()
    }

    /// Convert to EngineConfig for use in Engine
    pub fn to_engine_config(&self) -> EngineConfig {
        log::debug!(
            "to_engine_config: layer key {}, {} tap/hold key(s)",
            self.layer_key,
            self.tap_holds.len()
        );
        EngineConfig {
            tap_holds: self.tap_holds.clone(),
            layer: LayerBinding {
                key: self.layer_key,
                tapping_term_ms: self.tapping_term_ms,
                hold_activation_extra_ms: self.hold_activation_extra_ms,
                tap: self.layer_tap.clone(),
                release_activation: self.release_activation,
            },
            buffer: BufferLayout::new(
                self.layer_key,
                self.extra_keys.iter().copied(),
                &self.multi_slot_keys,
                self.multi_slot_count,
            ),
            dispatch: LayerDispatchTable::new()
                .with_group(DispatchGroup::Navigation, self.navigation.iter().copied())
                .with_group(DispatchGroup::FunctionRow, self.function_row.iter().copied()),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut triggers = HashSet::new();
        for binding in &self.tap_holds {
            if !triggers.insert(binding.trigger) {
                return Err(ConfigError::DuplicateTrigger(binding.trigger));
            }
        }
        if triggers.contains(&self.layer_key) {
            return Err(ConfigError::LayerKeyConflict {
                key: self.layer_key,
                role: "a tap/hold trigger",
            });
        }
        let is_source = self
            .navigation
            .iter()
            .chain(&self.function_row)
            .any(|&(source, _)| source == self.layer_key);
        if is_source {
            return Err(ConfigError::LayerKeyConflict {
                key: self.layer_key,
                role: "a dispatch source",
            });
        }
        Ok(())
    }
}

impl ConfigToml {
    /// Convert parsed TOML to internal Config structure
    fn to_config(&self) -> Result<Config, ConfigError> {
        let mut config = Config::default();

        if let Some(timing) = &self.timing {
            if let Some(ms) = timing.tapping_term_ms {
                config.tapping_term_ms = check_range("tapping_term_ms", ms, TAPPING_TERM_RANGE)?;
                config.tap_holds = keymap::default_tap_holds(config.tapping_term_ms);
            }
            if let Some(ms) = timing.hold_activation_extra_ms {
                config.hold_activation_extra_ms =
                    check_range("hold_activation_extra_ms", ms, HOLD_EXTRA_RANGE)?;
            }
        }

        if let Some(entries) = &self.tap_hold {
            config.tap_holds = entries
                .iter()
                .map(|entry| entry.to_binding(config.tapping_term_ms))
                .collect::<Result<_, _>>()?;
        }

        if let Some(layer) = &self.layer {
            if let Some(name) = &layer.key {
                config.layer_key = parse_key(name)?;
                config.layer_tap = Combo::key_only(config.layer_key);
            }
            if let Some(tap) = &layer.tap {
                config.layer_tap = parse_combo(tap)?;
            }
            if let Some(release_activation) = layer.release_activation {
                config.release_activation = release_activation;
            }
        }

        if let Some(buffer) = &self.buffer {
            if let Some(names) = &buffer.multi_slot_keys {
                config.multi_slot_keys = parse_keys(names)?;
            }
            if let Some(count) = buffer.multi_slot_count {
                if !SLOT_COUNT_RANGE.contains(&count) {
                    return Err(ConfigError::SlotCountOutOfRange(count));
                }
                config.multi_slot_count = count;
            }
            if let Some(names) = &buffer.extra_keys {
                config.extra_keys = parse_keys(names)?;
            }
        }

        if let Some(dispatch) = &self.dispatch {
            if let Some(table) = &dispatch.navigation {
                config.navigation = parse_pairs(table)?;
            }
            if let Some(table) = &dispatch.function_row {
                config.function_row = parse_pairs(table)?;
            }
        }

        config.validate()?;
        log::debug!(
            "config: tapping term {}ms, hold extra {}ms, {} dispatch mapping(s)",
            config.tapping_term_ms,
            config.hold_activation_extra_ms,
            config.navigation.len() + config.function_row.len()
        );
        Ok(config)
    }
}

impl TapHoldTomlEntry {
    fn to_binding(&self, default_term_ms: u64) -> Result<TapHoldBinding, ConfigError> {
        let tapping_term_ms = match self.tapping_term_ms {
            Some(ms) => check_range("tap_hold.tapping_term_ms", ms, TAPPING_TERM_RANGE)?,
            None => default_term_ms,
        };
        Ok(TapHoldBinding {
            trigger: parse_key(&self.trigger)?,
            tapping_term_ms,
            tap: parse_combo(&self.tap)?,
            hold: parse_modifier(&self.hold)?,
        })
    }
}

fn check_range(name: &'static str, value: u64, range: RangeInclusive<u64>) -> Result<u64, ConfigError> {
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::TimeoutOutOfRange {
            name,
            value,
            min: *range.start(),
            max: *range.end(),
        })
    }
}

/// Parse a key name into a Key
fn parse_key(name: &str) -> Result<Key, ConfigError> {
    let trimmed = name.trim();
    crate::key::key_from_name(trimmed).ok_or_else(|| ConfigError::InvalidKey(trimmed.to_string()))
}

fn parse_keys(names: &[String]) -> Result<Vec<Key>, ConfigError> {
    names.iter().map(|name| parse_key(name)).collect()
}

/// Modifier alias ("Ctrl", "RShift") or the name of a modifier key ("left_ctrl")
fn parse_modifier(name: &str) -> Result<Modifier, ConfigError> {
    Modifier::from_alias(name)
        .or_else(|| crate::key::key_from_name(name).and_then(Modifier::from_key))
        .ok_or_else(|| ConfigError::InvalidModifier(name.trim().to_string()))
}

fn parse_combo(combo: &str) -> Result<Combo, ConfigError> {
    parse_combo_string(combo).map_err(|source| ConfigError::InvalidCombo {
        combo: combo.to_string(),
        source,
    })
}

fn parse_pairs(table: &IndexMap<String, String>) -> Result<Vec<(Key, Key)>, ConfigError> {
    table
        .iter()
        .map(|(source, target)| Ok((parse_key(source)?, parse_key(target)?)))
        .collect()
}
