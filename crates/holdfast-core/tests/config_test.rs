// Holdfast Configuration Tests
//
// TOML documents loaded through the public API, checked both for the
// resolved configuration and for the behavior of an engine built from it.

use std::fs;
use std::path::PathBuf;

use holdfast_core::config::ComboParseError;
use holdfast_core::{
    Combo, Config, ConfigError, DispatchGroup, Edge, Engine, Key, LayerPhase, Modifier, Output,
    OutputEvent, PhysicalEvent,
};

const CUSTOM: &str = r#"
    [timing]
    tapping_term_ms = 200
    hold_activation_extra_ms = 50

    [[tap_hold]]
    trigger = "capslock"
    tap = "escape"
    hold = "Ctrl"

    [[tap_hold]]
    trigger = "enter"
    tap = "enter"
    hold = "right_ctrl"
    tapping_term_ms = 300

    [layer]
    key = "space"
    tap = "space"
    release_activation = false

    [buffer]
    multi_slot_keys = ["l"]
    multi_slot_count = 2
    extra_keys = ["comma", "dot"]

    [dispatch.navigation]
    h = "left"
    l = "right"

    [dispatch.function_row]
    1 = "f1"
"#;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn run(config: &Config, events: &[PhysicalEvent]) -> Vec<OutputEvent> {
    let mut engine = Engine::new(config.to_engine_config());
    let mut out = Vec::new();
    for event in events {
        engine.process(event, &mut out);
    }
    out
}

fn edges(out: &[OutputEvent]) -> Vec<(Output, Edge)> {
    out.iter().map(|event| (event.action, event.edge)).collect()
}

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("holdfast-{}-{}", std::process::id(), name))
}

#[test]
fn test_custom_config_resolves() {
    init_logger();
    let config = Config::from_toml(CUSTOM).unwrap();

    assert_eq!(config.tapping_term_ms, 200);
    assert_eq!(config.layer_key, Key::SPACE);
    assert_eq!(config.layer_tap, Combo::key_only(Key::SPACE));
    assert!(!config.release_activation);
    assert_eq!(config.tap_holds.len(), 2);
    assert_eq!(config.tap_holds[0].tapping_term_ms, 200);
    assert_eq!(config.tap_holds[0].hold, Modifier::LeftCtrl);
    assert_eq!(config.tap_holds[1].tapping_term_ms, 300);
    assert_eq!(config.tap_holds[1].hold, Modifier::RightCtrl);

    let engine_config = config.to_engine_config();
    assert_eq!(engine_config.layer.hold_threshold_ms(), 250);
    assert_eq!(engine_config.buffer.capacity(Key::L), Some(2));
    assert!(engine_config.buffer.contains(Key::DOT));
    assert!(!engine_config.buffer.contains(Key::ENTER));
    assert_eq!(engine_config.dispatch.len(), 3);
    assert_eq!(
        engine_config.dispatch.entry(Key::KEY_1).map(|entry| entry.group),
        Some(DispatchGroup::FunctionRow)
    );
}

#[test]
fn test_custom_layer_key_replays_and_dispatches() {
    init_logger();
    let config = Config::from_toml(CUSTOM).unwrap();

    let out = run(
        &config,
        &[
            PhysicalEvent::down(Key::SPACE, 0),
            PhysicalEvent::down(Key::COMMA, 10),
            PhysicalEvent::down(Key::A, 20),
            PhysicalEvent::up(Key::SPACE, 30),
        ],
    );
    let downs: Vec<Output> = out
        .iter()
        .filter(|event| event.edge == Edge::Down)
        .map(|event| event.action)
        .collect();
    assert_eq!(
        downs,
        vec![Output::Key(Key::SPACE), Output::Key(Key::A), Output::Key(Key::COMMA)]
    );

    let out = run(
        &config,
        &[
            PhysicalEvent::down(Key::SPACE, 0),
            PhysicalEvent::down(Key::H, 10),
            PhysicalEvent::up(Key::H, 30),
            PhysicalEvent::down(Key::H, 50),
        ],
    );
    assert_eq!(edges(&out), vec![(Output::Key(Key::LEFT), Edge::Down)]);
}

#[test]
fn test_custom_tap_hold_terms() {
    init_logger();
    let config = Config::from_toml(CUSTOM).unwrap();

    // 250ms is a hold for capslock (200) but still a tap for enter (300)
    let out = run(
        &config,
        &[
            PhysicalEvent::down(Key::CAPSLOCK, 0),
            PhysicalEvent::up(Key::CAPSLOCK, 250),
            PhysicalEvent::down(Key::ENTER, 1000),
            PhysicalEvent::up(Key::ENTER, 1250),
        ],
    );
    assert_eq!(
        edges(&out),
        vec![(Output::Key(Key::ENTER), Edge::Down), (Output::Key(Key::ENTER), Edge::Up)]
    );
}

#[test]
fn test_partial_config_keeps_builtin_keymap() {
    let config = Config::from_toml("[layer]\nrelease_activation = false").unwrap();
    assert_eq!(config.layer_key, Key::F);
    assert_eq!(config.tap_holds.len(), 3);
    assert_eq!(config.navigation.len(), 6);

    let mut engine = Engine::new(config.to_engine_config());
    let mut out = Vec::new();
    engine.process(&PhysicalEvent::down(Key::F, 0), &mut out);
    assert_eq!(engine.layer_phase(), LayerPhase::Pending);
}

#[test]
fn test_from_toml_path() {
    let path = temp_path("config.toml");
    fs::write(&path, "[timing]\ntapping_term_ms = 180\n").unwrap();
    let config = Config::from_toml_path(&path).unwrap();
    fs::remove_file(&path).unwrap();

    assert_eq!(config.tapping_term_ms, 180);
}

#[test]
fn test_missing_file_is_io_error() {
    let result = Config::from_toml_path(temp_path("does-not-exist.toml"));
    assert!(matches!(result, Err(ConfigError::Io(_))));
}

#[test]
fn test_invalid_documents() {
    let cases: &[(&str, fn(&ConfigError) -> bool)] = &[
        ("[timing]\ntapping_term_ms = 9000", |e| {
            matches!(e, ConfigError::TimeoutOutOfRange { .. })
        }),
        ("[timing]\nhold_activation_extra_ms = 6000", |e| {
            matches!(e, ConfigError::TimeoutOutOfRange { .. })
        }),
        ("[buffer]\nmulti_slot_count = 0", |e| {
            matches!(e, ConfigError::SlotCountOutOfRange(0))
        }),
        ("[buffer]\nmulti_slot_count = 9", |e| {
            matches!(e, ConfigError::SlotCountOutOfRange(9))
        }),
        ("[buffer]\nextra_keys = [\"nope\"]", |e| {
            matches!(e, ConfigError::InvalidKey(name) if name == "nope")
        }),
        ("[dispatch.navigation]\nh = \"sideways\"", |e| {
            matches!(e, ConfigError::InvalidKey(_))
        }),
        (
            "[[tap_hold]]\ntrigger = \"capslock\"\ntap = \"esc\"\nhold = \"Ctrl\"\n\
             [[tap_hold]]\ntrigger = \"capslock\"\ntap = \"a\"\nhold = \"Alt\"",
            |e| matches!(e, ConfigError::DuplicateTrigger(Key::CAPSLOCK)),
        ),
        ("[[tap_hold]]\ntrigger = \"capslock\"\ntap = \"esc\"\nhold = \"q\"", |e| {
            matches!(e, ConfigError::InvalidModifier(_))
        }),
        ("[[tap_hold]]\ntrigger = \"capslock\"\ntap = \"Ctrl-\"\nhold = \"Ctrl\"", |e| {
            matches!(
                e,
                ConfigError::InvalidCombo {
                    source: ComboParseError::TrailingHyphen,
                    ..
                }
            )
        }),
        ("[layer]\nkey = \"h\"", |e| {
            matches!(e, ConfigError::LayerKeyConflict { key: Key::H, .. })
        }),
        ("[general]\nsuspend_key = \"f12\"", |e| matches!(e, ConfigError::TomlParse(_))),
        ("[timing\n", |e| matches!(e, ConfigError::TomlParse(_))),
    ];

    for (toml, check) in cases {
        match Config::from_toml(toml) {
            Ok(_) => panic!("expected error for {:?}", toml),
            Err(err) => assert!(check(&err), "unexpected error {:?} for {:?}", err, toml),
        }
    }
}
