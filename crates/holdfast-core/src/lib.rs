// Holdfast Core Library
// Tap/hold and momentary-layer keyboard remapping engine

pub mod combo;
pub mod config;
pub mod event;
pub mod key;
pub mod layer;
pub mod modifier;
pub mod output;
pub mod tap_hold;
pub mod timer;
pub mod transform;

pub use combo::Combo;
pub use config::{parse_combo_string, ComboParseError, Config, ConfigError};
pub use event::{
    ChannelInput, Clock, Edge, EventLoop, EventLoopError, EventLoopResult, InputSource, Output,
    OutputEvent, PhysicalEvent, Polled, ScriptedInput, Timestamp,
};
pub use key::Key;
pub use layer::{
    BufferError, BufferLayout, DispatchGroup, LayerBinding, LayerDispatchTable, LayerKeyController,
    LayerPhase, LayerState,
};
pub use modifier::Modifier;
pub use output::{HeldOutputs, OutputSink};
pub use tap_hold::{TapHoldBinding, TapHoldController, TapHoldSet};
pub use timer::{TimerHandle, TimerQueue, TimerService, TimerToken};
pub use transform::{Engine, EngineConfig, EngineStats};
