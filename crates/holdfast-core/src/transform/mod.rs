// Holdfast Transform Module
// Event routing and the engine that drives every controller

pub mod bus;
pub mod engine;

pub use bus::{route_press, Handler, Route};
pub use engine::{Engine, EngineConfig, EngineStats};
