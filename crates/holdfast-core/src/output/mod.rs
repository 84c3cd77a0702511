// Holdfast Output Layer
// The sink boundary and bookkeeping of what the sink currently holds down

mod sink;
mod state;

pub use sink::OutputSink;
pub use state::HeldOutputs;
