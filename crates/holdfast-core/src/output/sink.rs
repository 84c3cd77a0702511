// Holdfast Output Sink
// Receives the ordered synthesized event stream

use crate::event::OutputEvent;

/// Where synthesized events go, e.g. a virtual keyboard or a test recorder.
///
/// Injection into the operating system is the implementor's concern. The engine
/// calls `emit` in output order and never batches.
pub trait OutputSink {
    fn emit(&mut self, event: OutputEvent);
}

/// Records every event; handy for tests and replays
impl OutputSink for Vec<OutputEvent> {
    fn emit(&mut self, event: OutputEvent) {
        self.push(event);
    }
}

impl<S: OutputSink + ?Sized> OutputSink for &mut S {
    fn emit(&mut self, event: OutputEvent) {
        (**self).emit(event);
    }
}

impl<S: OutputSink + ?Sized> OutputSink for Box<S> {
    fn emit(&mut self, event: OutputEvent) {
        (**self).emit(event);
    }
}
