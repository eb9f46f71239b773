//! Durable-log sink trait — the Event Fast-path schedules an
//! `InteractionEvent` write through this trait rather than talking to
//! Postgres directly, so the orchestrator and its tests can swap in a
//! capturing double.

use crate::types::InteractionEvent;
use std::sync::{Arc, Mutex};

/// Accepts interaction events for durable logging. Implementations
/// route to the relational interaction log (`reco-durable-log`), or,
/// in tests, to memory.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: InteractionEvent);
}

/// No-op sink for call sites that don't need durable logging.
pub struct NoOpSink;

impl EventSink for NoOpSink {
    fn emit(&self, _event: InteractionEvent) {}
}

/// In-memory sink that captures events for testing.
#[derive(Default)]
pub struct CaptureSink {
    events: Mutex<Vec<InteractionEvent>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn events(&self) -> Vec<InteractionEvent> {
        self.events.lock().expect("event bus mutex poisoned").clone()
    }

    pub fn count(&self) -> usize {
        self.events.lock().expect("event bus mutex poisoned").len()
    }

    pub fn clear(&self) {
        self.events.lock().expect("event bus mutex poisoned").clear();
    }
}

impl EventSink for CaptureSink {
    fn emit(&self, event: InteractionEvent) {
        self.events.lock().expect("event bus mutex poisoned").push(event);
    }
}

pub fn noop_sink() -> Arc<dyn EventSink> {
    Arc::new(NoOpSink)
}

pub fn capture_sink() -> Arc<CaptureSink> {
    Arc::new(CaptureSink::new())
}
