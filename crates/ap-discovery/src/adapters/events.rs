//! Event sink adapters.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{info, warn};

use crate::domain::{DiscoveryEvent, EventOutcome};
use crate::ports::DiscoveryEventSink;

// ============================================================================
// RecordingEventSink - Shared in-memory log
// ============================================================================

/// Keeps every event; clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingEventSink {
    events: Rc<RefCell<Vec<DiscoveryEvent>>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DiscoveryEvent> {
        self.events.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    pub fn last(&self) -> Option<DiscoveryEvent> {
        self.events.borrow().last().cloned()
    }

    pub fn take(&self) -> Vec<DiscoveryEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }
}

impl DiscoveryEventSink for RecordingEventSink {
    fn on_event(&mut self, event: &DiscoveryEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}

// ============================================================================
// TracingEventSink - Log-only sink
// ============================================================================

/// Logs every event and keeps nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl DiscoveryEventSink for TracingEventSink {
    fn on_event(&mut self, event: &DiscoveryEvent) {
        match event.outcome {
            EventOutcome::Succeeded => info!(
                source = ?event.source,
                server = ?event.server,
                flags = %event.flags,
                addresses = event.addresses.len(),
                "discovery succeeded"
            ),
            outcome => warn!(
                source = ?event.source,
                server = ?event.server,
                flags = %event.flags,
                ?outcome,
                "discovery did not succeed"
            ),
        }
    }
}
