//! Event Publisher Adapters
//!
//! `InMemoryEventLog` keeps every event for inspection; `NoOpPublisher`
//! drops them.

use crate::domain::RelayEvent;
use crate::ports::outbound::{EventPublisher, PublishError};
use parking_lot::RwLock;

/// Publisher that records events in order.
#[derive(Default)]
pub struct InMemoryEventLog {
    events: RwLock<Vec<RelayEvent>>,
}

impl InMemoryEventLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// All events published so far.
    pub fn events(&self) -> Vec<RelayEvent> {
        self.events.read().clone()
    }

    /// Names of the events published so far.
    pub fn names(&self) -> Vec<&'static str> {
        self.events.read().iter().map(RelayEvent::name).collect()
    }

    /// Number of events with the given name.
    pub fn count(&self, name: &str) -> usize {
        self.events.read().iter().filter(|e| e.name() == name).count()
    }

    /// Drop all recorded events.
    pub fn clear(&self) {
        self.events.write().clear();
    }
}

impl EventPublisher for InMemoryEventLog {
    fn publish(&self, event: RelayEvent) -> Result<(), PublishError> {
        self.events.write().push(event);
        Ok(())
    }
}

/// Publisher that discards events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpPublisher;

impl EventPublisher for NoOpPublisher {
    fn publish(&self, _event: RelayEvent) -> Result<(), PublishError> {
        Ok(())
    }
}
