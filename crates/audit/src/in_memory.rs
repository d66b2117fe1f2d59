//! In-memory audit sink for tests/dev.

use std::sync::Mutex;

use crate::event::AuditEvent;
use crate::sink::{AuditError, AuditSink};

/// Collects events in memory so tests can assert on what was recorded.
#[derive(Debug, Default)]
pub struct InMemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.events.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&self, event: AuditEvent) -> Result<(), AuditError> {
        let mut events = self
            .events
            .lock()
            .map_err(|_| AuditError::new("sink lock poisoned"))?;
        events.push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::AuditAction;
    use stockroom_core::ShopId;

    #[test]
    fn recorded_events_are_observable_in_order() {
        let sink = InMemoryAuditSink::new();
        let shop_id = ShopId::new();

        sink.record(AuditEvent::new(
            shop_id,
            AuditAction::Created,
            "restocking",
            "id-1",
            "RST-1",
            "order created",
        ))
        .unwrap();
        sink.record(AuditEvent::new(
            shop_id,
            AuditAction::Completed,
            "restocking",
            "id-1",
            "RST-1",
            "order completed",
        ))
        .unwrap();

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].action_type, AuditAction::Created);
        assert_eq!(events[1].action_type, AuditAction::Completed);
    }
}
