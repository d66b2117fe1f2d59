//! Tracing-backed audit sink: emits each fact record as a structured log line.

use crate::event::AuditEvent;
use crate::sink::{AuditError, AuditSink};

/// Default production sink when no dedicated audit store is wired up.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl TracingAuditSink {
    pub fn new() -> Self {
        Self
    }
}

impl AuditSink for TracingAuditSink {
    fn record(&self, event: AuditEvent) -> Result<(), AuditError> {
        tracing::info!(
            target: "audit",
            shop_id = %event.shop_id,
            action = event.action_type.as_str(),
            entity_type = %event.entity_type,
            entity_id = %event.entity_id,
            entity_name = %event.entity_name,
            description = %event.description,
            "audit event"
        );
        Ok(())
    }
}
