//! Audit sink abstraction (mechanics only).
//!
//! A sink receives fact records after a business operation has committed.
//! Delivery is best-effort: the engine logs a failed `record` and moves on,
//! so implementations must not be load-bearing for correctness.

use std::sync::Arc;
use thiserror::Error;

use crate::event::AuditEvent;

/// Audit delivery failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("audit delivery failed: {0}")]
pub struct AuditError(pub String);

impl AuditError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Append-only destination for audit events.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: AuditEvent) -> Result<(), AuditError>;
}

impl<S> AuditSink for Arc<S>
where
    S: AuditSink + ?Sized,
{
    fn record(&self, event: AuditEvent) -> Result<(), AuditError> {
        (**self).record(event)
    }
}
