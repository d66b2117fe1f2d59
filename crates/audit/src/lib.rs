//! Audit trail: fact records describing what changed.
//!
//! The engine treats the sink as fire-and-forget — a delivery failure is
//! logged by the caller and never rolls back the business operation.

pub mod event;
pub mod in_memory;
pub mod sink;
pub mod tracing_sink;

pub use event::{AuditAction, AuditEvent};
pub use in_memory::InMemoryAuditSink;
pub use sink::{AuditError, AuditSink};
pub use tracing_sink::TracingAuditSink;
