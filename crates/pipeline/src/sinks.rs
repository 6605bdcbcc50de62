use sara_core::audit::{AuditEvent, AuditSink};

/// Production audit sink: one structured log line per lifecycle event.
/// Emitting never fails and never blocks the pipeline.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn emit(&self, event: AuditEvent) {
        tracing::info!(
            event_name = "audit",
            audit_event_type = event.event_type.as_str(),
            event_id = %event.event_id,
            payload = %event.payload,
            occurred_at = %event.occurred_at.to_rfc3339(),
            "audit event"
        );
    }
}
