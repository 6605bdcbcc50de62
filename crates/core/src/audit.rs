use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::interaction::EventId;

/// Lifecycle stages emitted by the pipeline. Fire-and-forget: emitting must
/// never block or fail interaction processing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    InteractionStarted,
    IntentExtracted,
    InteractionCompleted,
    InteractionFailed,
    CalendarEventCreated,
    CalendarEventCancelled,
    MessageSent,
}

impl AuditEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InteractionStarted => "interaction_started",
            Self::IntentExtracted => "intent_extracted",
            Self::InteractionCompleted => "interaction_completed",
            Self::InteractionFailed => "interaction_failed",
            Self::CalendarEventCreated => "calendar_event_created",
            Self::CalendarEventCancelled => "calendar_event_cancelled",
            Self::MessageSent => "message_sent",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub audit_id: String,
    pub event_id: EventId,
    pub event_type: AuditEventType,
    pub payload: serde_json::Value,
    pub occurred_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(event_id: EventId, event_type: AuditEventType, payload: serde_json::Value) -> Self {
        Self {
            audit_id: Uuid::new_v4().to_string(),
            event_id,
            event_type,
            payload,
            occurred_at: Utc::now(),
        }
    }
}

pub trait AuditSink: Send + Sync {
    fn emit(&self, event: AuditEvent);
}

#[derive(Clone, Default)]
pub struct InMemoryAuditSink {
    events: Arc<Mutex<Vec<AuditEvent>>>,
}

impl InMemoryAuditSink {
    pub fn events(&self) -> Vec<AuditEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn of_type(&self, event_type: AuditEventType) -> Vec<AuditEvent> {
        self.events().into_iter().filter(|event| event.event_type == event_type).collect()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn emit(&self, event: AuditEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::interaction::EventId;

    use super::{AuditEvent, AuditEventType, AuditSink, InMemoryAuditSink};

    #[test]
    fn in_memory_sink_records_events_with_their_payload() {
        let sink = InMemoryAuditSink::default();
        sink.emit(AuditEvent::new(
            EventId("sms_SM1".to_owned()),
            AuditEventType::IntentExtracted,
            serde_json::json!({"intent": "schedule", "confidence": 0.92}),
        ));

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_id.as_str(), "sms_SM1");
        assert_eq!(events[0].payload["intent"], "schedule");
    }

    #[test]
    fn of_type_filters_to_the_requested_stage() {
        let sink = InMemoryAuditSink::default();
        let id = EventId("call-1".to_owned());
        sink.emit(AuditEvent::new(
            id.clone(),
            AuditEventType::InteractionStarted,
            serde_json::json!({}),
        ));
        sink.emit(AuditEvent::new(
            id,
            AuditEventType::InteractionCompleted,
            serde_json::json!({}),
        ));

        assert_eq!(sink.of_type(AuditEventType::InteractionCompleted).len(), 1);
        assert_eq!(sink.of_type(AuditEventType::CalendarEventCreated).len(), 0);
    }
}
