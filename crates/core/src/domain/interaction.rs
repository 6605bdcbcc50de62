use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::channel::ChannelType;
use crate::domain::intent::{ContactInfo, IntentResult, IntentType};
use crate::errors::DomainError;

/// Canonical, channel-prefixed deduplication key for one inbound webhook
/// delivery. Globally unique; two records never share one.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub String);

impl EventId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl InteractionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// Durable record of one webhook event's full lifecycle. Single writer: the
/// dispatcher handling the event owns the record until it reaches a terminal
/// status; afterwards it is read-only audit data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub event_id: EventId,
    pub channel: ChannelType,
    pub status: InteractionStatus,
    pub intent: Option<IntentType>,
    pub intent_confidence: Option<f64>,
    pub extracted_slots: serde_json::Map<String, serde_json::Value>,
    pub contact: Option<ContactInfo>,
    pub response_text: Option<String>,
    pub calendar_event_id: Option<String>,
    pub error_message: Option<String>,
    pub processing_time_ms: Option<i64>,
    pub raw_payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InteractionRecord {
    /// A freshly received event, already in `processing` (the record is
    /// persisted before any further work happens).
    pub fn processing(
        event_id: EventId,
        channel: ChannelType,
        raw_payload: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id,
            channel,
            status: InteractionStatus::Processing,
            intent: None,
            intent_confidence: None,
            extracted_slots: serde_json::Map::new(),
            contact: None,
            response_text: None,
            calendar_event_id: None,
            error_message: None,
            processing_time_ms: None,
            raw_payload,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn can_transition_to(&self, next: InteractionStatus) -> bool {
        matches!(
            (&self.status, next),
            (InteractionStatus::Pending, InteractionStatus::Processing)
                | (InteractionStatus::Processing, InteractionStatus::Completed)
                | (InteractionStatus::Processing, InteractionStatus::Failed)
                // Strict delivery policy: a completed record whose reply could
                // not be delivered may be re-marked failed.
                | (InteractionStatus::Completed, InteractionStatus::Failed)
                | (InteractionStatus::Pending, InteractionStatus::Cancelled)
                | (InteractionStatus::Processing, InteractionStatus::Cancelled)
        )
    }

    pub fn transition_to(&mut self, next: InteractionStatus) -> Result<(), DomainError> {
        if self.can_transition_to(next) {
            self.status = next;
            return Ok(());
        }

        Err(DomainError::InvalidInteractionTransition { from: self.status, to: next })
    }

    /// Copy classification output onto the record.
    pub fn apply_classification(&mut self, result: &IntentResult, now: DateTime<Utc>) {
        self.intent = Some(result.intent);
        self.intent_confidence = Some(result.confidence);
        self.extracted_slots = result.slots.clone();
        self.contact = result.contact.clone();
        self.updated_at = now;
    }

    /// Terminal success. A completed interaction always carries the reply
    /// that was generated for it.
    pub fn complete(
        &mut self,
        response_text: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let response_text = response_text.into();
        if response_text.is_empty() {
            return Err(DomainError::InvariantViolation(
                "completed interaction requires a response text".to_owned(),
            ));
        }

        self.transition_to(InteractionStatus::Completed)?;
        self.response_text = Some(response_text);
        self.updated_at = now;
        Ok(())
    }

    /// Terminal failure. A failed interaction always carries the cause.
    pub fn fail(
        &mut self,
        error_message: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let error_message = error_message.into();
        if error_message.is_empty() {
            return Err(DomainError::InvariantViolation(
                "failed interaction requires an error message".to_owned(),
            ));
        }

        self.transition_to(InteractionStatus::Failed)?;
        self.error_message = Some(error_message);
        self.updated_at = now;
        Ok(())
    }

    /// Explicit external cancellation; never reached from the processing
    /// pipeline itself.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.transition_to(InteractionStatus::Cancelled)?;
        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::domain::channel::ChannelType;
    use crate::domain::intent::{ContactInfo, IntentResult, IntentType};
    use crate::errors::DomainError;

    use super::{EventId, InteractionRecord, InteractionStatus};

    fn record() -> InteractionRecord {
        InteractionRecord::processing(
            EventId("sms_SM123".to_owned()),
            ChannelType::Sms,
            serde_json::json!({"Body": "hello"}),
            Utc::now(),
        )
    }

    #[test]
    fn new_records_start_processing_with_raw_payload_attached() {
        let record = record();
        assert_eq!(record.status, InteractionStatus::Processing);
        assert_eq!(record.raw_payload["Body"], "hello");
        assert!(record.intent.is_none());
    }

    #[test]
    fn processing_completes_with_response_text() {
        let mut record = record();
        record.complete("Thanks for reaching out!", Utc::now()).expect("complete");

        assert_eq!(record.status, InteractionStatus::Completed);
        assert_eq!(record.response_text.as_deref(), Some("Thanks for reaching out!"));
    }

    #[test]
    fn completion_without_text_violates_invariant() {
        let mut record = record();
        let error = record.complete("", Utc::now()).expect_err("empty response must be rejected");
        assert!(matches!(error, DomainError::InvariantViolation(_)));
        assert_eq!(record.status, InteractionStatus::Processing);
    }

    #[test]
    fn processing_fails_with_error_message() {
        let mut record = record();
        record.fail("calendar unavailable", Utc::now()).expect("fail");

        assert_eq!(record.status, InteractionStatus::Failed);
        assert_eq!(record.error_message.as_deref(), Some("calendar unavailable"));
    }

    #[test]
    fn terminal_records_reject_reprocessing() {
        let mut record = record();
        record.complete("done", Utc::now()).expect("complete");

        let error = record
            .transition_to(InteractionStatus::Processing)
            .expect_err("completed -> processing must fail");
        assert!(matches!(error, DomainError::InvalidInteractionTransition { .. }));
    }

    #[test]
    fn completed_can_be_failed_only_for_delivery_policy() {
        let mut record = record();
        record.complete("done", Utc::now()).expect("complete");
        record.fail("delivery rejected by carrier", Utc::now()).expect("delivery failure");
        assert_eq!(record.status, InteractionStatus::Failed);
    }

    #[test]
    fn cancellation_is_only_reachable_before_terminal_status() {
        let mut record = record();
        record.cancel(Utc::now()).expect("processing -> cancelled");

        let mut completed = self::record();
        completed.complete("done", Utc::now()).expect("complete");
        assert!(completed.cancel(Utc::now()).is_err());
    }

    #[test]
    fn classification_fields_are_copied_onto_the_record() {
        let mut record = record();
        let result = IntentResult::new(IntentType::Contact, 0.8, "I'm Ada, ada@example.com")
            .with_contact(ContactInfo {
                name: Some("Ada".to_owned()),
                email: Some("ada@example.com".to_owned()),
                phone: None,
            });

        record.apply_classification(&result, Utc::now());

        assert_eq!(record.intent, Some(IntentType::Contact));
        assert_eq!(record.intent_confidence, Some(0.8));
        assert_eq!(record.contact.as_ref().and_then(|c| c.name.as_deref()), Some("Ada"));
    }
}
