//! The interaction pipeline orchestrator.
//!
//! One inbound event flows through: duplicate check, durable record
//! creation, classification, optional calendar mutation, reply generation,
//! completion, delivery, dedup mark. Each external call is bounded by a
//! timeout and resolves to an explicit outcome: classification and reply
//! generation recover to a fallback value inside their wrappers, scheduling
//! and persistence failures are fatal and surface to the caller after the
//! record is durably marked failed.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};

use sara_core::audit::{AuditEvent, AuditEventType, AuditSink};
use sara_core::config::{DeliveryFailurePolicy, PipelineConfig};
use sara_core::contracts::{IntentClassifier, ReplySender, ResponseGenerator, SchedulerAdapter};
use sara_core::domain::interaction::InteractionRecord;
use sara_core::domain::intent::{IntentResult, IntentType};
use sara_core::domain::message::{InboundEvent, OutboundReply};
use sara_db::{InsertOutcome, InteractionRepository, RepositoryError};

use crate::idempotency::IdempotencyGuard;

/// Reply of last resort: used when the generator fails so a completed
/// interaction always carries a response.
pub const FALLBACK_REPLY: &str = "I apologize, but I'm having trouble understanding your \
     request. Could you please try again or contact us directly?";

#[derive(Clone, Debug)]
pub struct DispatcherConfig {
    pub classifier_timeout: Duration,
    pub scheduler_timeout: Duration,
    pub generator_timeout: Duration,
    pub send_timeout: Duration,
    pub delivery_failure_policy: DeliveryFailurePolicy,
    pub idempotency_cache_capacity: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            classifier_timeout: Duration::from_secs(15),
            scheduler_timeout: Duration::from_secs(30),
            generator_timeout: Duration::from_secs(15),
            send_timeout: Duration::from_secs(15),
            delivery_failure_policy: DeliveryFailurePolicy::BestEffort,
            idempotency_cache_capacity: 1024,
        }
    }
}

impl From<&PipelineConfig> for DispatcherConfig {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            classifier_timeout: Duration::from_secs(config.classifier_timeout_secs),
            scheduler_timeout: Duration::from_secs(config.scheduler_timeout_secs),
            generator_timeout: Duration::from_secs(config.generator_timeout_secs),
            send_timeout: Duration::from_secs(config.send_timeout_secs),
            delivery_failure_policy: config.delivery_failure_policy,
            idempotency_cache_capacity: config.idempotency_cache_capacity,
        }
    }
}

/// Outcome of processing one delivery. A duplicate is a normal result, not
/// an error; `Processed` carries the final record (completed, or failed by
/// the strict delivery policy).
#[derive(Clone, Debug, PartialEq)]
pub enum ProcessOutcome {
    Processed(InteractionRecord),
    Duplicate,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    /// The durable store failed before a record was created.
    #[error(transparent)]
    Store(#[from] RepositoryError),
    /// The interaction failed mid-pipeline; the record is durably `failed`
    /// and the event_id stays seen (no automatic retry).
    #[error("interaction {event_id} failed: {cause}")]
    InteractionFailed { event_id: String, cause: String },
}

pub struct Dispatcher {
    store: Arc<dyn InteractionRepository>,
    guard: IdempotencyGuard,
    classifier: Arc<dyn IntentClassifier>,
    generator: Arc<dyn ResponseGenerator>,
    scheduler: Arc<dyn SchedulerAdapter>,
    sender: Arc<dyn ReplySender>,
    audit: Arc<dyn AuditSink>,
    config: DispatcherConfig,
}

impl Dispatcher {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn InteractionRepository>,
        classifier: Arc<dyn IntentClassifier>,
        generator: Arc<dyn ResponseGenerator>,
        scheduler: Arc<dyn SchedulerAdapter>,
        sender: Arc<dyn ReplySender>,
        audit: Arc<dyn AuditSink>,
        config: DispatcherConfig,
    ) -> Self {
        let guard = IdempotencyGuard::new(store.clone(), config.idempotency_cache_capacity);
        Self { store, guard, classifier, generator, scheduler, sender, audit, config }
    }

    pub async fn process(&self, event: InboundEvent) -> Result<ProcessOutcome, DispatchError> {
        let started = Instant::now();

        if self.guard.seen(&event.event_id).await? {
            info!(
                event_name = "pipeline.duplicate_delivery",
                event_id = %event.event_id,
                channel = %event.channel,
                "duplicate delivery short-circuited"
            );
            return Ok(ProcessOutcome::Duplicate);
        }

        let mut record = InteractionRecord::processing(
            event.event_id.clone(),
            event.channel,
            event.raw_payload.clone(),
            Utc::now(),
        );

        // Durability precedes further work: after this insert, a crash can
        // never lose the fact that processing started. The uniqueness
        // constraint is the backstop for deliveries racing past the guard.
        match self.store.insert_processing(&record).await? {
            InsertOutcome::Created => {}
            InsertOutcome::DuplicateEventId => {
                info!(
                    event_name = "pipeline.duplicate_insert",
                    event_id = %event.event_id,
                    "concurrent delivery lost the insert race"
                );
                return Ok(ProcessOutcome::Duplicate);
            }
        }

        self.audit.emit(AuditEvent::new(
            event.event_id.clone(),
            AuditEventType::InteractionStarted,
            serde_json::json!({
                "channel": event.channel.as_str(),
                "user_input": &event.text,
            }),
        ));

        let classification = self.classify(&event).await;
        self.audit.emit(AuditEvent::new(
            event.event_id.clone(),
            AuditEventType::IntentExtracted,
            serde_json::json!({
                "intent": classification.intent.as_str(),
                "confidence": classification.confidence,
                "slots": &classification.slots,
                "contact": &classification.contact,
            }),
        ));

        record.apply_classification(&classification, Utc::now());
        if let Err(error) = self.store.update(&record).await {
            return Err(self.fail_interaction(record, error.to_string(), started).await);
        }

        if classification.intent == IntentType::Schedule {
            if let Some(appointment) = &classification.appointment {
                let description =
                    format!("Appointment scheduled via {}", event.channel.as_str());
                let create = self.scheduler.create_appointment(
                    appointment,
                    classification.contact.as_ref(),
                    &description,
                );
                // Scheduling failure is not swallowed: reporting success on a
                // failed booking would be a correctness violation.
                match bounded(self.config.scheduler_timeout, "scheduler", create).await {
                    Ok(calendar_event_id) => {
                        self.audit.emit(AuditEvent::new(
                            event.event_id.clone(),
                            AuditEventType::CalendarEventCreated,
                            serde_json::json!({
                                "calendar_event_id": &calendar_event_id,
                                "date": appointment.date.to_string(),
                                "time": appointment.time.format("%H:%M").to_string(),
                                "contact_name": classification
                                    .contact
                                    .as_ref()
                                    .and_then(|contact| contact.name.clone()),
                            }),
                        ));
                        record.calendar_event_id = Some(calendar_event_id);
                    }
                    Err(cause) => {
                        return Err(self.fail_interaction(record, cause, started).await);
                    }
                }
            }
            // Without an appointment slot this is a clarification turn; no
            // calendar action is taken.
        }

        let response_text = self.generate(&classification, &event).await;
        record.processing_time_ms = Some(elapsed_ms(started));
        if let Err(error) = record.complete(response_text.as_str(), Utc::now()) {
            return Err(self.fail_interaction(record, error.to_string(), started).await);
        }
        if let Err(error) = self.store.update(&record).await {
            return Err(self.fail_interaction(record, error.to_string(), started).await);
        }

        self.audit.emit(AuditEvent::new(
            event.event_id.clone(),
            AuditEventType::InteractionCompleted,
            serde_json::json!({
                "intent": classification.intent.as_str(),
                "confidence": classification.confidence,
                "response": &response_text,
                "processing_time_ms": record.processing_time_ms,
            }),
        ));

        record = self.deliver(record, &event, &response_text).await;
        self.guard.mark(&event.event_id);

        Ok(ProcessOutcome::Processed(record))
    }

    /// Classification recovers locally: any failure or timeout degrades to
    /// the unknown-intent fallback instead of aborting the interaction.
    async fn classify(&self, event: &InboundEvent) -> IntentResult {
        let call = self.classifier.classify(&event.text, event.channel);
        match bounded(self.config.classifier_timeout, "classifier", call).await {
            Ok(result) => result,
            Err(cause) => {
                warn!(
                    event_name = "pipeline.classifier_recovered",
                    event_id = %event.event_id,
                    cause = %cause,
                    "classification failed, degrading to unknown intent"
                );
                IntentResult::fallback(&event.text)
            }
        }
    }

    /// Reply generation recovers locally so the pipeline always has a
    /// response text when it reaches `completed`.
    async fn generate(&self, classification: &IntentResult, event: &InboundEvent) -> String {
        let call = self.generator.generate(classification, event.channel);
        match bounded(self.config.generator_timeout, "generator", call).await {
            Ok(text) => text,
            Err(cause) => {
                warn!(
                    event_name = "pipeline.generator_recovered",
                    event_id = %event.event_id,
                    cause = %cause,
                    "reply generation failed, using fixed fallback"
                );
                FALLBACK_REPLY.to_owned()
            }
        }
    }

    /// Hand the reply to the originating channel. Delivery is a best-effort
    /// side effect by default; the strict policy re-marks the record failed.
    async fn deliver(
        &self,
        mut record: InteractionRecord,
        event: &InboundEvent,
        response_text: &str,
    ) -> InteractionRecord {
        let reply = OutboundReply::text_reply(event.channel, event.from.clone(), response_text);
        let outcome = bounded(self.config.send_timeout, "sender", self.sender.send(&reply)).await;

        let success = outcome.is_ok();
        self.audit.emit(AuditEvent::new(
            event.event_id.clone(),
            AuditEventType::MessageSent,
            serde_json::json!({
                "channel": event.channel.as_str(),
                "to": &event.from,
                "message": response_text,
                "success": success,
            }),
        ));

        if let Err(cause) = outcome {
            match self.config.delivery_failure_policy {
                DeliveryFailurePolicy::BestEffort => {
                    warn!(
                        event_name = "pipeline.delivery_failed",
                        event_id = %event.event_id,
                        cause = %cause,
                        "reply delivery failed, interaction stays completed"
                    );
                }
                DeliveryFailurePolicy::FailInteraction => {
                    let message = format!("reply delivery failed: {cause}");
                    if record.fail(message, Utc::now()).is_ok() {
                        if let Err(error) = self.store.update(&record).await {
                            warn!(
                                event_name = "pipeline.delivery_failure_unpersisted",
                                event_id = %event.event_id,
                                error = %error,
                                "could not persist delivery failure status"
                            );
                        }
                    }
                }
            }
        }

        record
    }

    /// Fatal path for steps 3 through 9: mark the record failed, persist it,
    /// keep the event_id seen, and surface the cause to the caller.
    async fn fail_interaction(
        &self,
        mut record: InteractionRecord,
        cause: String,
        started: Instant,
    ) -> DispatchError {
        let event_id = record.event_id.clone();
        record.processing_time_ms = Some(elapsed_ms(started));
        if let Err(error) = record.fail(cause.as_str(), Utc::now()) {
            warn!(
                event_name = "pipeline.failure_transition_rejected",
                event_id = %event_id,
                error = %error,
                "record refused failure transition"
            );
        }
        if let Err(error) = self.store.update(&record).await {
            warn!(
                event_name = "pipeline.failure_unpersisted",
                event_id = %event_id,
                error = %error,
                "could not persist failed status"
            );
        }

        self.audit.emit(AuditEvent::new(
            event_id.clone(),
            AuditEventType::InteractionFailed,
            serde_json::json!({
                "error": &cause,
                "processing_time_ms": record.processing_time_ms,
            }),
        ));
        self.guard.mark(&event_id);

        DispatchError::InteractionFailed { event_id: event_id.to_string(), cause }
    }
}

fn elapsed_ms(started: Instant) -> i64 {
    i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX)
}

/// Bound an external call by a timeout and fold transport errors and
/// timeouts into one cause string.
async fn bounded<T, E: std::fmt::Display>(
    limit: Duration,
    label: &str,
    call: impl std::future::Future<Output = Result<T, E>>,
) -> Result<T, String> {
    match tokio::time::timeout(limit, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(error)) => Err(format!("{label} call failed: {error}")),
        Err(_) => Err(format!("{label} call timed out after {}ms", limit.as_millis())),
    }
}
