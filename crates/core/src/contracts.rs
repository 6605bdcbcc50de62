//! Contracts for the external collaborators the interaction pipeline calls
//! into. The pipeline depends only on these traits; network implementations
//! live in their own crates.

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::channel::ChannelType;
use crate::domain::intent::{AppointmentSlot, ContactInfo, IntentResult};
use crate::domain::knowledge::KnowledgeBaseEntry;
use crate::domain::message::{InboundEvent, OutboundReply};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ClassifierError {
    #[error("classifier transport failure: {0}")]
    Transport(String),
    #[error("malformed classifier output: {0}")]
    MalformedOutput(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GeneratorError {
    #[error("generator transport failure: {0}")]
    Transport(String),
    #[error("faq lookup failure: {0}")]
    FaqLookup(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("scheduler transport failure: {0}")]
    Transport(String),
    #[error("calendar rejected the request: {0}")]
    Rejected(String),
    #[error("invalid appointment slot: {0}")]
    InvalidSlot(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SendError {
    #[error("send transport failure: {0}")]
    Transport(String),
    #[error("channel rejected the message: {0}")]
    Rejected(String),
    #[error("no adapter registered for channel {0}")]
    UnsupportedChannel(ChannelType),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ChannelParseError {
    #[error("missing required identifier `{0}`")]
    MissingIdentifier(&'static str),
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FaqSourceError {
    #[error("knowledge base unavailable: {0}")]
    Unavailable(String),
}

/// Turns raw utterance text into a structured intent result. Implementations
/// may fail; the pipeline converts any failure into the fallback result
/// rather than surfacing it.
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(
        &self,
        text: &str,
        channel: ChannelType,
    ) -> Result<IntentResult, ClassifierError>;
}

/// Maps an intent result to outbound reply text. FAQ lookup happens inside
/// implementations, against a [`FaqSource`].
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    async fn generate(
        &self,
        result: &IntentResult,
        channel: ChannelType,
    ) -> Result<String, GeneratorError>;
}

/// Calendar operations. Conflict semantics implementations must honor live in
/// [`crate::scheduling`].
#[async_trait]
pub trait SchedulerAdapter: Send + Sync {
    async fn check_availability(
        &self,
        slot: &AppointmentSlot,
        duration_minutes: u32,
    ) -> Result<bool, SchedulerError>;

    /// Returns the created calendar event id.
    async fn create_appointment(
        &self,
        slot: &AppointmentSlot,
        contact: Option<&ContactInfo>,
        description: &str,
    ) -> Result<String, SchedulerError>;

    /// Idempotent: cancelling an event that no longer exists is success.
    async fn cancel_appointment(&self, event_id: &str) -> Result<bool, SchedulerError>;

    async fn update_appointment(
        &self,
        event_id: &str,
        new_slot: &AppointmentSlot,
        contact: Option<&ContactInfo>,
    ) -> Result<bool, SchedulerError>;

    async fn list_available_slots(
        &self,
        date: NaiveDate,
        duration_minutes: u32,
        day_start_hour: u32,
        day_end_hour: u32,
    ) -> Result<Vec<String>, SchedulerError>;
}

/// Outbound delivery on a single channel.
#[async_trait]
pub trait ReplySender: Send + Sync {
    async fn send(&self, reply: &OutboundReply) -> Result<(), SendError>;
}

/// Read contract the FAQ path consumes; implemented by the knowledge-base
/// repository.
#[async_trait]
pub trait FaqSource: Send + Sync {
    async fn active_entries(&self) -> Result<Vec<KnowledgeBaseEntry>, FaqSourceError>;
}

/// The full capability set one concrete channel provides: turn a raw webhook
/// payload into canonical inbound events, and deliver replies. Everything
/// else is channel-agnostic.
#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    fn channel(&self) -> ChannelType;

    /// One payload may carry several events (WhatsApp batches). A payload
    /// with a missing identifier is rejected before any record exists.
    fn parse(&self, payload: &serde_json::Value) -> Result<Vec<InboundEvent>, ChannelParseError>;

    async fn send(&self, reply: &OutboundReply) -> Result<(), SendError>;
}
