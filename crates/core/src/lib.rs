pub mod audit;
pub mod config;
pub mod contracts;
pub mod domain;
pub mod errors;
pub mod faq;
pub mod scheduling;

pub use audit::{AuditEvent, AuditEventType, AuditSink, InMemoryAuditSink};
pub use contracts::{
    ChannelAdapter, FaqSource, IntentClassifier, ReplySender, ResponseGenerator, SchedulerAdapter,
};
pub use domain::channel::ChannelType;
pub use domain::interaction::{EventId, InteractionRecord, InteractionStatus};
pub use domain::intent::{AppointmentSlot, ContactInfo, IntentResult, IntentType};
pub use domain::knowledge::KnowledgeBaseEntry;
pub use domain::message::{InboundEvent, OutboundReply};
pub use errors::DomainError;
