use async_trait::async_trait;
use thiserror::Error;

use sara_core::domain::interaction::{EventId, InteractionRecord, InteractionStatus};
use sara_core::domain::knowledge::{KnowledgeBaseDraft, KnowledgeBaseEntry};
use sara_core::{ChannelType, IntentType};

pub mod interaction;
pub mod knowledge;
pub mod memory;

pub use interaction::SqlInteractionRepository;
pub use knowledge::SqlKnowledgeBaseRepository;
pub use memory::{InMemoryInteractionRepository, InMemoryKnowledgeBaseRepository};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Result of the initial durable write for an inbound event. A duplicate key
/// is a normal outcome, not an error: concurrent deliveries of the same
/// event_id race past the idempotency check, and the uniqueness constraint
/// is the backstop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertOutcome {
    Created,
    DuplicateEventId,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InteractionFilter {
    pub channel: Option<ChannelType>,
    pub status: Option<InteractionStatus>,
    pub intent: Option<IntentType>,
}

#[async_trait]
pub trait InteractionRepository: Send + Sync {
    /// Persist a freshly created record. Returns `DuplicateEventId` when a
    /// record with the same event_id already exists durably.
    async fn insert_processing(
        &self,
        record: &InteractionRecord,
    ) -> Result<InsertOutcome, RepositoryError>;

    async fn exists(&self, event_id: &EventId) -> Result<bool, RepositoryError>;

    async fn find_by_event_id(
        &self,
        event_id: &EventId,
    ) -> Result<Option<InteractionRecord>, RepositoryError>;

    async fn update(&self, record: &InteractionRecord) -> Result<(), RepositoryError>;

    /// Reverse-chronological listing for the logs surface.
    async fn list(
        &self,
        filter: &InteractionFilter,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<InteractionRecord>, RepositoryError>;

    async fn count(&self, filter: &InteractionFilter) -> Result<i64, RepositoryError>;
}

#[async_trait]
pub trait KnowledgeBaseRepository: Send + Sync {
    async fn active_entries(&self) -> Result<Vec<KnowledgeBaseEntry>, RepositoryError>;
    async fn all_entries(&self) -> Result<Vec<KnowledgeBaseEntry>, RepositoryError>;
    async fn find_by_id(&self, id: i64) -> Result<Option<KnowledgeBaseEntry>, RepositoryError>;
    async fn create(&self, draft: &KnowledgeBaseDraft) -> Result<KnowledgeBaseEntry, RepositoryError>;
    async fn update(
        &self,
        id: i64,
        draft: &KnowledgeBaseDraft,
    ) -> Result<Option<KnowledgeBaseEntry>, RepositoryError>;
    async fn delete(&self, id: i64) -> Result<bool, RepositoryError>;
    async fn categories(&self) -> Result<Vec<String>, RepositoryError>;
}
