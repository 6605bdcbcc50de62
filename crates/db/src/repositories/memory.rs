//! In-memory repository implementations backing pipeline and server tests.

use std::sync::{Mutex, MutexGuard};

use chrono::Utc;

use sara_core::contracts::{FaqSource, FaqSourceError};
use sara_core::domain::interaction::{EventId, InteractionRecord};
use sara_core::domain::knowledge::{KnowledgeBaseDraft, KnowledgeBaseEntry};

use super::{
    InsertOutcome, InteractionFilter, InteractionRepository, KnowledgeBaseRepository,
    RepositoryError,
};

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(inner) => inner,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[derive(Default)]
pub struct InMemoryInteractionRepository {
    records: Mutex<Vec<InteractionRecord>>,
}

impl InMemoryInteractionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<InteractionRecord> {
        guard(&self.records).clone()
    }
}

fn matches(filter: &InteractionFilter, record: &InteractionRecord) -> bool {
    filter.channel.map_or(true, |channel| record.channel == channel)
        && filter.status.map_or(true, |status| record.status == status)
        && filter.intent.map_or(true, |intent| record.intent == Some(intent))
}

#[async_trait::async_trait]
impl InteractionRepository for InMemoryInteractionRepository {
    async fn insert_processing(
        &self,
        record: &InteractionRecord,
    ) -> Result<InsertOutcome, RepositoryError> {
        let mut records = guard(&self.records);
        if records.iter().any(|existing| existing.event_id == record.event_id) {
            return Ok(InsertOutcome::DuplicateEventId);
        }
        records.push(record.clone());
        Ok(InsertOutcome::Created)
    }

    async fn exists(&self, event_id: &EventId) -> Result<bool, RepositoryError> {
        Ok(guard(&self.records).iter().any(|record| &record.event_id == event_id))
    }

    async fn find_by_event_id(
        &self,
        event_id: &EventId,
    ) -> Result<Option<InteractionRecord>, RepositoryError> {
        Ok(guard(&self.records).iter().find(|record| &record.event_id == event_id).cloned())
    }

    async fn update(&self, record: &InteractionRecord) -> Result<(), RepositoryError> {
        let mut records = guard(&self.records);
        if let Some(existing) =
            records.iter_mut().find(|existing| existing.event_id == record.event_id)
        {
            *existing = record.clone();
        }
        Ok(())
    }

    async fn list(
        &self,
        filter: &InteractionFilter,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<InteractionRecord>, RepositoryError> {
        let mut selected: Vec<InteractionRecord> = guard(&self.records)
            .iter()
            .filter(|record| matches(filter, record))
            .cloned()
            .collect();
        selected.sort_by(|a, b| {
            b.created_at.cmp(&a.created_at).then_with(|| b.event_id.0.cmp(&a.event_id.0))
        });

        Ok(selected.into_iter().skip(offset as usize).take(limit as usize).collect())
    }

    async fn count(&self, filter: &InteractionFilter) -> Result<i64, RepositoryError> {
        Ok(guard(&self.records).iter().filter(|record| matches(filter, record)).count() as i64)
    }
}

#[derive(Default)]
pub struct InMemoryKnowledgeBaseRepository {
    entries: Mutex<Vec<KnowledgeBaseEntry>>,
    next_id: Mutex<i64>,
}

impl InMemoryKnowledgeBaseRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an entry directly, bypassing draft validation.
    pub fn seed(&self, draft: KnowledgeBaseDraft) -> KnowledgeBaseEntry {
        let mut next_id = guard(&self.next_id);
        *next_id += 1;
        let now = Utc::now();
        let entry = KnowledgeBaseEntry {
            id: *next_id,
            question: draft.question,
            answer: draft.answer,
            keywords: draft.keywords,
            category: draft.category,
            is_active: draft.is_active,
            created_at: now,
            updated_at: now,
        };
        guard(&self.entries).push(entry.clone());
        entry
    }
}

#[async_trait::async_trait]
impl KnowledgeBaseRepository for InMemoryKnowledgeBaseRepository {
    async fn active_entries(&self) -> Result<Vec<KnowledgeBaseEntry>, RepositoryError> {
        Ok(guard(&self.entries).iter().filter(|entry| entry.is_active).cloned().collect())
    }

    async fn all_entries(&self) -> Result<Vec<KnowledgeBaseEntry>, RepositoryError> {
        Ok(guard(&self.entries).clone())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<KnowledgeBaseEntry>, RepositoryError> {
        Ok(guard(&self.entries).iter().find(|entry| entry.id == id).cloned())
    }

    async fn create(
        &self,
        draft: &KnowledgeBaseDraft,
    ) -> Result<KnowledgeBaseEntry, RepositoryError> {
        Ok(self.seed(draft.clone()))
    }

    async fn update(
        &self,
        id: i64,
        draft: &KnowledgeBaseDraft,
    ) -> Result<Option<KnowledgeBaseEntry>, RepositoryError> {
        let mut entries = guard(&self.entries);
        let Some(entry) = entries.iter_mut().find(|entry| entry.id == id) else {
            return Ok(None);
        };

        entry.question = draft.question.clone();
        entry.answer = draft.answer.clone();
        entry.keywords = draft.keywords.clone();
        entry.category = draft.category.clone();
        entry.is_active = draft.is_active;
        entry.updated_at = Utc::now();
        Ok(Some(entry.clone()))
    }

    async fn delete(&self, id: i64) -> Result<bool, RepositoryError> {
        let mut entries = guard(&self.entries);
        let before = entries.len();
        entries.retain(|entry| entry.id != id);
        Ok(entries.len() < before)
    }

    async fn categories(&self) -> Result<Vec<String>, RepositoryError> {
        let mut categories: Vec<String> = guard(&self.entries)
            .iter()
            .filter(|entry| entry.is_active)
            .map(|entry| entry.category.clone())
            .collect();
        categories.sort();
        categories.dedup();
        Ok(categories)
    }
}

#[async_trait::async_trait]
impl FaqSource for InMemoryKnowledgeBaseRepository {
    async fn active_entries(&self) -> Result<Vec<KnowledgeBaseEntry>, FaqSourceError> {
        KnowledgeBaseRepository::active_entries(self)
            .await
            .map_err(|error| FaqSourceError::Unavailable(error.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use sara_core::domain::interaction::{EventId, InteractionRecord};
    use sara_core::ChannelType;

    use super::InMemoryInteractionRepository;
    use crate::repositories::{InsertOutcome, InteractionFilter, InteractionRepository};

    #[tokio::test]
    async fn in_memory_repo_enforces_event_id_uniqueness() {
        let repo = InMemoryInteractionRepository::new();
        let record = InteractionRecord::processing(
            EventId("whatsapp_wamid.1".to_owned()),
            ChannelType::Whatsapp,
            serde_json::json!({}),
            Utc::now(),
        );

        assert_eq!(
            repo.insert_processing(&record).await.expect("insert"),
            InsertOutcome::Created
        );
        assert_eq!(
            repo.insert_processing(&record).await.expect("insert again"),
            InsertOutcome::DuplicateEventId
        );
        assert_eq!(repo.count(&InteractionFilter::default()).await.expect("count"), 1);
    }
}
