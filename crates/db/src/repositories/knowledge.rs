use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row};

use sara_core::contracts::{FaqSource, FaqSourceError};
use sara_core::domain::knowledge::{KnowledgeBaseDraft, KnowledgeBaseEntry};

use super::{KnowledgeBaseRepository, RepositoryError};
use crate::repositories::interaction::parse_timestamp;
use crate::DbPool;

const ENTRY_COLUMNS: &str =
    "id, question, answer, keywords, category, is_active, created_at, updated_at";

pub struct SqlKnowledgeBaseRepository {
    pool: DbPool,
}

impl SqlKnowledgeBaseRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl KnowledgeBaseRepository for SqlKnowledgeBaseRepository {
    async fn active_entries(&self) -> Result<Vec<KnowledgeBaseEntry>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {ENTRY_COLUMNS} FROM knowledge_base WHERE is_active = 1 ORDER BY id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(entry_from_row).collect()
    }

    async fn all_entries(&self) -> Result<Vec<KnowledgeBaseEntry>, RepositoryError> {
        let rows =
            sqlx::query(&format!("SELECT {ENTRY_COLUMNS} FROM knowledge_base ORDER BY id ASC"))
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(entry_from_row).collect()
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<KnowledgeBaseEntry>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {ENTRY_COLUMNS} FROM knowledge_base WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(entry_from_row).transpose()
    }

    async fn create(
        &self,
        draft: &KnowledgeBaseDraft,
    ) -> Result<KnowledgeBaseEntry, RepositoryError> {
        let now = Utc::now().to_rfc3339();
        let keywords = serde_json::to_string(&draft.keywords)
            .map_err(|error| RepositoryError::Decode(format!("invalid keywords: {error}")))?;

        let result = sqlx::query(
            "INSERT INTO knowledge_base
                (question, answer, keywords, category, is_active, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&draft.question)
        .bind(&draft.answer)
        .bind(&keywords)
        .bind(&draft.category)
        .bind(i64::from(draft.is_active))
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        self.find_by_id(id).await?.ok_or_else(|| {
            RepositoryError::Decode(format!("entry {id} vanished after insert"))
        })
    }

    async fn update(
        &self,
        id: i64,
        draft: &KnowledgeBaseDraft,
    ) -> Result<Option<KnowledgeBaseEntry>, RepositoryError> {
        let keywords = serde_json::to_string(&draft.keywords)
            .map_err(|error| RepositoryError::Decode(format!("invalid keywords: {error}")))?;

        let result = sqlx::query(
            "UPDATE knowledge_base SET
                question = ?,
                answer = ?,
                keywords = ?,
                category = ?,
                is_active = ?,
                updated_at = ?
             WHERE id = ?",
        )
        .bind(&draft.question)
        .bind(&draft.answer)
        .bind(&keywords)
        .bind(&draft.category)
        .bind(i64::from(draft.is_active))
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_by_id(id).await
    }

    async fn delete(&self, id: i64) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM knowledge_base WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn categories(&self) -> Result<Vec<String>, RepositoryError> {
        let rows = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT category FROM knowledge_base WHERE is_active = 1 ORDER BY category",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

#[async_trait::async_trait]
impl FaqSource for SqlKnowledgeBaseRepository {
    async fn active_entries(&self) -> Result<Vec<KnowledgeBaseEntry>, FaqSourceError> {
        KnowledgeBaseRepository::active_entries(self)
            .await
            .map_err(|error| FaqSourceError::Unavailable(error.to_string()))
    }
}

fn entry_from_row(row: SqliteRow) -> Result<KnowledgeBaseEntry, RepositoryError> {
    let keywords_raw = row.try_get::<String, _>("keywords")?;
    let keywords: Vec<String> = serde_json::from_str(&keywords_raw).map_err(|error| {
        RepositoryError::Decode(format!("invalid keywords JSON `{keywords_raw}`: {error}"))
    })?;

    Ok(KnowledgeBaseEntry {
        id: row.try_get("id")?,
        question: row.try_get("question")?,
        answer: row.try_get("answer")?,
        keywords,
        category: row.try_get("category")?,
        is_active: row.try_get::<i64, _>("is_active")? != 0,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
        updated_at: parse_timestamp("updated_at", row.try_get("updated_at")?)?,
    })
}
