use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row};

use sara_core::domain::interaction::{EventId, InteractionRecord, InteractionStatus};
use sara_core::domain::intent::ContactInfo;
use sara_core::{ChannelType, IntentType};

use super::{InsertOutcome, InteractionFilter, InteractionRepository, RepositoryError};
use crate::DbPool;

const RECORD_COLUMNS: &str = "event_id,
    channel,
    status,
    intent,
    intent_confidence,
    extracted_slots,
    contact_name,
    contact_email,
    contact_phone,
    response_text,
    calendar_event_id,
    error_message,
    processing_time_ms,
    raw_payload,
    created_at,
    updated_at";

pub struct SqlInteractionRepository {
    pool: DbPool,
}

impl SqlInteractionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl InteractionRepository for SqlInteractionRepository {
    async fn insert_processing(
        &self,
        record: &InteractionRecord,
    ) -> Result<InsertOutcome, RepositoryError> {
        let result = sqlx::query(&format!(
            "INSERT INTO interaction ({RECORD_COLUMNS})
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(record.event_id.as_str())
        .bind(record.channel.as_str())
        .bind(record.status.as_str())
        .bind(record.intent.map(|intent| intent.as_str()))
        .bind(record.intent_confidence)
        .bind(serde_json::Value::Object(record.extracted_slots.clone()).to_string())
        .bind(record.contact.as_ref().and_then(|contact| contact.name.as_deref()))
        .bind(record.contact.as_ref().and_then(|contact| contact.email.as_deref()))
        .bind(record.contact.as_ref().and_then(|contact| contact.phone.as_deref()))
        .bind(record.response_text.as_deref())
        .bind(record.calendar_event_id.as_deref())
        .bind(record.error_message.as_deref())
        .bind(record.processing_time_ms)
        .bind(record.raw_payload.to_string())
        .bind(record.created_at.to_rfc3339())
        .bind(record.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(InsertOutcome::Created),
            Err(sqlx::Error::Database(db_error)) if db_error.is_unique_violation() => {
                Ok(InsertOutcome::DuplicateEventId)
            }
            Err(error) => Err(error.into()),
        }
    }

    async fn exists(&self, event_id: &EventId) -> Result<bool, RepositoryError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM interaction WHERE event_id = ?")
                .bind(event_id.as_str())
                .fetch_one(&self.pool)
                .await?;

        Ok(count > 0)
    }

    async fn find_by_event_id(
        &self,
        event_id: &EventId,
    ) -> Result<Option<InteractionRecord>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {RECORD_COLUMNS} FROM interaction WHERE event_id = ?"
        ))
        .bind(event_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(record_from_row).transpose()
    }

    async fn update(&self, record: &InteractionRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE interaction SET
                status = ?,
                intent = ?,
                intent_confidence = ?,
                extracted_slots = ?,
                contact_name = ?,
                contact_email = ?,
                contact_phone = ?,
                response_text = ?,
                calendar_event_id = ?,
                error_message = ?,
                processing_time_ms = ?,
                updated_at = ?
             WHERE event_id = ?",
        )
        .bind(record.status.as_str())
        .bind(record.intent.map(|intent| intent.as_str()))
        .bind(record.intent_confidence)
        .bind(serde_json::Value::Object(record.extracted_slots.clone()).to_string())
        .bind(record.contact.as_ref().and_then(|contact| contact.name.as_deref()))
        .bind(record.contact.as_ref().and_then(|contact| contact.email.as_deref()))
        .bind(record.contact.as_ref().and_then(|contact| contact.phone.as_deref()))
        .bind(record.response_text.as_deref())
        .bind(record.calendar_event_id.as_deref())
        .bind(record.error_message.as_deref())
        .bind(record.processing_time_ms)
        .bind(record.updated_at.to_rfc3339())
        .bind(record.event_id.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list(
        &self,
        filter: &InteractionFilter,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<InteractionRecord>, RepositoryError> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM interaction{}
             ORDER BY created_at DESC, event_id DESC
             LIMIT ? OFFSET ?",
            where_clause(filter)
        );

        let mut query = sqlx::query(&sql);
        query = bind_filter(query, filter);
        let rows =
            query.bind(i64::from(limit)).bind(i64::from(offset)).fetch_all(&self.pool).await?;

        rows.into_iter().map(record_from_row).collect()
    }

    async fn count(&self, filter: &InteractionFilter) -> Result<i64, RepositoryError> {
        let sql = format!("SELECT COUNT(*) FROM interaction{}", where_clause(filter));
        let mut query = sqlx::query_scalar::<_, i64>(&sql);
        query = bind_filter_scalar(query, filter);
        Ok(query.fetch_one(&self.pool).await?)
    }
}

fn where_clause(filter: &InteractionFilter) -> String {
    let mut conditions = Vec::new();
    if filter.channel.is_some() {
        conditions.push("channel = ?");
    }
    if filter.status.is_some() {
        conditions.push("status = ?");
    }
    if filter.intent.is_some() {
        conditions.push("intent = ?");
    }

    if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    }
}

fn bind_filter<'q>(
    mut query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    filter: &InteractionFilter,
) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    if let Some(channel) = filter.channel {
        query = query.bind(channel.as_str());
    }
    if let Some(status) = filter.status {
        query = query.bind(status.as_str());
    }
    if let Some(intent) = filter.intent {
        query = query.bind(intent.as_str());
    }
    query
}

fn bind_filter_scalar<'q>(
    mut query: sqlx::query::QueryScalar<'q, sqlx::Sqlite, i64, sqlx::sqlite::SqliteArguments<'q>>,
    filter: &InteractionFilter,
) -> sqlx::query::QueryScalar<'q, sqlx::Sqlite, i64, sqlx::sqlite::SqliteArguments<'q>> {
    if let Some(channel) = filter.channel {
        query = query.bind(channel.as_str());
    }
    if let Some(status) = filter.status {
        query = query.bind(status.as_str());
    }
    if let Some(intent) = filter.intent {
        query = query.bind(intent.as_str());
    }
    query
}

fn record_from_row(row: SqliteRow) -> Result<InteractionRecord, RepositoryError> {
    let channel_raw = row.try_get::<String, _>("channel")?;
    let channel = ChannelType::parse(&channel_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown channel `{channel_raw}`")))?;

    let status_raw = row.try_get::<String, _>("status")?;
    let status = InteractionStatus::parse(&status_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown status `{status_raw}`")))?;

    let intent = row
        .try_get::<Option<String>, _>("intent")?
        .map(|value| {
            IntentType::parse(&value)
                .ok_or_else(|| RepositoryError::Decode(format!("unknown intent `{value}`")))
        })
        .transpose()?;

    let contact = contact_from_columns(
        row.try_get("contact_name")?,
        row.try_get("contact_email")?,
        row.try_get("contact_phone")?,
    );

    Ok(InteractionRecord {
        event_id: EventId(row.try_get("event_id")?),
        channel,
        status,
        intent,
        intent_confidence: row.try_get("intent_confidence")?,
        extracted_slots: parse_slots(row.try_get("extracted_slots")?)?,
        contact,
        response_text: row.try_get("response_text")?,
        calendar_event_id: row.try_get("calendar_event_id")?,
        error_message: row.try_get("error_message")?,
        processing_time_ms: row.try_get("processing_time_ms")?,
        raw_payload: parse_json("raw_payload", row.try_get("raw_payload")?)?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
        updated_at: parse_timestamp("updated_at", row.try_get("updated_at")?)?,
    })
}

fn contact_from_columns(
    name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
) -> Option<ContactInfo> {
    let contact = ContactInfo { name, email, phone };
    (!contact.is_empty()).then_some(contact)
}

fn parse_slots(
    value: String,
) -> Result<serde_json::Map<String, serde_json::Value>, RepositoryError> {
    match parse_json("extracted_slots", value)? {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(RepositoryError::Decode(format!(
            "extracted_slots must be a JSON object, got `{other}`"
        ))),
    }
}

fn parse_json(column: &str, value: String) -> Result<serde_json::Value, RepositoryError> {
    serde_json::from_str(&value)
        .map_err(|error| RepositoryError::Decode(format!("invalid JSON in `{column}`: {error}")))
}

pub(crate) fn parse_timestamp(column: &str, value: String) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(&value).map(|timestamp| timestamp.with_timezone(&Utc)).map_err(
        |error| {
            RepositoryError::Decode(format!("invalid timestamp in `{column}`: `{value}` ({error})"))
        },
    )
}
