use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use tracing::error;

use sara_core::domain::interaction::{EventId, InteractionRecord, InteractionStatus};
use sara_core::{ChannelType, IntentType};
use sara_db::{InteractionFilter, InteractionRepository};

use crate::state::AppState;

const DEFAULT_LIMIT: u32 = 50;
const MAX_LIMIT: u32 = 1000;

#[derive(Debug, Default, Deserialize)]
pub struct LogsQuery {
    channel: Option<String>,
    status: Option<String>,
    intent: Option<String>,
    limit: Option<u32>,
    offset: Option<u32>,
}

/// `GET /api/logs`: reverse-chronological listing with channel/status/
/// intent filters and limit/offset pagination.
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<LogsQuery>,
) -> impl IntoResponse {
    let filter = match build_filter(&query) {
        Ok(filter) => filter,
        Err(message) => {
            return (StatusCode::BAD_REQUEST, Json(serde_json::json!({"error": message})));
        }
    };

    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = query.offset.unwrap_or(0);

    let total_count = match state.interactions.count(&filter).await {
        Ok(count) => count,
        Err(repo_error) => return internal_error(&repo_error),
    };
    let records = match state.interactions.list(&filter, limit, offset).await {
        Ok(records) => records,
        Err(repo_error) => return internal_error(&repo_error),
    };

    let interactions: Vec<serde_json::Value> = records.iter().map(summary).collect();
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "interactions": interactions,
            "total_count": total_count,
            "limit": limit,
            "offset": offset,
        })),
    )
}

/// `GET /api/logs/{event_id}`: the full audit record for one interaction.
pub async fn get(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> impl IntoResponse {
    match state.interactions.find_by_event_id(&EventId(event_id)).await {
        Ok(Some(record)) => (
            StatusCode::OK,
            Json(serde_json::to_value(&record).unwrap_or(serde_json::Value::Null)),
        ),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": "Interaction not found"})),
        ),
        Err(repo_error) => internal_error(&repo_error),
    }
}

fn build_filter(query: &LogsQuery) -> Result<InteractionFilter, String> {
    let mut filter = InteractionFilter::default();

    if let Some(channel) = &query.channel {
        filter.channel = Some(
            ChannelType::parse(channel).ok_or_else(|| format!("unknown channel `{channel}`"))?,
        );
    }
    if let Some(status) = &query.status {
        filter.status = Some(
            InteractionStatus::parse(status)
                .ok_or_else(|| format!("unknown status `{status}`"))?,
        );
    }
    if let Some(intent) = &query.intent {
        filter.intent =
            Some(IntentType::parse(intent).ok_or_else(|| format!("unknown intent `{intent}`"))?);
    }

    Ok(filter)
}

fn summary(record: &InteractionRecord) -> serde_json::Value {
    serde_json::json!({
        "event_id": record.event_id.as_str(),
        "channel": record.channel.as_str(),
        "status": record.status.as_str(),
        "intent": record.intent.map(|intent| intent.as_str()),
        "intent_confidence": record.intent_confidence,
        "contact_name": record.contact.as_ref().and_then(|contact| contact.name.clone()),
        "created_at": record.created_at.to_rfc3339(),
        "updated_at": record.updated_at.to_rfc3339(),
    })
}

fn internal_error(cause: &dyn std::fmt::Display) -> (StatusCode, Json<serde_json::Value>) {
    error!(event_name = "logs.query_failed", error = %cause, "logs query failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({"error": "Internal server error"})),
    )
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::{DateTime, Utc};
    use tower::ServiceExt;

    use sara_core::domain::interaction::{EventId, InteractionRecord};
    use sara_core::ChannelType;

    use crate::router;
    use crate::state::testing;

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    fn parse_ts(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value).expect("valid rfc3339").with_timezone(&Utc)
    }

    async fn seed(state: &crate::state::AppState) {
        use sara_db::InteractionRepository;

        let mut completed = InteractionRecord::processing(
            EventId("sms_SM1".to_owned()),
            ChannelType::Sms,
            serde_json::json!({"Body": "hours"}),
            parse_ts("2026-03-16T09:00:00+00:00"),
        );
        completed.complete("We open at 9.", parse_ts("2026-03-16T09:00:01+00:00")).expect("ok");

        let mut failed = InteractionRecord::processing(
            EventId("CA2".to_owned()),
            ChannelType::Voice,
            serde_json::json!({"TranscriptionText": "book"}),
            parse_ts("2026-03-16T10:00:00+00:00"),
        );
        failed.fail("calendar unavailable", parse_ts("2026-03-16T10:00:01+00:00")).expect("ok");

        for record in [&completed, &failed] {
            state.interactions.insert_processing(record).await.expect("seed insert");
            state.interactions.update(record).await.expect("seed update");
        }
    }

    #[tokio::test]
    async fn listing_is_reverse_chronological_with_totals() {
        let state = testing::state().await;
        seed(&state).await;
        let app = router(state);

        let response = app
            .oneshot(Request::builder().uri("/api/logs").body(Body::empty()).expect("request"))
            .await
            .expect("call");
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["total_count"], 2);
        assert_eq!(body["limit"], 50);
        let interactions = body["interactions"].as_array().expect("array");
        assert_eq!(interactions[0]["event_id"], "CA2");
        assert_eq!(interactions[1]["event_id"], "sms_SM1");
    }

    #[tokio::test]
    async fn filters_restrict_by_status_and_channel() {
        let state = testing::state().await;
        seed(&state).await;
        let app = router(state);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/logs?status=failed")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("call");
        let body = body_json(response).await;
        assert_eq!(body["total_count"], 1);
        assert_eq!(body["interactions"][0]["status"], "failed");

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/logs?channel=sms&status=completed")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("call");
        let body = body_json(response).await;
        assert_eq!(body["total_count"], 1);
        assert_eq!(body["interactions"][0]["event_id"], "sms_SM1");
    }

    #[tokio::test]
    async fn unknown_filter_values_are_client_errors() {
        let state = testing::state().await;
        let app = router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/logs?channel=telegraph")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("call");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn single_record_lookup_returns_the_full_record_or_404() {
        let state = testing::state().await;
        seed(&state).await;
        let app = router(state);

        let response = app
            .clone()
            .oneshot(
                Request::builder().uri("/api/logs/sms_SM1").body(Body::empty()).expect("request"),
            )
            .await
            .expect("call");
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["event_id"], "sms_SM1");
        assert_eq!(body["status"], "completed");
        assert_eq!(body["response_text"], "We open at 9.");
        assert_eq!(body["raw_payload"]["Body"], "hours");

        let missing = app
            .oneshot(
                Request::builder().uri("/api/logs/nope").body(Body::empty()).expect("request"),
            )
            .await
            .expect("call");
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }
}
