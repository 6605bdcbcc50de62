use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use tracing::error;

use sara_core::domain::knowledge::KnowledgeBaseDraft;
use sara_core::faq;
use sara_db::KnowledgeBaseRepository;

use crate::state::AppState;

/// `GET /api/admin/faqs`
pub async fn list(State(state): State<AppState>) -> impl IntoResponse {
    match state.knowledge.all_entries().await {
        Ok(entries) => {
            let total_count = entries.len();
            (
                StatusCode::OK,
                Json(serde_json::json!({
                    "faqs": entries,
                    "total_count": total_count,
                })),
            )
        }
        Err(repo_error) => internal_error(&repo_error),
    }
}

/// `POST /api/admin/faqs`
pub async fn create(
    State(state): State<AppState>,
    Json(draft): Json<KnowledgeBaseDraft>,
) -> impl IntoResponse {
    if let Err(message) = validate(&draft) {
        return (StatusCode::BAD_REQUEST, Json(serde_json::json!({"error": message})));
    }

    match state.knowledge.create(&draft).await {
        Ok(entry) => (StatusCode::CREATED, Json(serde_json::json!(entry))),
        Err(repo_error) => internal_error(&repo_error),
    }
}

/// `PUT /api/admin/faqs/{id}`
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(draft): Json<KnowledgeBaseDraft>,
) -> impl IntoResponse {
    if let Err(message) = validate(&draft) {
        return (StatusCode::BAD_REQUEST, Json(serde_json::json!({"error": message})));
    }

    match state.knowledge.update(id, &draft).await {
        Ok(Some(entry)) => (StatusCode::OK, Json(serde_json::json!(entry))),
        Ok(None) => not_found(),
        Err(repo_error) => internal_error(&repo_error),
    }
}

/// `DELETE /api/admin/faqs/{id}`
pub async fn delete(State(state): State<AppState>, Path(id): Path<i64>) -> impl IntoResponse {
    match state.knowledge.delete(id).await {
        Ok(true) => {
            (StatusCode::OK, Json(serde_json::json!({"status": "deleted", "id": id})))
        }
        Ok(false) => not_found(),
        Err(repo_error) => internal_error(&repo_error),
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    q: String,
    limit: Option<usize>,
}

/// `GET /api/admin/faqs/search`: ranked matches for a free-text query,
/// scored the same way the FAQ reply path scores them.
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> impl IntoResponse {
    let entries = match state.knowledge.active_entries().await {
        Ok(entries) => entries,
        Err(repo_error) => return internal_error(&repo_error),
    };

    let results: Vec<serde_json::Value> = faq::rank(&entries, &query.q, query.limit.unwrap_or(5))
        .into_iter()
        .map(|ranked| {
            serde_json::json!({
                "id": ranked.entry.id,
                "question": &ranked.entry.question,
                "answer": &ranked.entry.answer,
                "category": &ranked.entry.category,
                "score": ranked.score,
            })
        })
        .collect();

    (StatusCode::OK, Json(serde_json::json!({"results": results})))
}

/// `GET /api/admin/faqs/categories`
pub async fn categories(State(state): State<AppState>) -> impl IntoResponse {
    match state.knowledge.categories().await {
        Ok(categories) => {
            (StatusCode::OK, Json(serde_json::json!({"categories": categories})))
        }
        Err(repo_error) => internal_error(&repo_error),
    }
}

fn validate(draft: &KnowledgeBaseDraft) -> Result<(), String> {
    if draft.question.trim().is_empty() {
        return Err("question must not be empty".to_owned());
    }
    if draft.answer.trim().is_empty() {
        return Err("answer must not be empty".to_owned());
    }
    Ok(())
}

fn not_found() -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::NOT_FOUND, Json(serde_json::json!({"error": "FAQ not found"})))
}

fn internal_error(cause: &dyn std::fmt::Display) -> (StatusCode, Json<serde_json::Value>) {
    error!(event_name = "admin.faq_operation_failed", error = %cause, "faq operation failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({"error": "Internal server error"})),
    )
}
