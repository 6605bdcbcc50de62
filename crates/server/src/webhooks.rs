use std::collections::HashMap;

use axum::extract::{Form, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use tracing::{error, info};

use sara_core::contracts::ChannelParseError;
use sara_core::ChannelType;
use sara_pipeline::ProcessOutcome;

use crate::state::AppState;

pub async fn voice(
    State(state): State<AppState>,
    Form(form): Form<HashMap<String, String>>,
) -> impl IntoResponse {
    handle_single(state, ChannelType::Voice, form_to_json(form), "Voice").await
}

pub async fn sms(
    State(state): State<AppState>,
    Form(form): Form<HashMap<String, String>>,
) -> impl IntoResponse {
    handle_single(state, ChannelType::Sms, form_to_json(form), "SMS").await
}

pub async fn whatsapp(
    State(state): State<AppState>,
    Json(payload): Json<serde_json::Value>,
) -> impl IntoResponse {
    let events = match parse_events(&state, ChannelType::Whatsapp, &payload) {
        Ok(events) => events,
        Err(response) => return response,
    };

    // Batch payload: every message is processed; duplicates are skipped
    // without aborting the rest of the batch.
    for event in events {
        match state.dispatcher.process(event).await {
            Ok(ProcessOutcome::Processed(_)) | Ok(ProcessOutcome::Duplicate) => {}
            Err(error) => return internal_error(&error),
        }
    }

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "success",
            "message": "WhatsApp webhook processed",
        })),
    )
}

/// Meta webhook subscription handshake: echo the challenge when the verify
/// token matches.
pub async fn whatsapp_verify(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let mode = params.get("hub.mode").map(String::as_str);
    let token = params.get("hub.verify_token");
    let challenge = params.get("hub.challenge").cloned().unwrap_or_default();

    if mode == Some("subscribe") && token == state.whatsapp_verify_token.as_ref() {
        return (StatusCode::OK, challenge);
    }

    (StatusCode::FORBIDDEN, "verification failed".to_owned())
}

async fn handle_single(
    state: AppState,
    channel: ChannelType,
    payload: serde_json::Value,
    label: &str,
) -> (StatusCode, Json<serde_json::Value>) {
    let events = match parse_events(&state, channel, &payload) {
        Ok(events) => events,
        Err(response) => return response,
    };

    let Some(event) = events.into_iter().next() else {
        return bad_request("payload carried no events".to_owned());
    };

    match state.dispatcher.process(event).await {
        Ok(ProcessOutcome::Processed(_)) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "success",
                "message": format!("{label} webhook processed"),
            })),
        ),
        Ok(ProcessOutcome::Duplicate) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "duplicate",
                "message": "Request already processed",
            })),
        ),
        Err(error) => internal_error(&error),
    }
}

fn parse_events(
    state: &AppState,
    channel: ChannelType,
    payload: &serde_json::Value,
) -> Result<Vec<sara_core::InboundEvent>, (StatusCode, Json<serde_json::Value>)> {
    let Some(adapter) = state.registry.get(channel) else {
        error!(event_name = "webhook.adapter_missing", channel = %channel, "channel unregistered");
        return Err(internal_error(&"adapter not registered"));
    };

    adapter.parse(payload).map_err(|parse_error| {
        info!(
            event_name = "webhook.rejected",
            channel = %channel,
            error = %parse_error,
            "inbound payload rejected"
        );
        match parse_error {
            ChannelParseError::MissingIdentifier(field) => {
                bad_request(format!("Missing {field}"))
            }
            ChannelParseError::InvalidPayload(message) => bad_request(message),
        }
    })
}

fn bad_request(message: String) -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::BAD_REQUEST, Json(serde_json::json!({"error": message})))
}

fn internal_error(cause: &dyn std::fmt::Display) -> (StatusCode, Json<serde_json::Value>) {
    error!(event_name = "webhook.failed", error = %cause, "webhook processing failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({"error": "Internal server error"})),
    )
}

fn form_to_json(form: HashMap<String, String>) -> serde_json::Value {
    serde_json::Value::Object(
        form.into_iter().map(|(key, value)| (key, serde_json::Value::String(value))).collect(),
    )
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    use sara_db::InteractionRepository;

    use crate::router;
    use crate::state::testing;

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    fn sms_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/webhooks/sms")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_owned()))
            .expect("request")
    }

    #[tokio::test]
    async fn sms_webhook_processes_then_reports_duplicate() {
        let state = testing::state().await;
        let app = router(state.clone());

        let first = app
            .clone()
            .oneshot(sms_request("MessageSid=SM1&From=%2B15550001&To=%2B15550002&Body=hours"))
            .await
            .expect("first call");
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(body_json(first).await["status"], "success");

        let second = app
            .clone()
            .oneshot(sms_request("MessageSid=SM1&From=%2B15550001&To=%2B15550002&Body=hours"))
            .await
            .expect("second call");
        assert_eq!(second.status(), StatusCode::OK);
        assert_eq!(body_json(second).await["status"], "duplicate");

        let records = state
            .interactions
            .list(&Default::default(), 50, 0)
            .await
            .expect("list records");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].event_id.as_str(), "sms_SM1");
    }

    #[tokio::test]
    async fn missing_identifier_is_a_client_error_without_a_record() {
        let state = testing::state().await;
        let app = router(state.clone());

        let response =
            app.oneshot(sms_request("From=%2B15550001&Body=hi")).await.expect("call");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(response).await["error"]
            .as_str()
            .expect("error text")
            .contains("MessageSid"));

        let records = state
            .interactions
            .list(&Default::default(), 50, 0)
            .await
            .expect("list records");
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn voice_webhook_uses_the_raw_call_sid() {
        let state = testing::state().await;
        let app = router(state.clone());

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/webhooks/voice")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from(
                        "CallSid=CA77&From=%2B15550001&To=%2B15550002&TranscriptionText=hello",
                    ))
                    .expect("request"),
            )
            .await
            .expect("call");
        assert_eq!(response.status(), StatusCode::OK);

        let records = state
            .interactions
            .list(&Default::default(), 50, 0)
            .await
            .expect("list records");
        assert_eq!(records[0].event_id.as_str(), "CA77");
    }

    #[tokio::test]
    async fn whatsapp_batch_creates_one_record_per_message() {
        let state = testing::state().await;
        let app = router(state.clone());

        let payload = serde_json::json!({
            "object": "whatsapp_business_account",
            "entry": [{
                "changes": [{
                    "field": "messages",
                    "value": {"messages": [
                        {"id": "wamid.a", "from": "15550001", "type": "text",
                         "text": {"body": "hi"}},
                        {"id": "wamid.b", "from": "15550001", "type": "image",
                         "image": {"id": "m1"}},
                    ]},
                }],
            }],
        });

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/webhooks/whatsapp")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(payload.to_string()))
                    .expect("request"),
            )
            .await
            .expect("call");
        assert_eq!(response.status(), StatusCode::OK);

        let records = state
            .interactions
            .list(&Default::default(), 50, 0)
            .await
            .expect("list records");
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn whatsapp_verification_echoes_the_challenge() {
        let state = testing::state().await;
        let app = router(state.clone());

        let ok = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(
                        "/webhooks/whatsapp?hub.mode=subscribe&hub.verify_token=verify-me&hub.challenge=12345",
                    )
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("call");
        assert_eq!(ok.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(ok.into_body(), usize::MAX).await.expect("body");
        assert_eq!(&bytes[..], b"12345");

        let forbidden = app
            .oneshot(
                Request::builder()
                    .uri(
                        "/webhooks/whatsapp?hub.mode=subscribe&hub.verify_token=wrong&hub.challenge=12345",
                    )
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("call");
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);
    }
}
