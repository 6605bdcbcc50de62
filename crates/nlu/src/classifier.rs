use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use sara_core::contracts::{ClassifierError, IntentClassifier};
use sara_core::domain::intent::{AppointmentSlot, ContactInfo, IntentResult, IntentType};
use sara_core::ChannelType;

use crate::client::OpenAiClient;

/// Hosted-LLM intent classifier. The model is asked for a JSON object; the
/// boundary parser below applies all clamping and defaulting rules, so the
/// rest of the system never sees raw model output.
pub struct OpenAiIntentClassifier {
    client: Arc<OpenAiClient>,
    business_name: String,
}

impl OpenAiIntentClassifier {
    pub fn new(client: Arc<OpenAiClient>, business_name: impl Into<String>) -> Self {
        Self { client, business_name: business_name.into() }
    }

    fn system_prompt(&self) -> String {
        format!(
            "You are Sara, an AI receptionist for {business}.\n\
             Your job is to analyze incoming messages and extract what the person wants \
             (intent), their contact information, appointment details if they are \
             scheduling, and any other relevant information.\n\
             Be accurate and conservative with confidence scores. Extract information \
             only if it is clearly stated or strongly implied.",
            business = self.business_name
        )
    }
}

pub(crate) fn extraction_prompt(text: &str, channel: ChannelType) -> String {
    format!(
        "Analyze the following {channel} message and extract the intent and relevant \
         information:\n\n\
         Message: \"{text}\"\n\n\
         Respond with a JSON object in this exact format:\n\
         {{\n\
           \"intent\": \"schedule|faq|contact|cancel|reschedule|unknown\",\n\
           \"confidence\": 0.95,\n\
           \"contact_info\": {{\"name\": null, \"email\": null, \"phone\": null}},\n\
           \"appointment\": {{\"date\": \"2024-01-15\", \"time\": \"14:30\", \"timezone\": \"UTC\"}},\n\
           \"slots\": {{}}\n\
         }}\n\n\
         Guidelines:\n\
         - Use null for missing information\n\
         - Be conservative with confidence scores\n\
         - Extract dates in YYYY-MM-DD format\n\
         - Extract times in HH:MM format (24-hour)",
        channel = channel.as_str(),
    )
}

#[async_trait]
impl IntentClassifier for OpenAiIntentClassifier {
    async fn classify(
        &self,
        text: &str,
        channel: ChannelType,
    ) -> Result<IntentResult, ClassifierError> {
        let prompt = extraction_prompt(text, channel);
        let raw = self
            .client
            .complete_json(&self.system_prompt(), &prompt)
            .await
            .map_err(|error| ClassifierError::Transport(error.to_string()))?;

        let payload: serde_json::Value = serde_json::from_str(&raw)
            .map_err(|error| ClassifierError::MalformedOutput(error.to_string()))?;

        let result = parse_intent_payload(&payload, text);
        info!(
            event_name = "nlu.intent_classified",
            channel = channel.as_str(),
            intent = result.intent.as_str(),
            confidence = result.confidence,
            slot_count = result.slots.len(),
            "intent classified"
        );
        Ok(result)
    }
}

/// Placeholder classifier used when no LLM API key is configured. Every
/// call reports a transport failure, which the pipeline degrades to the
/// unknown-intent fallback.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnconfiguredClassifier;

#[async_trait]
impl IntentClassifier for UnconfiguredClassifier {
    async fn classify(
        &self,
        _text: &str,
        _channel: ChannelType,
    ) -> Result<IntentResult, ClassifierError> {
        Err(ClassifierError::Transport("llm api key not configured".to_owned()))
    }
}

/// Validate raw classifier output into a typed result. Unknown intent tokens
/// map to `Unknown`, confidence is coerced and clamped to [0, 1], contact
/// info counts only when some field is set, and an appointment requires both
/// a well-formed date and time.
pub fn parse_intent_payload(payload: &serde_json::Value, raw_text: &str) -> IntentResult {
    let intent = payload
        .get("intent")
        .and_then(|value| value.as_str())
        .and_then(|token| IntentType::parse(&token.trim().to_ascii_lowercase()))
        .unwrap_or(IntentType::Unknown);

    let confidence = payload.get("confidence").and_then(coerce_f64).unwrap_or(0.0);

    let mut result = IntentResult::new(intent, confidence, raw_text);

    if let Some(slots) = payload.get("slots").and_then(|value| value.as_object()) {
        result = result.with_slots(slots.clone());
    }

    if let Some(contact) = payload.get("contact_info").and_then(|value| value.as_object()) {
        result = result.with_contact(ContactInfo {
            name: non_empty_string(contact.get("name")),
            email: non_empty_string(contact.get("email")),
            phone: non_empty_string(contact.get("phone")),
        });
    }

    if let Some(appointment) = payload.get("appointment").and_then(|value| value.as_object()) {
        let date = non_empty_string(appointment.get("date"));
        let time = non_empty_string(appointment.get("time"));
        let timezone = non_empty_string(appointment.get("timezone"));
        if let (Some(date), Some(time)) = (date, time) {
            if let Some(slot) = AppointmentSlot::parse(&date, &time, timezone.as_deref()) {
                result = result.with_appointment(slot);
            }
        }
    }

    result
}

fn coerce_f64(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(number) => number.as_f64(),
        serde_json::Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn non_empty_string(value: Option<&serde_json::Value>) -> Option<String> {
    value
        .and_then(|value| value.as_str())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_owned)
}
