//! Reply selection, keyed by intent. The only branch that consults a store
//! is the FAQ path; the only branches that compose text with the LLM are
//! schedule confirmations and FAQ misses, and both carry fixed fallbacks so
//! reply selection itself never fails the pipeline.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use tracing::warn;

use sara_core::contracts::{FaqSource, GeneratorError, ResponseGenerator};
use sara_core::domain::intent::{ContactInfo, IntentResult, IntentType};
use sara_core::{faq, ChannelType};

use crate::client::OpenAiClient;

pub(crate) mod texts {
    pub const SCHEDULE_ASK: &str = "I'd be happy to help you schedule an appointment! Could \
         you please provide your preferred date and time?";
    pub const SCHEDULE_RECEIVED: &str = "I've received your appointment request. I'll check \
         our availability and get back to you shortly with confirmation details.";
    pub const FAQ_DEFLECT: &str = "Thank you for your question! I'd be happy to help you with \
         that. Could you provide a bit more detail, or would you like to schedule an \
         appointment to discuss this in person?";
    pub const CONTACT_ASK: &str = "I'd be happy to help you get in touch with our team! Could \
         you please provide your name and contact information so we can reach you?";
    pub const CANCEL_ASK: &str = "I understand you'd like to cancel an appointment. I'll help \
         you with that. Could you please provide the appointment details or reference number \
         so I can locate it in our system?";
    pub const RESCHEDULE_ASK: &str = "I'd be happy to help you reschedule your appointment. \
         Could you please provide the current appointment details and your preferred new date \
         and time?";
    pub const UNKNOWN_CLARIFY: &str = "I'm not sure I understand what you're looking for. I \
         can help you with scheduling appointments, answering questions, or connecting you \
         with our team. What would you like to do today?";
}

fn contact_acknowledgement(name: &str) -> String {
    format!(
        "Thank you for providing your contact information, {name}! I have your details and \
         will make sure our team gets back to you soon. Is there anything specific you'd like \
         to discuss or schedule?"
    )
}

/// "Friday, March 20, 2026"
pub(crate) fn display_date(date: NaiveDate) -> String {
    date.format("%A, %B %d, %Y").to_string()
}

/// "02:30 PM"
pub(crate) fn display_time(time: NaiveTime) -> String {
    time.format("%I:%M %p").to_string()
}

async fn lookup_faq(source: &dyn FaqSource, query: &str) -> Option<String> {
    match source.active_entries().await {
        Ok(entries) => faq::search(&entries, query).map(|entry| entry.answer.clone()),
        Err(error) => {
            // A broken knowledge base degrades to the deflect reply.
            warn!(
                event_name = "nlu.faq_source_unavailable",
                error = %error,
                "faq lookup failed, deflecting"
            );
            None
        }
    }
}

/// LLM-composing generator used when an API key is configured.
pub struct OpenAiResponseGenerator {
    client: Arc<OpenAiClient>,
    faq_source: Arc<dyn FaqSource>,
    business_name: String,
}

impl OpenAiResponseGenerator {
    pub fn new(
        client: Arc<OpenAiClient>,
        faq_source: Arc<dyn FaqSource>,
        business_name: impl Into<String>,
    ) -> Self {
        Self { client, faq_source, business_name: business_name.into() }
    }

    async fn schedule_confirmation(&self, result: &IntentResult, channel: ChannelType) -> String {
        let Some(appointment) = &result.appointment else {
            return texts::SCHEDULE_ASK.to_owned();
        };

        let contact_name = result
            .contact
            .as_ref()
            .and_then(|contact| contact.name.as_deref())
            .unwrap_or("Not provided");
        let prompt = format!(
            "Generate a professional appointment confirmation message for {business}.\n\n\
             Appointment Details:\n\
             - Date: {date}\n\
             - Time: {time}\n\
             - Contact: {contact_name}\n\n\
             The message should confirm the appointment details, be friendly and \
             professional, include next steps, be appropriate for {channel} communication, \
             and be concise but complete.",
            business = self.business_name,
            date = display_date(appointment.date),
            time = display_time(appointment.time),
            channel = channel.as_str(),
        );
        let system = format!(
            "You are Sara, a professional AI receptionist for {business}. When confirming \
             appointments, be warm and professional, clearly state the appointment details, \
             and keep the message concise but complete.",
            business = self.business_name
        );

        match self.client.complete_text(&system, &prompt).await {
            Ok(message) => message.trim().to_owned(),
            Err(error) => {
                warn!(
                    event_name = "nlu.confirmation_fallback",
                    error = %error,
                    "confirmation composition failed, using fixed text"
                );
                texts::SCHEDULE_RECEIVED.to_owned()
            }
        }
    }

    async fn faq_reply(&self, result: &IntentResult, channel: ChannelType) -> String {
        if let Some(answer) = lookup_faq(self.faq_source.as_ref(), &result.raw_text).await {
            return answer;
        }

        let prompt = format!(
            "The user asked: \"{question}\"\n\n\
             Generate a helpful response for {business} that acknowledges their question, \
             provides general helpful information, suggests they can schedule an appointment \
             or contact us for more specific help, and is appropriate for {channel} \
             communication.",
            question = result.raw_text,
            business = self.business_name,
            channel = channel.as_str(),
        );
        let system = format!(
            "You are Sara, a helpful AI receptionist for {business}. Be helpful and \
             informative, stay within your knowledge of the business, and be encouraging \
             about scheduling appointments for detailed discussions.",
            business = self.business_name
        );

        match self.client.complete_text(&system, &prompt).await {
            Ok(message) => message.trim().to_owned(),
            Err(error) => {
                warn!(
                    event_name = "nlu.faq_fallback",
                    error = %error,
                    "faq composition failed, deflecting"
                );
                texts::FAQ_DEFLECT.to_owned()
            }
        }
    }
}

#[async_trait]
impl ResponseGenerator for OpenAiResponseGenerator {
    async fn generate(
        &self,
        result: &IntentResult,
        channel: ChannelType,
    ) -> Result<String, GeneratorError> {
        let text = match result.intent {
            IntentType::Schedule => self.schedule_confirmation(result, channel).await,
            IntentType::Faq => self.faq_reply(result, channel).await,
            IntentType::Contact => contact_reply(result.contact.as_ref()),
            IntentType::Cancel => texts::CANCEL_ASK.to_owned(),
            IntentType::Reschedule => texts::RESCHEDULE_ASK.to_owned(),
            IntentType::Unknown => texts::UNKNOWN_CLARIFY.to_owned(),
        };
        Ok(text)
    }
}

fn contact_reply(contact: Option<&ContactInfo>) -> String {
    match contact.and_then(|contact| contact.name.as_deref()) {
        Some(name) => contact_acknowledgement(name),
        None => texts::CONTACT_ASK.to_owned(),
    }
}

/// Deterministic generator: the dispatch table with fixed confirmation text
/// instead of LLM composition. Selected at bootstrap when no API key is
/// configured, and used throughout the test suites.
pub struct StaticResponseGenerator {
    faq_source: Arc<dyn FaqSource>,
}

impl StaticResponseGenerator {
    pub fn new(faq_source: Arc<dyn FaqSource>) -> Self {
        Self { faq_source }
    }
}

#[async_trait]
impl ResponseGenerator for StaticResponseGenerator {
    async fn generate(
        &self,
        result: &IntentResult,
        _channel: ChannelType,
    ) -> Result<String, GeneratorError> {
        let text = match result.intent {
            IntentType::Schedule => match &result.appointment {
                None => texts::SCHEDULE_ASK.to_owned(),
                Some(appointment) => {
                    let greeting = result
                        .contact
                        .as_ref()
                        .and_then(|contact| contact.name.as_deref())
                        .map(|name| format!(", {name}"))
                        .unwrap_or_default();
                    format!(
                        "Your appointment is confirmed for {date} at {time}{greeting}. We \
                         look forward to seeing you!",
                        date = display_date(appointment.date),
                        time = display_time(appointment.time),
                    )
                }
            },
            IntentType::Faq => lookup_faq(self.faq_source.as_ref(), &result.raw_text)
                .await
                .unwrap_or_else(|| texts::FAQ_DEFLECT.to_owned()),
            IntentType::Contact => contact_reply(result.contact.as_ref()),
            IntentType::Cancel => texts::CANCEL_ASK.to_owned(),
            IntentType::Reschedule => texts::RESCHEDULE_ASK.to_owned(),
            IntentType::Unknown => texts::UNKNOWN_CLARIFY.to_owned(),
        };
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use sara_core::contracts::ResponseGenerator;
    use sara_core::domain::intent::{AppointmentSlot, ContactInfo, IntentResult, IntentType};
    use sara_core::domain::knowledge::KnowledgeBaseDraft;
    use sara_core::ChannelType;
    use sara_db::InMemoryKnowledgeBaseRepository;

    use super::{display_date, display_time, texts, StaticResponseGenerator};

    fn generator_with_faqs(entries: &[(&str, &str, &[&str])]) -> StaticResponseGenerator {
        let repo = InMemoryKnowledgeBaseRepository::new();
        for (question, answer, keywords) in entries {
            repo.seed(KnowledgeBaseDraft {
                question: (*question).to_owned(),
                answer: (*answer).to_owned(),
                keywords: keywords.iter().map(|k| (*k).to_owned()).collect(),
                category: "general".to_owned(),
                is_active: true,
            });
        }
        StaticResponseGenerator::new(Arc::new(repo))
    }

    fn generator() -> StaticResponseGenerator {
        generator_with_faqs(&[])
    }

    async fn reply(generator: &StaticResponseGenerator, result: IntentResult) -> String {
        generator.generate(&result, ChannelType::Sms).await.expect("generate")
    }

    #[tokio::test]
    async fn schedule_without_slot_asks_for_date_and_time() {
        let text =
            reply(&generator(), IntentResult::new(IntentType::Schedule, 0.9, "book me")).await;
        assert_eq!(text, texts::SCHEDULE_ASK);
    }

    #[tokio::test]
    async fn schedule_with_slot_confirms_formatted_date_time_and_name() {
        let result = IntentResult::new(IntentType::Schedule, 0.9, "book friday 2:30pm")
            .with_appointment(
                AppointmentSlot::parse("2026-03-20", "14:30", None).expect("valid slot"),
            )
            .with_contact(ContactInfo {
                name: Some("Ada".to_owned()),
                email: None,
                phone: None,
            });

        let text = reply(&generator(), result).await;
        assert!(text.contains("Friday, March 20, 2026"));
        assert!(text.contains("02:30 PM"));
        assert!(text.contains("Ada"));
    }

    #[tokio::test]
    async fn faq_hit_returns_the_answer_verbatim() {
        let generator = generator_with_faqs(&[(
            "What are your business hours?",
            "We are open 9am to 5pm, Monday through Friday.",
            &["hours", "open"],
        )]);

        let result = IntentResult::new(IntentType::Faq, 0.9, "what are your open hours");
        let text = reply(&generator, result).await;
        assert_eq!(text, "We are open 9am to 5pm, Monday through Friday.");
    }

    #[tokio::test]
    async fn faq_miss_deflects_to_appointment() {
        let result = IntentResult::new(IntentType::Faq, 0.9, "do you ship to the moon");
        let text = reply(&generator(), result).await;
        assert_eq!(text, texts::FAQ_DEFLECT);
    }

    #[tokio::test]
    async fn contact_with_name_is_acknowledged_by_name() {
        let result = IntentResult::new(IntentType::Contact, 0.9, "I'm Grace, reach me anytime")
            .with_contact(ContactInfo {
                name: Some("Grace".to_owned()),
                email: None,
                phone: Some("+15550003".to_owned()),
            });

        let text = reply(&generator(), result).await;
        assert!(text.contains("Grace"));
    }

    #[tokio::test]
    async fn contact_without_name_asks_for_details() {
        let text =
            reply(&generator(), IntentResult::new(IntentType::Contact, 0.9, "call me")).await;
        assert_eq!(text, texts::CONTACT_ASK);
    }

    #[tokio::test]
    async fn cancel_reschedule_and_unknown_use_fixed_prompts() {
        let generator = generator();
        assert_eq!(
            reply(&generator, IntentResult::new(IntentType::Cancel, 0.9, "cancel it")).await,
            texts::CANCEL_ASK
        );
        assert_eq!(
            reply(&generator, IntentResult::new(IntentType::Reschedule, 0.9, "move it")).await,
            texts::RESCHEDULE_ASK
        );
        assert_eq!(
            reply(&generator, IntentResult::fallback("???")).await,
            texts::UNKNOWN_CLARIFY
        );
    }

    #[test]
    fn display_formats_match_the_reply_wording() {
        let date = chrono::NaiveDate::from_ymd_opt(2026, 3, 20).expect("valid date");
        assert_eq!(display_date(date), "Friday, March 20, 2026");

        let time = chrono::NaiveTime::from_hms_opt(14, 30, 0).expect("valid time");
        assert_eq!(display_time(time), "02:30 PM");
    }
}
