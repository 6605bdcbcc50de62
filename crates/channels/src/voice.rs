use async_trait::async_trait;
use tracing::info;

use sara_core::contracts::{ChannelAdapter, ChannelParseError, SendError};
use sara_core::domain::interaction::EventId;
use sara_core::domain::message::{InboundEvent, OutboundReply};
use sara_core::ChannelType;

use crate::senders::text_field;

/// Telephony channel. The raw call identifier is already globally unique, so
/// the event_id carries no prefix. Replies are spoken back on the call leg
/// by the telephony provider; this adapter logs the text that is said.
#[derive(Default)]
pub struct VoiceChannel;

impl VoiceChannel {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ChannelAdapter for VoiceChannel {
    fn channel(&self) -> ChannelType {
        ChannelType::Voice
    }

    fn parse(&self, payload: &serde_json::Value) -> Result<Vec<InboundEvent>, ChannelParseError> {
        let call_sid = text_field(payload, "CallSid")
            .ok_or(ChannelParseError::MissingIdentifier("CallSid"))?;

        Ok(vec![InboundEvent {
            event_id: EventId(call_sid),
            channel: ChannelType::Voice,
            from: text_field(payload, "From").unwrap_or_default(),
            to: text_field(payload, "To").unwrap_or_default(),
            text: text_field(payload, "TranscriptionText").unwrap_or_default(),
            raw_payload: payload.clone(),
        }])
    }

    async fn send(&self, reply: &OutboundReply) -> Result<(), SendError> {
        info!(
            event_name = "channel.voice_response",
            to = %reply.to,
            response_text = %reply.text,
            "voice response spoken to caller"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use sara_core::contracts::{ChannelAdapter, ChannelParseError};

    use super::VoiceChannel;

    #[test]
    fn parses_a_transcribed_call() {
        let payload = serde_json::json!({
            "CallSid": "CA7d2f3",
            "From": "+15550001",
            "To": "+15550002",
            "CallStatus": "completed",
            "TranscriptionText": "I'd like to book an appointment",
            "RecordingUrl": "https://recordings.example/CA7d2f3",
        });

        let events = VoiceChannel::new().parse(&payload).expect("parse");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_id.as_str(), "CA7d2f3");
        assert_eq!(events[0].text, "I'd like to book an appointment");
        assert_eq!(events[0].raw_payload["RecordingUrl"], "https://recordings.example/CA7d2f3");
    }

    #[test]
    fn missing_call_sid_is_rejected_before_any_record_exists() {
        let payload = serde_json::json!({"From": "+15550001"});
        let error = VoiceChannel::new().parse(&payload).expect_err("must reject");
        assert_eq!(error, ChannelParseError::MissingIdentifier("CallSid"));
    }

    #[test]
    fn missing_transcription_yields_empty_text() {
        let payload = serde_json::json!({"CallSid": "CA1"});
        let events = VoiceChannel::new().parse(&payload).expect("parse");
        assert_eq!(events[0].text, "");
    }
}
