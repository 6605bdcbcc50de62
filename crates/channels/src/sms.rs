use std::sync::Arc;

use async_trait::async_trait;

use sara_core::contracts::{ChannelAdapter, ChannelParseError, ReplySender, SendError};
use sara_core::domain::interaction::EventId;
use sara_core::domain::message::{InboundEvent, OutboundReply};
use sara_core::ChannelType;

use crate::senders::text_field;

/// SMS channel over a Twilio-shaped form payload. The canonical event_id is
/// `sms_<MessageSid>`.
pub struct SmsChannel {
    sender: Arc<dyn ReplySender>,
}

impl SmsChannel {
    pub fn new(sender: Arc<dyn ReplySender>) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl ChannelAdapter for SmsChannel {
    fn channel(&self) -> ChannelType {
        ChannelType::Sms
    }

    fn parse(&self, payload: &serde_json::Value) -> Result<Vec<InboundEvent>, ChannelParseError> {
        let message_sid = text_field(payload, "MessageSid")
            .ok_or(ChannelParseError::MissingIdentifier("MessageSid"))?;

        Ok(vec![InboundEvent {
            event_id: EventId(format!("sms_{message_sid}")),
            channel: ChannelType::Sms,
            from: text_field(payload, "From").unwrap_or_default(),
            to: text_field(payload, "To").unwrap_or_default(),
            text: text_field(payload, "Body").unwrap_or_default(),
            raw_payload: payload.clone(),
        }])
    }

    async fn send(&self, reply: &OutboundReply) -> Result<(), SendError> {
        self.sender.send(reply).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use sara_core::contracts::{ChannelAdapter, ChannelParseError};

    use crate::senders::NoopSender;

    use super::SmsChannel;

    fn channel() -> SmsChannel {
        SmsChannel::new(Arc::new(NoopSender::new("sms")))
    }

    #[test]
    fn event_id_is_prefixed_with_the_channel() {
        let payload = serde_json::json!({
            "MessageSid": "SM900",
            "From": "+15550001",
            "To": "+15550002",
            "Body": "what are your hours",
        });

        let events = channel().parse(&payload).expect("parse");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_id.as_str(), "sms_SM900");
        assert_eq!(events[0].from, "+15550001");
        assert_eq!(events[0].text, "what are your hours");
    }

    #[test]
    fn missing_message_sid_is_rejected() {
        let payload = serde_json::json!({"Body": "hi"});
        let error = channel().parse(&payload).expect_err("must reject");
        assert_eq!(error, ChannelParseError::MissingIdentifier("MessageSid"));
    }
}
