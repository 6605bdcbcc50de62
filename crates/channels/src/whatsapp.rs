use std::sync::Arc;

use async_trait::async_trait;

use sara_core::contracts::{ChannelAdapter, ChannelParseError, ReplySender, SendError};
use sara_core::domain::interaction::EventId;
use sara_core::domain::message::{InboundEvent, OutboundReply};
use sara_core::ChannelType;

use crate::senders::text_field;

/// WhatsApp Business channel. One webhook payload batches messages across
/// `entry[].changes[]`; each message becomes its own inbound event with the
/// canonical id `whatsapp_<message id>`. Non-text messages are represented
/// by a placeholder body so classification still has something to work with.
pub struct WhatsAppChannel {
    sender: Arc<dyn ReplySender>,
}

impl WhatsAppChannel {
    pub fn new(sender: Arc<dyn ReplySender>) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl ChannelAdapter for WhatsAppChannel {
    fn channel(&self) -> ChannelType {
        ChannelType::Whatsapp
    }

    fn parse(&self, payload: &serde_json::Value) -> Result<Vec<InboundEvent>, ChannelParseError> {
        if payload.get("object").and_then(|value| value.as_str())
            != Some("whatsapp_business_account")
        {
            return Err(ChannelParseError::InvalidPayload(
                "object must be `whatsapp_business_account`".to_owned(),
            ));
        }

        let mut events = Vec::new();
        let entries = payload.get("entry").and_then(|value| value.as_array());
        for entry in entries.into_iter().flatten() {
            let changes = entry.get("changes").and_then(|value| value.as_array());
            for change in changes.into_iter().flatten() {
                if change.get("field").and_then(|value| value.as_str()) != Some("messages") {
                    continue;
                }
                let value = change.get("value").cloned().unwrap_or_default();
                let messages = value.get("messages").and_then(|inner| inner.as_array());
                for message in messages.into_iter().flatten() {
                    events.push(parse_message(message)?);
                }
            }
        }

        Ok(events)
    }

    async fn send(&self, reply: &OutboundReply) -> Result<(), SendError> {
        self.sender.send(reply).await
    }
}

fn parse_message(message: &serde_json::Value) -> Result<InboundEvent, ChannelParseError> {
    let message_id =
        text_field(message, "id").ok_or(ChannelParseError::MissingIdentifier("id"))?;

    let message_type = text_field(message, "type").unwrap_or_else(|| "text".to_owned());
    let text = if message_type == "text" {
        message
            .get("text")
            .and_then(|body| body.get("body"))
            .and_then(|body| body.as_str())
            .unwrap_or_default()
            .to_owned()
    } else {
        format!("[{message_type} message]")
    };

    Ok(InboundEvent {
        event_id: EventId(format!("whatsapp_{message_id}")),
        channel: ChannelType::Whatsapp,
        from: text_field(message, "from").unwrap_or_default(),
        to: text_field(message, "to").unwrap_or_default(),
        text,
        raw_payload: message.clone(),
    })
}
