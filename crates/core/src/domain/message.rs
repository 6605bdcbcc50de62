use serde::{Deserialize, Serialize};

use crate::domain::channel::ChannelType;
use crate::domain::interaction::EventId;

/// Channel-agnostic form of one inbound webhook delivery, produced by a
/// channel adapter. The dispatcher never sees channel-specific payloads.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InboundEvent {
    pub event_id: EventId,
    pub channel: ChannelType,
    pub from: String,
    pub to: String,
    pub text: String,
    pub raw_payload: serde_json::Value,
}

/// Reply handed to the originating channel's send operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundReply {
    pub text: String,
    pub channel: ChannelType,
    pub to: String,
    pub media_url: Option<String>,
}

impl OutboundReply {
    pub fn text_reply(channel: ChannelType, to: impl Into<String>, text: impl Into<String>) -> Self {
        Self { text: text.into(), channel, to: to.into(), media_url: None }
    }
}
