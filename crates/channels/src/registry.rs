use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use sara_core::contracts::{ChannelAdapter, ReplySender, SendError};
use sara_core::domain::message::OutboundReply;
use sara_core::ChannelType;

/// Maps each channel to its adapter. The webhook layer uses it to parse
/// inbound payloads; the pipeline uses it (through [`ReplySender`]) to
/// deliver replies on whichever channel an event arrived on.
#[derive(Default)]
pub struct ChannelRegistry {
    adapters: HashMap<ChannelType, Arc<dyn ChannelAdapter>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, adapter: Arc<dyn ChannelAdapter>) {
        self.adapters.insert(adapter.channel(), adapter);
    }

    pub fn get(&self, channel: ChannelType) -> Option<Arc<dyn ChannelAdapter>> {
        self.adapters.get(&channel).cloned()
    }

    pub fn adapter_count(&self) -> usize {
        self.adapters.len()
    }
}

#[async_trait]
impl ReplySender for ChannelRegistry {
    async fn send(&self, reply: &OutboundReply) -> Result<(), SendError> {
        let Some(adapter) = self.get(reply.channel) else {
            return Err(SendError::UnsupportedChannel(reply.channel));
        };
        adapter.send(reply).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use sara_core::contracts::{ReplySender, SendError};
    use sara_core::domain::message::OutboundReply;
    use sara_core::ChannelType;

    use crate::senders::NoopSender;
    use crate::{SmsChannel, VoiceChannel, WhatsAppChannel};

    use super::ChannelRegistry;

    fn registry() -> ChannelRegistry {
        let mut registry = ChannelRegistry::new();
        registry.register(Arc::new(VoiceChannel::new()));
        registry.register(Arc::new(SmsChannel::new(Arc::new(NoopSender::new("sms")))));
        registry
            .register(Arc::new(WhatsAppChannel::new(Arc::new(NoopSender::new("whatsapp")))));
        registry
    }

    #[test]
    fn registry_exposes_one_adapter_per_channel() {
        let registry = registry();
        assert_eq!(registry.adapter_count(), 3);
        assert!(registry.get(ChannelType::Sms).is_some());
        assert!(registry.get(ChannelType::Email).is_none());
    }

    #[tokio::test]
    async fn replies_route_to_the_originating_channel() {
        let registry = registry();
        let reply = OutboundReply::text_reply(ChannelType::Sms, "+15550001", "hi");
        registry.send(&reply).await.expect("send");
    }

    #[tokio::test]
    async fn unregistered_channel_is_an_explicit_send_error() {
        let registry = registry();
        let reply = OutboundReply::text_reply(ChannelType::Email, "a@b.c", "hi");
        let error = registry.send(&reply).await.expect_err("must fail");
        assert_eq!(error, SendError::UnsupportedChannel(ChannelType::Email));
    }
}
