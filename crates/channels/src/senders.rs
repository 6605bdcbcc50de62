use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tracing::info;

use sara_core::contracts::{ReplySender, SendError};
use sara_core::domain::message::OutboundReply;

pub(crate) fn text_field(payload: &serde_json::Value, key: &str) -> Option<String> {
    payload
        .get(key)
        .and_then(|value| value.as_str())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}

fn build_http(timeout_secs: u64) -> Result<reqwest::Client, SendError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs.max(1)))
        .build()
        .map_err(|error| SendError::Transport(error.to_string()))
}

/// Outbound SMS through the Twilio Messages API.
pub struct TwilioSender {
    http: reqwest::Client,
    base_url: String,
    account_sid: String,
    auth_token: SecretString,
    from_number: String,
}

impl TwilioSender {
    pub fn new(
        base_url: impl Into<String>,
        account_sid: impl Into<String>,
        auth_token: SecretString,
        from_number: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, SendError> {
        Ok(Self {
            http: build_http(timeout_secs)?,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            account_sid: account_sid.into(),
            auth_token,
            from_number: from_number.into(),
        })
    }
}

#[async_trait]
impl ReplySender for TwilioSender {
    async fn send(&self, reply: &OutboundReply) -> Result<(), SendError> {
        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url, self.account_sid
        );
        let form = [
            ("To", reply.to.as_str()),
            ("From", self.from_number.as_str()),
            ("Body", reply.text.as_str()),
        ];

        let response = self
            .http
            .post(url)
            .basic_auth(&self.account_sid, Some(self.auth_token.expose_secret()))
            .form(&form)
            .send()
            .await
            .map_err(|error| SendError::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SendError::Rejected(format!("twilio returned {status}: {body}")));
        }

        info!(
            event_name = "channel.sms_sent",
            to = %reply.to,
            "sms delivered to carrier"
        );
        Ok(())
    }
}

/// Outbound WhatsApp messages through the Meta Graph API.
pub struct MetaWhatsAppSender {
    http: reqwest::Client,
    base_url: String,
    phone_number_id: String,
    access_token: SecretString,
}

impl MetaWhatsAppSender {
    pub fn new(
        base_url: impl Into<String>,
        phone_number_id: impl Into<String>,
        access_token: SecretString,
        timeout_secs: u64,
    ) -> Result<Self, SendError> {
        Ok(Self {
            http: build_http(timeout_secs)?,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            phone_number_id: phone_number_id.into(),
            access_token,
        })
    }
}

pub(crate) fn whatsapp_message_body(reply: &OutboundReply) -> serde_json::Value {
    match &reply.media_url {
        Some(media_url) => serde_json::json!({
            "messaging_product": "whatsapp",
            "to": &reply.to,
            "type": "image",
            "image": {"link": media_url},
        }),
        None => serde_json::json!({
            "messaging_product": "whatsapp",
            "to": &reply.to,
            "type": "text",
            "text": {"body": &reply.text},
        }),
    }
}

#[async_trait]
impl ReplySender for MetaWhatsAppSender {
    async fn send(&self, reply: &OutboundReply) -> Result<(), SendError> {
        let url = format!("{}/{}/messages", self.base_url, self.phone_number_id);

        let response = self
            .http
            .post(url)
            .bearer_auth(self.access_token.expose_secret())
            .json(&whatsapp_message_body(reply))
            .send()
            .await
            .map_err(|error| SendError::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SendError::Rejected(format!("graph api returned {status}: {body}")));
        }

        info!(
            event_name = "channel.whatsapp_sent",
            to = %reply.to,
            "whatsapp message accepted"
        );
        Ok(())
    }
}

/// Stand-in sender for channels whose credentials are not configured: logs
/// the reply and reports success so local runs work end to end.
pub struct NoopSender {
    label: &'static str,
}

impl NoopSender {
    pub fn new(label: &'static str) -> Self {
        Self { label }
    }
}

#[async_trait]
impl ReplySender for NoopSender {
    async fn send(&self, reply: &OutboundReply) -> Result<(), SendError> {
        info!(
            event_name = "channel.noop_send",
            transport = self.label,
            to = %reply.to,
            response_text = %reply.text,
            "send skipped, transport not configured"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use sara_core::domain::message::OutboundReply;
    use sara_core::ChannelType;

    use super::{text_field, whatsapp_message_body};

    #[test]
    fn text_field_trims_and_drops_empty_values() {
        let payload = serde_json::json!({"A": " x ", "B": "  ", "C": 7});
        assert_eq!(text_field(&payload, "A").as_deref(), Some("x"));
        assert_eq!(text_field(&payload, "B"), None);
        assert_eq!(text_field(&payload, "C"), None);
        assert_eq!(text_field(&payload, "D"), None);
    }

    #[test]
    fn whatsapp_body_switches_to_image_when_media_is_attached() {
        let mut reply =
            OutboundReply::text_reply(ChannelType::Whatsapp, "15550001", "see attached");
        let body = whatsapp_message_body(&reply);
        assert_eq!(body["type"], "text");
        assert_eq!(body["text"]["body"], "see attached");

        reply.media_url = Some("https://cdn.example/map.png".to_owned());
        let body = whatsapp_message_body(&reply);
        assert_eq!(body["type"], "image");
        assert_eq!(body["image"]["link"], "https://cdn.example/map.png");
        assert!(body.get("text").is_none());
    }
}
