use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("llm client build failed: {0}")]
    Build(String),
    #[error("llm request failed: {0}")]
    Request(String),
    #[error("llm returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("llm response carried no message content")]
    EmptyResponse,
}

/// Minimal chat-completions client. One method per response mode; prompt
/// construction stays with the callers.
pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: SecretString,
    model: String,
    max_tokens: u32,
    temperature: f64,
}

impl OpenAiClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: SecretString,
        model: impl Into<String>,
        timeout_secs: u64,
        max_tokens: u32,
        temperature: f64,
    ) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .build()
            .map_err(|error| LlmError::Build(error.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            api_key,
            model: model.into(),
            max_tokens,
            temperature,
        })
    }

    /// Completion constrained to a JSON object (intent extraction).
    pub async fn complete_json(&self, system: &str, user: &str) -> Result<String, LlmError> {
        self.complete(system, user, Some("json_object"), 0.1).await
    }

    /// Free-text completion (reply composition).
    pub async fn complete_text(&self, system: &str, user: &str) -> Result<String, LlmError> {
        self.complete(system, user, None, self.temperature).await
    }

    async fn complete(
        &self,
        system: &str,
        user: &str,
        response_format: Option<&str>,
        temperature: f64,
    ) -> Result<String, LlmError> {
        let mut body = serde_json::json!({
            "model": &self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
            "temperature": temperature,
            "max_tokens": self.max_tokens,
        });
        if let Some(format) = response_format {
            body["response_format"] = serde_json::json!({"type": format});
        }

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|error| LlmError::Request(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status { status: status.as_u16(), body });
        }

        let completion: ChatCompletion =
            response.json().await.map_err(|error| LlmError::Request(error.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(LlmError::EmptyResponse)
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}
