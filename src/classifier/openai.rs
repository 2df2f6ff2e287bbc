//! OpenAI chat-completions classifier backend.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::classifier::prompt::{SYSTEM_PROMPT, build_user_prompt, parse_response};
use crate::classifier::types::ParsedIntent;
use crate::classifier::IntentParser;
use crate::error::ClassifierError;
use crate::ledger::model::Transaction;

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Low temperature for deterministic extraction.
const TEMPERATURE: f32 = 0.1;

pub struct OpenAiParser {
    client: reqwest::Client,
    api_key: SecretString,
    model: String,
    endpoint: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

impl OpenAiParser {
    pub fn new(api_key: SecretString, model: impl Into<String>) -> Self {
        Self::with_base(api_key, model, DEFAULT_API_BASE)
    }

    pub fn with_base(
        api_key: SecretString,
        model: impl Into<String>,
        api_base: &str,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model: model.into(),
            endpoint: format!("{api_base}/chat/completions"),
        }
    }
}

#[async_trait]
impl IntentParser for OpenAiParser {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn parse_text(
        &self,
        text: &str,
        reply_context: Option<&Transaction>,
    ) -> Result<ParsedIntent, ClassifierError> {
        let body = json!({
            "model": self.model,
            "temperature": TEMPERATURE,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": build_user_prompt(text, reply_context) },
            ],
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ClassifierError::RequestFailed {
                backend: "openai".to_string(),
                reason: format!("status {status}: {detail}"),
            });
        }

        let chat: ChatResponse = response.json().await?;
        let content = chat
            .choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .filter(|c| !c.trim().is_empty())
            .ok_or(ClassifierError::EmptyResponse {
                backend: "openai".to_string(),
            })?;
        debug!(raw = %content, "OpenAI classifier response");

        parse_response("openai", content).map_err(|reason| ClassifierError::InvalidOutput {
            backend: "openai".to_string(),
            reason,
        })
    }
}
