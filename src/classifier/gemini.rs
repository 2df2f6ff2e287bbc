//! Gemini generateContent classifier backend.

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

const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

const TEMPERATURE: f32 = 0.1;

pub struct GeminiParser {
    client: reqwest::Client,
    api_key: SecretString,
    model: String,
    api_base: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    parts: Option<Vec<CandidatePart>>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GeminiParser {
    pub fn new(api_key: SecretString, model: impl Into<String>) -> Self {
        Self::with_base(api_key, model, DEFAULT_API_BASE)
    }

    pub fn with_base(api_key: SecretString, model: impl Into<String>, api_base: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model: model.into(),
            api_base: api_base.to_string(),
        }
    }
}

#[async_trait]
impl IntentParser for GeminiParser {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn parse_text(
        &self,
        text: &str,
        reply_context: Option<&Transaction>,
    ) -> Result<ParsedIntent, ClassifierError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.api_base, self.model
        );
        let body = json!({
            "systemInstruction": { "parts": [{ "text": SYSTEM_PROMPT }] },
            "contents": [{
                "role": "user",
                "parts": [{ "text": build_user_prompt(text, reply_context) }],
            }],
            "generationConfig": {
                "temperature": TEMPERATURE,
                "responseMimeType": "application/json",
            },
        });

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ClassifierError::RequestFailed {
                backend: "gemini".to_string(),
                reason: format!("status {status}: {detail}"),
            });
        }

        let generated: GenerateResponse = response.json().await?;
        let content = generated
            .candidates
            .as_ref()
            .and_then(|c| c.first())
            .and_then(|c| c.content.as_ref())
            .and_then(|c| c.parts.as_ref())
            .and_then(|p| p.first())
            .and_then(|p| p.text.as_deref())
            .filter(|t| !t.trim().is_empty())
            .ok_or(ClassifierError::EmptyResponse {
                backend: "gemini".to_string(),
            })?;
        debug!(raw = %content, "Gemini classifier response");

        parse_response("gemini", content).map_err(|reason| ClassifierError::InvalidOutput {
            backend: "gemini".to_string(),
            reason,
        })
    }
}
