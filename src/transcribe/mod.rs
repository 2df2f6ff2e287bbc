//! Speech-to-text for voice notes.
//!
//! Voice notes arrive as OGG/Opus from WhatsApp; Sarvam's saarika model
//! handles the Indian-language mix the classifier expects downstream.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

use crate::error::TranscribeError;

const DEFAULT_API_BASE: &str = "https://api.sarvam.ai";

const MODEL: &str = "saarika:v2";

/// A completed transcription.
#[derive(Debug, Clone)]
pub struct Transcription {
    pub text: String,
    /// BCP-47 code reported by the service, when it detects one.
    pub language: Option<String>,
}

#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(
        &self,
        audio: Vec<u8>,
        mime_type: &str,
    ) -> Result<Transcription, TranscribeError>;
}

pub struct SarvamTranscriber {
    client: reqwest::Client,
    api_key: SecretString,
    api_base: String,
}

#[derive(Deserialize)]
struct SarvamResponse {
    transcript: Option<String>,
    language_code: Option<String>,
}

/// Sarvam keys the upload off the filename extension.
fn extension_for(mime_type: &str) -> &'static str {
    match mime_type.split(';').next().unwrap_or_default().trim() {
        "audio/ogg" | "audio/opus" => "ogg",
        "audio/mpeg" | "audio/mp3" => "mp3",
        "audio/wav" | "audio/x-wav" => "wav",
        "audio/aac" => "aac",
        "audio/amr" => "amr",
        _ => "ogg",
    }
}

impl SarvamTranscriber {
    pub fn new(api_key: SecretString) -> Self {
        Self::with_base(api_key, DEFAULT_API_BASE)
    }

    pub fn with_base(api_key: SecretString, api_base: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            api_base: api_base.to_string(),
        }
    }
}

#[async_trait]
impl Transcriber for SarvamTranscriber {
    async fn transcribe(
        &self,
        audio: Vec<u8>,
        mime_type: &str,
    ) -> Result<Transcription, TranscribeError> {
        let filename = format!("voice.{}", extension_for(mime_type));
        let part = reqwest::multipart::Part::bytes(audio)
            .file_name(filename)
            .mime_str(mime_type)?;
        let form = reqwest::multipart::Form::new()
            .text("model", MODEL)
            .text("language_code", "unknown")
            .part("file", part);

        let response = self
            .client
            .post(format!("{}/speech-to-text", self.api_base))
            .header("api-subscription-key", self.api_key.expose_secret())
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(TranscribeError::RequestFailed {
                status: status.as_u16(),
                detail,
            });
        }

        let parsed: SarvamResponse = response.json().await?;
        let text = parsed
            .transcript
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(TranscribeError::EmptyTranscript)?;
        debug!(language = ?parsed.language_code, "Transcribed voice note");

        Ok(Transcription {
            text,
            language: parsed.language_code,
        })
    }
}
