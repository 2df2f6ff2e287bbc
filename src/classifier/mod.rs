//! Natural-language intent classification with ordered backend fallback.
//!
//! Backends implement `IntentParser` and must fail loudly; `FallbackParser`
//! wraps them with try-in-order semantics and graceful degradation.

pub mod fallback;
pub mod gemini;
pub mod openai;
pub mod prompt;
pub mod types;

use std::sync::Arc;

use async_trait::async_trait;

pub use fallback::FallbackParser;
pub use gemini::GeminiParser;
pub use openai::OpenAiParser;

use crate::config::ClassifierConfig;
use crate::error::ClassifierError;
use crate::ledger::model::Transaction;
use crate::classifier::types::ParsedIntent;

/// A single classification backend. Must raise on any failure — never a
/// silently-wrong result — so the fallback wrapper can tell "backend
/// failed" apart from "backend answered".
#[async_trait]
pub trait IntentParser: Send + Sync {
    fn name(&self) -> &'static str;

    async fn parse_text(
        &self,
        text: &str,
        reply_context: Option<&Transaction>,
    ) -> Result<ParsedIntent, ClassifierError>;
}

/// Build the production classifier: OpenAI primary, Gemini secondary.
pub fn create_classifier(config: &ClassifierConfig) -> FallbackParser {
    FallbackParser::new(vec![
        Arc::new(OpenAiParser::new(
            config.openai_api_key.clone(),
            config.openai_model.clone(),
        )),
        Arc::new(GeminiParser::new(
            config.gemini_api_key.clone(),
            config.gemini_model.clone(),
        )),
    ])
}
