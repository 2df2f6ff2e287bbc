//! Ordered fallback across classifier backends.
//!
//! Tries each backend in order; on failure, logs and moves on. When every
//! backend fails, returns the degraded neutral result instead of an error —
//! a classification failure must never abort the conversation.

use std::sync::Arc;

use tracing::{error, warn};

use crate::classifier::types::ParsedIntent;
use crate::classifier::IntentParser;
use crate::ledger::model::Transaction;

pub struct FallbackParser {
    backends: Vec<Arc<dyn IntentParser>>,
}

impl FallbackParser {
    /// `backends` must be non-empty; order encodes priority.
    pub fn new(backends: Vec<Arc<dyn IntentParser>>) -> Self {
        Self { backends }
    }

    /// Classify `text`, degrading gracefully when every backend fails.
    pub async fn classify(
        &self,
        text: &str,
        reply_context: Option<&Transaction>,
    ) -> ParsedIntent {
        for backend in &self.backends {
            match backend.parse_text(text, reply_context).await {
                Ok(parsed) => return parsed,
                Err(e) => {
                    warn!(backend = backend.name(), error = %e, "Classifier backend failed, trying next");
                }
            }
        }
        error!("All classifier backends failed, returning degraded result");
        ParsedIntent::degraded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use crate::classifier::types::Intent;
    use crate::error::ClassifierError;

    struct FixedParser {
        name: &'static str,
        result: Result<Intent, ()>,
    }

    #[async_trait]
    impl IntentParser for FixedParser {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn parse_text(
            &self,
            _text: &str,
            _reply_context: Option<&Transaction>,
        ) -> Result<ParsedIntent, ClassifierError> {
            match self.result {
                Ok(intent) => {
                    let mut parsed = ParsedIntent::of(intent);
                    parsed.amount = Some(dec!(500));
                    Ok(parsed)
                }
                Err(()) => Err(ClassifierError::RequestFailed {
                    backend: self.name.to_string(),
                    reason: "boom".to_string(),
                }),
            }
        }
    }

    #[tokio::test]
    async fn primary_success_short_circuits() {
        let fallback = FallbackParser::new(vec![
            Arc::new(FixedParser { name: "a", result: Ok(Intent::Credit) }),
            Arc::new(FixedParser { name: "b", result: Ok(Intent::Debit) }),
        ]);
        let parsed = fallback.classify("gave 500", None).await;
        assert_eq!(parsed.intent, Intent::Credit);
    }

    #[tokio::test]
    async fn primary_failure_falls_through() {
        let fallback = FallbackParser::new(vec![
            Arc::new(FixedParser { name: "a", result: Err(()) }),
            Arc::new(FixedParser { name: "b", result: Ok(Intent::Debit) }),
        ]);
        let parsed = fallback.classify("got 500", None).await;
        assert_eq!(parsed.intent, Intent::Debit);
    }

    #[tokio::test]
    async fn all_failures_degrade_instead_of_erroring() {
        let fallback = FallbackParser::new(vec![
            Arc::new(FixedParser { name: "a", result: Err(()) }),
            Arc::new(FixedParser { name: "b", result: Err(()) }),
        ]);
        let parsed = fallback.classify("anything", None).await;
        assert_eq!(parsed.intent, Intent::Balance);
        assert_eq!(parsed.amount, Some(Decimal::ZERO));
        assert_eq!(parsed.name.as_deref(), Some("Unknown"));
        assert_eq!(parsed.category.as_deref(), Some("Error"));
    }
}
