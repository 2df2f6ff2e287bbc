//! Ordered processor dispatch.
//!
//! Processors are registered in priority order; the first whose
//! `can_handle` accepts the context wins. Processors that need no
//! classification opt into the pre-classification pass via
//! `handles_unclassified`, which lets button taps, the onboarding keyword,
//! and simple reply phrasing skip the classifier entirely.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::ProcessError;
use crate::pipeline::types::{ProcessContext, ProcessOutcome};

#[async_trait]
pub trait Processor: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether this processor participates in the pre-classification pass
    /// (where `ctx.parsed` is `None`).
    fn handles_unclassified(&self) -> bool {
        false
    }

    fn can_handle(&self, ctx: &ProcessContext) -> bool;

    async fn process(&self, ctx: &ProcessContext) -> Result<ProcessOutcome, ProcessError>;
}

pub struct ProcessorRouter {
    processors: Vec<Arc<dyn Processor>>,
}

impl ProcessorRouter {
    pub fn new(processors: Vec<Arc<dyn Processor>>) -> Self {
        Self { processors }
    }

    /// Pre-classification pass. Returns `None` when no classifier-free
    /// processor claims the message.
    pub async fn dispatch_unclassified(
        &self,
        ctx: &ProcessContext,
    ) -> Result<Option<ProcessOutcome>, ProcessError> {
        for processor in &self.processors {
            if processor.handles_unclassified() && processor.can_handle(ctx) {
                debug!(processor = processor.name(), "Dispatching without classification");
                return Ok(Some(processor.process(ctx).await?));
            }
        }
        Ok(None)
    }

    /// Post-classification pass. `ctx.parsed` must be set; failing to find
    /// a handler is a terminal error.
    pub async fn dispatch(&self, ctx: &ProcessContext) -> Result<ProcessOutcome, ProcessError> {
        for processor in &self.processors {
            if processor.can_handle(ctx) {
                debug!(processor = processor.name(), "Dispatching");
                return processor.process(ctx).await;
            }
        }
        let intent = ctx
            .parsed
            .as_ref()
            .map(|p| p.intent)
            .unwrap_or(crate::classifier::types::Intent::Chat);
        Err(ProcessError::UnsupportedIntent(intent))
    }
}
