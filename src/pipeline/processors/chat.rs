//! Conversational messages: echo the classifier's suggested reply.

use std::sync::Arc;

use async_trait::async_trait;

use crate::classifier::types::{Intent, ParsedIntent};
use crate::error::ProcessError;
use crate::messenger::Messenger;
use crate::pipeline::router::Processor;
use crate::pipeline::types::{ProcessContext, ProcessOutcome};

pub struct ChatProcessor {
    messenger: Arc<dyn Messenger>,
}

impl ChatProcessor {
    pub fn new(messenger: Arc<dyn Messenger>) -> Self {
        Self { messenger }
    }
}

#[async_trait]
impl Processor for ChatProcessor {
    fn name(&self) -> &'static str {
        "chat"
    }

    fn can_handle(&self, ctx: &ProcessContext) -> bool {
        ctx.parsed.as_ref().is_some_and(|p| p.intent == Intent::Chat)
    }

    async fn process(&self, ctx: &ProcessContext) -> Result<ProcessOutcome, ProcessError> {
        let parsed = ctx
            .parsed
            .clone()
            .unwrap_or_else(|| ParsedIntent::of(Intent::Chat));

        let response = parsed
            .conversational_response
            .clone()
            .unwrap_or_else(|| "Hello! I am here to help you track your finances.".to_string());
        self.messenger
            .send_message(&ctx.user.phone_number, &response)
            .await?;
        Ok(ProcessOutcome { response, parsed })
    }
}
