//! Onboarding greeting for the literal "start" keyword.

use std::sync::Arc;

use async_trait::async_trait;

use crate::classifier::types::{Intent, ParsedIntent};
use crate::error::ProcessError;
use crate::messenger::Messenger;
use crate::pipeline::router::Processor;
use crate::pipeline::types::{ProcessContext, ProcessOutcome};

pub struct StartProcessor {
    messenger: Arc<dyn Messenger>,
}

impl StartProcessor {
    pub fn new(messenger: Arc<dyn Messenger>) -> Self {
        Self { messenger }
    }
}

#[async_trait]
impl Processor for StartProcessor {
    fn name(&self) -> &'static str {
        "start"
    }

    fn handles_unclassified(&self) -> bool {
        true
    }

    fn can_handle(&self, ctx: &ProcessContext) -> bool {
        !ctx.body.is_button() && ctx.body.text().trim().eq_ignore_ascii_case("start")
    }

    async fn process(&self, ctx: &ProcessContext) -> Result<ProcessOutcome, ProcessError> {
        let response = format!(
            "👋 Hey {}! Welcome to Khata! Tell me things like 'Gave 500 to Raju' \
             or ask 'Balance for Raju' to track your ledger.",
            ctx.user.name.as_deref().unwrap_or("there"),
        );
        self.messenger
            .send_message(&ctx.user.phone_number, &response)
            .await?;
        Ok(ProcessOutcome {
            response,
            parsed: ParsedIntent::with_notes(Intent::Start, "User initiated onboarding"),
        })
    }
}
