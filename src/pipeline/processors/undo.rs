//! Immediate undo of the user's most recent entry. Unlike the reply-driven
//! delete flow, this one is not confirmed; "undo" phrasing already names
//! exactly one transaction.

use std::sync::Arc;

use async_trait::async_trait;

use crate::classifier::types::{Intent, ParsedIntent};
use crate::error::ProcessError;
use crate::ledger::TransactionLedger;
use crate::messenger::Messenger;
use crate::pipeline::processors::rupees;
use crate::pipeline::router::Processor;
use crate::pipeline::types::{ProcessContext, ProcessOutcome};

pub struct UndoProcessor {
    ledger: Arc<TransactionLedger>,
    messenger: Arc<dyn Messenger>,
}

impl UndoProcessor {
    pub fn new(ledger: Arc<TransactionLedger>, messenger: Arc<dyn Messenger>) -> Self {
        Self { ledger, messenger }
    }
}

#[async_trait]
impl Processor for UndoProcessor {
    fn name(&self) -> &'static str {
        "undo"
    }

    fn can_handle(&self, ctx: &ProcessContext) -> bool {
        ctx.parsed.as_ref().is_some_and(|p| p.intent == Intent::Undo)
    }

    async fn process(&self, ctx: &ProcessContext) -> Result<ProcessOutcome, ProcessError> {
        let parsed = ctx
            .parsed
            .clone()
            .unwrap_or_else(|| ParsedIntent::of(Intent::Undo));

        let Some(deleted) = self.ledger.undo_last(&ctx.user.id).await? else {
            let response = "⚠️ No recent transaction found to delete.".to_string();
            self.messenger
                .send_message(&ctx.user.phone_number, &response)
                .await?;
            return Ok(ProcessOutcome { response, parsed });
        };

        let response = format!(
            "🗑️ *Deleted Last Entry*\n\n\
             Removed: {} ({})\n\n\
             🔄 Balance reverted to previous state.",
            rupees(deleted.amount),
            deleted.intent.as_str(),
        );
        self.messenger
            .send_message(&ctx.user.phone_number, &response)
            .await?;
        Ok(ProcessOutcome { response, parsed })
    }
}
