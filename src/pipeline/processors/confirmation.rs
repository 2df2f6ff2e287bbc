//! Second phase of the delete confirmation flow.
//!
//! The confirmation prompt carries buttons whose payload ids embed the
//! transaction id (`confirm_delete_<id>` / `cancel_delete_<id>`), so this
//! processor needs no classifier and no reply correlation to know what to
//! delete.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::classifier::types::{Intent, ParsedIntent};
use crate::error::ProcessError;
use crate::ledger::TransactionLedger;
use crate::messenger::Messenger;
use crate::pipeline::processors::rupees;
use crate::pipeline::router::Processor;
use crate::pipeline::types::{ProcessContext, ProcessOutcome};

pub const CONFIRM_PREFIX: &str = "confirm_delete_";
pub const CANCEL_PREFIX: &str = "cancel_delete_";

pub struct ConfirmationProcessor {
    ledger: Arc<TransactionLedger>,
    messenger: Arc<dyn Messenger>,
}

impl ConfirmationProcessor {
    pub fn new(ledger: Arc<TransactionLedger>, messenger: Arc<dyn Messenger>) -> Self {
        Self { ledger, messenger }
    }
}

#[async_trait]
impl Processor for ConfirmationProcessor {
    fn name(&self) -> &'static str {
        "confirmation"
    }

    fn handles_unclassified(&self) -> bool {
        true
    }

    fn can_handle(&self, ctx: &ProcessContext) -> bool {
        let text = ctx.body.text();
        text.starts_with(CONFIRM_PREFIX) || text.starts_with(CANCEL_PREFIX)
    }

    async fn process(&self, ctx: &ProcessContext) -> Result<ProcessOutcome, ProcessError> {
        let text = ctx.body.text();

        if let Some(transaction_id) = text.strip_prefix(CONFIRM_PREFIX) {
            let response = match self.ledger.find_by_id(transaction_id).await? {
                Some(tx) if !tx.is_deleted => {
                    self.ledger.soft_delete(&tx.id, Some(&ctx.user.id)).await?;
                    info!(transaction_id, user_id = %ctx.user.id, "Confirmed delete");
                    format!(
                        "🗑️ *Entry Deleted*\n\n\
                         Removed: {} ({})\n\
                         Note: {}",
                        rupees(tx.amount),
                        tx.intent.as_str(),
                        tx.description.as_deref().unwrap_or("None"),
                    )
                }
                _ => "⚠️ Transaction not found or already deleted.".to_string(),
            };
            self.messenger
                .send_message(&ctx.user.phone_number, &response)
                .await?;
            return Ok(ProcessOutcome {
                response,
                parsed: ParsedIntent::with_notes(Intent::Undo, "Confirmed delete"),
            });
        }

        let response = "❌ Deletion cancelled.".to_string();
        self.messenger
            .send_message(&ctx.user.phone_number, &response)
            .await?;
        Ok(ProcessOutcome {
            response,
            parsed: ParsedIntent::with_notes(Intent::Undo, "Cancelled delete"),
        })
    }
}
