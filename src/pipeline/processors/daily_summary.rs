//! Today's spend, broken down by category.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::classifier::types::{Intent, ParsedIntent};
use crate::error::ProcessError;
use crate::ledger::model::TransactionIntent;
use crate::ledger::TransactionLedger;
use crate::messenger::Messenger;
use crate::pipeline::processors::rupees;
use crate::pipeline::router::Processor;
use crate::pipeline::types::{ProcessContext, ProcessOutcome};

pub struct DailySummaryProcessor {
    ledger: Arc<TransactionLedger>,
    messenger: Arc<dyn Messenger>,
}

impl DailySummaryProcessor {
    pub fn new(ledger: Arc<TransactionLedger>, messenger: Arc<dyn Messenger>) -> Self {
        Self { ledger, messenger }
    }
}

#[async_trait]
impl Processor for DailySummaryProcessor {
    fn name(&self) -> &'static str {
        "daily_summary"
    }

    fn can_handle(&self, ctx: &ProcessContext) -> bool {
        ctx.parsed
            .as_ref()
            .is_some_and(|p| p.intent == Intent::ViewDailySummary)
    }

    async fn process(&self, ctx: &ProcessContext) -> Result<ProcessOutcome, ProcessError> {
        let parsed = ctx
            .parsed
            .clone()
            .unwrap_or_else(|| ParsedIntent::of(Intent::ViewDailySummary));

        let summary = self.ledger.daily_summary(&ctx.user.id, Utc::now()).await?;

        let mut response = String::from("📅 *Today's Summary*\n\n");
        response.push_str(&format!("💸 *Total Spend:* {}\n\n", rupees(summary.total_spend)));

        if !summary.category_breakdown.is_empty() {
            response.push_str("📊 *Category Breakdown:*\n");
            for (category, amount) in &summary.category_breakdown {
                response.push_str(&format!("- {category}: {}\n", rupees(*amount)));
            }
            response.push('\n');
        }

        if summary.transactions.is_empty() {
            response.push_str("_No transactions recorded today._");
        } else {
            response.push_str("📝 *Recent Entries:*\n");
            for tx in summary.transactions.iter().take(5) {
                let icon = match tx.intent {
                    TransactionIntent::Credit => "🔴",
                    TransactionIntent::Debit => "🟢",
                };
                response.push_str(&format!("{icon} {} ({})\n", rupees(tx.amount), tx.category));
            }
        }

        self.messenger
            .send_message(&ctx.user.phone_number, &response)
            .await?;
        Ok(ProcessOutcome { response, parsed })
    }
}
