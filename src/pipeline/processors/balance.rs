//! Per-contact balance report.
//!
//! The reported balance is folded live from the contact's transactions
//! rather than read from the cached column, so a report is correct even if
//! a recompute is still in flight.

use std::sync::Arc;

use async_trait::async_trait;

use crate::classifier::types::{Intent, ParsedIntent};
use crate::error::ProcessError;
use crate::ledger::model::{total_balance, Transaction, TransactionIntent};
use crate::ledger::{ContactResolver, TransactionLedger};
use crate::messenger::Messenger;
use crate::pipeline::processors::{balance_tag, rupees};
use crate::pipeline::router::Processor;
use crate::pipeline::types::{ProcessContext, ProcessOutcome};
use crate::store::TransactionFilter;

pub struct BalanceProcessor {
    ledger: Arc<TransactionLedger>,
    contacts: Arc<ContactResolver>,
    messenger: Arc<dyn Messenger>,
}

fn history_line(tx: &Transaction) -> String {
    let kind = match tx.intent {
        TransactionIntent::Credit => "Gave",
        TransactionIntent::Debit => "Received",
    };
    let note = tx
        .description
        .as_deref()
        .map(|d| format!(" ({d})"))
        .unwrap_or_default();
    format!(
        "- {kind} {} on {}{note}",
        rupees(tx.amount),
        tx.date.format("%Y-%m-%d"),
    )
}

impl BalanceProcessor {
    pub fn new(
        ledger: Arc<TransactionLedger>,
        contacts: Arc<ContactResolver>,
        messenger: Arc<dyn Messenger>,
    ) -> Self {
        Self {
            ledger,
            contacts,
            messenger,
        }
    }

    async fn send(&self, ctx: &ProcessContext, body: &str) -> Result<(), ProcessError> {
        self.messenger
            .send_message(&ctx.user.phone_number, body)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Processor for BalanceProcessor {
    fn name(&self) -> &'static str {
        "balance"
    }

    fn can_handle(&self, ctx: &ProcessContext) -> bool {
        ctx.parsed.as_ref().is_some_and(|p| p.intent == Intent::Balance)
    }

    async fn process(&self, ctx: &ProcessContext) -> Result<ProcessOutcome, ProcessError> {
        let parsed = ctx
            .parsed
            .clone()
            .unwrap_or_else(|| ParsedIntent::of(Intent::Balance));

        let Some(name) = parsed.name.as_deref() else {
            let response =
                "Please specify a contact name to check balance (e.g., 'Balance for Raju')"
                    .to_string();
            self.send(ctx, &response).await?;
            return Ok(ProcessOutcome { response, parsed });
        };

        let Some(contact) = self.contacts.resolve(&ctx.user.id, name).await? else {
            let response = format!("You don't have any records with {name} yet.");
            self.send(ctx, &response).await?;
            return Ok(ProcessOutcome { response, parsed });
        };

        let transactions = self.ledger.find_by_contact(&contact.id).await?;
        let recent = self
            .ledger
            .recent_three(TransactionFilter {
                user_id: Some(ctx.user.id.clone()),
                contact_id: Some(contact.id.clone()),
            })
            .await?;
        let balance = total_balance(&transactions);

        let history: Vec<String> = recent.iter().map(history_line).collect();
        let response = format!(
            "👤 *Customer Report: {}*\n\n\
             💰 *Current Balance:* {} {}\n\
             📉 *Recent History:*\n\n{}",
            contact.name,
            rupees(balance),
            balance_tag(balance),
            history.join("\n\n"),
        );
        self.send(ctx, &response).await?;
        Ok(ProcessOutcome { response, parsed })
    }
}
