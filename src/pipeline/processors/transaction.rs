//! Records a classified CREDIT or DEBIT entry.
//!
//! After sending the confirmation message, its provider id is written back
//! onto the transaction; that id is what later replies correlate against.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::info;

use crate::classifier::types::{Intent, ParsedIntent};
use crate::error::ProcessError;
use crate::ledger::model::{NewTransaction, TransactionIntent};
use crate::ledger::{ContactResolver, TransactionLedger};
use crate::messenger::Messenger;
use crate::pipeline::processors::{balance_tag, rupees};
use crate::pipeline::router::Processor;
use crate::pipeline::types::{ProcessContext, ProcessOutcome};

pub struct TransactionProcessor {
    ledger: Arc<TransactionLedger>,
    contacts: Arc<ContactResolver>,
    messenger: Arc<dyn Messenger>,
}

impl TransactionProcessor {
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
}

#[async_trait]
impl Processor for TransactionProcessor {
    fn name(&self) -> &'static str {
        "transaction"
    }

    fn can_handle(&self, ctx: &ProcessContext) -> bool {
        ctx.parsed
            .as_ref()
            .is_some_and(|p| p.intent.as_transaction_intent().is_some())
    }

    async fn process(&self, ctx: &ProcessContext) -> Result<ProcessOutcome, ProcessError> {
        let parsed = ctx
            .parsed
            .clone()
            .unwrap_or_else(|| ParsedIntent::of(Intent::Credit));
        let intent = parsed
            .intent
            .as_transaction_intent()
            .ok_or(ProcessError::UnsupportedIntent(parsed.intent))?;
        let amount = parsed.amount.ok_or(ProcessError::MissingAmount)?;

        let mut contact = None;
        if let Some(ref name) = parsed.name {
            contact = Some(self.contacts.find_or_create(&ctx.user.id, name).await?);
        }

        let transaction = self
            .ledger
            .record(NewTransaction {
                user_id: ctx.user.id.clone(),
                contact_id: contact.as_ref().map(|c| c.id.clone()),
                amount,
                intent,
                category: parsed.category.clone(),
                description: parsed
                    .description
                    .clone()
                    .or_else(|| parsed.category.clone()),
            })
            .await?;
        info!(
            transaction_id = %transaction.id,
            user_id = %ctx.user.id,
            intent = intent.as_str(),
            %amount,
            "Recorded transaction"
        );

        // Re-read after the recompute so the reported balance includes this
        // entry.
        let mut new_balance = Decimal::ZERO;
        if let Some(ref contact) = contact
            && let Some(updated) = self.ledger.store().find_contact_by_id(&contact.id).await?
        {
            new_balance = updated.current_balance;
        }

        let (direction, party) = match intent {
            TransactionIntent::Credit => ("🔻 *Gave:*", "To"),
            TransactionIntent::Debit => ("🟩 *Received:*", "From"),
        };
        let response = format!(
            "✅ *Entry Added*\n\n\
             {direction} {}\n\
             👤 {party}: {}\n\
             📝 *Note:* {}\n\n\
             💰 *New Balance:* {} {}\n\n\
             _Add more entries or ask for your balance anytime!_",
            rupees(transaction.amount),
            contact.as_ref().map(|c| c.name.as_str()).unwrap_or("Unknown"),
            transaction.description.as_deref().unwrap_or("None"),
            rupees(new_balance),
            balance_tag(new_balance),
        );

        let message_id = self
            .messenger
            .send_message(&ctx.user.phone_number, &response)
            .await?;
        self.ledger
            .set_confirmation_message_id(&transaction.id, &message_id)
            .await?;

        Ok(ProcessOutcome { response, parsed })
    }
}
