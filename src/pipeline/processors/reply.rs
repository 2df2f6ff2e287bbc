//! Replies to a recorded transaction: delete requests and field updates.
//!
//! Runs in both passes. Before classification it claims replies whose text
//! matches simple delete/update phrasing against the correlated
//! transaction. After classification it claims any `UPDATE_TRANSACTION`,
//! with or without reply correlation (falling back to the user's most
//! recent entry).
//!
//! Delete is two-phase: this processor only asks for confirmation, with the
//! transaction id embedded in the button payloads. The actual soft delete
//! happens in the confirmation processor when the button tap comes back.

use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;

use crate::classifier::types::{Intent, ParsedIntent};
use crate::error::ProcessError;
use crate::ledger::model::{Transaction, TransactionUpdate};
use crate::ledger::TransactionLedger;
use crate::messenger::{Button, Messenger};
use crate::pipeline::processors::confirmation::{CANCEL_PREFIX, CONFIRM_PREFIX};
use crate::pipeline::processors::rupees;
use crate::pipeline::router::Processor;
use crate::pipeline::types::{ProcessContext, ProcessOutcome};

pub struct ReplyProcessor {
    ledger: Arc<TransactionLedger>,
    messenger: Arc<dyn Messenger>,
    category_pattern: Regex,
}

fn is_delete_phrase(lower: &str) -> bool {
    lower.contains("delete") || lower.contains("remove") || lower.contains("undo")
}

impl ReplyProcessor {
    pub fn new(ledger: Arc<TransactionLedger>, messenger: Arc<dyn Messenger>) -> Self {
        Self {
            ledger,
            messenger,
            // Legacy text pattern, kept so the flow works when
            // classification is degraded.
            category_pattern: Regex::new(r"(?i)update category to\s+(.+)").expect("valid pattern"),
        }
    }

    async fn send(&self, ctx: &ProcessContext, body: &str) -> Result<(), ProcessError> {
        self.messenger
            .send_message(&ctx.user.phone_number, body)
            .await?;
        Ok(())
    }

    async fn request_delete_confirmation(
        &self,
        ctx: &ProcessContext,
        tx: &Transaction,
    ) -> Result<ProcessOutcome, ProcessError> {
        let response = format!(
            "⚠️ Are you sure you want to delete this transaction?\n\n{} ({})",
            rupees(tx.amount),
            tx.intent.as_str(),
        );
        self.messenger
            .send_interactive_message(
                &ctx.user.phone_number,
                &response,
                &[
                    Button::new(format!("{CONFIRM_PREFIX}{}", tx.id), "Delete"),
                    Button::new(format!("{CANCEL_PREFIX}{}", tx.id), "Cancel"),
                ],
            )
            .await?;
        Ok(ProcessOutcome {
            response,
            parsed: ParsedIntent::with_notes(Intent::Undo, "Requested delete confirmation"),
        })
    }

    async fn apply_parsed_update(
        &self,
        ctx: &ProcessContext,
        tx: &Transaction,
        parsed: &ParsedIntent,
    ) -> Result<Option<ProcessOutcome>, ProcessError> {
        let Some(fields) = parsed.updated_fields.as_ref().filter(|f| !f.is_empty()) else {
            return Ok(None);
        };

        // A category change implies a description change unless one was
        // given explicitly.
        let description = fields
            .description
            .clone()
            .or_else(|| fields.category.clone());
        let update = TransactionUpdate {
            amount: fields.amount,
            category: fields.category.clone(),
            description,
        };
        if update.is_empty() {
            return Ok(None);
        }
        self.ledger.update(&tx.id, update.clone()).await?;

        let mut response = "✅ *Transaction Updated*\n".to_string();
        if let Some(amount) = update.amount {
            response.push_str(&format!("Amount: {amount}\n"));
        }
        if let Some(ref category) = update.category {
            response.push_str(&format!("Category: {category}\n"));
        }
        if let Some(ref description) = update.description {
            response.push_str(&format!("Description: {description}\n"));
        }
        self.send(ctx, &response).await?;
        Ok(Some(ProcessOutcome {
            response,
            parsed: parsed.clone(),
        }))
    }

    async fn apply_legacy_category_update(
        &self,
        ctx: &ProcessContext,
        tx: &Transaction,
        text: &str,
    ) -> Result<Option<ProcessOutcome>, ProcessError> {
        let Some(new_category) = self
            .category_pattern
            .captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|c| !c.is_empty())
        else {
            return Ok(None);
        };

        self.ledger
            .update(
                &tx.id,
                TransactionUpdate {
                    category: Some(new_category.clone()),
                    ..Default::default()
                },
            )
            .await?;

        let response = format!("✅ *Category Updated*\n\nNew Category: {new_category}");
        self.send(ctx, &response).await?;

        let mut parsed =
            ParsedIntent::with_notes(Intent::UpdateTransaction, format!("Updated category to {new_category}"));
        parsed.updated_fields = Some(crate::classifier::types::UpdatedFields {
            category: Some(new_category),
            ..Default::default()
        });
        Ok(Some(ProcessOutcome { response, parsed }))
    }
}

#[async_trait]
impl Processor for ReplyProcessor {
    fn name(&self) -> &'static str {
        "reply"
    }

    fn handles_unclassified(&self) -> bool {
        true
    }

    fn can_handle(&self, ctx: &ProcessContext) -> bool {
        if let Some(parsed) = &ctx.parsed {
            return parsed.intent == Intent::UpdateTransaction;
        }

        if ctx.reply_transaction.is_some() && !ctx.body.is_button() {
            let lower = ctx.body.text().to_lowercase();
            return is_delete_phrase(&lower) || lower.contains("update category to");
        }
        false
    }

    async fn process(&self, ctx: &ProcessContext) -> Result<ProcessOutcome, ProcessError> {
        let is_update_intent = ctx
            .parsed
            .as_ref()
            .is_some_and(|p| p.intent == Intent::UpdateTransaction);

        let mut target = ctx.reply_transaction.clone();
        if target.is_none() && is_update_intent {
            target = self.ledger.find_last_by_user(&ctx.user.id).await?;
            if target.is_none() {
                let response = "I couldn't find any recent transaction to update. \
                                Please create a new transaction first."
                    .to_string();
                self.send(ctx, &response).await?;
                return Ok(ProcessOutcome {
                    response,
                    parsed: ctx
                        .parsed
                        .clone()
                        .unwrap_or_else(|| ParsedIntent::of(Intent::UpdateTransaction)),
                });
            }
        }

        let Some(tx) = target else {
            let response = "Please reply to the specific transaction you want to update.".to_string();
            self.send(ctx, &response).await?;
            return Ok(ProcessOutcome {
                response,
                parsed: ctx.parsed.clone().unwrap_or_else(|| ParsedIntent::of(Intent::Start)),
            });
        };

        let text = ctx.body.text();
        let lower = text.to_lowercase();

        if is_delete_phrase(&lower) {
            return self.request_delete_confirmation(ctx, &tx).await;
        }

        if is_update_intent
            && let Some(parsed) = &ctx.parsed
            && let Some(outcome) = self.apply_parsed_update(ctx, &tx, parsed).await?
        {
            return Ok(outcome);
        }

        if let Some(outcome) = self.apply_legacy_category_update(ctx, &tx, text).await? {
            return Ok(outcome);
        }

        let response = "❓ I see you replied to a transaction, but I didn't understand. \
                        Try 'delete' or 'update category to [name]'."
            .to_string();
        self.send(ctx, &response).await?;
        Ok(ProcessOutcome {
            response,
            parsed: ParsedIntent::with_notes(Intent::Start, "Unknown reply intent"),
        })
    }
}
