//! Per-message orchestration: user resolution, reply correlation, quick
//! replies, the two router passes, and classification in between.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::classifier::types::{Intent, ParsedIntent};
use crate::classifier::FallbackParser;
use crate::error::{Error, ProcessError};
use crate::ledger::model::User;
use crate::ledger::TransactionLedger;
use crate::messenger::Messenger;
use crate::pipeline::router::ProcessorRouter;
use crate::pipeline::types::{MessageBody, ProcessContext, ProcessOutcome};

/// One inbound message, lifted out of the webhook payload.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub sender_phone: String,
    pub sender_name: Option<String>,
    pub body: MessageBody,
    pub reply_to_message_id: Option<String>,
}

/// Static keyword shortcuts, checked before any classification.
pub fn default_quick_replies() -> HashMap<String, String> {
    HashMap::from([
        ("ping".to_string(), "pong".to_string()),
        ("hello".to_string(), "Hi there! 👋".to_string()),
        (
            "help".to_string(),
            "Tell me things like 'Gave 500 to Raju', ask 'Balance for Raju', \
             or say 'undo' to remove the last entry."
                .to_string(),
        ),
    ])
}

pub struct ConversationOrchestrator {
    ledger: Arc<TransactionLedger>,
    classifier: Arc<FallbackParser>,
    messenger: Arc<dyn Messenger>,
    router: ProcessorRouter,
    quick_replies: HashMap<String, String>,
}

impl ConversationOrchestrator {
    pub fn new(
        ledger: Arc<TransactionLedger>,
        classifier: Arc<FallbackParser>,
        messenger: Arc<dyn Messenger>,
        router: ProcessorRouter,
        quick_replies: HashMap<String, String>,
    ) -> Self {
        Self {
            ledger,
            classifier,
            messenger,
            router,
            quick_replies,
        }
    }

    async fn ensure_user(&self, phone: &str, name: Option<&str>) -> Result<User, Error> {
        if let Some(existing) = self.ledger.store().find_user_by_phone(phone).await? {
            return Ok(existing);
        }
        info!(phone, "Creating new user");
        Ok(self.ledger.store().create_user(phone, name).await?)
    }

    /// Process one message end to end, producing exactly one outbound
    /// response (or a terminal error).
    pub async fn execute(&self, message: IncomingMessage) -> Result<ProcessOutcome, Error> {
        let user = self
            .ensure_user(&message.sender_phone, message.sender_name.as_deref())
            .await?;

        let mut reply_transaction = None;
        if let Some(ref reply_id) = message.reply_to_message_id {
            reply_transaction = self.ledger.find_by_confirmation_id(reply_id).await?;
            debug!(
                reply_id,
                correlated = reply_transaction.is_some(),
                "Reply correlation lookup"
            );
        }

        // Keyword shortcuts never reach the classifier.
        if !message.body.is_button() {
            let normalized = message.body.text().trim().to_lowercase();
            if let Some(reply) = self.quick_replies.get(&normalized) {
                self.messenger
                    .send_message(&user.phone_number, reply)
                    .await
                    .map_err(ProcessError::from)?;
                return Ok(ProcessOutcome {
                    response: reply.clone(),
                    parsed: ParsedIntent::with_notes(
                        Intent::QuickReply,
                        format!("Quick reply for keyword: {normalized}"),
                    ),
                });
            }
        }

        let mut ctx = ProcessContext {
            user,
            body: message.body,
            reply_to_message_id: message.reply_to_message_id,
            reply_transaction,
            parsed: None,
        };

        if let Some(outcome) = self.router.dispatch_unclassified(&ctx).await? {
            return Ok(outcome);
        }

        let parsed = self
            .classifier
            .classify(ctx.body.text(), ctx.reply_transaction.as_ref())
            .await;
        debug!(intent = ?parsed.intent, "Classified message");
        ctx.parsed = Some(parsed);

        Ok(self.router.dispatch(&ctx).await?)
    }
}
