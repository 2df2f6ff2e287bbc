//! Processing context shared by the orchestrator and processors.

use crate::classifier::types::ParsedIntent;
use crate::ledger::model::{Transaction, User};

/// The inbound message body, already lifted out of the webhook payload.
/// Button taps keep their payload id and label separate from free text so
/// processors never have to guess which one they are looking at.
#[derive(Debug, Clone)]
pub enum MessageBody {
    Text(String),
    Button { id: String, title: String },
}

impl MessageBody {
    /// The text a processor should match against: the body for text
    /// messages, the payload id for button taps.
    pub fn text(&self) -> &str {
        match self {
            MessageBody::Text(body) => body,
            MessageBody::Button { id, .. } => id,
        }
    }

    pub fn is_button(&self) -> bool {
        matches!(self, MessageBody::Button { .. })
    }
}

/// Everything a processor may need to act on one message. `parsed` is
/// `None` during the pre-classification pass.
#[derive(Debug, Clone)]
pub struct ProcessContext {
    pub user: User,
    pub body: MessageBody,
    pub reply_to_message_id: Option<String>,
    /// The transaction the user is replying to, resolved via the
    /// confirmation-message-id correlation.
    pub reply_transaction: Option<Transaction>,
    pub parsed: Option<ParsedIntent>,
}

/// The result of processing one message: what was said back, and the
/// classification that drove it.
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub response: String,
    pub parsed: ParsedIntent,
}
