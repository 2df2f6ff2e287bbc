//! Classification result types. Transient — never persisted.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ledger::model::TransactionIntent;

/// The classified purpose of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    /// User gave/spent money; requires an amount.
    Credit,
    /// User received money; requires an amount.
    Debit,
    /// Balance inquiry, optionally scoped to a named contact.
    Balance,
    /// Delete the most recent transaction.
    Undo,
    /// Modify a referenced transaction.
    UpdateTransaction,
    /// Aggregate today's CREDIT entries by category.
    ViewDailySummary,
    /// Conversational, non-ledger.
    Chat,
    /// Analytical question about the ledger.
    Query,
    /// Literal "start" onboarding keyword; classified without a backend.
    Start,
    /// Static keyword shortcut; classified without a backend.
    QuickReply,
}

impl Intent {
    pub fn as_transaction_intent(&self) -> Option<TransactionIntent> {
        match self {
            Intent::Credit => Some(TransactionIntent::Credit),
            Intent::Debit => Some(TransactionIntent::Debit),
            _ => None,
        }
    }
}

/// What an analytical query is asking for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueryKind {
    TotalSpend,
    TotalIncome,
    NetBalance,
    TransactionHistory,
}

/// The time window an analytical query covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueryPeriod {
    Today,
    ThisWeek,
    ThisMonth,
    AllTime,
}

/// Structured details for `Intent::Query`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryDetails {
    pub kind: Option<QueryKind>,
    pub period: Option<QueryPeriod>,
    pub category: Option<String>,
}

/// Fields to apply for `Intent::UpdateTransaction`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatedFields {
    pub amount: Option<Decimal>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub name: Option<String>,
}

impl UpdatedFields {
    pub fn is_empty(&self) -> bool {
        self.amount.is_none()
            && self.category.is_none()
            && self.description.is_none()
            && self.name.is_none()
    }
}

/// The full classification result handed to the processor router.
#[derive(Debug, Clone)]
pub struct ParsedIntent {
    pub intent: Intent,
    pub amount: Option<Decimal>,
    pub name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub conversational_response: Option<String>,
    pub query_details: Option<QueryDetails>,
    pub updated_fields: Option<UpdatedFields>,
}

impl ParsedIntent {
    /// A bare result carrying only an intent tag.
    pub fn of(intent: Intent) -> Self {
        Self {
            intent,
            amount: None,
            name: None,
            category: None,
            description: None,
            notes: None,
            conversational_response: None,
            query_details: None,
            updated_fields: None,
        }
    }

    pub fn with_notes(intent: Intent, notes: impl Into<String>) -> Self {
        let mut parsed = Self::of(intent);
        parsed.notes = Some(notes.into());
        parsed
    }

    /// The degraded neutral result returned when every backend fails.
    /// Classification failure must never abort the conversation.
    pub fn degraded() -> Self {
        Self {
            intent: Intent::Balance,
            amount: Some(Decimal::ZERO),
            name: Some("Unknown".to_string()),
            category: Some("Error".to_string()),
            description: None,
            notes: None,
            conversational_response: None,
            query_details: None,
            updated_fields: None,
        }
    }
}
