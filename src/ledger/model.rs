//! Ledger domain types.
//!
//! Amounts are always positive `Decimal`s; direction lives in the intent.
//! CREDIT means value left the user (they gave/spent), DEBIT means value
//! arrived. A contact's `current_balance` is a cached derivation over their
//! non-deleted transactions, never patched incrementally.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Direction of a ledger entry, from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionIntent {
    /// Value left the user (gave, paid, lent, spent).
    Credit,
    /// Value arrived to the user (received, borrowed, earned).
    Debit,
}

impl TransactionIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionIntent::Credit => "CREDIT",
            TransactionIntent::Debit => "DEBIT",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CREDIT" => Some(TransactionIntent::Credit),
            "DEBIT" => Some(TransactionIntent::Debit),
            _ => None,
        }
    }
}

/// A messaging-channel identity. Keyed by phone number, created lazily on
/// first inbound message, never deleted.
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub phone_number: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A named counterparty in one user's contact book.
#[derive(Debug, Clone)]
pub struct Contact {
    pub id: String,
    pub user_id: String,
    pub name: String,
    /// Derived: Σ(CREDIT) − Σ(DEBIT) over non-deleted linked transactions.
    pub current_balance: Decimal,
    pub created_at: DateTime<Utc>,
}

/// A single ledger entry. Soft-deleted rows stay addressable by id but are
/// excluded from every balance, history, and summary computation.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub id: String,
    pub user_id: String,
    pub contact_id: Option<String>,
    pub amount: Decimal,
    pub intent: TransactionIntent,
    pub category: String,
    pub description: Option<String>,
    pub date: DateTime<Utc>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<String>,
    /// Id of the outbound message that announced this entry. Unique among
    /// non-deleted rows; correlates later replies back to the entry.
    pub confirmation_message_id: Option<String>,
}

/// Fields for creating a transaction.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub user_id: String,
    pub contact_id: Option<String>,
    pub amount: Decimal,
    pub intent: TransactionIntent,
    pub category: Option<String>,
    pub description: Option<String>,
}

/// Partial update; only present fields are applied.
#[derive(Debug, Clone, Default)]
pub struct TransactionUpdate {
    pub amount: Option<Decimal>,
    pub category: Option<String>,
    pub description: Option<String>,
}

impl TransactionUpdate {
    pub fn is_empty(&self) -> bool {
        self.amount.is_none() && self.category.is_none() && self.description.is_none()
    }
}

/// One calendar day of activity. `total_spend` and the breakdown cover
/// CREDIT entries only — money the user gave, not money received.
#[derive(Debug, Clone)]
pub struct DailySummary {
    pub transactions: Vec<Transaction>,
    pub total_spend: Decimal,
    pub category_breakdown: Vec<(String, Decimal)>,
}

/// Fold a transaction slice into a balance: +amount for CREDIT, −amount for
/// DEBIT. Callers pass non-deleted rows only.
pub fn total_balance(transactions: &[Transaction]) -> Decimal {
    let mut balance = Decimal::ZERO;
    for t in transactions {
        match t.intent {
            TransactionIntent::Credit => balance += t.amount,
            TransactionIntent::Debit => balance -= t.amount,
        }
    }
    balance
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn tx(amount: Decimal, intent: TransactionIntent) -> Transaction {
        Transaction {
            id: "t".into(),
            user_id: "u".into(),
            contact_id: None,
            amount,
            intent,
            category: "General".into(),
            description: None,
            date: Utc::now(),
            is_deleted: false,
            deleted_at: None,
            deleted_by: None,
            confirmation_message_id: None,
        }
    }

    #[test]
    fn balance_folds_credit_minus_debit() {
        let txs = vec![
            tx(dec!(500), TransactionIntent::Credit),
            tx(dec!(200), TransactionIntent::Debit),
            tx(dec!(50.25), TransactionIntent::Credit),
        ];
        assert_eq!(total_balance(&txs), dec!(350.25));
    }

    #[test]
    fn balance_of_empty_slice_is_zero() {
        assert_eq!(total_balance(&[]), Decimal::ZERO);
    }

    #[test]
    fn intent_round_trips_through_str() {
        assert_eq!(
            TransactionIntent::parse(TransactionIntent::Credit.as_str()),
            Some(TransactionIntent::Credit)
        );
        assert_eq!(
            TransactionIntent::parse(TransactionIntent::Debit.as_str()),
            Some(TransactionIntent::Debit)
        );
        assert_eq!(TransactionIntent::parse("TRANSFER"), None);
    }
}
