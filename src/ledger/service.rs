//! Transaction ledger — record CRUD plus derived-balance maintenance.
//!
//! Every mutation that touches a contact-linked transaction is followed by a
//! synchronous full recompute of that contact's cached balance: fetch all
//! non-deleted transactions, fold, persist. Full recompute over incremental
//! deltas keeps the invariant trivially correct at O(n) per mutation, which
//! is fine at per-contact volumes.
//!
//! The recompute is a read-then-write, so mutations on the same contact are
//! serialized through a per-contact async lock; different contacts still run
//! concurrently.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::DatabaseError;
use crate::ledger::model::{
    DailySummary, NewTransaction, Transaction, TransactionIntent, TransactionUpdate, total_balance,
};
use crate::store::{LedgerStore, TransactionFilter};

/// Record CRUD plus balance maintenance over a `LedgerStore`.
pub struct TransactionLedger {
    store: Arc<dyn LedgerStore>,
    contact_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl TransactionLedger {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            store,
            contact_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }

    async fn lock_for_contact(&self, contact_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.contact_locks.lock().await;
        Arc::clone(
            locks
                .entry(contact_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }

    /// Recompute and persist a contact's cached balance from scratch.
    async fn recompute_contact_balance(&self, contact_id: &str) -> Result<Decimal, DatabaseError> {
        let lock = self.lock_for_contact(contact_id).await;
        let _guard = lock.lock().await;

        let transactions = self.store.find_transactions_by_contact(contact_id).await?;
        let balance = total_balance(&transactions);
        self.store.set_contact_balance(contact_id, balance).await?;
        debug!(contact_id, %balance, "Recomputed contact balance");
        Ok(balance)
    }

    /// Persist a new entry, then bring the linked contact's balance up to
    /// date. Returns the stored transaction.
    pub async fn record(&self, new: NewTransaction) -> Result<Transaction, DatabaseError> {
        let tx = self.store.insert_transaction(new).await?;
        if let Some(ref contact_id) = tx.contact_id {
            self.recompute_contact_balance(contact_id).await?;
        }
        Ok(tx)
    }

    /// Apply only the provided fields, then recompute if contact-linked.
    pub async fn update(&self, id: &str, update: TransactionUpdate) -> Result<(), DatabaseError> {
        self.store.update_transaction(id, update).await?;
        if let Some(tx) = self.store.find_transaction_by_id(id).await?
            && let Some(ref contact_id) = tx.contact_id
        {
            self.recompute_contact_balance(contact_id).await?;
        }
        Ok(())
    }

    /// Soft-delete an entry and recompute the linked contact's balance.
    pub async fn soft_delete(
        &self,
        id: &str,
        deleted_by: Option<&str>,
    ) -> Result<(), DatabaseError> {
        self.store.mark_transaction_deleted(id, deleted_by).await?;
        if let Some(tx) = self.store.find_transaction_by_id(id).await?
            && let Some(ref contact_id) = tx.contact_id
        {
            self.recompute_contact_balance(contact_id).await?;
        }
        Ok(())
    }

    /// Soft-delete the user's most recent entry. Returns the deleted
    /// transaction, or `None` when the user has no live entries.
    pub async fn undo_last(&self, user_id: &str) -> Result<Option<Transaction>, DatabaseError> {
        let Some(last) = self.store.find_last_transaction(user_id).await? else {
            return Ok(None);
        };
        self.soft_delete(&last.id, Some(user_id)).await?;
        Ok(Some(last))
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Transaction>, DatabaseError> {
        self.store.find_transaction_by_id(id).await
    }

    pub async fn find_by_contact(
        &self,
        contact_id: &str,
    ) -> Result<Vec<Transaction>, DatabaseError> {
        self.store.find_transactions_by_contact(contact_id).await
    }

    pub async fn find_last_by_user(
        &self,
        user_id: &str,
    ) -> Result<Option<Transaction>, DatabaseError> {
        self.store.find_last_transaction(user_id).await
    }

    /// Newest three non-deleted entries, for recent-history display.
    pub async fn recent_three(
        &self,
        filter: TransactionFilter,
    ) -> Result<Vec<Transaction>, DatabaseError> {
        self.store.find_recent_transactions(filter, 3).await
    }

    pub async fn find_by_confirmation_id(
        &self,
        message_id: &str,
    ) -> Result<Option<Transaction>, DatabaseError> {
        self.store.find_transaction_by_confirmation_id(message_id).await
    }

    /// Close the reply-correlation loop: link the outbound confirmation
    /// message id onto the transaction it announced.
    pub async fn set_confirmation_message_id(
        &self,
        transaction_id: &str,
        message_id: &str,
    ) -> Result<(), DatabaseError> {
        self.store
            .set_confirmation_message_id(transaction_id, message_id)
            .await
    }

    /// Aggregate one calendar day `[00:00:00.000, 23:59:59.999]`. Spend and
    /// the category breakdown sum CREDIT entries only — DEBIT is money
    /// received, not spend.
    pub async fn daily_summary(
        &self,
        user_id: &str,
        date: DateTime<Utc>,
    ) -> Result<DailySummary, DatabaseError> {
        let day = date.date_naive();
        let start = day.and_hms_milli_opt(0, 0, 0, 0).unwrap_or_default().and_utc();
        let end = day
            .and_hms_milli_opt(23, 59, 59, 999)
            .unwrap_or_default()
            .and_utc();

        let transactions = self
            .store
            .find_transactions_in_range(user_id, start, end)
            .await?;

        let mut total_spend = Decimal::ZERO;
        let mut breakdown: Vec<(String, Decimal)> = Vec::new();
        for tx in &transactions {
            if tx.intent != TransactionIntent::Credit {
                continue;
            }
            total_spend += tx.amount;
            match breakdown.iter_mut().find(|(c, _)| *c == tx.category) {
                Some((_, sum)) => *sum += tx.amount,
                None => breakdown.push((tx.category.clone(), tx.amount)),
            }
        }

        Ok(DailySummary {
            transactions,
            total_spend,
            category_breakdown: breakdown,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    use crate::store::LibSqlStore;

    struct Fixture {
        ledger: TransactionLedger,
        store: Arc<dyn LedgerStore>,
        user_id: String,
        contact_id: String,
    }

    async fn fixture() -> Fixture {
        let store: Arc<dyn LedgerStore> = Arc::new(LibSqlStore::new_memory().await.unwrap());
        let user = store.create_user("1", None).await.unwrap();
        let contact = store.create_contact(&user.id, "Raju").await.unwrap();
        Fixture {
            ledger: TransactionLedger::new(Arc::clone(&store)),
            store,
            user_id: user.id,
            contact_id: contact.id,
        }
    }

    fn entry(f: &Fixture, amount: Decimal, intent: TransactionIntent) -> NewTransaction {
        NewTransaction {
            user_id: f.user_id.clone(),
            contact_id: Some(f.contact_id.clone()),
            amount,
            intent,
            category: None,
            description: None,
        }
    }

    async fn cached_balance(f: &Fixture) -> Decimal {
        f.store
            .find_contact_by_id(&f.contact_id)
            .await
            .unwrap()
            .unwrap()
            .current_balance
    }

    #[tokio::test]
    async fn record_recomputes_contact_balance() {
        let f = fixture().await;
        f.ledger
            .record(entry(&f, dec!(500), TransactionIntent::Credit))
            .await
            .unwrap();
        assert_eq!(cached_balance(&f).await, dec!(500));

        f.ledger
            .record(entry(&f, dec!(200), TransactionIntent::Debit))
            .await
            .unwrap();
        assert_eq!(cached_balance(&f).await, dec!(300));
    }

    #[tokio::test]
    async fn delete_then_balance_round_trips() {
        let f = fixture().await;
        f.ledger
            .record(entry(&f, dec!(100), TransactionIntent::Credit))
            .await
            .unwrap();
        let before = cached_balance(&f).await;

        let tx = f
            .ledger
            .record(entry(&f, dec!(75), TransactionIntent::Credit))
            .await
            .unwrap();
        assert_eq!(cached_balance(&f).await, dec!(175));

        f.ledger.soft_delete(&tx.id, None).await.unwrap();
        assert_eq!(cached_balance(&f).await, before);
    }

    #[tokio::test]
    async fn amount_update_recomputes() {
        let f = fixture().await;
        let tx = f
            .ledger
            .record(entry(&f, dec!(500), TransactionIntent::Credit))
            .await
            .unwrap();

        f.ledger
            .update(
                &tx.id,
                TransactionUpdate {
                    amount: Some(dec!(600)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(cached_balance(&f).await, dec!(600));
    }

    #[tokio::test]
    async fn category_update_leaves_balance() {
        let f = fixture().await;
        let tx = f
            .ledger
            .record(entry(&f, dec!(500), TransactionIntent::Credit))
            .await
            .unwrap();

        f.ledger
            .update(
                &tx.id,
                TransactionUpdate {
                    category: Some("Food".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(cached_balance(&f).await, dec!(500));
        let loaded = f.ledger.find_by_id(&tx.id).await.unwrap().unwrap();
        assert_eq!(loaded.category, "Food");
    }

    #[tokio::test]
    async fn undo_last_picks_newest_and_returns_none_when_empty() {
        let f = fixture().await;
        assert!(f.ledger.undo_last(&f.user_id).await.unwrap().is_none());

        f.ledger
            .record(entry(&f, dec!(10), TransactionIntent::Credit))
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        f.ledger
            .record(entry(&f, dec!(20), TransactionIntent::Credit))
            .await
            .unwrap();

        let deleted = f.ledger.undo_last(&f.user_id).await.unwrap().unwrap();
        assert_eq!(deleted.amount, dec!(20));
        assert_eq!(cached_balance(&f).await, dec!(10));
    }

    #[tokio::test]
    async fn daily_summary_counts_credit_only() {
        let f = fixture().await;
        f.ledger
            .record(NewTransaction {
                category: Some("Food".to_string()),
                ..entry(&f, dec!(120), TransactionIntent::Credit)
            })
            .await
            .unwrap();
        f.ledger
            .record(NewTransaction {
                category: Some("Food".to_string()),
                ..entry(&f, dec!(80), TransactionIntent::Credit)
            })
            .await
            .unwrap();
        f.ledger
            .record(entry(&f, dec!(999), TransactionIntent::Debit))
            .await
            .unwrap();

        let summary = f.ledger.daily_summary(&f.user_id, Utc::now()).await.unwrap();
        assert_eq!(summary.total_spend, dec!(200));
        assert_eq!(summary.transactions.len(), 3);
        assert_eq!(summary.category_breakdown, vec![("Food".to_string(), dec!(200))]);
    }

    #[tokio::test]
    async fn concurrent_records_keep_invariant() {
        let f = fixture().await;
        let ledger = Arc::new(f.ledger);
        let mut handles = Vec::new();
        for _ in 0..8 {
            let ledger = Arc::clone(&ledger);
            let new = NewTransaction {
                user_id: f.user_id.clone(),
                contact_id: Some(f.contact_id.clone()),
                amount: dec!(10),
                intent: TransactionIntent::Credit,
                category: None,
                description: None,
            };
            handles.push(tokio::spawn(async move { ledger.record(new).await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let cached = f
            .store
            .find_contact_by_id(&f.contact_id)
            .await
            .unwrap()
            .unwrap()
            .current_balance;
        assert_eq!(cached, dec!(80));
    }
}
