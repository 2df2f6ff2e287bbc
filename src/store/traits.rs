//! `LedgerStore` — single async interface for all persistence.
//!
//! Exposes exactly the operations the core pipeline needs: user and contact
//! lookup/creation, transaction CRUD (soft delete only), confirmation-id
//! correlation, and processed-message markers. Balance recomputation and
//! daily aggregation live above this trait in `ledger::service`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::error::DatabaseError;
use crate::ledger::model::{Contact, NewTransaction, Transaction, TransactionUpdate, User};

/// Filter for recent-history queries. Both fields optional; set fields are
/// ANDed together.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub user_id: Option<String>,
    pub contact_id: Option<String>,
}

/// Backend-agnostic persistence trait for the ledger engine.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Run all pending schema migrations.
    async fn run_migrations(&self) -> Result<(), DatabaseError>;

    // ── Users ───────────────────────────────────────────────────────

    async fn find_user_by_phone(&self, phone: &str) -> Result<Option<User>, DatabaseError>;

    async fn create_user(&self, phone: &str, name: Option<&str>) -> Result<User, DatabaseError>;

    // ── Contacts ────────────────────────────────────────────────────

    /// Exact lookup on the (user, normalized name) unique pair.
    async fn find_contact_by_name(
        &self,
        user_id: &str,
        name: &str,
    ) -> Result<Option<Contact>, DatabaseError>;

    async fn find_contact_by_id(&self, id: &str) -> Result<Option<Contact>, DatabaseError>;

    async fn find_contacts_by_user(&self, user_id: &str) -> Result<Vec<Contact>, DatabaseError>;

    async fn create_contact(&self, user_id: &str, name: &str) -> Result<Contact, DatabaseError>;

    /// Overwrite a contact's cached derived balance.
    async fn set_contact_balance(
        &self,
        contact_id: &str,
        balance: Decimal,
    ) -> Result<(), DatabaseError>;

    // ── Transactions ────────────────────────────────────────────────

    async fn insert_transaction(&self, new: NewTransaction) -> Result<Transaction, DatabaseError>;

    /// Lookup by id, including soft-deleted rows (they stay addressable).
    async fn find_transaction_by_id(
        &self,
        id: &str,
    ) -> Result<Option<Transaction>, DatabaseError>;

    /// Non-deleted transactions for a user, newest first.
    async fn find_transactions_by_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<Transaction>, DatabaseError>;

    /// Non-deleted transactions for a contact, newest first.
    async fn find_transactions_by_contact(
        &self,
        contact_id: &str,
    ) -> Result<Vec<Transaction>, DatabaseError>;

    /// Newest `limit` non-deleted transactions matching the filter.
    async fn find_recent_transactions(
        &self,
        filter: TransactionFilter,
        limit: usize,
    ) -> Result<Vec<Transaction>, DatabaseError>;

    /// Non-deleted transactions for a user within `[start, end]`, newest first.
    async fn find_transactions_in_range(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Transaction>, DatabaseError>;

    /// The newest non-deleted transaction for a user, if any.
    async fn find_last_transaction(
        &self,
        user_id: &str,
    ) -> Result<Option<Transaction>, DatabaseError>;

    /// Correlation lookup: the non-deleted transaction announced by the
    /// given outbound message id.
    async fn find_transaction_by_confirmation_id(
        &self,
        message_id: &str,
    ) -> Result<Option<Transaction>, DatabaseError>;

    /// Apply only the provided fields (amount/category/description).
    async fn update_transaction(
        &self,
        id: &str,
        update: TransactionUpdate,
    ) -> Result<(), DatabaseError>;

    /// Soft-delete: set `is_deleted`, `deleted_at`, optionally `deleted_by`.
    /// Never a physical removal.
    async fn mark_transaction_deleted(
        &self,
        id: &str,
        deleted_by: Option<&str>,
    ) -> Result<(), DatabaseError>;

    /// Link the outbound confirmation message back onto the transaction.
    async fn set_confirmation_message_id(
        &self,
        transaction_id: &str,
        message_id: &str,
    ) -> Result<(), DatabaseError>;

    // ── Processed-message markers ───────────────────────────────────

    async fn marker_exists(&self, message_id: &str) -> Result<bool, DatabaseError>;

    async fn insert_marker(&self, message_id: &str) -> Result<(), DatabaseError>;
}
