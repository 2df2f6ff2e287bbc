//! libSQL backend — async `LedgerStore` implementation.
//!
//! Supports local file and in-memory databases. Decimals are stored as TEXT
//! and timestamps as RFC 3339 strings.

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::ledger::model::{
    Contact, NewTransaction, Transaction, TransactionIntent, TransactionUpdate, User,
};
use crate::store::migrations;
use crate::store::traits::{LedgerStore, TransactionFilter};

/// libSQL ledger store.
///
/// Holds a single connection reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlStore {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Connection(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Connection(format!("Failed to open database: {e}")))?;
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Connection(format!("Failed to create connection: {e}")))?;

        let store = Self {
            db: Arc::new(db),
            conn,
        };
        store.run_migrations().await?;
        info!(path = %path.display(), "Database opened");
        Ok(store)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Connection(format!("Failed to create in-memory database: {e}"))
            })?;
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Connection(format!("Failed to create connection: {e}")))?;

        let store = Self {
            db: Arc::new(db),
            conn,
        };
        store.run_migrations().await?;
        Ok(store)
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }
}

// ── Row mapping helpers ─────────────────────────────────────────────

fn query_err(e: libsql::Error) -> DatabaseError {
    DatabaseError::Query(e.to_string())
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::Decode(format!("bad datetime '{s}': {e}")))
}

fn parse_decimal(s: &str) -> Result<Decimal, DatabaseError> {
    Decimal::from_str(s).map_err(|e| DatabaseError::Decode(format!("bad decimal '{s}': {e}")))
}

fn parse_intent(s: &str) -> Result<TransactionIntent, DatabaseError> {
    TransactionIntent::parse(s)
        .ok_or_else(|| DatabaseError::Decode(format!("bad transaction intent '{s}'")))
}

/// Column order: id, phone_number, name, created_at.
fn row_to_user(row: &libsql::Row) -> Result<User, DatabaseError> {
    Ok(User {
        id: row.get(0).map_err(query_err)?,
        phone_number: row.get(1).map_err(query_err)?,
        name: row.get(2).map_err(query_err)?,
        created_at: parse_datetime(&row.get::<String>(3).map_err(query_err)?)?,
    })
}

/// Column order: id, user_id, name, current_balance, created_at.
fn row_to_contact(row: &libsql::Row) -> Result<Contact, DatabaseError> {
    Ok(Contact {
        id: row.get(0).map_err(query_err)?,
        user_id: row.get(1).map_err(query_err)?,
        name: row.get(2).map_err(query_err)?,
        current_balance: parse_decimal(&row.get::<String>(3).map_err(query_err)?)?,
        created_at: parse_datetime(&row.get::<String>(4).map_err(query_err)?)?,
    })
}

const TX_COLUMNS: &str = "id, user_id, contact_id, amount, intent, category, description, \
                          date, is_deleted, deleted_at, deleted_by, confirmation_message_id";

/// Column order matches `TX_COLUMNS`.
fn row_to_transaction(row: &libsql::Row) -> Result<Transaction, DatabaseError> {
    let deleted_at: Option<String> = row.get(9).map_err(query_err)?;
    Ok(Transaction {
        id: row.get(0).map_err(query_err)?,
        user_id: row.get(1).map_err(query_err)?,
        contact_id: row.get(2).map_err(query_err)?,
        amount: parse_decimal(&row.get::<String>(3).map_err(query_err)?)?,
        intent: parse_intent(&row.get::<String>(4).map_err(query_err)?)?,
        category: row.get(5).map_err(query_err)?,
        description: row.get(6).map_err(query_err)?,
        date: parse_datetime(&row.get::<String>(7).map_err(query_err)?)?,
        is_deleted: row.get::<i64>(8).map_err(query_err)? != 0,
        deleted_at: deleted_at.as_deref().map(parse_datetime).transpose()?,
        deleted_by: row.get(10).map_err(query_err)?,
        confirmation_message_id: row.get(11).map_err(query_err)?,
    })
}

async fn collect_transactions(mut rows: libsql::Rows) -> Result<Vec<Transaction>, DatabaseError> {
    let mut out = Vec::new();
    while let Some(row) = rows.next().await.map_err(query_err)? {
        out.push(row_to_transaction(&row)?);
    }
    Ok(out)
}

#[async_trait]
impl LedgerStore for LibSqlStore {
    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(self.conn()).await
    }

    // ── Users ───────────────────────────────────────────────────────

    async fn find_user_by_phone(&self, phone: &str) -> Result<Option<User>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT id, phone_number, name, created_at FROM users WHERE phone_number = ?1",
                params![phone],
            )
            .await
            .map_err(query_err)?;
        match rows.next().await.map_err(query_err)? {
            Some(row) => Ok(Some(row_to_user(&row)?)),
            None => Ok(None),
        }
    }

    async fn create_user(&self, phone: &str, name: Option<&str>) -> Result<User, DatabaseError> {
        let user = User {
            id: Uuid::new_v4().to_string(),
            phone_number: phone.to_string(),
            name: name.map(String::from),
            created_at: Utc::now(),
        };
        self.conn()
            .execute(
                "INSERT INTO users (id, phone_number, name, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![
                    user.id.clone(),
                    user.phone_number.clone(),
                    user.name.clone(),
                    user.created_at.to_rfc3339()
                ],
            )
            .await
            .map_err(query_err)?;
        Ok(user)
    }

    // ── Contacts ────────────────────────────────────────────────────

    async fn find_contact_by_name(
        &self,
        user_id: &str,
        name: &str,
    ) -> Result<Option<Contact>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT id, user_id, name, current_balance, created_at FROM contacts \
                 WHERE user_id = ?1 AND name = ?2",
                params![user_id, name],
            )
            .await
            .map_err(query_err)?;
        match rows.next().await.map_err(query_err)? {
            Some(row) => Ok(Some(row_to_contact(&row)?)),
            None => Ok(None),
        }
    }

    async fn find_contact_by_id(&self, id: &str) -> Result<Option<Contact>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT id, user_id, name, current_balance, created_at FROM contacts \
                 WHERE id = ?1",
                params![id],
            )
            .await
            .map_err(query_err)?;
        match rows.next().await.map_err(query_err)? {
            Some(row) => Ok(Some(row_to_contact(&row)?)),
            None => Ok(None),
        }
    }

    async fn find_contacts_by_user(&self, user_id: &str) -> Result<Vec<Contact>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT id, user_id, name, current_balance, created_at FROM contacts \
                 WHERE user_id = ?1 ORDER BY created_at",
                params![user_id],
            )
            .await
            .map_err(query_err)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await.map_err(query_err)? {
            out.push(row_to_contact(&row)?);
        }
        Ok(out)
    }

    async fn create_contact(&self, user_id: &str, name: &str) -> Result<Contact, DatabaseError> {
        let contact = Contact {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            name: name.to_string(),
            current_balance: Decimal::ZERO,
            created_at: Utc::now(),
        };
        self.conn()
            .execute(
                "INSERT INTO contacts (id, user_id, name, current_balance, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    contact.id.clone(),
                    contact.user_id.clone(),
                    contact.name.clone(),
                    contact.current_balance.to_string(),
                    contact.created_at.to_rfc3339()
                ],
            )
            .await
            .map_err(query_err)?;
        Ok(contact)
    }

    async fn set_contact_balance(
        &self,
        contact_id: &str,
        balance: Decimal,
    ) -> Result<(), DatabaseError> {
        let affected = self
            .conn()
            .execute(
                "UPDATE contacts SET current_balance = ?1 WHERE id = ?2",
                params![balance.to_string(), contact_id],
            )
            .await
            .map_err(query_err)?;
        if affected == 0 {
            return Err(DatabaseError::NotFound {
                entity: "contact".to_string(),
                id: contact_id.to_string(),
            });
        }
        Ok(())
    }

    // ── Transactions ────────────────────────────────────────────────

    async fn insert_transaction(&self, new: NewTransaction) -> Result<Transaction, DatabaseError> {
        let tx = Transaction {
            id: Uuid::new_v4().to_string(),
            user_id: new.user_id,
            contact_id: new.contact_id,
            amount: new.amount,
            intent: new.intent,
            category: new.category.unwrap_or_else(|| "General".to_string()),
            description: new.description,
            date: Utc::now(),
            is_deleted: false,
            deleted_at: None,
            deleted_by: None,
            confirmation_message_id: None,
        };
        self.conn()
            .execute(
                "INSERT INTO transactions \
                 (id, user_id, contact_id, amount, intent, category, description, date, is_deleted) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0)",
                params![
                    tx.id.clone(),
                    tx.user_id.clone(),
                    tx.contact_id.clone(),
                    tx.amount.to_string(),
                    tx.intent.as_str(),
                    tx.category.clone(),
                    tx.description.clone(),
                    tx.date.to_rfc3339()
                ],
            )
            .await
            .map_err(query_err)?;
        Ok(tx)
    }

    async fn find_transaction_by_id(
        &self,
        id: &str,
    ) -> Result<Option<Transaction>, DatabaseError> {
        let sql = format!("SELECT {TX_COLUMNS} FROM transactions WHERE id = ?1");
        let mut rows = self
            .conn()
            .query(&sql, params![id])
            .await
            .map_err(query_err)?;
        match rows.next().await.map_err(query_err)? {
            Some(row) => Ok(Some(row_to_transaction(&row)?)),
            None => Ok(None),
        }
    }

    async fn find_transactions_by_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<Transaction>, DatabaseError> {
        let sql = format!(
            "SELECT {TX_COLUMNS} FROM transactions \
             WHERE user_id = ?1 AND is_deleted = 0 ORDER BY date DESC"
        );
        let rows = self
            .conn()
            .query(&sql, params![user_id])
            .await
            .map_err(query_err)?;
        collect_transactions(rows).await
    }

    async fn find_transactions_by_contact(
        &self,
        contact_id: &str,
    ) -> Result<Vec<Transaction>, DatabaseError> {
        let sql = format!(
            "SELECT {TX_COLUMNS} FROM transactions \
             WHERE contact_id = ?1 AND is_deleted = 0 ORDER BY date DESC"
        );
        let rows = self
            .conn()
            .query(&sql, params![contact_id])
            .await
            .map_err(query_err)?;
        collect_transactions(rows).await
    }

    async fn find_recent_transactions(
        &self,
        filter: TransactionFilter,
        limit: usize,
    ) -> Result<Vec<Transaction>, DatabaseError> {
        // Unset filter fields match everything.
        let sql = format!(
            "SELECT {TX_COLUMNS} FROM transactions \
             WHERE is_deleted = 0 \
               AND (?1 IS NULL OR user_id = ?1) \
               AND (?2 IS NULL OR contact_id = ?2) \
             ORDER BY date DESC LIMIT ?3"
        );
        let rows = self
            .conn()
            .query(
                &sql,
                params![filter.user_id, filter.contact_id, limit as i64],
            )
            .await
            .map_err(query_err)?;
        collect_transactions(rows).await
    }

    async fn find_transactions_in_range(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Transaction>, DatabaseError> {
        let sql = format!(
            "SELECT {TX_COLUMNS} FROM transactions \
             WHERE user_id = ?1 AND is_deleted = 0 AND date >= ?2 AND date <= ?3 \
             ORDER BY date DESC"
        );
        let rows = self
            .conn()
            .query(
                &sql,
                params![user_id, start.to_rfc3339(), end.to_rfc3339()],
            )
            .await
            .map_err(query_err)?;
        collect_transactions(rows).await
    }

    async fn find_last_transaction(
        &self,
        user_id: &str,
    ) -> Result<Option<Transaction>, DatabaseError> {
        let sql = format!(
            "SELECT {TX_COLUMNS} FROM transactions \
             WHERE user_id = ?1 AND is_deleted = 0 ORDER BY date DESC LIMIT 1"
        );
        let mut rows = self
            .conn()
            .query(&sql, params![user_id])
            .await
            .map_err(query_err)?;
        match rows.next().await.map_err(query_err)? {
            Some(row) => Ok(Some(row_to_transaction(&row)?)),
            None => Ok(None),
        }
    }

    async fn find_transaction_by_confirmation_id(
        &self,
        message_id: &str,
    ) -> Result<Option<Transaction>, DatabaseError> {
        let sql = format!(
            "SELECT {TX_COLUMNS} FROM transactions \
             WHERE confirmation_message_id = ?1 AND is_deleted = 0"
        );
        let mut rows = self
            .conn()
            .query(&sql, params![message_id])
            .await
            .map_err(query_err)?;
        match rows.next().await.map_err(query_err)? {
            Some(row) => Ok(Some(row_to_transaction(&row)?)),
            None => Ok(None),
        }
    }

    async fn update_transaction(
        &self,
        id: &str,
        update: TransactionUpdate,
    ) -> Result<(), DatabaseError> {
        if update.is_empty() {
            return Ok(());
        }
        let affected = self
            .conn()
            .execute(
                "UPDATE transactions SET \
                 amount = COALESCE(?1, amount), \
                 category = COALESCE(?2, category), \
                 description = COALESCE(?3, description) \
                 WHERE id = ?4",
                params![
                    update.amount.map(|a| a.to_string()),
                    update.category,
                    update.description,
                    id
                ],
            )
            .await
            .map_err(query_err)?;
        if affected == 0 {
            return Err(DatabaseError::NotFound {
                entity: "transaction".to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    async fn mark_transaction_deleted(
        &self,
        id: &str,
        deleted_by: Option<&str>,
    ) -> Result<(), DatabaseError> {
        let affected = self
            .conn()
            .execute(
                "UPDATE transactions SET is_deleted = 1, deleted_at = ?1, deleted_by = ?2 \
                 WHERE id = ?3",
                params![Utc::now().to_rfc3339(), deleted_by, id],
            )
            .await
            .map_err(query_err)?;
        if affected == 0 {
            return Err(DatabaseError::NotFound {
                entity: "transaction".to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    async fn set_confirmation_message_id(
        &self,
        transaction_id: &str,
        message_id: &str,
    ) -> Result<(), DatabaseError> {
        let affected = self
            .conn()
            .execute(
                "UPDATE transactions SET confirmation_message_id = ?1 WHERE id = ?2",
                params![message_id, transaction_id],
            )
            .await
            .map_err(query_err)?;
        if affected == 0 {
            return Err(DatabaseError::NotFound {
                entity: "transaction".to_string(),
                id: transaction_id.to_string(),
            });
        }
        Ok(())
    }

    // ── Processed-message markers ───────────────────────────────────

    async fn marker_exists(&self, message_id: &str) -> Result<bool, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT 1 FROM processed_messages WHERE message_id = ?1",
                params![message_id],
            )
            .await
            .map_err(query_err)?;
        Ok(rows.next().await.map_err(query_err)?.is_some())
    }

    async fn insert_marker(&self, message_id: &str) -> Result<(), DatabaseError> {
        // Idempotent on redelivery races.
        self.conn()
            .execute(
                "INSERT OR IGNORE INTO processed_messages (message_id, processed_at) \
                 VALUES (?1, ?2)",
                params![message_id, Utc::now().to_rfc3339()],
            )
            .await
            .map_err(query_err)?;
        Ok(())
    }
}
