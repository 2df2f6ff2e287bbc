//! At-least-once delivery guard.
//!
//! Webhook providers redeliver; a message id that has been seen before must
//! not run the pipeline again. The marker is written immediately after the
//! check, before any processing side effects, so a redelivery racing the
//! original at worst costs one duplicate check, never a duplicate ledger
//! entry.

use std::sync::Arc;

use tracing::debug;

use crate::error::DatabaseError;
use crate::store::LedgerStore;

pub struct MessageDeduplicator {
    store: Arc<dyn LedgerStore>,
}

impl MessageDeduplicator {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    pub async fn has_been_processed(&self, message_id: &str) -> Result<bool, DatabaseError> {
        let seen = self.store.marker_exists(message_id).await?;
        if seen {
            debug!(message_id, "Duplicate delivery, skipping");
        }
        Ok(seen)
    }

    /// Idempotent; inserting an already-marked id is a no-op.
    pub async fn mark_processed(&self, message_id: &str) -> Result<(), DatabaseError> {
        self.store.insert_marker(message_id).await
    }
}
