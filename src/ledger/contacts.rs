//! Contact resolution: exact and fuzzy name lookup scoped to one user.
//!
//! Fuzzy matching is a Levenshtein scan over the user's full contact list.
//! Per-user contact books are small, so the O(n·m) scan beats maintaining an
//! approximate-match index; a larger fleet would swap the scan for an index
//! while keeping the same selection semantics (exact wins, otherwise nearest
//! within threshold, first-encountered breaks ties).

use std::sync::Arc;

use tracing::debug;

use crate::error::DatabaseError;
use crate::ledger::model::Contact;
use crate::store::LedgerStore;

/// Default maximum edit distance for a fuzzy match.
pub const DEFAULT_FUZZY_THRESHOLD: usize = 2;

/// Name lookup/creation scoped to one user's contact book.
pub struct ContactResolver {
    store: Arc<dyn LedgerStore>,
}

impl ContactResolver {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Exact lookup on the trimmed name.
    pub async fn find_by_name(
        &self,
        user_id: &str,
        name: &str,
    ) -> Result<Option<Contact>, DatabaseError> {
        self.store.find_contact_by_name(user_id, name.trim()).await
    }

    /// Fuzzy lookup: exact case-insensitive match wins immediately;
    /// otherwise the contact with the smallest edit distance at or below
    /// `threshold`, ties broken by first encountered.
    pub async fn find_similar_by_name(
        &self,
        user_id: &str,
        name: &str,
        threshold: usize,
    ) -> Result<Option<Contact>, DatabaseError> {
        let contacts = self.store.find_contacts_by_user(user_id).await?;
        let target = name.trim().to_lowercase();

        let mut best: Option<Contact> = None;
        let mut best_distance = usize::MAX;

        for contact in contacts {
            let candidate = contact.name.trim().to_lowercase();
            if candidate == target {
                return Ok(Some(contact));
            }
            let distance = levenshtein(&target, &candidate);
            if distance <= threshold && distance < best_distance {
                best_distance = distance;
                best = Some(contact);
            }
        }

        if let Some(ref contact) = best {
            debug!(
                user_id,
                target = %name,
                matched = %contact.name,
                distance = best_distance,
                "Fuzzy contact match"
            );
        }
        Ok(best)
    }

    /// Exact, then fuzzy at the default threshold.
    pub async fn resolve(
        &self,
        user_id: &str,
        name: &str,
    ) -> Result<Option<Contact>, DatabaseError> {
        if let Some(contact) = self.find_by_name(user_id, name).await? {
            return Ok(Some(contact));
        }
        self.find_similar_by_name(user_id, name, DEFAULT_FUZZY_THRESHOLD)
            .await
    }

    pub async fn create(&self, user_id: &str, name: &str) -> Result<Contact, DatabaseError> {
        self.store.create_contact(user_id, name.trim()).await
    }

    /// Exact lookup, falling back to creation. Used when a transaction
    /// names a counterparty for the first time.
    pub async fn find_or_create(
        &self,
        user_id: &str,
        name: &str,
    ) -> Result<Contact, DatabaseError> {
        if let Some(existing) = self.find_by_name(user_id, name).await? {
            return Ok(existing);
        }
        self.create(user_id, name).await
    }
}

/// Classic dynamic-programming edit distance.
fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (m, n) = (a.len(), b.len());

    let mut prev: Vec<usize> = (0..=n).collect();
    let mut curr = vec![0usize; n + 1];

    for i in 1..=m {
        curr[0] = i;
        for j in 1..=n {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[n]
}
