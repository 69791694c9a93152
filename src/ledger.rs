use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;

use crate::error::StoreError;
use crate::models::LedgerEntry;

/// Storage for per-key usage counters.
///
/// Every mutation is a single atomic step on the `(count, window_start)` pair,
/// so a backend shared by several gateway processes stays consistent as long
/// as it implements `compare_and_swap` and `find_or_create` atomically.
#[async_trait]
pub trait UsageLedger: Send + Sync {
    async fn find(&self, api_key: &str) -> Result<Option<LedgerEntry>, StoreError>;

    /// Insert `{count: 0, window_start: now}` unless an entry exists; return the stored entry.
    async fn find_or_create(
        &self,
        api_key: &str,
        now: DateTime<Utc>,
    ) -> Result<LedgerEntry, StoreError>;

    /// Replace the entry with `new` only if it still equals `expected`.
    ///
    /// Returns `Ok(false)` when another writer got there first or the entry is gone.
    async fn compare_and_swap(
        &self,
        api_key: &str,
        expected: LedgerEntry,
        new: LedgerEntry,
    ) -> Result<bool, StoreError>;

    // unconditional fresh window (new key after rotation)
    async fn reset(&self, api_key: &str, now: DateTime<Utc>) -> Result<(), StoreError>;

    async fn remove(&self, api_key: &str) -> Result<bool, StoreError>;

    async fn entries(&self) -> Result<Vec<(String, LedgerEntry)>, StoreError>;
}

// In-process ledger; per-key atomicity comes from DashMap's shard locks
#[derive(Debug, Clone, Default)]
pub struct InMemoryUsageLedger {
    entries: Arc<DashMap<String, LedgerEntry>>,
}

impl InMemoryUsageLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (String, LedgerEntry)>) -> Self {
        Self {
            entries: Arc::new(entries.into_iter().collect()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl UsageLedger for InMemoryUsageLedger {
    async fn find(&self, api_key: &str) -> Result<Option<LedgerEntry>, StoreError> {
        Ok(self.entries.get(api_key).map(|entry| *entry))
    }

    async fn find_or_create(
        &self,
        api_key: &str,
        now: DateTime<Utc>,
    ) -> Result<LedgerEntry, StoreError> {
        let entry = self
            .entries
            .entry(api_key.to_string())
            .or_insert(LedgerEntry::fresh(now));
        Ok(*entry)
    }

    async fn compare_and_swap(
        &self,
        api_key: &str,
        expected: LedgerEntry,
        new: LedgerEntry,
    ) -> Result<bool, StoreError> {
        match self.entries.get_mut(api_key) {
            Some(mut current) if *current == expected => {
                *current = new;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn reset(&self, api_key: &str, now: DateTime<Utc>) -> Result<(), StoreError> {
        self.entries.insert(api_key.to_string(), LedgerEntry::fresh(now));
        Ok(())
    }

    async fn remove(&self, api_key: &str) -> Result<bool, StoreError> {
        Ok(self.entries.remove(api_key).is_some())
    }

    async fn entries(&self) -> Result<Vec<(String, LedgerEntry)>, StoreError> {
        Ok(self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect())
    }
}
