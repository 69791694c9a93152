// tests/gateway/fixtures/faulty_stores.rs

// dependencies
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use keymeter::{
    Client, ClientRegistry, InMemoryClientRegistry, InMemoryUsageLedger, LedgerEntry, StoreError,
    UsageLedger,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use uuid::Uuid;

// Ledger whose writes can be switched off
#[derive(Debug, Clone, Default)]
pub struct FlakyLedger {
    inner: InMemoryUsageLedger,
    fail_writes: Arc<AtomicBool>,
}

impl FlakyLedger {
    pub fn new(inner: InMemoryUsageLedger) -> Self {
        Self {
            inner,
            fail_writes: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("ledger offline".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl UsageLedger for FlakyLedger {
    async fn find(&self, api_key: &str) -> Result<Option<LedgerEntry>, StoreError> {
        self.inner.find(api_key).await
    }

    async fn find_or_create(
        &self,
        api_key: &str,
        now: DateTime<Utc>,
    ) -> Result<LedgerEntry, StoreError> {
        self.inner.find_or_create(api_key, now).await
    }

    async fn compare_and_swap(
        &self,
        api_key: &str,
        expected: LedgerEntry,
        new: LedgerEntry,
    ) -> Result<bool, StoreError> {
        self.check()?;
        self.inner.compare_and_swap(api_key, expected, new).await
    }

    async fn reset(&self, api_key: &str, now: DateTime<Utc>) -> Result<(), StoreError> {
        self.check()?;
        self.inner.reset(api_key, now).await
    }

    async fn remove(&self, api_key: &str) -> Result<bool, StoreError> {
        self.check()?;
        self.inner.remove(api_key).await
    }

    async fn entries(&self) -> Result<Vec<(String, LedgerEntry)>, StoreError> {
        self.inner.entries().await
    }
}

// Registry that answers key lookups only after a delay
#[derive(Debug, Clone)]
pub struct SlowRegistry {
    inner: InMemoryClientRegistry,
    delay: Duration,
}

impl SlowRegistry {
    pub fn new(inner: InMemoryClientRegistry, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

#[async_trait]
impl ClientRegistry for SlowRegistry {
    async fn insert(&self, client: Client) -> Result<(), StoreError> {
        self.inner.insert(client).await
    }

    async fn find_by_api_key(&self, api_key: &str) -> Result<Option<Client>, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.find_by_api_key(api_key).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Client>, StoreError> {
        self.inner.find_by_id(id).await
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Client>, StoreError> {
        self.inner.list_by_user(user_id).await
    }

    async fn list_all(&self) -> Result<Vec<Client>, StoreError> {
        self.inner.list_all().await
    }

    async fn replace_api_key(
        &self,
        id: Uuid,
        new_key: &str,
    ) -> Result<Option<(String, Client)>, StoreError> {
        self.inner.replace_api_key(id, new_key).await
    }

    async fn remove(&self, id: Uuid) -> Result<Option<Client>, StoreError> {
        self.inner.remove(id).await
    }
}
