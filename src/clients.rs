use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{StoreError, bounded};
use crate::ledger::UsageLedger;
use crate::models::{Client, ClientUsage, UsageSnapshot, fingerprint, generate_api_key};
use crate::registry::ClientRegistry;
use crate::reporter::UsageReporter;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClientError {
    #[error("{0}")]
    Invalid(&'static str),
    #[error("client not found")]
    NotFound,
    #[error(transparent)]
    Store(#[from] StoreError),
}

// Owner-facing client management: registration, listing, key rotation, deletion.
// The only writer of client records; also drops ledger entries for dead keys.
#[derive(Clone)]
pub struct ClientService {
    registry: Arc<dyn ClientRegistry>,
    ledger: Arc<dyn UsageLedger>,
    reporter: UsageReporter,
    store_timeout: Duration,
}

impl ClientService {
    pub fn new(
        registry: Arc<dyn ClientRegistry>,
        ledger: Arc<dyn UsageLedger>,
        reporter: UsageReporter,
        store_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            ledger,
            reporter,
            store_timeout,
        }
    }

    pub async fn register(
        &self,
        user_id: &str,
        name: &str,
        rate_limit: Option<u32>,
        now: DateTime<Utc>,
    ) -> Result<Client, ClientError> {
        let name = name.trim();
        let Some(rate_limit) = rate_limit.filter(|_| !name.is_empty()) else {
            return Err(ClientError::Invalid("Name and rateLimit required"));
        };
        if rate_limit == 0 {
            return Err(ClientError::Invalid("rateLimit must be at least 1"));
        }

        let client = Client::new(user_id, name, rate_limit, now);
        bounded(self.store_timeout, self.registry.insert(client.clone())).await?;
        info!(client_id = %client.id, user_id, rate_limit, "client registered");
        Ok(client)
    }

    pub async fn list_with_usage(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<ClientUsage>, ClientError> {
        let clients = bounded(self.store_timeout, self.registry.list_by_user(user_id)).await?;
        let mut listing = Vec::with_capacity(clients.len());
        for client in clients {
            let entry = bounded(self.store_timeout, self.ledger.find(&client.api_key)).await?;
            listing.push(ClientUsage {
                id: client.id,
                request_count: entry.map(|e| e.count).unwrap_or(0),
                window_start: entry.map(|e| e.window_start).unwrap_or(now),
                name: client.name,
                api_key: client.api_key,
                rate_limit: client.rate_limit,
                created_at: client.created_at,
            });
        }
        Ok(listing)
    }

    pub async fn usage(
        &self,
        user_id: &str,
        client_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<UsageSnapshot, ClientError> {
        let client = self.owned(user_id, client_id).await?;
        Ok(self.reporter.report_for_client(&client, now).await?)
    }

    /// Issue a new key. The old key stops working at once and its ledger
    /// entry is dropped; the new key starts a fresh window at `now`.
    pub async fn rotate_key(
        &self,
        user_id: &str,
        client_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(String, String), ClientError> {
        self.owned(user_id, client_id).await?;

        let new_key = generate_api_key();
        let (old_key, _) = bounded(
            self.store_timeout,
            self.registry.replace_api_key(client_id, &new_key),
        )
        .await?
        .ok_or(ClientError::NotFound)?;

        // the key swap already happened; a leftover entry is pruned by the sweeper
        if let Err(err) = bounded(self.store_timeout, self.ledger.remove(&old_key)).await {
            warn!(client_id = %client_id, key = %fingerprint(&old_key), error = %err, "failed to drop ledger entry for rotated key");
        }
        if let Err(err) = bounded(self.store_timeout, self.ledger.reset(&new_key, now)).await {
            warn!(client_id = %client_id, error = %err, "failed to open ledger entry for new key");
        }

        info!(client_id = %client_id, old = %fingerprint(&old_key), new = %fingerprint(&new_key), "api key rotated");
        Ok((old_key, new_key))
    }

    pub async fn delete(&self, user_id: &str, client_id: Uuid) -> Result<(), ClientError> {
        self.owned(user_id, client_id).await?;

        let client = bounded(self.store_timeout, self.registry.remove(client_id))
            .await?
            .ok_or(ClientError::NotFound)?;
        if let Err(err) = bounded(self.store_timeout, self.ledger.remove(&client.api_key)).await {
            warn!(client_id = %client_id, error = %err, "failed to drop ledger entry for deleted client");
        }

        info!(client_id = %client_id, user_id, "client deleted");
        Ok(())
    }

    // clients owned by someone else look the same as missing ones
    async fn owned(&self, user_id: &str, client_id: Uuid) -> Result<Client, ClientError> {
        bounded(self.store_timeout, self.registry.find_by_id(client_id))
            .await?
            .filter(|client| client.user_id == user_id)
            .ok_or(ClientError::NotFound)
    }
}
