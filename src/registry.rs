use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::Client;

/// Client records with a unique index on the API key.
#[async_trait]
pub trait ClientRegistry: Send + Sync {
    /// Fails with `StoreError::Conflict` if the id or key is already taken.
    async fn insert(&self, client: Client) -> Result<(), StoreError>;

    async fn find_by_api_key(&self, api_key: &str) -> Result<Option<Client>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Client>, StoreError>;

    // oldest first
    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Client>, StoreError>;

    async fn list_all(&self) -> Result<Vec<Client>, StoreError>;

    /// Swap a client's key. The old key stops resolving as soon as this returns.
    ///
    /// Returns the old key and the updated record, or `None` for an unknown id.
    async fn replace_api_key(
        &self,
        id: Uuid,
        new_key: &str,
    ) -> Result<Option<(String, Client)>, StoreError>;

    async fn remove(&self, id: Uuid) -> Result<Option<Client>, StoreError>;
}

// Lock order is always clients -> by_key
#[derive(Debug, Clone, Default)]
pub struct InMemoryClientRegistry {
    clients: Arc<DashMap<Uuid, Client>>,
    by_key: Arc<DashMap<String, Uuid>>,
}

impl InMemoryClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // Rebuild from persisted records; later duplicates of a key are dropped
    pub fn from_clients(clients: impl IntoIterator<Item = Client>) -> Self {
        let registry = Self::new();
        for client in clients {
            if registry.by_key.contains_key(&client.api_key) {
                tracing::warn!(client_id = %client.id, "skipping client with duplicate api key");
                continue;
            }
            registry.by_key.insert(client.api_key.clone(), client.id);
            registry.clients.insert(client.id, client);
        }
        registry
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

#[async_trait]
impl ClientRegistry for InMemoryClientRegistry {
    async fn insert(&self, client: Client) -> Result<(), StoreError> {
        let slot = match self.clients.entry(client.id) {
            Entry::Occupied(_) => {
                return Err(StoreError::Conflict(format!("client {} exists", client.id)));
            }
            Entry::Vacant(slot) => slot,
        };
        match self.by_key.entry(client.api_key.clone()) {
            Entry::Occupied(_) => Err(StoreError::Conflict("api key already issued".into())),
            Entry::Vacant(key_slot) => {
                key_slot.insert(client.id);
                slot.insert(client);
                Ok(())
            }
        }
    }

    async fn find_by_api_key(&self, api_key: &str) -> Result<Option<Client>, StoreError> {
        let id = match self.by_key.get(api_key) {
            Some(id) => *id,
            None => return Ok(None),
        };
        // index may briefly point at a client mid-rotation
        Ok(self
            .clients
            .get(&id)
            .filter(|client| client.api_key == api_key)
            .map(|client| client.value().clone()))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Client>, StoreError> {
        Ok(self.clients.get(&id).map(|client| client.value().clone()))
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Client>, StoreError> {
        let mut owned: Vec<Client> = self
            .clients
            .iter()
            .filter(|client| client.user_id == user_id)
            .map(|client| client.value().clone())
            .collect();
        owned.sort_by_key(|client| client.created_at);
        Ok(owned)
    }

    async fn list_all(&self) -> Result<Vec<Client>, StoreError> {
        Ok(self.clients.iter().map(|client| client.value().clone()).collect())
    }

    async fn replace_api_key(
        &self,
        id: Uuid,
        new_key: &str,
    ) -> Result<Option<(String, Client)>, StoreError> {
        let Some(mut client) = self.clients.get_mut(&id) else {
            return Ok(None);
        };
        match self.by_key.entry(new_key.to_string()) {
            Entry::Occupied(_) => {
                return Err(StoreError::Conflict("api key already issued".into()));
            }
            Entry::Vacant(slot) => {
                slot.insert(id);
            }
        }
        let old_key = std::mem::replace(&mut client.api_key, new_key.to_string());
        self.by_key.remove(&old_key);
        Ok(Some((old_key, client.value().clone())))
    }

    async fn remove(&self, id: Uuid) -> Result<Option<Client>, StoreError> {
        let removed = self.clients.remove(&id).map(|(_, client)| client);
        if let Some(client) = &removed {
            self.by_key.remove(&client.api_key);
        }
        Ok(removed)
    }
}
