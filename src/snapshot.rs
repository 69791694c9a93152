use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::error::StoreError;
use crate::ledger::{InMemoryUsageLedger, UsageLedger};
use crate::models::{Client, LedgerEntry};
use crate::registry::{ClientRegistry, InMemoryClientRegistry};

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("state file io: {0}")]
    Io(#[from] std::io::Error),
    #[error("state file format: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

// On-disk state: clients plus their ledger entries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub clients: Vec<Client>,
    pub ledger: Vec<LedgerRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerRecord {
    pub api_key: String,
    pub count: u32,
    pub window_start: DateTime<Utc>,
}

impl Snapshot {
    pub async fn capture(
        registry: &dyn ClientRegistry,
        ledger: &dyn UsageLedger,
    ) -> Result<Self, StoreError> {
        let clients = registry.list_all().await?;
        let ledger = ledger
            .entries()
            .await?
            .into_iter()
            .map(|(api_key, entry)| LedgerRecord {
                api_key,
                count: entry.count,
                window_start: entry.window_start,
            })
            .collect();
        Ok(Self { clients, ledger })
    }

    pub fn into_stores(self) -> (InMemoryClientRegistry, InMemoryUsageLedger) {
        let ledger = InMemoryUsageLedger::from_entries(self.ledger.into_iter().map(|record| {
            (
                record.api_key,
                LedgerEntry {
                    count: record.count,
                    window_start: record.window_start,
                },
            )
        }));
        (InMemoryClientRegistry::from_clients(self.clients), ledger)
    }
}

// A missing file is an empty snapshot
pub async fn load(path: &Path) -> Result<Snapshot, SnapshotError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Snapshot::default()),
        Err(err) => Err(err.into()),
    }
}

// Sibling of `path` with ".tmp" appended, never equal to `path` itself
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

// Write to a sibling temp file, then rename over the target
pub async fn save(path: &Path, snapshot: &Snapshot) -> Result<(), SnapshotError> {
    let json = serde_json::to_vec_pretty(snapshot)?;
    let tmp = temp_path(path);
    tokio::fs::write(&tmp, json).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
