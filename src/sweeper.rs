use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::{Duration, interval};
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::ledger::UsageLedger;
use crate::metrics::{LEDGER_PRUNED, LEDGER_SIZE};
use crate::registry::ClientRegistry;
use crate::snapshot::{self, Snapshot};

/// Remove ledger entries whose key no longer belongs to any client.
///
/// Entries are listed before clients so a key registered mid-sweep is never
/// mistaken for an orphan. Returns how many entries were removed.
pub async fn prune_orphans(
    registry: &dyn ClientRegistry,
    ledger: &dyn UsageLedger,
) -> Result<usize, StoreError> {
    let entries = ledger.entries().await?;
    let live: HashSet<String> = registry
        .list_all()
        .await?
        .into_iter()
        .map(|client| client.api_key)
        .collect();

    LEDGER_SIZE.set(entries.len() as i64);

    let mut pruned = 0;
    for (api_key, _) in entries {
        if !live.contains(&api_key) && ledger.remove(&api_key).await? {
            pruned += 1;
        }
    }
    LEDGER_PRUNED.inc_by(pruned as u64);
    Ok(pruned)
}

// Background loop - prunes orphans and snapshots state every tick
pub async fn ledger_sweeper(
    registry: Arc<dyn ClientRegistry>,
    ledger: Arc<dyn UsageLedger>,
    every: Duration,
    state_file: Option<PathBuf>,
) {
    let mut interval = interval(every.max(Duration::from_secs(1)));
    // first tick fires immediately
    interval.tick().await;

    info!(interval = ?every, "ledger sweeper started");

    loop {
        interval.tick().await;

        match prune_orphans(registry.as_ref(), ledger.as_ref()).await {
            Ok(0) => debug!("sweep found no orphaned ledger entries"),
            Ok(pruned) => info!(pruned, "pruned orphaned ledger entries"),
            Err(err) => warn!(error = %err, "ledger sweep failed"),
        }

        if let Some(path) = &state_file {
            let saved = match Snapshot::capture(registry.as_ref(), ledger.as_ref()).await {
                Ok(snap) => snapshot::save(path, &snap).await,
                Err(err) => Err(err.into()),
            };
            if let Err(err) = saved {
                warn!(path = %path.display(), error = %err, "failed to save state snapshot");
            }
        }
    }
}
