use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::error::{StoreError, bounded};
use crate::ledger::UsageLedger;
use crate::models::{Client, UsageSnapshot};
use crate::registry::ClientRegistry;
use crate::window::FixedWindow;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReportError {
    #[error("client not found")]
    NotFound,
    #[error(transparent)]
    Store(#[from] StoreError),
}

// Read-only usage view. Never creates, resets or increments ledger entries:
// an expired window keeps showing its old count until the next admission.
#[derive(Clone)]
pub struct UsageReporter {
    registry: Arc<dyn ClientRegistry>,
    ledger: Arc<dyn UsageLedger>,
    window: FixedWindow,
    store_timeout: Duration,
}

impl UsageReporter {
    pub fn new(
        registry: Arc<dyn ClientRegistry>,
        ledger: Arc<dyn UsageLedger>,
        window: FixedWindow,
        store_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            ledger,
            window,
            store_timeout,
        }
    }

    pub async fn report(
        &self,
        api_key: &str,
        now: DateTime<Utc>,
    ) -> Result<UsageSnapshot, ReportError> {
        let client = bounded(self.store_timeout, self.registry.find_by_api_key(api_key))
            .await?
            .ok_or(ReportError::NotFound)?;
        Ok(self.report_for_client(&client, now).await?)
    }

    pub async fn report_for_client(
        &self,
        client: &Client,
        now: DateTime<Utc>,
    ) -> Result<UsageSnapshot, StoreError> {
        let entry = bounded(self.store_timeout, self.ledger.find(&client.api_key)).await?;

        // no entry yet: preview the window a first request would open
        let (used, window_start) = match entry {
            Some(entry) => (entry.count, entry.window_start),
            None => (0, now),
        };

        Ok(UsageSnapshot {
            limit: client.rate_limit,
            used,
            remaining: client.rate_limit.saturating_sub(used),
            window_start,
            window_end: self.window.window_end(window_start),
            minutes_until_reset: self.window.minutes_until_reset(now, window_start),
        })
    }
}
