use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

use crate::error::{StoreError, bounded};
use crate::ledger::UsageLedger;
use crate::metrics::{ADMISSION_LATENCY, ADMISSIONS_TOTAL, LEDGER_CONFLICTS};
use crate::models::{Client, LedgerEntry, fingerprint};
use crate::registry::ClientRegistry;
use crate::window::FixedWindow;

// Give up on a key after this many lost compare-and-swap races
const MAX_CAS_ATTEMPTS: usize = 1024;

/// Outcome of checking one request against its key's quota.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionResult {
    Admitted {
        limit: u32,
        remaining: u32,
        reset_at: DateTime<Utc>,
        client_name: String,
    },
    RateLimited {
        limit: u32,
        reset_at: DateTime<Utc>,
        minutes_until_reset: u64,
    },
    // no key supplied
    Unauthenticated,
    // key supplied but not registered
    Forbidden,
    // store failure or timeout; the ledger was left untouched
    Internal,
}

impl AdmissionResult {
    pub fn is_admitted(&self) -> bool {
        matches!(self, AdmissionResult::Admitted { .. })
    }

    // metric label
    pub fn outcome(&self) -> &'static str {
        match self {
            AdmissionResult::Admitted { .. } => "admitted",
            AdmissionResult::RateLimited { .. } => "rate_limited",
            AdmissionResult::Unauthenticated => "unauthenticated",
            AdmissionResult::Forbidden => "forbidden",
            AdmissionResult::Internal => "internal",
        }
    }
}

/// Decides, per request, whether a key still has quota in its current window.
///
/// Each decision is one optimistic read-modify-write on the key's ledger entry:
/// read (creating the entry if absent), work out the reset and the increment
/// locally, then commit with a single compare-and-swap on the whole
/// `(count, window_start)` pair. A lost race re-reads and tries again, so two
/// concurrent requests can never both commit `count + 1` from the same `count`.
#[derive(Clone)]
pub struct AdmissionController {
    registry: Arc<dyn ClientRegistry>,
    ledger: Arc<dyn UsageLedger>,
    window: FixedWindow,
    store_timeout: Duration,
}

impl AdmissionController {
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

    pub async fn admit(&self, api_key: Option<&str>, now: DateTime<Utc>) -> AdmissionResult {
        let _timer = ADMISSION_LATENCY.start_timer();

        let result = match api_key.filter(|key| !key.is_empty()) {
            None => AdmissionResult::Unauthenticated,
            Some(key) => match self.try_admit(key, now).await {
                Ok(result) => result,
                Err(err) => {
                    error!(key = %fingerprint(key), error = %err, "admission check failed");
                    AdmissionResult::Internal
                }
            },
        };

        ADMISSIONS_TOTAL.with_label_values(&[result.outcome()]).inc();
        result
    }

    async fn try_admit(
        &self,
        api_key: &str,
        now: DateTime<Utc>,
    ) -> Result<AdmissionResult, StoreError> {
        for attempt in 0..MAX_CAS_ATTEMPTS {
            let Some(client) = self.lookup(api_key).await? else {
                debug!(key = %fingerprint(api_key), "unknown api key");
                return Ok(AdmissionResult::Forbidden);
            };

            let current =
                bounded(self.store_timeout, self.ledger.find_or_create(api_key, now)).await?;

            // reset is decided before the quota check and committed with it
            let candidate = if self.window.expired(now, current.window_start) {
                LedgerEntry::fresh(now)
            } else {
                current
            };
            let reset_at = self.window.window_end(candidate.window_start);

            if candidate.count >= client.rate_limit {
                if candidate != current && !self.swap(api_key, current, candidate).await? {
                    LEDGER_CONFLICTS.inc();
                    continue;
                }
                debug!(
                    key = %fingerprint(api_key),
                    limit = client.rate_limit,
                    "rate limit exceeded"
                );
                return Ok(AdmissionResult::RateLimited {
                    limit: client.rate_limit,
                    reset_at,
                    minutes_until_reset: self
                        .window
                        .minutes_until_reset(now, candidate.window_start),
                });
            }

            let next = LedgerEntry {
                count: candidate.count + 1,
                window_start: candidate.window_start,
            };
            if self.swap(api_key, current, next).await? {
                return Ok(AdmissionResult::Admitted {
                    limit: client.rate_limit,
                    remaining: client.rate_limit - next.count,
                    reset_at,
                    client_name: client.name,
                });
            }

            LEDGER_CONFLICTS.inc();
            debug!(key = %fingerprint(api_key), attempt, "ledger conflict, retrying");
            tokio::task::yield_now().await;
        }

        Err(StoreError::Conflict(format!(
            "gave up after {} contended attempts",
            MAX_CAS_ATTEMPTS
        )))
    }

    async fn lookup(&self, api_key: &str) -> Result<Option<Client>, StoreError> {
        bounded(self.store_timeout, self.registry.find_by_api_key(api_key)).await
    }

    async fn swap(
        &self,
        api_key: &str,
        expected: LedgerEntry,
        new: LedgerEntry,
    ) -> Result<bool, StoreError> {
        bounded(
            self.store_timeout,
            self.ledger.compare_and_swap(api_key, expected, new),
        )
        .await
    }
}
