//! Keymeter: an API gateway core that issues per-client API keys and meters
//! every request against a fixed-window quota per key.
//!
//! The pieces, leaf first:
//! - [`registry`] and [`ledger`]: storage seams for clients and per-key counters
//! - [`window`]: fixed-window math
//! - [`admission`]: the per-request admit/reject decision
//! - [`reporter`]: read-only usage views
//! - [`clients`]: registration, key rotation and deletion
//! - [`handlers`] and [`middleware`]: the axum HTTP layer

pub mod admission;
pub mod clients;
pub mod clock;
pub mod config;
pub mod error;
pub mod handlers;
pub mod ledger;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod registry;
pub mod reporter;
pub mod snapshot;
pub mod state;
pub mod sweeper;
pub mod window;

pub use admission::{AdmissionController, AdmissionResult};
pub use clients::{ClientError, ClientService};
pub use clock::{Clock, SystemClock};
pub use error::StoreError;
pub use handlers::router;
pub use ledger::{InMemoryUsageLedger, UsageLedger};
pub use models::{Client, LedgerEntry, UsageSnapshot};
pub use registry::{ClientRegistry, InMemoryClientRegistry};
pub use reporter::{ReportError, UsageReporter};
pub use state::AppState;
pub use window::{FixedWindow, WINDOW_SIZE_SECS};
