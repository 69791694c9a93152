use std::sync::Arc;
use std::time::Duration;

use crate::admission::AdmissionController;
use crate::clients::ClientService;
use crate::clock::Clock;
use crate::ledger::UsageLedger;
use crate::registry::ClientRegistry;
use crate::reporter::UsageReporter;
use crate::window::FixedWindow;

// app's shared state
pub struct AppState {
    pub admission: AdmissionController,
    pub reporter: UsageReporter,
    pub clients: ClientService,
    pub window: FixedWindow,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    // wire every component over the same registry and ledger
    pub fn new(
        registry: Arc<dyn ClientRegistry>,
        ledger: Arc<dyn UsageLedger>,
        window: FixedWindow,
        store_timeout: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let reporter =
            UsageReporter::new(registry.clone(), ledger.clone(), window, store_timeout);
        Self {
            admission: AdmissionController::new(
                registry.clone(),
                ledger.clone(),
                window,
                store_timeout,
            ),
            clients: ClientService::new(registry, ledger, reporter.clone(), store_timeout),
            reporter,
            window,
            clock,
        }
    }
}
