use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::window::{FixedWindow, WINDOW_SIZE_SECS};

// CLI argument structure
#[derive(Parser, Debug, Clone)]
#[command(name = "keymeter")]
#[command(about = "API gateway that issues keys and meters hourly quotas")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    // Quota window length in seconds
    #[arg(long, env = "KEYMETER_WINDOW_SECS", default_value_t = WINDOW_SIZE_SECS as u64)]
    pub window_secs: u64,

    // Upper bound on any single store call, in milliseconds
    #[arg(long, env = "KEYMETER_STORE_TIMEOUT_MS", default_value_t = 500)]
    pub store_timeout_ms: u64,

    // Seconds between ledger sweeps
    #[arg(long, env = "KEYMETER_SWEEP_INTERVAL", default_value_t = 300)]
    pub sweep_interval: u64,

    // JSON file to load state from at startup and save to on sweeps/shutdown
    #[arg(long, env = "KEYMETER_STATE_FILE")]
    pub state_file: Option<PathBuf>,

    // Default log filter when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Args {
    pub fn window(&self) -> FixedWindow {
        FixedWindow::from_secs(self.window_secs)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms.max(1))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval.max(1))
    }
}
