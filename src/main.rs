use anyhow::Context;
use clap::Parser; // for cli
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use keymeter::config::Args;
use keymeter::snapshot::{self, Snapshot};
use keymeter::sweeper::ledger_sweeper;
use keymeter::{AppState, ClientRegistry, SystemClock, UsageLedger, router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // parse cli arguments
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .init();

    // restore state if a file was given
    let restored = match &args.state_file {
        Some(path) => snapshot::load(path)
            .await
            .with_context(|| format!("loading state from {}", path.display()))?,
        None => Snapshot::default(),
    };
    info!(
        clients = restored.clients.len(),
        ledger_entries = restored.ledger.len(),
        "state loaded"
    );
    let (registry, ledger) = restored.into_stores();
    let registry: Arc<dyn ClientRegistry> = Arc::new(registry);
    let ledger: Arc<dyn UsageLedger> = Arc::new(ledger);

    let state = Arc::new(AppState::new(
        registry.clone(),
        ledger.clone(),
        args.window(),
        args.store_timeout(),
        Arc::new(SystemClock),
    ));

    // spawn the background sweeper
    tokio::spawn(ledger_sweeper(
        registry.clone(),
        ledger.clone(),
        args.sweep_interval(),
        args.state_file.clone(),
    ));

    let app = router(state);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;

    info!(port = args.port, "gateway listening");
    info!(
        window = %args.window().describe(),
        store_timeout_ms = args.store_timeout_ms,
        "quota window configured"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    if let Some(path) = &args.state_file {
        let snap = Snapshot::capture(registry.as_ref(), ledger.as_ref()).await?;
        snapshot::save(path, &snap)
            .await
            .with_context(|| format!("saving state to {}", path.display()))?;
        info!(path = %path.display(), "state saved");
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
