use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::{mpsc, Mutex};
use tracing::info;
use tracing_subscriber::EnvFilter;

use tweetledger_common::Config;
use tweetledger_ingest::infra::{EnvAllowList, FileCredentialStore};
use tweetledger_ingest::{Ledger, Trigger};

mod routes;

use routes::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("tweetledger starting");

    let config = Config::from_env();
    let credentials = Arc::new(FileCredentialStore::new(config.credentials_path.clone()));

    // Capacity 1: a rebuild request queued while a cycle runs waits at the
    // loop's select point; a second concurrent request blocks the sender.
    let (trigger_tx, trigger_rx) = mpsc::channel::<Trigger>(1);

    let ledger = Ledger::new(
        config.clone(),
        credentials.clone(),
        Arc::new(EnvAllowList::new()),
    );
    tokio::spawn(ledger.run(trigger_rx));

    let state = Arc::new(AppState {
        config: config.clone(),
        credentials,
        triggers: trigger_tx,
        pending_logins: Mutex::new(HashMap::new()),
    });
    let app = routes::router(state);

    let addr = format!("{}:{}", config.host, config.port);
    info!(addr = %addr, "listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
