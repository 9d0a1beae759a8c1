//! Cycle wiring and the background control loop.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{error, info};

use sheets_client::SheetsClient;
use tweetledger_common::Config;
use twitter_client::{Keypair, TwitterClient};

use crate::infra::{EnvAllowList, FileCredentialStore};
use crate::poll::{CycleStats, PollCycle};
use crate::rebuild::{Rebuild, RebuildStats};
use crate::store::SheetStore;
use crate::traits::{AllowList, CredentialStore};

/// Period of the background poll timer.
const POLL_PERIOD: Duration = Duration::from_secs(5 * 60);

/// On-demand work the control loop accepts between cycles.
#[derive(Debug, Clone, Copy)]
pub enum Trigger {
    Rebuild,
}

/// Wires configuration and the credential/allow-list sources into poll and
/// rebuild cycles. Tokens, allow-list, and sheet state are re-read fresh at
/// the start of every cycle; nothing is cached across cycles.
pub struct Ledger {
    config: Config,
    credentials: Arc<dyn CredentialStore>,
    allowlist: Arc<dyn AllowList>,
}

impl Ledger {
    pub fn new(
        config: Config,
        credentials: Arc<dyn CredentialStore>,
        allowlist: Arc<dyn AllowList>,
    ) -> Self {
        Self {
            config,
            credentials,
            allowlist,
        }
    }

    pub fn from_config(config: Config) -> Self {
        let credentials = Arc::new(FileCredentialStore::new(config.credentials_path.clone()));
        Self::new(config, credentials, Arc::new(EnvAllowList::new()))
    }

    pub async fn poll_once(&self) -> Result<CycleStats> {
        let senders = self
            .allowlist
            .senders()
            .await
            .context("fetching allow-list")?;
        let user = self
            .credentials
            .user_token()
            .await
            .context("fetching user token")?;

        let twitter = TwitterClient::new(Keypair::new(
            self.config.twitter_api_key.clone(),
            self.config.twitter_api_key_secret.clone(),
        ))
        .with_token(Keypair::new(user.token, user.secret));
        let store = self.sheet_store();

        PollCycle::new(&twitter, &twitter, &store).run(&senders).await
    }

    pub async fn rebuild_once(&self) -> Result<RebuildStats> {
        let store = self.sheet_store();
        Rebuild::new(&store).run().await
    }

    /// Single-worker control loop: at most one cycle (poll or rebuild) at a
    /// time. A trigger arriving mid-cycle waits in the channel until the
    /// loop is back at the select point; the loop exits between cycles when
    /// the trigger channel closes.
    pub async fn run(self, mut triggers: mpsc::Receiver<Trigger>) {
        let mut ticker = tokio::time::interval(POLL_PERIOD);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    info!("polling DMs");
                    match self.poll_once().await {
                        Ok(stats) => info!(%stats, "poll cycle complete"),
                        Err(e) => error!("poll cycle failed: {e:#}"),
                    }
                }
                trigger = triggers.recv() => match trigger {
                    Some(Trigger::Rebuild) => {
                        info!("rebuild requested");
                        match self.rebuild_once().await {
                            Ok(stats) => info!(%stats, "rebuild complete"),
                            Err(e) => error!("rebuild failed: {e:#}"),
                        }
                    }
                    None => {
                        info!("trigger channel closed; stopping control loop");
                        return;
                    }
                },
            }
        }
    }

    fn sheet_store(&self) -> SheetStore {
        SheetStore::new(
            SheetsClient::new(self.config.google_access_token.clone()),
            self.config.spreadsheet_id.clone(),
        )
    }
}
