//! One poll-and-reconcile cycle: resolve last-known state, collect new
//! messages, group them, and update or append one row per cluster.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{debug, info, warn};

use twitter_client::DmEvent;

use crate::codec::{self, Record};
use crate::derive::{apply_derived, cluster_notes};
use crate::group::group_by_anchor;
use crate::reference::tweet_id_from_event;
use crate::resolver::{last_known_by_sender, LastKnown};
use crate::traits::{FeedError, ItemFetcher, MessageFeed, TabularStore};

/// How long to suspend when the feed reports throttling before
/// re-requesting the same page.
const THROTTLE_COOLDOWN: Duration = Duration::from_secs(60);

#[derive(Debug, Default)]
pub struct CycleStats {
    pub messages_collected: u32,
    pub clusters: u32,
    pub rows_appended: u32,
    pub rows_updated: u32,
    pub rows_unchanged: u32,
    pub clusters_skipped: u32,
}

impl fmt::Display for CycleStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "messages={} clusters={} appended={} updated={} unchanged={} skipped={}",
            self.messages_collected,
            self.clusters,
            self.rows_appended,
            self.rows_updated,
            self.rows_unchanged,
            self.clusters_skipped
        )
    }
}

pub struct PollCycle<'a> {
    feed: &'a dyn MessageFeed,
    items: &'a dyn ItemFetcher,
    store: &'a dyn TabularStore,
    cooldown: Duration,
}

impl<'a> PollCycle<'a> {
    pub fn new(
        feed: &'a dyn MessageFeed,
        items: &'a dyn ItemFetcher,
        store: &'a dyn TabularStore,
    ) -> Self {
        Self {
            feed,
            items,
            store,
            cooldown: THROTTLE_COOLDOWN,
        }
    }

    /// Override the throttle cooldown (tests).
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub async fn run(&self, allowlist: &BTreeMap<String, String>) -> Result<CycleStats> {
        let mut stats = CycleStats::default();

        let last_known = last_known_by_sender(self.store, allowlist)
            .await
            .context("resolving last stored tweet per sender")?;

        let mut events = self.collect_new_events(allowlist, &last_known).await?;
        stats.messages_collected = events.len() as u32;

        // Chronological total order: shorter timestamps first, then raw
        // string comparison. Survives a timestamp format change.
        events.sort_by(|a, b| {
            (a.created_timestamp.len(), a.created_timestamp.as_str())
                .cmp(&(b.created_timestamp.len(), b.created_timestamp.as_str()))
        });

        let mut by_sender: BTreeMap<String, Vec<DmEvent>> = BTreeMap::new();
        for event in events {
            let Some(sender) = event.message.as_ref().map(|m| m.sender_id.clone()) else {
                continue;
            };
            by_sender.entry(sender).or_default().push(event);
        }

        let header = self
            .store
            .header()
            .await
            .context("reading spreadsheet header")?;

        for (sender, events) in by_sender {
            for cluster in group_by_anchor(events) {
                self.reconcile_cluster(
                    &sender,
                    allowlist,
                    &cluster,
                    last_known.get(&sender),
                    &header,
                    &mut stats,
                )
                .await?;
            }
        }
        Ok(stats)
    }

    /// Paginate the feed, keeping allow-listed messages not yet in the
    /// sheet. For each sender with a last-known tweet, collection stops
    /// once that tweet has been re-observed; throttled pages are retried
    /// in place after the cooldown.
    async fn collect_new_events(
        &self,
        allowlist: &BTreeMap<String, String>,
        last_known: &BTreeMap<String, LastKnown>,
    ) -> Result<Vec<DmEvent>> {
        let mut events = Vec::new();
        let mut need_confirmation: BTreeSet<String> = last_known.keys().cloned().collect();
        let mut cursor: Option<String> = None;

        loop {
            let page = loop {
                match self.feed.events_page(cursor.as_deref()).await {
                    Ok(page) => break page,
                    Err(FeedError::RateLimited) => {
                        warn!(
                            cooldown_secs = self.cooldown.as_secs(),
                            "message feed throttled; cooling down"
                        );
                        tokio::time::sleep(self.cooldown).await;
                    }
                    Err(FeedError::Other(e)) => {
                        return Err(e.context("fetching DM events page"));
                    }
                }
            };

            for event in page.events {
                if event.kind != "message_create" {
                    continue;
                }
                let Some(message) = event.message.as_ref() else {
                    continue;
                };
                let sender = message.sender_id.clone();
                if !allowlist.contains_key(&sender) {
                    continue;
                }
                // Once this sender's last recorded tweet has been
                // re-observed, everything older is already in the sheet.
                if last_known.contains_key(&sender) && !need_confirmation.contains(&sender) {
                    continue;
                }
                let tweet_id = tweet_id_from_event(&event);
                events.push(event);

                if let (Some(tweet_id), Some(last)) = (tweet_id, last_known.get(&sender)) {
                    if tweet_id == last.tweet_id {
                        need_confirmation.remove(&sender);
                    }
                }
            }

            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }
        Ok(events)
    }

    async fn reconcile_cluster(
        &self,
        sender: &str,
        allowlist: &BTreeMap<String, String>,
        cluster: &[DmEvent],
        last_known: Option<&LastKnown>,
        header: &[String],
        stats: &mut CycleStats,
    ) -> Result<()> {
        stats.clusters += 1;

        let Some(anchor) = cluster.first() else {
            warn!(sender, "skipping empty cluster");
            stats.clusters_skipped += 1;
            return Ok(());
        };
        let Some(anchor_id) = tweet_id_from_event(anchor) else {
            warn!(
                sender,
                cluster = %stringify(&cluster),
                "skipping cluster whose first message has no tweet reference"
            );
            stats.clusters_skipped += 1;
            return Ok(());
        };
        let notes = cluster_notes(cluster, &anchor_id);

        if let Some(last) = last_known.filter(|l| l.tweet_id == anchor_id) {
            // Same tweet as this sender's latest stored row: refresh its
            // notes in place instead of appending a duplicate.
            let mut record = match codec::decode_record(&last.raw_json) {
                Ok(record) => record,
                Err(e) => {
                    warn!(
                        sender,
                        row = last.row,
                        error = %e,
                        "stored JSON does not parse; skipping update"
                    );
                    stats.clusters_skipped += 1;
                    return Ok(());
                }
            };
            record.insert("notes".to_string(), Value::String(notes));

            let encoded = match codec::encode_row(&record, header) {
                Ok(encoded) => encoded,
                Err(e) => {
                    warn!(sender, tweet_id = %anchor_id, error = %e, "failed to encode row");
                    stats.clusters_skipped += 1;
                    return Ok(());
                }
            };
            if encoded.raw == last.raw_json {
                debug!(sender, row = last.row, "row already current; nothing to write");
                stats.rows_unchanged += 1;
                return Ok(());
            }
            self.store
                .update_row(last.row, encoded.cells)
                .await
                .with_context(|| format!("updating row {}", last.row))?;
            info!(sender, row = last.row, tweet_id = %anchor_id, "updated row");
            stats.rows_updated += 1;
            return Ok(());
        }

        // New tweet for this sender: fetch it and append a fresh row.
        let numeric_id: u64 = match anchor_id.parse() {
            Ok(id) => id,
            Err(e) => {
                warn!(sender, tweet_id = %anchor_id, error = %e, "tweet id is not numeric; skipping cluster");
                stats.clusters_skipped += 1;
                return Ok(());
            }
        };
        let tweet = match self.items.fetch_item(numeric_id).await {
            Ok(tweet) => tweet,
            Err(e) => {
                warn!(sender, tweet_id = %anchor_id, error = %e, "failed to fetch tweet; skipping cluster");
                stats.clusters_skipped += 1;
                return Ok(());
            }
        };

        let mut record = Record::new();
        record.insert("sender_id".to_string(), Value::String(sender.to_string()));
        record.insert(
            "sender_username".to_string(),
            Value::String(allowlist.get(sender).cloned().unwrap_or_default()),
        );
        record.insert("tweet".to_string(), tweet.clone());
        record.insert("notes".to_string(), Value::String(notes));
        apply_derived(&mut record, &tweet);

        let encoded = match codec::encode_row(&record, header) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(sender, tweet_id = %anchor_id, error = %e, "failed to encode row");
                stats.clusters_skipped += 1;
                return Ok(());
            }
        };
        self.store
            .append_row(encoded.cells)
            .await
            .with_context(|| format!("appending tweet {anchor_id}"))?;
        info!(sender, tweet_id = %anchor_id, "appended row");
        stats.rows_appended += 1;
        Ok(())
    }
}

fn stringify<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "<unserializable>".to_string())
}
