use std::collections::{BTreeMap, BTreeSet};

use anyhow::Result;
use serde::Deserialize;
use tracing::warn;

use tweetledger_common::LedgerError;

use crate::codec::RAW_JSON_COLUMN;
use crate::traits::TabularStore;

/// The most recent stored row for one sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastKnown {
    /// Tweet id of that row; empty if the row carries no tweet.
    pub tweet_id: String,
    /// 1-based row within the data region (header row excluded).
    pub row: usize,
    /// The raw-JSON cell, verbatim, for the update-in-place path.
    pub raw_json: String,
}

/// The two fields the scan needs from each stored document.
#[derive(Debug, Deserialize)]
struct MinimalRecord {
    sender_id: String,
    #[serde(default)]
    tweet: Option<MinimalTweet>,
}

#[derive(Debug, Deserialize)]
struct MinimalTweet {
    #[serde(default)]
    id_str: String,
}

/// Backward-scan state over the raw-JSON column.
///
/// `is_complete` is the early-exit predicate: once it holds, the scan cost
/// has been bounded by the staleness of the most stale sender instead of
/// the full sheet depth.
pub struct ScanState<'a> {
    allowlist: &'a BTreeMap<String, String>,
    resolved: BTreeMap<String, LastKnown>,
    pending: BTreeSet<String>,
}

impl<'a> ScanState<'a> {
    pub fn new(allowlist: &'a BTreeMap<String, String>) -> Self {
        Self {
            allowlist,
            resolved: BTreeMap::new(),
            pending: allowlist.keys().cloned().collect(),
        }
    }

    /// Feed one raw-JSON cell; rows arrive newest-first, so the first
    /// occurrence per sender wins. `row` is 1-based within the data region.
    pub fn observe(&mut self, row: usize, raw: &str) {
        let minimal: MinimalRecord = match serde_json::from_str(raw) {
            Ok(m) => m,
            Err(e) => {
                warn!(row, error = %e, "skipping stored row with undecodable JSON");
                return;
            }
        };
        if !self.allowlist.contains_key(&minimal.sender_id) {
            return;
        }
        if self.resolved.contains_key(&minimal.sender_id) {
            return;
        }
        let tweet_id = minimal.tweet.map(|t| t.id_str).unwrap_or_default();
        self.pending.remove(&minimal.sender_id);
        self.resolved.insert(
            minimal.sender_id,
            LastKnown {
                tweet_id,
                row,
                raw_json: raw.to_string(),
            },
        );
    }

    /// True once every allow-listed sender has a resolved row.
    pub fn is_complete(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn into_resolved(self) -> BTreeMap<String, LastKnown> {
        self.resolved
    }
}

/// Resolve each allow-listed sender's most recently stored tweet by
/// scanning the raw-JSON column from the last row upward.
pub async fn last_known_by_sender(
    store: &dyn TabularStore,
    allowlist: &BTreeMap<String, String>,
) -> Result<BTreeMap<String, LastKnown>> {
    let header = store.header().await?;
    let json_col = header
        .iter()
        .position(|h| h == RAW_JSON_COLUMN)
        .ok_or_else(|| {
            LedgerError::Config(format!(
                "missing {RAW_JSON_COLUMN:?} column in the spreadsheet"
            ))
        })?;

    let cells = store.column(json_col + 1).await?;
    let mut state = ScanState::new(allowlist);
    for (i, raw) in cells.iter().enumerate().rev() {
        state.observe(i + 1, raw);
        if state.is_complete() {
            break;
        }
    }
    Ok(state.into_resolved())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowlist(ids: &[&str]) -> BTreeMap<String, String> {
        ids.iter()
            .map(|id| (id.to_string(), format!("user{id}")))
            .collect()
    }

    fn row_json(sender: &str, tweet_id: &str) -> String {
        format!(r#"{{"sender_id":"{sender}","tweet":{{"id_str":"{tweet_id}"}}}}"#)
    }

    #[test]
    fn most_recent_row_wins_per_sender() {
        let allow = allowlist(&["1", "2"]);
        let mut state = ScanState::new(&allow);
        // scanning backward: row 3 first
        state.observe(3, &row_json("1", "300"));
        state.observe(2, &row_json("1", "200"));
        state.observe(1, &row_json("2", "100"));

        let resolved = state.into_resolved();
        assert_eq!(resolved["1"].tweet_id, "300");
        assert_eq!(resolved["1"].row, 3);
        assert_eq!(resolved["2"].tweet_id, "100");
        assert_eq!(resolved["2"].row, 1);
    }

    #[test]
    fn ignores_senders_outside_the_allowlist() {
        let allow = allowlist(&["1"]);
        let mut state = ScanState::new(&allow);
        state.observe(2, &row_json("99", "900"));
        state.observe(1, &row_json("1", "100"));

        let resolved = state.into_resolved();
        assert_eq!(resolved.len(), 1);
        assert!(resolved.contains_key("1"));
    }

    #[test]
    fn complete_once_every_sender_resolved() {
        let allow = allowlist(&["1", "2"]);
        let mut state = ScanState::new(&allow);
        assert!(!state.is_complete());
        state.observe(2, &row_json("1", "100"));
        assert!(!state.is_complete());
        state.observe(1, &row_json("2", "200"));
        assert!(state.is_complete());
    }

    #[test]
    fn empty_allowlist_is_complete_immediately() {
        let allow = allowlist(&[]);
        let state = ScanState::new(&allow);
        assert!(state.is_complete());
    }

    #[test]
    fn malformed_rows_are_skipped_not_fatal() {
        let allow = allowlist(&["1"]);
        let mut state = ScanState::new(&allow);
        state.observe(2, "{corrupt");
        state.observe(1, &row_json("1", "100"));

        let resolved = state.into_resolved();
        assert_eq!(resolved["1"].row, 1);
    }

    #[test]
    fn row_without_tweet_resolves_with_empty_id() {
        let allow = allowlist(&["1"]);
        let mut state = ScanState::new(&allow);
        state.observe(1, r#"{"sender_id":"1","notes":"manual row"}"#);
        assert!(state.is_complete());
        assert_eq!(state.into_resolved()["1"].tweet_id, "");
    }
}
