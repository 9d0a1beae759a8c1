//! In-memory doubles for the engine's collaborator seams. No network, no
//! spreadsheet; `cargo test` in milliseconds.
#![allow(dead_code)] // each test binary uses its own slice of the harness

use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

use tweetledger_ingest::traits::{FeedError, ItemFetcher, MessageFeed, TabularStore};
use twitter_client::{DmEvent, DmMessage, DmPage, Entities, MessageData, UrlEntity};

// ---------------------------------------------------------------------------
// MemStore
// ---------------------------------------------------------------------------

/// In-memory spreadsheet: a fixed header plus mutable data rows.
pub struct MemStore {
    header: Vec<String>,
    rows: Mutex<Vec<Vec<String>>>,
    pub updates: Mutex<u32>,
    pub appends: Mutex<u32>,
    fail_writes: bool,
}

impl MemStore {
    pub fn new(header: &[&str]) -> Self {
        Self {
            header: header.iter().map(|s| s.to_string()).collect(),
            rows: Mutex::new(Vec::new()),
            updates: Mutex::new(0),
            appends: Mutex::new(0),
            fail_writes: false,
        }
    }

    pub fn with_rows(self, rows: Vec<Vec<String>>) -> Self {
        *self.rows.lock().unwrap() = rows;
        self
    }

    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    pub fn rows(&self) -> Vec<Vec<String>> {
        self.rows.lock().unwrap().clone()
    }

    pub fn update_count(&self) -> u32 {
        *self.updates.lock().unwrap()
    }

    pub fn append_count(&self) -> u32 {
        *self.appends.lock().unwrap()
    }
}

#[async_trait]
impl TabularStore for MemStore {
    async fn header(&self) -> Result<Vec<String>> {
        Ok(self.header.clone())
    }

    async fn column(&self, col: usize) -> Result<Vec<String>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .map(|row| row.get(col - 1).cloned().unwrap_or_default())
            .collect())
    }

    async fn data_rows(&self) -> Result<Vec<Vec<String>>> {
        Ok(self.rows.lock().unwrap().clone())
    }

    async fn update_row(&self, row: usize, values: Vec<String>) -> Result<()> {
        if self.fail_writes {
            return Err(anyhow!("simulated write failure"));
        }
        let mut rows = self.rows.lock().unwrap();
        let slot = rows
            .get_mut(row - 1)
            .ok_or_else(|| anyhow!("row {row} out of range"))?;
        *slot = values;
        *self.updates.lock().unwrap() += 1;
        Ok(())
    }

    async fn append_row(&self, values: Vec<String>) -> Result<()> {
        if self.fail_writes {
            return Err(anyhow!("simulated write failure"));
        }
        self.rows.lock().unwrap().push(values);
        *self.appends.lock().unwrap() += 1;
        Ok(())
    }

    async fn overwrite_rows(&self, rows: Vec<Vec<String>>) -> Result<()> {
        if self.fail_writes {
            return Err(anyhow!("simulated write failure"));
        }
        *self.rows.lock().unwrap() = rows;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockFeed
// ---------------------------------------------------------------------------

/// Serves a fixed sequence of pages; optionally throttles before the next
/// page is handed out.
pub struct MockFeed {
    pages: Mutex<VecDeque<DmPage>>,
    throttles_remaining: Mutex<u32>,
    pub calls: Mutex<u32>,
}

impl MockFeed {
    pub fn new(pages: Vec<DmPage>) -> Self {
        Self {
            pages: Mutex::new(pages.into()),
            throttles_remaining: Mutex::new(0),
            calls: Mutex::new(0),
        }
    }

    pub fn single_page(events: Vec<DmEvent>) -> Self {
        Self::new(vec![DmPage {
            events,
            next_cursor: None,
        }])
    }

    pub fn throttling_first(self, times: u32) -> Self {
        *self.throttles_remaining.lock().unwrap() = times;
        self
    }

    pub fn call_count(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl MessageFeed for MockFeed {
    async fn events_page(&self, _cursor: Option<&str>) -> Result<DmPage, FeedError> {
        *self.calls.lock().unwrap() += 1;
        {
            let mut throttles = self.throttles_remaining.lock().unwrap();
            if *throttles > 0 {
                *throttles -= 1;
                return Err(FeedError::RateLimited);
            }
        }
        self.pages
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| FeedError::Other(anyhow!("mock feed exhausted")))
    }
}

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

pub struct MockFetcher {
    tweets: BTreeMap<u64, Value>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self {
            tweets: BTreeMap::new(),
        }
    }

    pub fn with_tweet(mut self, id: u64, tweet: Value) -> Self {
        self.tweets.insert(id, tweet);
        self
    }
}

#[async_trait]
impl ItemFetcher for MockFetcher {
    async fn fetch_item(&self, id: u64) -> Result<Value> {
        self.tweets
            .get(&id)
            .cloned()
            .ok_or_else(|| anyhow!("tweet {id} not found"))
    }
}

// ---------------------------------------------------------------------------
// Fixture builders
// ---------------------------------------------------------------------------

pub fn allowlist(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
    entries
        .iter()
        .map(|(id, handle)| (id.to_string(), handle.to_string()))
        .collect()
}

/// A plain note message with no URL entities.
pub fn note(sender: &str, ts: &str, text: &str) -> DmEvent {
    event(sender, ts, text, Vec::new())
}

/// A message whose single entity links to tweet `tweet_id`.
pub fn anchor(sender: &str, ts: &str, tweet_id: &str) -> DmEvent {
    let text = "https://t.co/link".to_string();
    let urls = vec![UrlEntity {
        url: "https://t.co/link".to_string(),
        expanded_url: format!("https://twitter.com/someone/status/{tweet_id}"),
        indices: [0, 17],
    }];
    event(sender, ts, &text, urls)
}

pub fn event(sender: &str, ts: &str, text: &str, urls: Vec<UrlEntity>) -> DmEvent {
    DmEvent {
        kind: "message_create".to_string(),
        id: ts.to_string(),
        created_timestamp: ts.to_string(),
        message: Some(DmMessage {
            sender_id: sender.to_string(),
            message_data: MessageData {
                text: text.to_string(),
                entities: Entities { urls },
            },
        }),
    }
}

pub fn tweet(id: &str, screen_name: &str, text: &str) -> Value {
    json!({
        "id_str": id,
        "full_text": text,
        "user": {"screen_name": screen_name},
        "entities": {"urls": []}
    })
}

/// The header used across tests; mirrors a typical sheet layout.
pub const HEADER: &[&str] = &[
    "sender_id",
    "sender_username",
    "tweet.id_str",
    "mentions",
    "text",
    "url",
    "notes",
    "json",
];
