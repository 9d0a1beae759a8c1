// Trait abstractions for the collaborators the engine only knows by
// contract: the message feed, the item fetch, the tabular store, and the
// credential/allow-list sources.
//
// The concrete clients implement these right here; tests swap in mocks.
// No network, no spreadsheet.

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use tweetledger_common::UserToken;
use twitter_client::{DmPage, TwitterClient, TwitterError};

/// Feed errors the orchestrator tells apart: throttling is retried in
/// place, anything else aborts the cycle.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("rate limited by the message feed")]
    RateLimited,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[async_trait]
pub trait MessageFeed: Send + Sync {
    /// Fetch one page of message events. `None` requests the newest page.
    async fn events_page(&self, cursor: Option<&str>) -> Result<DmPage, FeedError>;
}

#[async_trait]
pub trait ItemFetcher: Send + Sync {
    /// Fetch one tweet by numeric id, as its raw JSON payload.
    async fn fetch_item(&self, id: u64) -> Result<Value>;
}

/// The spreadsheet, addressed by row/column within the data region.
/// Row numbers are 1-based and exclude the header row.
#[async_trait]
pub trait TabularStore: Send + Sync {
    async fn header(&self) -> Result<Vec<String>>;

    /// All data-region values of one 1-based column, as text.
    async fn column(&self, col: usize) -> Result<Vec<String>>;

    /// The whole data region, row-major.
    async fn data_rows(&self) -> Result<Vec<Vec<String>>>;

    /// Overwrite one data row across exactly `values.len()` columns.
    async fn update_row(&self, row: usize, values: Vec<String>) -> Result<()>;

    /// Append one row after the current last data row.
    async fn append_row(&self, values: Vec<String>) -> Result<()>;

    /// Replace the whole data region in a single write.
    async fn overwrite_rows(&self, rows: Vec<Vec<String>>) -> Result<()>;
}

#[async_trait]
pub trait AllowList: Send + Sync {
    /// Sender id → display handle for every sender allowed to file tweets.
    async fn senders(&self) -> Result<BTreeMap<String, String>>;
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn user_token(&self) -> Result<UserToken>;
    async fn store_user_token(&self, token: &UserToken) -> Result<()>;
}

#[async_trait]
impl MessageFeed for TwitterClient {
    async fn events_page(&self, cursor: Option<&str>) -> Result<DmPage, FeedError> {
        self.dm_events(cursor).await.map_err(|e| match e {
            TwitterError::RateLimited => FeedError::RateLimited,
            other => FeedError::Other(other.into()),
        })
    }
}

#[async_trait]
impl ItemFetcher for TwitterClient {
    async fn fetch_item(&self, id: u64) -> Result<Value> {
        Ok(self.show_tweet(id).await?)
    }
}
