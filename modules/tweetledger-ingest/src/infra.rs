use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;

use tweetledger_common::UserToken;

use crate::traits::{AllowList, CredentialStore};

/// Allow-list sourced from the process environment: every variable named
/// `ALLOWLIST_<sender_id>` maps that sender id to a display handle.
/// Re-enumerated on every call, never cached.
pub struct EnvAllowList {
    prefix: String,
}

impl EnvAllowList {
    pub fn new() -> Self {
        Self::with_prefix("ALLOWLIST_")
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for EnvAllowList {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AllowList for EnvAllowList {
    async fn senders(&self) -> Result<BTreeMap<String, String>> {
        Ok(std::env::vars()
            .filter_map(|(key, value)| {
                key.strip_prefix(&self.prefix)
                    .map(|id| (id.to_string(), value))
            })
            .collect())
    }
}

/// JSON file holding the user-delegated token. Written by the login
/// callback, re-read at the start of every poll cycle.
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn user_token(&self) -> Result<UserToken> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("reading credentials from {}", self.path.display()))?;
        serde_json::from_str(&raw).context("parsing stored credentials")
    }

    async fn store_user_token(&self, token: &UserToken) -> Result<()> {
        let raw = serde_json::to_string_pretty(token).context("serializing credentials")?;
        tokio::fs::write(&self.path, raw)
            .await
            .with_context(|| format!("writing credentials to {}", self.path.display()))?;
        Ok(())
    }
}
