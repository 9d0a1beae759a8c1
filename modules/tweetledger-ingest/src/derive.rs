//! Fields derived from a tweet payload and from a cluster's messages.
//!
//! Derivation is path-based over the raw JSON so it works the same whether
//! the tweet was fetched this cycle or decoded out of a stored row during
//! rebuild.

use serde_json::Value;
use tracing::warn;

use twitter_client::{DmEvent, UrlEntity};

use crate::codec::Record;
use crate::expand::expand_entities;
use crate::reference::references_tweet;

pub struct Derived {
    pub text: String,
    pub mentions: String,
    pub url: String,
}

/// Compute the derived fields for one tweet: display text with entity URLs
/// expanded and the leading @mention run split off, plus the permalink.
pub fn derived_fields(tweet: &Value) -> Derived {
    let raw_text = tweet
        .get("full_text")
        .and_then(Value::as_str)
        .or_else(|| tweet.get("text").and_then(Value::as_str))
        .unwrap_or("");
    let expanded = expand_entities(raw_text, &tweet_urls(tweet));
    let (mentions, text) = split_leading_mentions(&expanded);

    let screen_name = tweet
        .pointer("/user/screen_name")
        .and_then(Value::as_str)
        .unwrap_or("");
    let id_str = tweet.get("id_str").and_then(Value::as_str).unwrap_or("");

    Derived {
        text,
        mentions,
        url: format!("https://twitter.com/{screen_name}/status/{id_str}"),
    }
}

/// Insert the derived fields into `record`, replacing any stored values.
pub fn apply_derived(record: &mut Record, tweet: &Value) {
    let derived = derived_fields(tweet);
    record.insert("text".to_string(), Value::String(derived.text));
    record.insert("mentions".to_string(), Value::String(derived.mentions));
    record.insert("url".to_string(), Value::String(derived.url));
}

/// Render a cluster's notes: each message's text with the anchor's own
/// permalink substituted away and every other URL expanded, newline-joined.
pub fn cluster_notes(cluster: &[DmEvent], anchor_id: &str) -> String {
    let mut lines = Vec::with_capacity(cluster.len());
    for event in cluster {
        let Some(message) = event.message.as_ref() else {
            continue;
        };
        let data = &message.message_data;
        let entities: Vec<UrlEntity> = data
            .entities
            .urls
            .iter()
            .map(|u| {
                let mut u = u.clone();
                if references_tweet(&u.expanded_url, anchor_id) {
                    u.expanded_url = String::new();
                }
                u
            })
            .collect();
        lines.push(expand_entities(&data.text, &entities));
    }
    lines.join("\n")
}

fn tweet_urls(tweet: &Value) -> Vec<UrlEntity> {
    let Some(urls) = tweet.pointer("/entities/urls") else {
        return Vec::new();
    };
    match serde_json::from_value(urls.clone()) {
        Ok(urls) => urls,
        Err(e) => {
            warn!(error = %e, "tweet url entities do not parse; leaving text unexpanded");
            Vec::new()
        }
    }
}

/// Split the leading run of `@handle` tokens off the front of `text`.
fn split_leading_mentions(text: &str) -> (String, String) {
    let mut mentions: Vec<&str> = Vec::new();
    let mut rest = text.trim_start();
    while rest.starts_with('@') && rest.len() > 1 {
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        mentions.push(&rest[..end]);
        rest = rest[end..].trim_start();
    }
    (mentions.join(" "), rest.to_string())
}
