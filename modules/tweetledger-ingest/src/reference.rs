use std::sync::LazyLock;

use regex::Regex;

use twitter_client::{DmEvent, UrlEntity};

/// Tweet permalink: `/<handle>/status/<digits>`, optionally followed by a
/// trailer that starts with a non-digit (query string, `/photo/1`, ...).
static TWEET_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https://twitter\.com/[^/]+/status/([0-9]+)([^0-9].*)?$").unwrap()
});

/// Tweet id referenced by the first permalink entity, if any. Later
/// entities are not examined once one matches.
pub fn tweet_id_from_entities(urls: &[UrlEntity]) -> Option<String> {
    urls.iter()
        .find_map(|u| TWEET_ID_RE.captures(&u.expanded_url).map(|c| c[1].to_string()))
}

pub fn tweet_id_from_event(event: &DmEvent) -> Option<String> {
    let message = event.message.as_ref()?;
    tweet_id_from_entities(&message.message_data.entities.urls)
}

/// True when `url` is a permalink of tweet `id`.
pub fn references_tweet(url: &str, id: &str) -> bool {
    TWEET_ID_RE
        .captures(url)
        .is_some_and(|c| &c[1] == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(expanded: &str) -> UrlEntity {
        UrlEntity {
            url: "https://t.co/x".to_string(),
            expanded_url: expanded.to_string(),
            indices: [0, 14],
        }
    }

    #[test]
    fn extracts_id_from_plain_permalink() {
        let urls = [entity("https://twitter.com/alice/status/12345")];
        assert_eq!(tweet_id_from_entities(&urls).as_deref(), Some("12345"));
    }

    #[test]
    fn extracts_id_with_query_trailer() {
        let urls = [entity("https://twitter.com/alice/status/12345?s=20")];
        assert_eq!(tweet_id_from_entities(&urls).as_deref(), Some("12345"));
    }

    #[test]
    fn rejects_non_permalink_urls() {
        assert_eq!(tweet_id_from_entities(&[entity("https://example.com/page")]), None);
        assert_eq!(
            tweet_id_from_entities(&[entity("https://twitter.com/alice/status/")]),
            None
        );
        assert_eq!(
            tweet_id_from_entities(&[entity("https://twitter.com/alice/likes")]),
            None
        );
    }

    #[test]
    fn first_matching_entity_wins() {
        let urls = [
            entity("https://example.com/not-a-tweet"),
            entity("https://twitter.com/a/status/111"),
            entity("https://twitter.com/b/status/222"),
        ];
        assert_eq!(tweet_id_from_entities(&urls).as_deref(), Some("111"));
    }

    #[test]
    fn references_tweet_matches_only_that_id() {
        assert!(references_tweet("https://twitter.com/a/status/99", "99"));
        assert!(references_tweet("https://twitter.com/a/status/99?s=20", "99"));
        assert!(!references_tweet("https://twitter.com/a/status/99", "9"));
        assert!(!references_tweet("https://example.com/99", "99"));
    }
}
