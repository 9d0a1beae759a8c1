use serde::{Deserialize, Serialize};

/// One page of the DM event feed.
#[derive(Debug, Clone, Deserialize)]
pub struct DmPage {
    #[serde(default)]
    pub events: Vec<DmEvent>,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// A direct-message event as returned by `direct_messages/events/list`.
///
/// `created_timestamp` is epoch milliseconds as a decimal string; it is
/// never parsed, only compared (length, then value) to order messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DmEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    pub created_timestamp: String,
    /// Present only for `message_create` events.
    #[serde(rename = "message_create", default, skip_serializing_if = "Option::is_none")]
    pub message: Option<DmMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DmMessage {
    pub sender_id: String,
    pub message_data: MessageData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageData {
    pub text: String,
    #[serde(default)]
    pub entities: Entities,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Entities {
    #[serde(default)]
    pub urls: Vec<UrlEntity>,
}

/// A shortened URL inside a message or tweet, with its code-point span
/// `[start, end)` into the surrounding text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlEntity {
    pub url: String,
    pub expanded_url: String,
    pub indices: [usize; 2],
}

/// Temporary token pair from the `oauth/request_token` step.
#[derive(Debug, Clone)]
pub struct RequestToken {
    pub token: String,
    pub secret: String,
}

/// Result of the `oauth/access_token` exchange. Carries the authenticated
/// user's identity alongside the delegated token pair.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub secret: String,
    pub user_id: String,
    pub screen_name: String,
}
