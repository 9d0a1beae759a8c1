use serde::{Deserialize, Serialize};

/// User-delegated OAuth1 token pair, persisted by the login callback and
/// re-read at the start of every poll cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserToken {
    pub token: String,
    pub secret: String,
}
