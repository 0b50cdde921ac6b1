use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The subset of a Mastodon account the reaper cares about.
///
/// `acct` is the webfinger handle relative to the instance: `alice` for local
/// accounts, `alice@remote.example` for remote ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub acct: String,
    #[serde(default)]
    pub username: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Unlisted,
    /// Followers-only.
    Private,
    Direct,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub visibility: Visibility,
    pub account: Account,
}

/// A decoded frame from the user stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A new status appeared on the home timeline.
    Update(Box<Status>),
    /// A status was deleted; carries its id.
    Delete(String),
    /// A frame this agent has no use for (notifications, edits, filters...).
    Other(String),
    /// Transport keep-alive (ping/pong). Proves the connection is still live.
    Heartbeat,
    /// The stream broke; the connection must be re-established.
    Error(String),
}

impl StreamEvent {
    pub fn kind(&self) -> &str {
        match self {
            Self::Update(_) => "update",
            Self::Delete(_) => "delete",
            Self::Other(kind) => kind,
            Self::Heartbeat => "heartbeat",
            Self::Error(_) => "error",
        }
    }
}
