use super::types::StreamEvent;
use crate::error::MastodonError;
use async_trait::async_trait;
use futures_util::stream::BoxStream;

/// Live sequence of stream events. Ends (or yields [`StreamEvent::Error`])
/// when the underlying connection is gone.
pub type EventStream = BoxStream<'static, StreamEvent>;

/// Source of real-time events for the watched account.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Open a fresh connection. Called again after every disconnect.
    async fn connect(&self) -> Result<EventStream, MastodonError>;
}

/// Remote status removal.
#[async_trait]
pub trait StatusDeleter: Send + Sync {
    /// Any error, including "already gone", is reported as `Err`.
    async fn delete_status(&self, id: &str) -> Result<(), MastodonError>;
}
