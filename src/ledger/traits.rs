use crate::error::LedgerError;
use async_trait::async_trait;

/// One watched post awaiting deferred deletion.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LedgerEntry {
    pub id: String,
    /// Unix seconds.
    pub created_at: i64,
}

impl LedgerEntry {
    pub fn new(id: impl Into<String>, created_at: i64) -> Self {
        Self {
            id: id.into(),
            created_at,
        }
    }
}

/// Durable table of posts pending deletion, keyed by post id.
///
/// Implementations rely on the store's own single-key atomicity; callers never
/// hold locks across calls.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &str;

    /// Verify the backing table exists, creating it if needed. Idempotent.
    async fn ensure_schema(&self) -> Result<(), LedgerError>;

    /// Insert or replace the entry with the same id.
    async fn upsert(&self, entry: &LedgerEntry) -> Result<(), LedgerError>;

    /// Every entry with `created_at <= cutoff`, in backend order.
    /// All-or-nothing: an error means no entries should be acted on.
    async fn scan_older_than(&self, cutoff: i64) -> Result<Vec<LedgerEntry>, LedgerError>;

    /// Remove one entry. Deleting an absent id is not an error.
    async fn delete_by_key(&self, id: &str) -> Result<(), LedgerError>;
}
