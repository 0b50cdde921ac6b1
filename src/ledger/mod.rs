#[cfg(feature = "dynamodb")]
pub mod dynamodb;
pub mod sqlite;
pub mod traits;

#[cfg(feature = "dynamodb")]
pub use dynamodb::DynamoLedger;
pub use sqlite::SqliteLedger;
pub use traits::{Ledger, LedgerEntry};

use crate::config::{LedgerBackend, LedgerConfig};
use crate::error::LedgerError;
use std::sync::Arc;

/// Build the configured backend. The schema is not touched here; callers run
/// [`Ledger::ensure_schema`] during bootstrap.
pub async fn create_ledger(config: &LedgerConfig) -> Result<Arc<dyn Ledger>, LedgerError> {
    let ledger: Arc<dyn Ledger> = match config.backend {
        #[cfg(feature = "dynamodb")]
        LedgerBackend::Dynamodb => Arc::new(DynamoLedger::new(config).await),
        #[cfg(not(feature = "dynamodb"))]
        LedgerBackend::Dynamodb => {
            return Err(LedgerError::BackendUnavailable(
                "built without the 'dynamodb' feature".into(),
            ));
        }
        LedgerBackend::Sqlite => {
            Arc::new(SqliteLedger::open(&config.sqlite_path, &config.table).await?)
        }
    };
    tracing::info!(backend = ledger.name(), table = %config.table, "ledger ready");
    Ok(ledger)
}
