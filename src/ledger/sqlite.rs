use super::traits::{Ledger, LedgerEntry};
use crate::error::LedgerError;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::path::Path;

const MAX_CONNECTIONS: u32 = 4;

/// SQLite-backed ledger for single-host deployments.
pub struct SqliteLedger {
    pool: SqlitePool,
    table: String,
    /// Double-quoted identifier, safe to splice into statements.
    quoted: String,
}

impl SqliteLedger {
    pub async fn open(path: &Path, table: &str) -> Result<Self, LedgerError> {
        let quoted = quote_table_name(table)?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| LedgerError::Schema {
                    table: table.to_string(),
                    message: format!("create {}: {e}", parent.display()),
                })?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);
        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await
            .map_err(|e| LedgerError::BackendUnavailable(format!("{}: {e}", path.display())))?;

        Ok(Self {
            pool,
            table: table.to_string(),
            quoted,
        })
    }
}

/// Table names come from config, so only a conservative character set is accepted.
fn quote_table_name(table: &str) -> Result<String, LedgerError> {
    let valid = !table.is_empty()
        && table
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.');
    if !valid {
        return Err(LedgerError::Schema {
            table: table.to_string(),
            message: "table name may only contain [A-Za-z0-9_.-]".into(),
        });
    }
    Ok(format!("\"{table}\""))
}

#[async_trait]
impl Ledger for SqliteLedger {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn ensure_schema(&self) -> Result<(), LedgerError> {
        let create = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id         TEXT PRIMARY KEY,
                created_at INTEGER NOT NULL
            )",
            self.quoted
        );
        sqlx::query(&create)
            .execute(&self.pool)
            .await
            .map_err(|e| LedgerError::Schema {
                table: self.table.clone(),
                message: e.to_string(),
            })?;

        let index = format!(
            "CREATE INDEX IF NOT EXISTS \"idx_{}_created_at\" ON {}(created_at)",
            self.table, self.quoted
        );
        sqlx::query(&index)
            .execute(&self.pool)
            .await
            .map_err(|e| LedgerError::Schema {
                table: self.table.clone(),
                message: e.to_string(),
            })?;

        Ok(())
    }

    async fn upsert(&self, entry: &LedgerEntry) -> Result<(), LedgerError> {
        let sql = format!(
            "INSERT INTO {} (id, created_at) VALUES (?1, ?2)
             ON CONFLICT(id) DO UPDATE SET created_at = excluded.created_at",
            self.quoted
        );
        sqlx::query(&sql)
            .bind(&entry.id)
            .bind(entry.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| LedgerError::Write {
                id: entry.id.clone(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    async fn scan_older_than(&self, cutoff: i64) -> Result<Vec<LedgerEntry>, LedgerError> {
        let sql = format!(
            "SELECT id, created_at FROM {} WHERE created_at <= ?1",
            self.quoted
        );
        let rows = sqlx::query(&sql)
            .bind(cutoff)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| LedgerError::Scan(e.to_string()))?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row
                .try_get("id")
                .map_err(|e| LedgerError::Malformed(e.to_string()))?;
            let created_at: i64 = row
                .try_get("created_at")
                .map_err(|e| LedgerError::Malformed(e.to_string()))?;
            entries.push(LedgerEntry { id, created_at });
        }
        Ok(entries)
    }

    async fn delete_by_key(&self, id: &str) -> Result<(), LedgerError> {
        let sql = format!("DELETE FROM {} WHERE id = ?1", self.quoted);
        sqlx::query(&sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| LedgerError::Delete {
                id: id.to_string(),
                message: e.to_string(),
            })?;
        Ok(())
    }
}
