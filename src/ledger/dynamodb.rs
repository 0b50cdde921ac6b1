//! DynamoDB-backed ledger.
//!
//! Items are `{ id: S (hash key), created_at: N }`. Tables created by the
//! reaper use on-demand billing. Credentials come from the standard AWS chain
//! (environment, profile, instance role).

use super::traits::{Ledger, LedgerEntry};
use crate::config::LedgerConfig;
use crate::error::LedgerError;
use async_trait::async_trait;
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::types::{
    AttributeDefinition, AttributeValue, BillingMode, KeySchemaElement, KeyType,
    ScalarAttributeType, TableStatus,
};
use std::collections::HashMap;
use std::time::Duration;

const KEY_ATTR: &str = "id";
const CREATED_AT_ATTR: &str = "created_at";
const TABLE_ACTIVE_POLL: Duration = Duration::from_secs(2);
const TABLE_ACTIVE_ATTEMPTS: u32 = 30;

pub struct DynamoLedger {
    client: Client,
    table: String,
}

impl DynamoLedger {
    pub async fn new(config: &LedgerConfig) -> Self {
        let mut aws_config = aws_config::from_env();

        if let Some(region) = &config.region {
            aws_config = aws_config.region(aws_config::Region::new(region.clone()));
        }

        let aws_config = aws_config.load().await;

        let mut ddb_config = aws_sdk_dynamodb::config::Builder::from(&aws_config);

        if let Some(endpoint_url) = &config.endpoint_url {
            ddb_config = ddb_config.endpoint_url(endpoint_url);
        }

        Self::from_client(Client::from_conf(ddb_config.build()), &config.table)
    }

    pub fn from_client(client: Client, table: &str) -> Self {
        Self {
            client,
            table: table.to_string(),
        }
    }

    fn schema_error(&self, message: impl Into<String>) -> LedgerError {
        LedgerError::Schema {
            table: self.table.clone(),
            message: message.into(),
        }
    }

    async fn table_status(&self) -> Result<Option<TableStatus>, LedgerError> {
        let output = self
            .client
            .describe_table()
            .table_name(&self.table)
            .send()
            .await
            .map_err(|e| self.schema_error(e.into_service_error().to_string()))?;
        Ok(output.table().and_then(|t| t.table_status()).cloned())
    }

    async fn create_table(&self) -> Result<(), LedgerError> {
        let attribute = AttributeDefinition::builder()
            .attribute_name(KEY_ATTR)
            .attribute_type(ScalarAttributeType::S)
            .build()
            .map_err(|e| self.schema_error(e.to_string()))?;
        let key = KeySchemaElement::builder()
            .attribute_name(KEY_ATTR)
            .key_type(KeyType::Hash)
            .build()
            .map_err(|e| self.schema_error(e.to_string()))?;

        self.client
            .create_table()
            .table_name(&self.table)
            .attribute_definitions(attribute)
            .key_schema(key)
            .billing_mode(BillingMode::PayPerRequest)
            .send()
            .await
            .map_err(|e| self.schema_error(e.into_service_error().to_string()))?;

        for _ in 0..TABLE_ACTIVE_ATTEMPTS {
            if self.table_status().await? == Some(TableStatus::Active) {
                return Ok(());
            }
            tokio::time::sleep(TABLE_ACTIVE_POLL).await;
        }
        Err(self.schema_error("table did not become ACTIVE after creation"))
    }
}

/// Decode one scanned item. The key must be a string, matching how
/// `delete_by_key` addresses it.
pub(crate) fn entry_from_item(
    item: &HashMap<String, AttributeValue>,
) -> Result<LedgerEntry, LedgerError> {
    let id = match item.get(KEY_ATTR) {
        Some(AttributeValue::S(s)) => s.clone(),
        other => {
            return Err(LedgerError::Malformed(format!(
                "item without usable '{KEY_ATTR}': {other:?}"
            )));
        }
    };
    let created_at = item
        .get(CREATED_AT_ATTR)
        .and_then(|v| v.as_n().ok())
        .and_then(|n| n.parse::<i64>().ok())
        .ok_or_else(|| {
            LedgerError::Malformed(format!("item {id} without numeric '{CREATED_AT_ATTR}'"))
        })?;
    Ok(LedgerEntry { id, created_at })
}

#[async_trait]
impl Ledger for DynamoLedger {
    fn name(&self) -> &str {
        "dynamodb"
    }

    async fn ensure_schema(&self) -> Result<(), LedgerError> {
        match self.table_status().await {
            Ok(_) => Ok(()),
            Err(e) => {
                tracing::info!(table = %self.table, reason = %e, "ledger table not found, creating");
                self.create_table().await
            }
        }
    }

    async fn upsert(&self, entry: &LedgerEntry) -> Result<(), LedgerError> {
        self.client
            .put_item()
            .table_name(&self.table)
            .item(KEY_ATTR, AttributeValue::S(entry.id.clone()))
            .item(CREATED_AT_ATTR, AttributeValue::N(entry.created_at.to_string()))
            .send()
            .await
            .map_err(|e| LedgerError::Write {
                id: entry.id.clone(),
                message: e.into_service_error().to_string(),
            })?;
        Ok(())
    }

    async fn scan_older_than(&self, cutoff: i64) -> Result<Vec<LedgerEntry>, LedgerError> {
        let mut entries = Vec::new();
        let mut start_key: Option<HashMap<String, AttributeValue>> = None;

        loop {
            let output = self
                .client
                .scan()
                .table_name(&self.table)
                .filter_expression("created_at <= :cutoff")
                .expression_attribute_values(":cutoff", AttributeValue::N(cutoff.to_string()))
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| LedgerError::Scan(e.into_service_error().to_string()))?;

            for item in output.items() {
                match entry_from_item(item) {
                    Ok(entry) => entries.push(entry),
                    Err(e) => tracing::warn!(table = %self.table, error = %e, "skipping ledger item"),
                }
            }

            match output.last_evaluated_key() {
                Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                _ => break,
            }
        }

        Ok(entries)
    }

    async fn delete_by_key(&self, id: &str) -> Result<(), LedgerError> {
        self.client
            .delete_item()
            .table_name(&self.table)
            .key(KEY_ATTR, AttributeValue::S(id.to_string()))
            .send()
            .await
            .map_err(|e| LedgerError::Delete {
                id: id.to_string(),
                message: e.into_service_error().to_string(),
            })?;
        Ok(())
    }
}
