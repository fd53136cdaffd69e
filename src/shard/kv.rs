//! Key-value subsystem.
//!
//! Upsert semantics on set; `created_at` is preserved across overwrites.
//! Expired rows are swept lazily on every read path.

use serde::Serialize;
use serde_json::Value;
use sqlx::Row;

use super::{Shard, ShardError};

/// Maximum rows one list call returns.
const MAX_LIST: u32 = 1000;

/// Options for [`Shard::kv_set`].
#[derive(Debug, Clone, Default)]
pub struct KvSetOptions {
    pub metadata: Option<Value>,
    pub ttl_secs: Option<i64>,
}

/// A stored key-value row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KvEntry {
    pub key: String,
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

/// Outcome of a set: `created` is true iff the key did not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KvSetOutcome {
    pub created: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

impl Shard {
    /// Stores a value under `key`. Overwrites preserve `created_at`.
    pub async fn kv_set(
        &self,
        key: &str,
        value: Value,
        options: KvSetOptions,
    ) -> Result<KvSetOutcome, ShardError> {
        if key.is_empty() || key.len() > 512 {
            return Err(ShardError::invalid("key must be 1..=512 bytes"));
        }
        if let Some(ttl) = options.ttl_secs {
            if ttl <= 0 {
                return Err(ShardError::invalid("ttl must be positive"));
            }
        }

        let now = Self::now_secs();
        self.kv_sweep(now).await?;

        let existing: Option<(i64,)> =
            sqlx::query_as("SELECT created_at FROM kv_store WHERE key = ?1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        let created = existing.is_none();

        let expires_at = options.ttl_secs.map(|ttl| now + ttl);
        let value_text = value.to_string();
        let metadata_text = options.metadata.as_ref().map(Value::to_string);

        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value, metadata, created_at, updated_at, expires_at)
            VALUES (?1, ?2, ?3, ?4, ?4, ?5)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                metadata = excluded.metadata,
                updated_at = excluded.updated_at,
                expires_at = excluded.expires_at
            "#,
        )
        .bind(key)
        .bind(value_text)
        .bind(metadata_text)
        .bind(now)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(KvSetOutcome { created, expires_at })
    }

    /// Reads one key, or `None` if absent or expired.
    pub async fn kv_get(&self, key: &str) -> Result<Option<KvEntry>, ShardError> {
        self.kv_sweep(Self::now_secs()).await?;

        let row = sqlx::query(
            "SELECT key, value, metadata, created_at, updated_at, expires_at
             FROM kv_store WHERE key = ?1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_entry).transpose()
    }

    /// Deletes one key; true if a live row was removed.
    pub async fn kv_delete(&self, key: &str) -> Result<bool, ShardError> {
        self.kv_sweep(Self::now_secs()).await?;

        let result = sqlx::query("DELETE FROM kv_store WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Lists keys, optionally by prefix. `limit` is clamped to 1000.
    pub async fn kv_list(
        &self,
        prefix: Option<&str>,
        limit: u32,
    ) -> Result<Vec<KvEntry>, ShardError> {
        self.kv_sweep(Self::now_secs()).await?;
        let limit = limit.min(MAX_LIST).max(1) as i64;

        let rows = match prefix {
            Some(prefix) => {
                let pattern = format!("{}%", escape_like(prefix));
                sqlx::query(
                    "SELECT key, value, metadata, created_at, updated_at, expires_at
                     FROM kv_store WHERE key LIKE ?1 ESCAPE '\\'
                     ORDER BY key LIMIT ?2",
                )
                .bind(pattern)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT key, value, metadata, created_at, updated_at, expires_at
                     FROM kv_store ORDER BY key LIMIT ?1",
                )
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.into_iter().map(row_to_entry).collect()
    }

    async fn kv_sweep(&self, now: i64) -> Result<(), ShardError> {
        sqlx::query("DELETE FROM kv_store WHERE expires_at IS NOT NULL AND expires_at <= ?1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn row_to_entry(row: sqlx::sqlite::SqliteRow) -> Result<KvEntry, ShardError> {
    let value_text: String = row.try_get("value")?;
    let value = serde_json::from_str(&value_text)
        .map_err(|e| ShardError::Database(format!("corrupt kv value: {e}")))?;
    let metadata_text: Option<String> = row.try_get("metadata")?;
    let metadata = metadata_text
        .map(|m| serde_json::from_str(&m))
        .transpose()
        .map_err(|e| ShardError::Database(format!("corrupt kv metadata: {e}")))?;

    Ok(KvEntry {
        key: row.try_get("key")?,
        value,
        metadata,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        expires_at: row.try_get("expires_at")?,
    })
}
