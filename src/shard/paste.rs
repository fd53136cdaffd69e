//! Paste subsystem: content-addressed blobs with random short ids,
//! immutable after create.

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Serialize;
use sqlx::Row;

use super::{Shard, ShardError};

/// Paste id length.
const ID_LEN: usize = 8;

/// Max content size accepted (1 MiB).
const MAX_CONTENT: usize = 1024 * 1024;

/// A stored paste.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Paste {
    pub id: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub created_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

fn random_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ID_LEN)
        .map(char::from)
        .collect()
}

impl Shard {
    /// Creates a paste and returns its 8-character id.
    pub async fn paste_create(
        &self,
        content: &str,
        title: Option<&str>,
        language: Option<&str>,
        ttl_secs: Option<i64>,
    ) -> Result<Paste, ShardError> {
        if content.is_empty() {
            return Err(ShardError::invalid("content must not be empty"));
        }
        if content.len() > MAX_CONTENT {
            return Err(ShardError::invalid("content exceeds 1 MiB"));
        }
        if let Some(ttl) = ttl_secs {
            if ttl <= 0 {
                return Err(ShardError::invalid("ttl must be positive"));
            }
        }

        let now = Self::now_secs();
        self.paste_sweep(now).await?;
        let expires_at = ttl_secs.map(|ttl| now + ttl);

        // Id collisions are vanishingly rare but not impossible; retry a
        // few times before giving up.
        for _ in 0..4 {
            let id = random_id();
            let result = sqlx::query(
                "INSERT INTO pastes (id, content, title, language, created_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(id) DO NOTHING",
            )
            .bind(&id)
            .bind(content)
            .bind(title)
            .bind(language)
            .bind(now)
            .bind(expires_at)
            .execute(&self.pool)
            .await?;

            if result.rows_affected() == 1 {
                return Ok(Paste {
                    id,
                    content: content.to_string(),
                    title: title.map(String::from),
                    language: language.map(String::from),
                    created_at: now,
                    expires_at,
                });
            }
        }
        Err(ShardError::Database("paste id space exhausted".into()))
    }

    /// Reads one paste, or `None` if absent or expired.
    pub async fn paste_get(&self, id: &str) -> Result<Option<Paste>, ShardError> {
        self.paste_sweep(Self::now_secs()).await?;

        let row = sqlx::query(
            "SELECT id, content, title, language, created_at, expires_at
             FROM pastes WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| Paste {
            id: row.get("id"),
            content: row.get("content"),
            title: row.get("title"),
            language: row.get("language"),
            created_at: row.get("created_at"),
            expires_at: row.get("expires_at"),
        }))
    }

    /// Deletes one paste; true if a live row was removed.
    pub async fn paste_delete(&self, id: &str) -> Result<bool, ShardError> {
        self.paste_sweep(Self::now_secs()).await?;

        let result = sqlx::query("DELETE FROM pastes WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn paste_sweep(&self, now: i64) -> Result<(), ShardError> {
        sqlx::query("DELETE FROM pastes WHERE expires_at IS NOT NULL AND expires_at <= ?1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
