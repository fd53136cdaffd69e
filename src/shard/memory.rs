//! Vector memory subsystem.
//!
//! Items carry caller-provided embeddings; search is a full scan with
//! cosine similarity. Upserts preserve `created_at` and bump
//! `updated_at`, so `updated_at >= created_at` always holds.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::Row;

use super::{Shard, ShardError};

/// Max results one search returns.
const MAX_SEARCH: u32 = 100;
/// Max rows one list returns.
const MAX_LIST: u32 = 1000;

/// An item to store or as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryItem {
    pub id: String,
    pub text: String,
    pub embedding: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

/// A search hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredMemory {
    pub id: String,
    pub text: String,
    pub similarity: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

/// Cosine similarity of two vectors. Mismatched lengths or a zero
/// magnitude on either side yield 0.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0;
    let mut mag_a = 0.0;
    let mut mag_b = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        mag_a += x * x;
        mag_b += y * y;
    }
    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }
    dot / (mag_a.sqrt() * mag_b.sqrt())
}

impl Shard {
    /// Upserts items by id. Every embedding must be non-empty.
    pub async fn memory_store(&self, items: &[MemoryItem]) -> Result<usize, ShardError> {
        if items.is_empty() {
            return Err(ShardError::invalid("store requires at least one item"));
        }
        for item in items {
            if item.id.is_empty() {
                return Err(ShardError::invalid("item id must not be empty"));
            }
            if item.embedding.is_empty() {
                return Err(ShardError::invalid(format!(
                    "item {} has an empty embedding",
                    item.id
                )));
            }
            if item.embedding.iter().any(|v| !v.is_finite()) {
                return Err(ShardError::invalid(format!(
                    "item {} has a non-finite embedding component",
                    item.id
                )));
            }
        }

        let now = Self::now_secs();
        for item in items {
            let embedding_text =
                serde_json::to_string(&item.embedding).expect("vector serializes");
            let metadata_text = item.metadata.as_ref().map(Value::to_string);
            sqlx::query(
                r#"
                INSERT INTO memory_items (id, text, embedding, metadata, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                ON CONFLICT(id) DO UPDATE SET
                    text = excluded.text,
                    embedding = excluded.embedding,
                    metadata = excluded.metadata,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(&item.id)
            .bind(&item.text)
            .bind(embedding_text)
            .bind(metadata_text)
            .bind(now)
            .execute(&self.pool)
            .await?;
        }
        Ok(items.len())
    }

    /// Full-scan cosine search. Results satisfy `similarity >=
    /// threshold`, sorted descending, truncated to `limit` (clamped to
    /// 100). `threshold` is clamped into `[0, 1]`.
    pub async fn memory_search(
        &self,
        query: &[f64],
        limit: u32,
        threshold: f64,
    ) -> Result<Vec<ScoredMemory>, ShardError> {
        if query.is_empty() {
            return Err(ShardError::invalid("query embedding must not be empty"));
        }
        let limit = limit.clamp(1, MAX_SEARCH) as usize;
        let threshold = if threshold.is_finite() {
            threshold.clamp(0.0, 1.0)
        } else {
            0.0
        };

        let rows = sqlx::query("SELECT id, text, embedding, metadata FROM memory_items")
            .fetch_all(&self.pool)
            .await?;

        let mut hits: Vec<ScoredMemory> = Vec::new();
        for row in rows {
            let embedding_text: String = row.try_get("embedding")?;
            let embedding: Vec<f64> = serde_json::from_str(&embedding_text)
                .map_err(|e| ShardError::Database(format!("corrupt embedding: {e}")))?;
            let similarity = cosine_similarity(query, &embedding);
            if similarity < threshold {
                continue;
            }
            let metadata_text: Option<String> = row.try_get("metadata")?;
            let metadata = metadata_text
                .map(|m| serde_json::from_str(&m))
                .transpose()
                .map_err(|e| ShardError::Database(format!("corrupt metadata: {e}")))?;
            hits.push(ScoredMemory {
                id: row.try_get("id")?,
                text: row.try_get("text")?,
                similarity,
                metadata,
            });
        }

        hits.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(limit);
        Ok(hits)
    }

    /// Deletes by id, reporting the ids that actually existed.
    pub async fn memory_delete(&self, ids: &[String]) -> Result<Vec<String>, ShardError> {
        if ids.is_empty() {
            return Err(ShardError::invalid("delete requires at least one id"));
        }

        let mut deleted = Vec::new();
        for id in ids {
            let result = sqlx::query("DELETE FROM memory_items WHERE id = ?1")
                .bind(id)
                .execute(&self.pool)
                .await?;
            if result.rows_affected() > 0 {
                deleted.push(id.clone());
            }
        }
        Ok(deleted)
    }

    /// Lists items by insertion id order. `limit` clamps to 1000.
    pub async fn memory_list(
        &self,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<MemoryItem>, ShardError> {
        let limit = limit.clamp(1, MAX_LIST) as i64;

        let rows = sqlx::query(
            "SELECT id, text, embedding, metadata, created_at, updated_at
             FROM memory_items ORDER BY id LIMIT ?1 OFFSET ?2",
        )
        .bind(limit)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let embedding_text: String = row.try_get("embedding")?;
                let embedding: Vec<f64> = serde_json::from_str(&embedding_text)
                    .map_err(|e| ShardError::Database(format!("corrupt embedding: {e}")))?;
                let metadata_text: Option<String> = row.try_get("metadata")?;
                let metadata = metadata_text
                    .map(|m| serde_json::from_str(&m))
                    .transpose()
                    .map_err(|e| ShardError::Database(format!("corrupt metadata: {e}")))?;
                Ok(MemoryItem {
                    id: row.try_get("id")?,
                    text: row.try_get("text")?,
                    embedding,
                    metadata,
                    created_at: row.try_get("created_at")?,
                    updated_at: row.try_get("updated_at")?,
                })
            })
            .collect()
    }

    /// Removes every memory item. Returns rows removed.
    pub async fn memory_clear(&self) -> Result<u64, ShardError> {
        let result = sqlx::query("DELETE FROM memory_items")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::shard;
    use super::*;
    use serde_json::json;

    fn item(id: &str, embedding: Vec<f64>) -> MemoryItem {
        MemoryItem {
            id: id.to_string(),
            text: format!("text-{id}"),
            embedding,
            metadata: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn cosine_basics() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]), 1.0);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn cosine_degenerate_inputs_are_zero() {
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[tokio::test]
    async fn store_and_exact_search_round_trips() {
        let shard = shard().await;
        shard.memory_store(&[item("1", vec![1.0, 0.0, 0.0])]).await.unwrap();

        let hits = shard.memory_search(&[1.0, 0.0, 0.0], 10, 0.99).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "1");
        assert!((hits[0].similarity - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn search_filters_and_orders() {
        let shard = shard().await;
        shard
            .memory_store(&[
                item("exact", vec![1.0, 0.0]),
                item("close", vec![0.9, 0.1]),
                item("orthogonal", vec![0.0, 1.0]),
            ])
            .await
            .unwrap();

        let hits = shard.memory_search(&[1.0, 0.0], 10, 0.5).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "exact");
        assert_eq!(hits[1].id, "close");
        assert!(hits[0].similarity >= hits[1].similarity);
        assert!(hits.iter().all(|h| h.similarity >= 0.5));
    }

    #[tokio::test]
    async fn threshold_zero_returns_up_to_limit() {
        let shard = shard().await;
        shard
            .memory_store(&[
                item("a", vec![1.0, 0.0]),
                item("b", vec![0.0, 1.0]),
                item("c", vec![0.5, 0.5]),
            ])
            .await
            .unwrap();

        let hits = shard.memory_search(&[1.0, 0.0], 2, 0.0).await.unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[tokio::test]
    async fn threshold_one_returns_exact_matches_only() {
        let shard = shard().await;
        shard
            .memory_store(&[item("exact", vec![2.0, 0.0]), item("near", vec![0.99, 0.1])])
            .await
            .unwrap();

        let hits = shard.memory_search(&[1.0, 0.0], 10, 1.0).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "exact");
    }

    #[tokio::test]
    async fn upsert_preserves_created_at() {
        let shard = shard().await;
        shard.memory_store(&[item("1", vec![1.0])]).await.unwrap();

        sqlx::query("UPDATE memory_items SET created_at = 100 WHERE id = '1'")
            .execute(&shard.pool)
            .await
            .unwrap();

        shard.memory_store(&[item("1", vec![0.5])]).await.unwrap();
        let items = shard.memory_list(10, 0).await.unwrap();
        assert_eq!(items[0].created_at, 100);
        assert!(items[0].updated_at >= items[0].created_at);
        assert_eq!(items[0].embedding, vec![0.5]);
    }

    #[tokio::test]
    async fn delete_reports_actual_set() {
        let shard = shard().await;
        shard
            .memory_store(&[item("a", vec![1.0]), item("b", vec![1.0])])
            .await
            .unwrap();

        let deleted = shard
            .memory_delete(&["a".into(), "ghost".into()])
            .await
            .unwrap();
        assert_eq!(deleted, vec!["a".to_string()]);
    }

    #[tokio::test]
    async fn list_paginates_and_clear_empties() {
        let shard = shard().await;
        for i in 0..5 {
            shard
                .memory_store(&[item(&format!("{i}"), vec![1.0])])
                .await
                .unwrap();
        }

        let page = shard.memory_list(2, 2).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].id, "2");

        let removed = shard.memory_clear().await.unwrap();
        assert_eq!(removed, 5);
        assert!(shard.memory_list(10, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejects_invalid_items() {
        let shard = shard().await;
        assert!(shard.memory_store(&[]).await.is_err());
        assert!(shard.memory_store(&[item("x", vec![])]).await.is_err());
        assert!(shard
            .memory_store(&[item("x", vec![f64::NAN])])
            .await
            .is_err());

        let mut bad = item("ok", vec![1.0]);
        bad.id = String::new();
        assert!(shard.memory_store(&[bad]).await.is_err());

        assert!(shard.memory_search(&[], 10, 0.0).await.is_err());
    }

    #[tokio::test]
    async fn metadata_round_trips() {
        let shard = shard().await;
        let mut with_meta = item("m", vec![1.0]);
        with_meta.metadata = Some(json!({"source": "test"}));
        shard.memory_store(&[with_meta]).await.unwrap();

        let hits = shard.memory_search(&[1.0], 1, 0.0).await.unwrap();
        assert_eq!(hits[0].metadata, Some(json!({"source": "test"})));
    }
}
