//! Content-scan verdict storage. Latest verdict wins.

use serde::{Deserialize, Serialize};
use sqlx::Row;

use crate::ports::ScanVerdict;

use super::{Shard, ShardError};

/// Max rows one scan list returns.
const MAX_LIST: u32 = 1000;

/// What kind of content a scan verdict covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanContentType {
    Paste,
    Kv,
    Memory,
}

impl ScanContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanContentType::Paste => "paste",
            ScanContentType::Kv => "kv",
            ScanContentType::Memory => "memory",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "paste" => Some(ScanContentType::Paste),
            "kv" => Some(ScanContentType::Kv),
            "memory" => Some(ScanContentType::Memory),
            _ => None,
        }
    }
}

/// A stored verdict.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRecord {
    pub content_id: String,
    pub content_type: String,
    pub safe: bool,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub scanned_at: i64,
}

impl Shard {
    /// Upserts a verdict for one content id.
    pub async fn scan_store(
        &self,
        content_id: &str,
        content_type: ScanContentType,
        verdict: &ScanVerdict,
    ) -> Result<(), ShardError> {
        if content_id.is_empty() {
            return Err(ShardError::invalid("content id must not be empty"));
        }

        sqlx::query(
            r#"
            INSERT INTO content_scans (content_id, content_type, safe, confidence, reason, scanned_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(content_id) DO UPDATE SET
                content_type = excluded.content_type,
                safe = excluded.safe,
                confidence = excluded.confidence,
                reason = excluded.reason,
                scanned_at = excluded.scanned_at
            "#,
        )
        .bind(content_id)
        .bind(content_type.as_str())
        .bind(verdict.safe)
        .bind(verdict.confidence)
        .bind(&verdict.reason)
        .bind(Self::now_secs())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Reads the verdict for one content id.
    pub async fn scan_get(&self, content_id: &str) -> Result<Option<ScanRecord>, ShardError> {
        let row = sqlx::query(
            "SELECT content_id, content_type, safe, confidence, reason, scanned_at
             FROM content_scans WHERE content_id = ?1",
        )
        .bind(content_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(row_to_record))
    }

    /// Lists verdicts, optionally filtered by content type and safety.
    pub async fn scan_list(
        &self,
        content_type: Option<ScanContentType>,
        safe_only: bool,
        limit: u32,
    ) -> Result<Vec<ScanRecord>, ShardError> {
        let limit = limit.clamp(1, MAX_LIST) as i64;

        let rows = match content_type {
            Some(ct) => {
                sqlx::query(
                    "SELECT content_id, content_type, safe, confidence, reason, scanned_at
                     FROM content_scans
                     WHERE content_type = ?1 AND (?2 = 0 OR safe = 1)
                     ORDER BY scanned_at DESC LIMIT ?3",
                )
                .bind(ct.as_str())
                .bind(safe_only as i64)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT content_id, content_type, safe, confidence, reason, scanned_at
                     FROM content_scans
                     WHERE (?1 = 0 OR safe = 1)
                     ORDER BY scanned_at DESC LIMIT ?2",
                )
                .bind(safe_only as i64)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows.into_iter().map(row_to_record).collect())
    }
}

fn row_to_record(row: sqlx::sqlite::SqliteRow) -> ScanRecord {
    ScanRecord {
        content_id: row.get("content_id"),
        content_type: row.get("content_type"),
        safe: row.get::<i64, _>("safe") != 0,
        confidence: row.get("confidence"),
        reason: row.get("reason"),
        scanned_at: row.get("scanned_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::shard;
    use super::*;

    #[tokio::test]
    async fn store_and_get_round_trips() {
        let shard = shard().await;
        shard
            .scan_store("paste-1", ScanContentType::Paste, &ScanVerdict::new(true, 0.9, "fine"))
            .await
            .unwrap();

        let record = shard.scan_get("paste-1").await.unwrap().unwrap();
        assert!(record.safe);
        assert!((record.confidence - 0.9).abs() < 1e-9);
        assert_eq!(record.content_type, "paste");
    }

    #[tokio::test]
    async fn latest_verdict_wins() {
        let shard = shard().await;
        shard
            .scan_store("id", ScanContentType::Kv, &ScanVerdict::new(true, 0.5, "first"))
            .await
            .unwrap();
        shard
            .scan_store("id", ScanContentType::Kv, &ScanVerdict::new(false, 0.8, "second"))
            .await
            .unwrap();

        let record = shard.scan_get("id").await.unwrap().unwrap();
        assert!(!record.safe);
        assert_eq!(record.reason.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn list_filters() {
        let shard = shard().await;
        shard
            .scan_store("p1", ScanContentType::Paste, &ScanVerdict::new(true, 1.0, "ok"))
            .await
            .unwrap();
        shard
            .scan_store("p2", ScanContentType::Paste, &ScanVerdict::new(false, 1.0, "bad"))
            .await
            .unwrap();
        shard
            .scan_store("k1", ScanContentType::Kv, &ScanVerdict::new(true, 1.0, "ok"))
            .await
            .unwrap();

        let pastes = shard.scan_list(Some(ScanContentType::Paste), false, 100).await.unwrap();
        assert_eq!(pastes.len(), 2);

        let safe_pastes = shard.scan_list(Some(ScanContentType::Paste), true, 100).await.unwrap();
        assert_eq!(safe_pastes.len(), 1);
        assert_eq!(safe_pastes[0].content_id, "p1");

        let all = shard.scan_list(None, false, 100).await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn content_type_parses() {
        assert_eq!(ScanContentType::parse("paste"), Some(ScanContentType::Paste));
        assert_eq!(ScanContentType::parse("kv"), Some(ScanContentType::Kv));
        assert_eq!(ScanContentType::parse("memory"), Some(ScanContentType::Memory));
        assert_eq!(ScanContentType::parse("other"), None);
    }
}
