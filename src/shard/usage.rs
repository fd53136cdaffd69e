//! Per-payer usage records and daily aggregates.
//!
//! Written asynchronously by the usage recorder after a settled request;
//! best-effort semantics apply. Revenue aggregates are decimal strings
//! updated read-modify-write, which is safe under the shard's
//! single-connection serialization.

use serde::Serialize;
use sqlx::Row;

use super::{Shard, ShardError};

/// One settled request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageRecord {
    pub endpoint: String,
    pub category: String,
    pub token: String,
    pub amount: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    pub created_at: i64,
}

/// Daily aggregate per token.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyUsage {
    pub day: String,
    pub token: String,
    pub requests: i64,
    pub revenue: String,
}

impl Shard {
    /// Appends a usage record and folds it into the daily aggregate.
    pub async fn usage_record(
        &self,
        endpoint: &str,
        category: &str,
        token: &str,
        amount: u128,
        transaction_id: Option<&str>,
    ) -> Result<(), ShardError> {
        let now = chrono::Utc::now();
        let day = now.format("%Y-%m-%d").to_string();

        sqlx::query(
            "INSERT INTO usage_records (endpoint, category, token, amount, transaction_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(endpoint)
        .bind(category)
        .bind(token)
        .bind(amount.to_string())
        .bind(transaction_id)
        .bind(now.timestamp())
        .execute(&self.pool)
        .await?;

        let existing: Option<(i64, String)> = sqlx::query_as(
            "SELECT requests, revenue FROM usage_daily WHERE day = ?1 AND token = ?2",
        )
        .bind(&day)
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        let (requests, revenue) = match existing {
            Some((requests, revenue)) => {
                let prior: u128 = revenue.parse().unwrap_or(0);
                (requests + 1, prior.saturating_add(amount))
            }
            None => (1, amount),
        };

        sqlx::query(
            "INSERT INTO usage_daily (day, token, requests, revenue)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(day, token) DO UPDATE SET
                 requests = excluded.requests,
                 revenue = excluded.revenue",
        )
        .bind(&day)
        .bind(token)
        .bind(requests)
        .bind(revenue.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Most recent usage records, newest first.
    pub async fn usage_recent(&self, limit: u32) -> Result<Vec<UsageRecord>, ShardError> {
        let limit = limit.clamp(1, 1000) as i64;
        let rows = sqlx::query(
            "SELECT endpoint, category, token, amount, transaction_id, created_at
             FROM usage_records ORDER BY created_at DESC, id DESC LIMIT ?1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| UsageRecord {
                endpoint: row.get("endpoint"),
                category: row.get("category"),
                token: row.get("token"),
                amount: row.get("amount"),
                transaction_id: row.get("transaction_id"),
                created_at: row.get("created_at"),
            })
            .collect())
    }

    /// Daily aggregates, newest day first.
    pub async fn usage_daily(&self, limit: u32) -> Result<Vec<DailyUsage>, ShardError> {
        let limit = limit.clamp(1, 365) as i64;
        let rows = sqlx::query(
            "SELECT day, token, requests, revenue FROM usage_daily
             ORDER BY day DESC, token LIMIT ?1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| DailyUsage {
                day: row.get("day"),
                token: row.get("token"),
                requests: row.get("requests"),
                revenue: row.get("revenue"),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::shard;

    #[tokio::test]
    async fn records_accumulate_into_daily() {
        let shard = shard().await;
        shard
            .usage_record("/hashing/sha256", "hashing", "STX", 1000, Some("0xabc"))
            .await
            .unwrap();
        shard
            .usage_record("/hashing/sha512", "hashing", "STX", 500, None)
            .await
            .unwrap();
        shard
            .usage_record("/storage/kv", "storage", "sBTC", 1, None)
            .await
            .unwrap();

        let recent = shard.usage_recent(10).await.unwrap();
        assert_eq!(recent.len(), 3);

        let daily = shard.usage_daily(10).await.unwrap();
        assert_eq!(daily.len(), 2);
        let stx = daily.iter().find(|d| d.token == "STX").unwrap();
        assert_eq!(stx.requests, 2);
        assert_eq!(stx.revenue, "1500");
    }

    #[tokio::test]
    async fn amounts_survive_as_decimal_strings() {
        let shard = shard().await;
        let big = u128::MAX - 1;
        shard
            .usage_record("/x", "other", "sUSDT", big, None)
            .await
            .unwrap();

        let recent = shard.usage_recent(1).await.unwrap();
        assert_eq!(recent[0].amount, big.to_string());
    }
}
