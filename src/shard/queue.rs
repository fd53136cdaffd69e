//! Priority queue subsystem.
//!
//! Jobs pop in `(priority DESC, created ASC)` order; equal priorities
//! are FIFO. Pop removes the selected jobs atomically. A hygiene step on
//! every pop/peek/status returns `processing` jobs whose visibility
//! window has elapsed to `pending` and increments their attempt count.

use serde::Serialize;
use serde_json::Value;
use sqlx::Row;

use super::{Shard, ShardError};

/// Max jobs one pop/peek returns.
const MAX_POP: u32 = 100;

/// Max items in one push.
const MAX_PUSH: usize = 100;

/// A queued job.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueJob {
    pub id: i64,
    pub queue: String,
    pub payload: Value,
    pub priority: i64,
    pub attempts: i64,
    pub created_at: i64,
}

/// Queue depth by state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStatus {
    pub pending: i64,
    pub processing: i64,
    pub total: i64,
}

fn validate_queue_name(queue: &str) -> Result<(), ShardError> {
    if queue.is_empty() || queue.len() > 256 {
        return Err(ShardError::invalid("queue name must be 1..=256 bytes"));
    }
    Ok(())
}

impl Shard {
    /// Pushes items onto a queue. Returns the number enqueued.
    pub async fn queue_push(
        &self,
        queue: &str,
        items: &[Value],
        priority: i64,
    ) -> Result<usize, ShardError> {
        validate_queue_name(queue)?;
        if items.is_empty() {
            return Err(ShardError::invalid("push requires at least one item"));
        }
        if items.len() > MAX_PUSH {
            return Err(ShardError::invalid("push accepts at most 100 items"));
        }

        let now = Self::now_millis();
        for item in items {
            sqlx::query(
                "INSERT INTO queue_jobs (queue, payload, priority, status, attempts, created_at)
                 VALUES (?1, ?2, ?3, 'pending', 0, ?4)",
            )
            .bind(queue)
            .bind(item.to_string())
            .bind(priority)
            .bind(now)
            .execute(&self.pool)
            .await?;
        }
        Ok(items.len())
    }

    /// Atomically removes and returns up to `count` pending jobs in
    /// priority order. `count` is clamped to 100.
    pub async fn queue_pop(&self, queue: &str, count: u32) -> Result<Vec<QueueJob>, ShardError> {
        validate_queue_name(queue)?;
        self.queue_reclaim(queue).await?;
        let count = count.clamp(1, MAX_POP) as i64;

        let mut tx = self.pool.begin().await?;
        let rows = sqlx::query(
            "SELECT id, queue, payload, priority, attempts, created_at
             FROM queue_jobs
             WHERE queue = ?1 AND status = 'pending'
             ORDER BY priority DESC, created_at ASC, id ASC
             LIMIT ?2",
        )
        .bind(queue)
        .bind(count)
        .fetch_all(&mut *tx)
        .await?;

        let jobs: Vec<QueueJob> = rows
            .into_iter()
            .map(row_to_job)
            .collect::<Result<_, _>>()?;

        for job in &jobs {
            sqlx::query("DELETE FROM queue_jobs WHERE id = ?1")
                .bind(job.id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        Ok(jobs)
    }

    /// Returns up to `count` pending jobs in pop order without removing
    /// them.
    pub async fn queue_peek(&self, queue: &str, count: u32) -> Result<Vec<QueueJob>, ShardError> {
        validate_queue_name(queue)?;
        self.queue_reclaim(queue).await?;
        let count = count.clamp(1, MAX_POP) as i64;

        let rows = sqlx::query(
            "SELECT id, queue, payload, priority, attempts, created_at
             FROM queue_jobs
             WHERE queue = ?1 AND status = 'pending'
             ORDER BY priority DESC, created_at ASC, id ASC
             LIMIT ?2",
        )
        .bind(queue)
        .bind(count)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_job).collect()
    }

    /// Counts jobs by state.
    pub async fn queue_status(&self, queue: &str) -> Result<QueueStatus, ShardError> {
        validate_queue_name(queue)?;
        self.queue_reclaim(queue).await?;

        let row = sqlx::query(
            "SELECT
                COUNT(*) FILTER (WHERE status = 'pending') AS pending,
                COUNT(*) FILTER (WHERE status = 'processing') AS processing,
                COUNT(*) AS total
             FROM queue_jobs WHERE queue = ?1",
        )
        .bind(queue)
        .fetch_one(&self.pool)
        .await?;

        Ok(QueueStatus {
            pending: row.get("pending"),
            processing: row.get("processing"),
            total: row.get("total"),
        })
    }

    /// Clears a queue, optionally only one state. Returns rows removed.
    pub async fn queue_clear(
        &self,
        queue: &str,
        status: Option<&str>,
    ) -> Result<u64, ShardError> {
        validate_queue_name(queue)?;
        if let Some(status) = status {
            if !matches!(status, "pending" | "processing") {
                return Err(ShardError::invalid("status must be pending or processing"));
            }
        }

        let result = match status {
            Some(status) => {
                sqlx::query("DELETE FROM queue_jobs WHERE queue = ?1 AND status = ?2")
                    .bind(queue)
                    .bind(status)
                    .execute(&self.pool)
                    .await?
            }
            None => {
                sqlx::query("DELETE FROM queue_jobs WHERE queue = ?1")
                    .bind(queue)
                    .execute(&self.pool)
                    .await?
            }
        };
        Ok(result.rows_affected())
    }

    /// Visibility-timeout hygiene: processing jobs whose window elapsed
    /// go back to pending with one more attempt on the clock.
    async fn queue_reclaim(&self, queue: &str) -> Result<(), ShardError> {
        sqlx::query(
            "UPDATE queue_jobs
             SET status = 'pending', attempts = attempts + 1, visible_at = NULL
             WHERE queue = ?1 AND status = 'processing'
               AND visible_at IS NOT NULL AND visible_at <= ?2",
        )
        .bind(queue)
        .bind(Self::now_millis())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn row_to_job(row: sqlx::sqlite::SqliteRow) -> Result<QueueJob, ShardError> {
    let payload_text: String = row.try_get("payload")?;
    let payload = serde_json::from_str(&payload_text)
        .map_err(|e| ShardError::Database(format!("corrupt queue payload: {e}")))?;
    Ok(QueueJob {
        id: row.try_get("id")?,
        queue: row.try_get("queue")?,
        payload,
        priority: row.try_get("priority")?,
        attempts: row.try_get("attempts")?,
        created_at: row.try_get("created_at")?,
    })
}
