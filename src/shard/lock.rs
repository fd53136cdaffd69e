//! Distributed lock subsystem.
//!
//! A lock is held by whoever presents its holder token. Acquisition
//! succeeds iff no unexpired row exists; expired rows are swept lazily
//! on every operation. TTLs are clamped into `[10, 300]` seconds.

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Serialize;
use sqlx::Row;

use super::{Shard, ShardError};

/// Default lock TTL, seconds.
const DEFAULT_TTL: i64 = 60;
/// Lock TTL bounds.
const MIN_TTL: i64 = 10;
const MAX_TTL: i64 = 300;
/// Holder token length.
const TOKEN_LEN: usize = 32;

/// Outcome of an acquire attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LockAcquire {
    pub acquired: bool,
    /// Holder token, present on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Expiry of the newly acquired lock.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    /// When the current holder's claim lapses, on contention.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub held_until: Option<i64>,
}

/// A lock row as reported by status/list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LockInfo {
    pub name: String,
    pub acquired_at: i64,
    pub expires_at: i64,
}

fn random_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

fn clamp_ttl(ttl: Option<i64>) -> i64 {
    ttl.unwrap_or(DEFAULT_TTL).clamp(MIN_TTL, MAX_TTL)
}

impl Shard {
    /// Attempts to acquire `name`. Returns the holder token on success,
    /// or the current holder's expiry on contention.
    pub async fn lock_acquire(
        &self,
        name: &str,
        ttl_secs: Option<i64>,
    ) -> Result<LockAcquire, ShardError> {
        if name.is_empty() || name.len() > 256 {
            return Err(ShardError::invalid("lock name must be 1..=256 bytes"));
        }

        let now = Self::now_secs();
        self.lock_sweep(now).await?;

        let ttl = clamp_ttl(ttl_secs);
        let token = random_token();
        let expires_at = now + ttl;

        let result = sqlx::query(
            "INSERT INTO sync_locks (name, holder_token, acquired_at, expires_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(name) DO NOTHING",
        )
        .bind(name)
        .bind(&token)
        .bind(now)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(LockAcquire {
                acquired: true,
                token: Some(token),
                expires_at: Some(expires_at),
                held_until: None,
            });
        }

        let held_until: Option<(i64,)> =
            sqlx::query_as("SELECT expires_at FROM sync_locks WHERE name = ?1")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;
        Ok(LockAcquire {
            acquired: false,
            token: None,
            expires_at: None,
            held_until: held_until.map(|(at,)| at),
        })
    }

    /// Releases `name` if `token` matches the holder. Returns whether a
    /// lock was released.
    pub async fn lock_release(&self, name: &str, token: &str) -> Result<bool, ShardError> {
        self.lock_sweep(Self::now_secs()).await?;

        let result = sqlx::query(
            "DELETE FROM sync_locks WHERE name = ?1 AND holder_token = ?2",
        )
        .bind(name)
        .bind(token)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Extends an unexpired lock held by `token`. Returns the new expiry,
    /// or `None` when the token does not match or the lock has lapsed.
    pub async fn lock_extend(
        &self,
        name: &str,
        token: &str,
        ttl_secs: Option<i64>,
    ) -> Result<Option<i64>, ShardError> {
        let now = Self::now_secs();
        self.lock_sweep(now).await?;

        let ttl = clamp_ttl(ttl_secs);
        let new_expiry = now + ttl;

        let result = sqlx::query(
            "UPDATE sync_locks SET expires_at = ?1
             WHERE name = ?2 AND holder_token = ?3 AND expires_at > ?4",
        )
        .bind(new_expiry)
        .bind(name)
        .bind(token)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok((result.rows_affected() > 0).then_some(new_expiry))
    }

    /// Reports whether `name` is currently held.
    pub async fn lock_status(&self, name: &str) -> Result<Option<LockInfo>, ShardError> {
        self.lock_sweep(Self::now_secs()).await?;

        let row = sqlx::query(
            "SELECT name, acquired_at, expires_at FROM sync_locks WHERE name = ?1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| LockInfo {
            name: row.get("name"),
            acquired_at: row.get("acquired_at"),
            expires_at: row.get("expires_at"),
        }))
    }

    /// Lists all currently held locks.
    pub async fn lock_list(&self) -> Result<Vec<LockInfo>, ShardError> {
        self.lock_sweep(Self::now_secs()).await?;

        let rows = sqlx::query(
            "SELECT name, acquired_at, expires_at FROM sync_locks ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| LockInfo {
                name: row.get("name"),
                acquired_at: row.get("acquired_at"),
                expires_at: row.get("expires_at"),
            })
            .collect())
    }

    async fn lock_sweep(&self, now: i64) -> Result<(), ShardError> {
        sqlx::query("DELETE FROM sync_locks WHERE expires_at <= ?1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::shard;
    use super::*;

    #[tokio::test]
    async fn acquire_release_reacquire() {
        let shard = shard().await;

        let first = shard.lock_acquire("job", None).await.unwrap();
        assert!(first.acquired);
        let token = first.token.unwrap();
        assert_eq!(token.len(), 32);

        let released = shard.lock_release("job", &token).await.unwrap();
        assert!(released);

        let second = shard.lock_acquire("job", None).await.unwrap();
        assert!(second.acquired);
    }

    #[tokio::test]
    async fn contention_reports_held_until() {
        let shard = shard().await;
        let first = shard.lock_acquire("job", Some(30)).await.unwrap();
        assert!(first.acquired);

        let second = shard.lock_acquire("job", None).await.unwrap();
        assert!(!second.acquired);
        assert!(second.token.is_none());
        assert_eq!(second.held_until, first.expires_at);
    }

    #[tokio::test]
    async fn release_requires_matching_token() {
        let shard = shard().await;
        shard.lock_acquire("job", None).await.unwrap();

        assert!(!shard.lock_release("job", "wrong-token").await.unwrap());
        assert!(shard.lock_status("job").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn expired_locks_can_be_reacquired() {
        let shard = shard().await;
        let first = shard.lock_acquire("job", Some(30)).await.unwrap();
        assert!(first.acquired);

        // Lapse the lock.
        sqlx::query("UPDATE sync_locks SET expires_at = 1 WHERE name = 'job'")
            .execute(&shard.pool)
            .await
            .unwrap();

        let second = shard.lock_acquire("job", None).await.unwrap();
        assert!(second.acquired);
    }

    #[tokio::test]
    async fn extend_requires_live_lock_and_token() {
        let shard = shard().await;
        let acquire = shard.lock_acquire("job", Some(30)).await.unwrap();
        let token = acquire.token.unwrap();

        let extended = shard.lock_extend("job", &token, Some(120)).await.unwrap();
        assert!(extended.is_some());
        assert!(extended.unwrap() > acquire.expires_at.unwrap());

        assert!(shard.lock_extend("job", "wrong", Some(120)).await.unwrap().is_none());

        // Expired lock cannot be extended.
        sqlx::query("UPDATE sync_locks SET expires_at = 1 WHERE name = 'job'")
            .execute(&shard.pool)
            .await
            .unwrap();
        assert!(shard.lock_extend("job", &token, Some(120)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn ttl_is_clamped_into_bounds() {
        let shard = shard().await;
        let now = Shard::now_secs();

        let low = shard.lock_acquire("low", Some(1)).await.unwrap();
        let expiry = low.expires_at.unwrap();
        assert!((expiry - now - MIN_TTL).abs() <= 1, "ttl below 10 clamps to 10");

        let high = shard.lock_acquire("high", Some(9999)).await.unwrap();
        let expiry = high.expires_at.unwrap();
        assert!((expiry - now - MAX_TTL).abs() <= 1, "ttl above 300 clamps to 300");
    }

    #[tokio::test]
    async fn list_shows_live_locks_only() {
        let shard = shard().await;
        shard.lock_acquire("a", None).await.unwrap();
        shard.lock_acquire("b", None).await.unwrap();

        sqlx::query("UPDATE sync_locks SET expires_at = 1 WHERE name = 'a'")
            .execute(&shard.pool)
            .await
            .unwrap();

        let locks = shard.lock_list().await.unwrap();
        assert_eq!(locks.len(), 1);
        assert_eq!(locks[0].name, "b");
    }
}
