//! Per-payer isolated storage shards.
//!
//! One SQLite database per payer address, opened lazily and pooled with
//! a single connection so every operation within a shard is serialized.
//! Schema initialization happens under the manager's guard: no request
//! can observe a shard with partial schema. Cross-shard operations do
//! not exist; the shard *is* the identity.

mod error;
mod kv;
mod lock;
mod memory;
mod paste;
mod queue;
mod scans;
mod schema;
mod sqlbox;
mod usage;

pub use error::ShardError;
pub use kv::{KvEntry, KvSetOptions, KvSetOutcome};
pub use lock::{LockAcquire, LockInfo};
pub use memory::{cosine_similarity, MemoryItem, ScoredMemory};
pub use paste::Paste;
pub use queue::{QueueJob, QueueStatus};
pub use scans::{ScanContentType, ScanRecord};
pub use schema::{is_reserved_table, RESERVED_TABLES};
pub use sqlbox::{ExecuteOutput, QueryOutput, TableInfo};
pub use usage::{DailyUsage, UsageRecord};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Handle to one payer's shard. Cheap to clone; all methods are defined
/// in the per-subsystem modules.
#[derive(Clone)]
pub struct Shard {
    pub(crate) pool: SqlitePool,
}

impl Shard {
    /// Unix seconds now.
    pub(crate) fn now_secs() -> i64 {
        chrono::Utc::now().timestamp()
    }

    /// Unix milliseconds now; queue FIFO ordering needs sub-second
    /// resolution.
    pub(crate) fn now_millis() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Where shard databases live.
enum ShardStorage {
    /// One `<address>.db` file per payer under a directory.
    Directory(PathBuf),
    /// Ephemeral in-memory shards, for tests and dev.
    Memory,
}

/// Creates, caches, and hands out payer shards.
pub struct ShardManager {
    storage: ShardStorage,
    // Also the initialization guard: a shard is inserted only after its
    // schema is fully applied.
    shards: Mutex<HashMap<String, Shard>>,
}

impl ShardManager {
    /// Manager backed by per-payer database files under `data_dir`, or
    /// in-memory shards when `data_dir` is `:memory:`.
    pub fn new(data_dir: &str) -> Arc<Self> {
        let storage = if data_dir == ":memory:" {
            ShardStorage::Memory
        } else {
            ShardStorage::Directory(PathBuf::from(data_dir))
        };
        Arc::new(Self { storage, shards: Mutex::new(HashMap::new()) })
    }

    /// Ephemeral manager for tests.
    pub fn in_memory() -> Arc<Self> {
        Self::new(":memory:")
    }

    /// Returns the payer's shard, creating and initializing it on first
    /// use.
    pub async fn shard_for(&self, payer: &str) -> Result<Shard, ShardError> {
        let key = sanitize_payer(payer)?;

        let mut shards = self.shards.lock().await;
        if let Some(shard) = shards.get(&key) {
            return Ok(shard.clone());
        }

        let options = match &self.storage {
            ShardStorage::Memory => SqliteConnectOptions::new().filename(":memory:"),
            ShardStorage::Directory(dir) => {
                tokio::fs::create_dir_all(dir)
                    .await
                    .map_err(|e| ShardError::Database(format!("create data dir: {e}")))?;
                SqliteConnectOptions::new()
                    .filename(dir.join(format!("{key}.db")))
                    .create_if_missing(true)
                    .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            }
        };

        // One connection per shard: the pool serializes all operations.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        for ddl in schema::SCHEMA {
            sqlx::query(ddl).execute(&pool).await?;
        }

        let shard = Shard { pool };
        shards.insert(key, shard.clone());
        Ok(shard)
    }
}

/// Normalizes a payer address into a shard key. Addresses are c32, so
/// uppercase alphanumerics only; anything else cannot name a shard (and
/// cannot traverse paths).
fn sanitize_payer(payer: &str) -> Result<String, ShardError> {
    let key = payer.trim().to_ascii_uppercase();
    if key.len() < 3 || key.len() > 64 {
        return Err(ShardError::InvalidPayer(payer.to_string()));
    }
    if !key.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ShardError::InvalidPayer(payer.to_string()));
    }
    Ok(key)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// In-memory shard for one well-formed payer address.
    pub(crate) async fn shard() -> Shard {
        ShardManager::in_memory()
            .shard_for("SP2J6ZY48GV1EZ5V2V5RB9MP66SW86PYKKNRV9EJ7")
            .await
            .unwrap()
    }

    /// Two distinct in-memory shards from one manager.
    pub(crate) async fn two_shards() -> (Shard, Shard) {
        let manager = ShardManager::in_memory();
        let a = manager
            .shard_for("SP2J6ZY48GV1EZ5V2V5RB9MP66SW86PYKKNRV9EJ7")
            .await
            .unwrap();
        let b = manager
            .shard_for("SP000000000000000000002Q6VF78")
            .await
            .unwrap();
        (a, b)
    }
}
