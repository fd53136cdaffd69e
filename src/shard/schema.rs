//! Shard schema.
//!
//! Every payer database carries the same tables. The schema is stable:
//! migrations append columns, never reinterpret existing ones. Reserved
//! tables are non-addressable from the SQL sandbox.

/// Tables the SQL sandbox may never drop, alter, or shadow.
pub const RESERVED_TABLES: [&str; 8] = [
    "kv_store",
    "pastes",
    "sync_locks",
    "queue_jobs",
    "memory_items",
    "content_scans",
    "usage_records",
    "usage_daily",
];

/// DDL executed at shard birth, inside the initialization guard.
pub const SCHEMA: [&str; 10] = [
    "CREATE TABLE IF NOT EXISTS kv_store (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL,
        metadata TEXT,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL,
        expires_at INTEGER
    )",
    "CREATE TABLE IF NOT EXISTS pastes (
        id TEXT PRIMARY KEY,
        content TEXT NOT NULL,
        title TEXT,
        language TEXT,
        created_at INTEGER NOT NULL,
        expires_at INTEGER
    )",
    "CREATE TABLE IF NOT EXISTS sync_locks (
        name TEXT PRIMARY KEY,
        holder_token TEXT NOT NULL,
        acquired_at INTEGER NOT NULL,
        expires_at INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS queue_jobs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        queue TEXT NOT NULL,
        payload TEXT NOT NULL,
        priority INTEGER NOT NULL DEFAULT 0,
        status TEXT NOT NULL DEFAULT 'pending',
        attempts INTEGER NOT NULL DEFAULT 0,
        created_at INTEGER NOT NULL,
        visible_at INTEGER
    )",
    "CREATE INDEX IF NOT EXISTS idx_queue_jobs_order
        ON queue_jobs (queue, status, priority DESC, created_at ASC)",
    "CREATE TABLE IF NOT EXISTS memory_items (
        id TEXT PRIMARY KEY,
        text TEXT NOT NULL,
        embedding TEXT NOT NULL,
        metadata TEXT,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS content_scans (
        content_id TEXT PRIMARY KEY,
        content_type TEXT NOT NULL,
        safe INTEGER NOT NULL,
        confidence REAL NOT NULL,
        reason TEXT,
        scanned_at INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS usage_records (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        endpoint TEXT NOT NULL,
        category TEXT NOT NULL,
        token TEXT NOT NULL,
        amount TEXT NOT NULL,
        transaction_id TEXT,
        created_at INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_usage_records_created
        ON usage_records (created_at)",
    "CREATE TABLE IF NOT EXISTS usage_daily (
        day TEXT NOT NULL,
        token TEXT NOT NULL,
        requests INTEGER NOT NULL DEFAULT 0,
        revenue TEXT NOT NULL DEFAULT '0',
        PRIMARY KEY (day, token)
    )",
];

/// True when `name` (any case) addresses a reserved table.
pub fn is_reserved_table(name: &str) -> bool {
    let lowered = name.to_ascii_lowercase();
    lowered.starts_with("sqlite_") || RESERVED_TABLES.contains(&lowered.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_detection_is_case_insensitive() {
        assert!(is_reserved_table("kv_store"));
        assert!(is_reserved_table("KV_STORE"));
        assert!(is_reserved_table("sqlite_master"));
        assert!(!is_reserved_table("my_table"));
    }

    #[test]
    fn every_reserved_table_has_ddl() {
        for table in RESERVED_TABLES {
            assert!(
                SCHEMA.iter().any(|ddl| ddl.contains(table)),
                "missing DDL for {table}"
            );
        }
    }
}
