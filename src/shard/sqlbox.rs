//! SQL sandbox: guarded query/execute access to the shard's own
//! database.
//!
//! `query` is read-only: it must begin with SELECT and may not mention
//! any mutating keyword. `execute` permits mutating statements over user
//! tables but never PRAGMA, and never DROP/ALTER against the reserved
//! set. Reserved tables stay reachable through their typed subsystems
//! only.

use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row, TypeInfo, ValueRef};

use super::schema::is_reserved_table;
use super::{Shard, ShardError};

/// Keywords that disqualify a sandbox query.
const FORBIDDEN_IN_QUERY: [&str; 7] =
    ["DROP", "DELETE", "INSERT", "UPDATE", "CREATE", "ALTER", "PRAGMA"];

/// Result of a sandbox query.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryOutput {
    pub rows: Vec<Value>,
    pub row_count: usize,
    pub columns: Vec<String>,
}

/// Result of a sandbox execute.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteOutput {
    pub rows_affected: u64,
}

/// One user table from schema introspection.
#[derive(Debug, Clone, Serialize)]
pub struct TableInfo {
    pub name: String,
    pub sql: String,
}

/// Uppercased bare words of a statement, for keyword checks.
fn tokens(sql: &str) -> Vec<String> {
    sql.split(|c: char| !c.is_ascii_alphanumeric() && c != '_')
        .filter(|t| !t.is_empty())
        .map(|t| t.to_ascii_uppercase())
        .collect()
}

fn bind_params<'q>(
    mut query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    params: &'q [Value],
) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    for param in params {
        query = match param {
            Value::Null => query.bind(None::<String>),
            Value::Bool(b) => query.bind(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    query.bind(i)
                } else {
                    query.bind(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => query.bind(s.as_str()),
            // Arrays and objects bind as their JSON text.
            other => query.bind(other.to_string()),
        };
    }
    query
}

fn decode_column(row: &SqliteRow, idx: usize) -> Value {
    let Ok(raw) = row.try_get_raw(idx) else {
        return Value::Null;
    };
    if raw.is_null() {
        return Value::Null;
    }
    let type_name = raw.type_info().name().to_ascii_uppercase();

    match type_name.as_str() {
        "INTEGER" | "BOOLEAN" | "INT" | "BIGINT" => row
            .try_get::<i64, _>(idx)
            .map(Value::from)
            .unwrap_or(Value::Null),
        "REAL" | "NUMERIC" | "DOUBLE" | "FLOAT" => row
            .try_get::<f64, _>(idx)
            .map(Value::from)
            .unwrap_or(Value::Null),
        "BLOB" => row
            .try_get::<Vec<u8>, _>(idx)
            .map(|b| Value::String(format!("0x{}", hex::encode(b))))
            .unwrap_or(Value::Null),
        _ => row
            .try_get::<String, _>(idx)
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}

impl Shard {
    /// Runs a read-only query. Rejected with no execution when the
    /// statement is not a SELECT or mentions a forbidden keyword.
    pub async fn sql_query(
        &self,
        sql: &str,
        params: &[Value],
    ) -> Result<QueryOutput, ShardError> {
        let trimmed = sql.trim();
        if !trimmed.get(..6).map_or(false, |head| head.eq_ignore_ascii_case("select")) {
            return Err(ShardError::rejected("query must begin with SELECT"));
        }
        let words = tokens(trimmed);
        for keyword in FORBIDDEN_IN_QUERY {
            if words.iter().any(|w| w == keyword) {
                return Err(ShardError::rejected(format!(
                    "query must not contain {keyword}"
                )));
            }
        }

        let rows = bind_params(sqlx::query(trimmed), params)
            .fetch_all(&self.pool)
            .await?;

        let columns: Vec<String> = rows
            .first()
            .map(|row| row.columns().iter().map(|c| c.name().to_string()).collect())
            .unwrap_or_default();

        let decoded: Vec<Value> = rows
            .iter()
            .map(|row| {
                let mut object = Map::new();
                for (idx, column) in row.columns().iter().enumerate() {
                    object.insert(column.name().to_string(), decode_column(row, idx));
                }
                Value::Object(object)
            })
            .collect();

        Ok(QueryOutput { row_count: decoded.len(), rows: decoded, columns })
    }

    /// Runs a mutating statement over user tables. PRAGMA is always
    /// rejected; DROP/ALTER are rejected when they touch reserved
    /// tables.
    pub async fn sql_execute(
        &self,
        sql: &str,
        params: &[Value],
    ) -> Result<ExecuteOutput, ShardError> {
        let trimmed = sql.trim();
        let words = tokens(trimmed);

        if words.iter().any(|w| w == "PRAGMA") {
            return Err(ShardError::rejected("PRAGMA is not allowed"));
        }
        if words.iter().any(|w| w == "DROP" || w == "ALTER")
            && words.iter().any(|w| is_reserved_table(w))
        {
            return Err(ShardError::rejected(
                "DROP/ALTER may not target reserved tables",
            ));
        }
        // Writes through the sandbox may not address reserved tables at
        // all; reads of them go through their typed subsystems.
        if words
            .iter()
            .any(|w| matches!(w.as_str(), "INSERT" | "UPDATE" | "DELETE"))
            && words.iter().any(|w| is_reserved_table(w))
        {
            return Err(ShardError::rejected(
                "reserved tables are not addressable from the sandbox",
            ));
        }

        let result = bind_params(sqlx::query(trimmed), params)
            .execute(&self.pool)
            .await?;
        Ok(ExecuteOutput { rows_affected: result.rows_affected() })
    }

    /// Lists user tables and their DDL from the engine's introspection.
    pub async fn sql_schema(&self) -> Result<Vec<TableInfo>, ShardError> {
        let rows = sqlx::query(
            "SELECT name, sql FROM sqlite_master
             WHERE type = 'table' AND sql IS NOT NULL
             ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let name: String = row.get("name");
                if is_reserved_table(&name) {
                    return None;
                }
                let sql: String = row.get("sql");
                Some(TableInfo { name, sql })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::shard;
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn create_insert_query_round_trips() {
        let shard = shard().await;
        shard
            .sql_execute("CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT, score REAL)", &[])
            .await
            .unwrap();
        let result = shard
            .sql_execute(
                "INSERT INTO notes (body, score) VALUES (?1, ?2), (?3, ?4)",
                &[json!("first"), json!(1.5), json!("second"), json!(2.5)],
            )
            .await
            .unwrap();
        assert_eq!(result.rows_affected, 2);

        let output = shard
            .sql_query("SELECT id, body, score FROM notes ORDER BY id", &[])
            .await
            .unwrap();
        assert_eq!(output.row_count, 2);
        assert_eq!(output.columns, vec!["id", "body", "score"]);
        assert_eq!(output.rows[0]["body"], "first");
        assert_eq!(output.rows[0]["id"], 1);
        assert_eq!(output.rows[1]["score"], 2.5);
    }

    #[tokio::test]
    async fn query_rejects_non_select() {
        let shard = shard().await;
        let err = shard.sql_query("DELETE FROM notes", &[]).await.unwrap_err();
        assert!(matches!(err, ShardError::Rejected(_)));
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn query_rejects_embedded_keywords() {
        let shard = shard().await;
        for sql in [
            "SELECT 1; DROP TABLE notes",
            "SELECT * FROM notes WHERE x = (UPDATE notes SET a = 1)",
            "select 1 union insert into x values (1)",
            "SELECT 1 PRAGMA journal_mode",
        ] {
            assert!(
                matches!(shard.sql_query(sql, &[]).await, Err(ShardError::Rejected(_))),
                "should reject: {sql}"
            );
        }
    }

    #[tokio::test]
    async fn query_allows_keyword_like_identifiers() {
        let shard = shard().await;
        shard
            .sql_execute("CREATE TABLE updates_log (n INTEGER)", &[])
            .await
            .unwrap();
        // "updates_log" contains "update" as a substring but not as a
        // bare word; it must pass.
        let output = shard.sql_query("SELECT n FROM updates_log", &[]).await.unwrap();
        assert_eq!(output.row_count, 0);
    }

    #[tokio::test]
    async fn execute_rejects_pragma() {
        let shard = shard().await;
        assert!(matches!(
            shard.sql_execute("PRAGMA journal_mode = DELETE", &[]).await,
            Err(ShardError::Rejected(_))
        ));
    }

    #[tokio::test]
    async fn execute_protects_reserved_tables() {
        let shard = shard().await;
        for sql in [
            "DROP TABLE kv_store",
            "ALTER TABLE queue_jobs ADD COLUMN x TEXT",
            "DELETE FROM kv_store",
            "INSERT INTO sync_locks (name) VALUES ('x')",
            "UPDATE pastes SET content = ''",
        ] {
            assert!(
                matches!(shard.sql_execute(sql, &[]).await, Err(ShardError::Rejected(_))),
                "should reject: {sql}"
            );
        }
    }

    #[tokio::test]
    async fn execute_allows_dropping_user_tables() {
        let shard = shard().await;
        shard.sql_execute("CREATE TABLE scratch (x INTEGER)", &[]).await.unwrap();
        shard.sql_execute("DROP TABLE scratch", &[]).await.unwrap();
    }

    #[tokio::test]
    async fn schema_hides_reserved_tables() {
        let shard = shard().await;
        shard.sql_execute("CREATE TABLE visible (x INTEGER)", &[]).await.unwrap();

        let tables = shard.sql_schema().await.unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].name, "visible");
        assert!(tables[0].sql.contains("CREATE TABLE"));
    }

    #[tokio::test]
    async fn null_and_bool_params_bind() {
        let shard = shard().await;
        shard
            .sql_execute("CREATE TABLE t (a TEXT, b INTEGER)", &[])
            .await
            .unwrap();
        shard
            .sql_execute(
                "INSERT INTO t (a, b) VALUES (?1, ?2)",
                &[json!(null), json!(true)],
            )
            .await
            .unwrap();

        let output = shard.sql_query("SELECT a, b FROM t", &[]).await.unwrap();
        assert_eq!(output.rows[0]["a"], Value::Null);
        assert_eq!(output.rows[0]["b"], 1);
    }
}
