//! DuckDB-backed warehouse
//!
//! Endpoint batches are staged as Parquet and loaded with
//! `CREATE TABLE IF NOT EXISTS ... AS SELECT *`, so an existing table's
//! contents are never replaced. Reporting queries run against these tables.

use crate::error::{Error, Result};
use crate::output::{write_batch_to_file, ParquetWriterConfig};
use arrow::record_batch::RecordBatch;
use duckdb::Connection;
use serde_json::Value;
use tracing::{debug, info};

/// SQL warehouse holding one table per endpoint
pub struct Warehouse {
    conn: Connection,
}

impl Warehouse {
    /// Open a warehouse at the given path, or in memory for ":memory:"
    pub fn open(database: &str) -> Result<Self> {
        let conn = if database == ":memory:" {
            Connection::open_in_memory()
                .map_err(|e| Error::sql(format!("Failed to open in-memory database: {e}")))?
        } else {
            Connection::open(database)
                .map_err(|e| Error::sql(format!("Failed to open database {database}: {e}")))?
        };
        Ok(Self { conn })
    }

    /// Load a batch into the named table.
    ///
    /// Returns true if the table was created; false if it already existed,
    /// in which case its contents are left untouched.
    pub fn load_table(&self, name: &str, batch: &RecordBatch) -> Result<bool> {
        if self.table_exists(name)? {
            info!(table = name, "table already exists, contents unchanged");
            return Ok(false);
        }

        let staging = std::env::temp_dir().join(format!("stackfeed_{name}_{}.parquet", nonce()));
        let staging_path = staging
            .to_str()
            .ok_or_else(|| Error::output("Invalid staging path"))?
            .to_string();

        write_batch_to_file(&staging, batch, &ParquetWriterConfig::default())?;

        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} AS SELECT * FROM read_parquet('{}')",
            quote_ident(name),
            staging_path.replace('\'', "''")
        );
        let result = self
            .conn
            .execute_batch(&sql)
            .map_err(|e| Error::sql(format!("Failed to create table {name}: {e}")));

        let _ = std::fs::remove_file(&staging);
        result?;

        debug!(table = name, rows = batch.num_rows(), "table created");
        Ok(true)
    }

    /// Check whether a table exists
    pub fn table_exists(&self, name: &str) -> Result<bool> {
        let count: i64 = self
            .conn
            .query_row(
                "SELECT count(*) FROM information_schema.tables WHERE table_name = ?",
                duckdb::params![name],
                |row| row.get(0),
            )
            .map_err(|e| Error::sql(format!("Failed to query catalog: {e}")))?;
        Ok(count > 0)
    }

    /// Count rows in a table
    pub fn row_count(&self, name: &str) -> Result<usize> {
        if !self.table_exists(name)? {
            return Err(Error::TableNotFound {
                table: name.to_string(),
            });
        }
        let count: i64 = self
            .conn
            .query_row(
                &format!("SELECT count(*) FROM {}", quote_ident(name)),
                [],
                |row| row.get(0),
            )
            .map_err(|e| Error::sql(format!("Failed to count rows in {name}: {e}")))?;
        Ok(count as usize)
    }

    /// Run a read-only query and return its rows as JSON objects
    pub fn query_rows(&self, sql: &str) -> Result<Vec<Value>> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| Error::sql(format!("Failed to prepare query: {e}")))?;

        let mut rows = stmt
            .query([])
            .map_err(|e| Error::sql(format!("Failed to execute query: {e}")))?;

        let mut results = Vec::new();
        while let Some(row) = rows
            .next()
            .map_err(|e| Error::sql(format!("Failed to read row: {e}")))?
        {
            let stmt = row.as_ref();
            let mut obj = serde_json::Map::new();
            for (idx, column) in stmt.column_names().iter().enumerate() {
                let value: duckdb::types::Value = row
                    .get(idx)
                    .map_err(|e| Error::sql(format!("Failed to read column {column}: {e}")))?;
                obj.insert(column.clone(), duckdb_value_to_json(value));
            }
            results.push(Value::Object(obj));
        }

        Ok(results)
    }
}

impl std::fmt::Debug for Warehouse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Warehouse").finish_non_exhaustive()
    }
}

/// Quote a SQL identifier
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Unique suffix for staging files (timestamp in nanoseconds)
fn nonce() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    format!("{timestamp:x}")
}

/// Convert a DuckDB value to JSON for display
fn duckdb_value_to_json(value: duckdb::types::Value) -> Value {
    use duckdb::types::Value as Db;
    match value {
        Db::Null => Value::Null,
        Db::Boolean(b) => Value::Bool(b),
        Db::TinyInt(i) => Value::Number(i.into()),
        Db::SmallInt(i) => Value::Number(i.into()),
        Db::Int(i) => Value::Number(i.into()),
        Db::BigInt(i) => Value::Number(i.into()),
        Db::HugeInt(i) => Value::String(i.to_string()),
        Db::UTinyInt(i) => Value::Number(i.into()),
        Db::USmallInt(i) => Value::Number(i.into()),
        Db::UInt(i) => Value::Number(i.into()),
        Db::UBigInt(i) => Value::Number(i.into()),
        Db::Float(f) => {
            serde_json::Number::from_f64(f64::from(f)).map_or(Value::Null, Value::Number)
        }
        Db::Double(f) => serde_json::Number::from_f64(f).map_or(Value::Null, Value::Number),
        Db::Text(s) => Value::String(s),
        Db::Timestamp(unit, i) => {
            use duckdb::types::TimeUnit;
            let (secs, nsecs) = match unit {
                TimeUnit::Second => (i, 0),
                TimeUnit::Millisecond => (i.div_euclid(1000), (i.rem_euclid(1000) * 1_000_000)),
                TimeUnit::Microsecond => (i.div_euclid(1_000_000), (i.rem_euclid(1_000_000) * 1000)),
                TimeUnit::Nanosecond => (i.div_euclid(1_000_000_000), i.rem_euclid(1_000_000_000)),
            };
            chrono::DateTime::from_timestamp(secs, nsecs as u32)
                .map(|dt| Value::String(dt.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()))
                .unwrap_or(Value::Number(i.into()))
        }
        Db::Date32(d) => chrono::NaiveDate::from_num_days_from_ce_opt(d + 719_163)
            .map(|date| Value::String(date.format("%Y-%m-%d").to_string()))
            .unwrap_or(Value::Number(d.into())),
        other => Value::String(format!("{other:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tabular::records_to_batch;
    use serde_json::json;

    fn tag_batch(counts: &[i64]) -> RecordBatch {
        let records: Vec<Value> = counts
            .iter()
            .enumerate()
            .map(|(i, c)| json!({"name": format!("tag{i}"), "count": c}))
            .collect();
        records_to_batch(&records, None).unwrap()
    }

    #[test]
    fn test_load_table_and_count() {
        let warehouse = Warehouse::open(":memory:").unwrap();
        let created = warehouse.load_table("tags", &tag_batch(&[5, 3, 9])).unwrap();

        assert!(created);
        assert!(warehouse.table_exists("tags").unwrap());
        assert_eq!(warehouse.row_count("tags").unwrap(), 3);
    }

    #[test]
    fn test_load_table_if_not_exists_keeps_contents() {
        let warehouse = Warehouse::open(":memory:").unwrap();
        warehouse.load_table("tags", &tag_batch(&[5, 3])).unwrap();

        // A second run never updates an existing table's contents
        let created = warehouse.load_table("tags", &tag_batch(&[1])).unwrap();
        assert!(!created);
        assert_eq!(warehouse.row_count("tags").unwrap(), 2);
    }

    #[test]
    fn test_row_count_unknown_table() {
        let warehouse = Warehouse::open(":memory:").unwrap();
        assert!(matches!(
            warehouse.row_count("nope").unwrap_err(),
            Error::TableNotFound { .. }
        ));
    }

    #[test]
    fn test_query_rows_returns_json() {
        let warehouse = Warehouse::open(":memory:").unwrap();
        warehouse.load_table("tags", &tag_batch(&[5, 3, 9])).unwrap();

        let rows = warehouse
            .query_rows("SELECT name, count FROM tags ORDER BY count DESC LIMIT 2")
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["name"], json!("tag2"));
        assert_eq!(rows[0]["count"], json!(9));
        assert_eq!(rows[1]["count"], json!(5));
    }

    #[test]
    fn test_query_rows_struct_column() {
        let warehouse = Warehouse::open(":memory:").unwrap();
        let records = vec![
            json!({"answer_id": 1, "score": 12, "owner": {"user_id": 7}}),
            json!({"answer_id": 2, "score": 4, "owner": {"user_id": 7}}),
        ];
        let batch = records_to_batch(&records, None).unwrap();
        warehouse.load_table("answers", &batch).unwrap();

        let rows = warehouse
            .query_rows(
                "SELECT a.owner.user_id AS user_id, CAST(SUM(score) AS BIGINT) AS total_score \
                 FROM answers a GROUP BY a.owner.user_id",
            )
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["user_id"], json!(7));
        assert_eq!(rows[0]["total_score"], json!(16));
    }

    #[test]
    fn test_query_rows_timestamp_units() {
        let warehouse = Warehouse::open(":memory:").unwrap();
        let rows = warehouse
            .query_rows(
                "SELECT CAST('2023-11-14 22:13:20' AS TIMESTAMP_S) AS ts_s, \
                 CAST('2023-11-14 22:13:20' AS TIMESTAMP_MS) AS ts_ms, \
                 TIMESTAMP '2023-11-14 22:13:20' AS ts_us",
            )
            .unwrap();

        // the same instant renders identically regardless of storage unit
        let expected = json!("2023-11-14T22:13:20.000000Z");
        assert_eq!(rows[0]["ts_s"], expected);
        assert_eq!(rows[0]["ts_ms"], expected);
        assert_eq!(rows[0]["ts_us"], expected);
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("tags"), "\"tags\"");
        assert_eq!(quote_ident("ta\"gs"), "\"ta\"\"gs\"");
    }
}
