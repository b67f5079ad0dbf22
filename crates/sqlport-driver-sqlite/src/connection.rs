//! SQLite connection implementation

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{Connection as RusqliteConnection, ErrorCode, OpenFlags, params_from_iter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use sqlport_core::{
    Connection, CoreError, QueryResult, Result, ResultColumn, Row, StatementResult, Value,
};

/// SQLite connection wrapper
///
/// The rusqlite handle is not `Sync`, so it sits behind a mutex and every call
/// runs on tokio's blocking pool.
pub struct SqliteConnection {
    id: Uuid,
    path: String,
    conn: Arc<Mutex<RusqliteConnection>>,
}

impl SqliteConnection {
    /// Open (or create) a SQLite database file
    pub fn open(path: &str) -> Result<Self> {
        if path == ":memory:" {
            return Self::open_in_memory();
        }
        tracing::info!(path = %path, "opening SQLite database");
        let expanded_path = Self::expand_path(path)?;

        if !expanded_path.starts_with("file:") {
            if let Some(parent) = Path::new(&expanded_path).parent()
                && !parent.exists()
            {
                return Err(CoreError::Connection(format!(
                    "Parent directory does not exist: {}",
                    parent.display()
                )));
            }
        }

        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = RusqliteConnection::open_with_flags(&expanded_path, flags).map_err(|e| {
            CoreError::Connection(format!(
                "Failed to open SQLite database at '{}': {}",
                expanded_path, e
            ))
        })?;

        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| CoreError::Connection(format!("Failed to set journal mode: {}", e)))?;

        Self::from_rusqlite(conn, expanded_path)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let conn = RusqliteConnection::open_in_memory().map_err(|e| {
            CoreError::Connection(format!("Failed to open in-memory database: {}", e))
        })?;
        Self::from_rusqlite(conn, ":memory:".to_string())
    }

    fn from_rusqlite(conn: RusqliteConnection, path: String) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(|e| CoreError::Connection(format!("Failed to enable foreign keys: {}", e)))?;

        let id = Uuid::new_v4();
        tracing::info!(path = %path, connection_id = %id, "SQLite database connection established");
        Ok(Self {
            id,
            path,
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Expand `~/` to the home directory and make relative paths absolute
    fn expand_path(path: &str) -> Result<String> {
        if path.starts_with("file:") {
            return Ok(path.to_string());
        }

        let expanded = if let Some(rest) = path.strip_prefix("~/") {
            let home = dirs::home_dir().ok_or_else(|| {
                CoreError::Configuration("Unable to determine HOME directory".into())
            })?;
            home.join(rest)
        } else if path.starts_with('~') {
            return Err(CoreError::Configuration(
                "User-specific home directories (~user) are not supported".into(),
            ));
        } else {
            PathBuf::from(path)
        };

        let absolute = if expanded.is_relative() {
            std::env::current_dir()?.join(expanded)
        } else {
            expanded
        };
        Ok(absolute.to_string_lossy().to_string())
    }

    /// Database path, `:memory:` for in-memory databases
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Run a script of `;`-separated statements, such as a dump file
    pub async fn execute_script(&self, sql: &str) -> Result<()> {
        tracing::debug!(bytes = sql.len(), "executing SQL script");
        let sql = sql.to_string();
        self.with_connection(move |conn| conn.execute_batch(&sql).map_err(map_error))
            .await
    }

    async fn with_connection<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&RusqliteConnection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || f(&conn.lock()))
            .await
            .map_err(|e| CoreError::Connection(format!("SQLite worker task failed: {}", e)))?
    }
}

#[async_trait]
impl Connection for SqliteConnection {
    fn connection_id(&self) -> Uuid {
        self.id
    }

    fn driver_name(&self) -> &str {
        "sqlite"
    }

    #[tracing::instrument(skip(self, sql, params), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<StatementResult> {
        let sql = sql.to_string();
        let params = values_to_rusqlite(params);
        let rows_affected = self
            .with_connection(move |conn| {
                conn.execute(&sql, params_from_iter(params.iter()))
                    .map_err(map_error)
            })
            .await?;

        tracing::debug!(affected_rows = rows_affected, "statement executed");
        Ok(StatementResult {
            affected_rows: rows_affected as u64,
            warnings: Vec::new(),
        })
    }

    #[tracing::instrument(skip(self, sql, params), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        let sql = sql.to_string();
        let params = values_to_rusqlite(params);
        let result = self
            .with_connection(move |conn| run_query(conn, &sql, &params))
            .await?;

        tracing::debug!(
            row_count = result.rows.len(),
            execution_time_ms = result.execution_time_ms,
            "query executed successfully"
        );
        Ok(result)
    }
}

fn run_query(
    conn: &RusqliteConnection,
    sql: &str,
    params: &[rusqlite::types::Value],
) -> Result<QueryResult> {
    let start_time = Instant::now();
    let mut stmt = conn.prepare(sql).map_err(map_error)?;

    // Declared types come from CREATE TABLE; expressions have none
    let columns: Vec<ResultColumn> = stmt
        .columns()
        .iter()
        .map(|col| ResultColumn {
            name: col.name().to_string(),
            data_type: col.decl_type().map(str::to_string),
        })
        .collect();
    let column_names: Vec<String> = columns.iter().map(|c| c.name.clone()).collect();

    let mut rows = Vec::new();
    let mut query_rows = stmt.query(params_from_iter(params.iter())).map_err(map_error)?;
    while let Some(row) = query_rows.next().map_err(map_error)? {
        let mut values = Vec::with_capacity(column_names.len());
        for idx in 0..column_names.len() {
            values.push(rusqlite_to_value(row, idx)?);
        }
        rows.push(Row::new(column_names.clone(), values));
    }

    Ok(QueryResult {
        columns,
        rows,
        execution_time_ms: start_time.elapsed().as_millis() as u64,
        ..QueryResult::empty()
    })
}

/// Errors that leave the handle unusable are connection errors; everything
/// else fails only the statement
fn map_error(error: rusqlite::Error) -> CoreError {
    match &error {
        rusqlite::Error::SqliteFailure(failure, _)
            if matches!(
                failure.code,
                ErrorCode::CannotOpen
                    | ErrorCode::NotADatabase
                    | ErrorCode::DatabaseCorrupt
                    | ErrorCode::SystemIoFailure
            ) =>
        {
            CoreError::Connection(error.to_string())
        }
        _ => CoreError::Query(error.to_string()),
    }
}

fn values_to_rusqlite(values: &[Value]) -> Vec<rusqlite::types::Value> {
    values.iter().map(value_to_rusqlite).collect()
}

fn value_to_rusqlite(value: &Value) -> rusqlite::types::Value {
    use rusqlite::types::Value as Sql;
    match value {
        Value::Null => Sql::Null,
        Value::Bool(b) => Sql::Integer(i64::from(*b)),
        Value::Int32(i) => Sql::Integer(i64::from(*i)),
        Value::Int64(i) => Sql::Integer(*i),
        Value::Float64(f) => Sql::Real(*f),
        Value::Decimal(d) => Sql::Text(d.clone()),
        Value::String(s) => Sql::Text(s.clone()),
        Value::Bytes(b) => Sql::Blob(b.clone()),
        Value::Uuid(u) => Sql::Text(u.to_string()),
        Value::Date(d) => Sql::Text(d.to_string()),
        Value::Time(t) => Sql::Text(t.to_string()),
        Value::DateTime(dt) => Sql::Text(dt.to_string()),
        Value::DateTimeUtc(dt) => Sql::Text(dt.to_rfc3339()),
        Value::Json(j) => Sql::Text(j.to_string()),
        Value::Array(_) => Sql::Null,
    }
}

fn rusqlite_to_value(row: &rusqlite::Row, idx: usize) -> Result<Value> {
    use rusqlite::types::ValueRef;

    let value_ref = row.get_ref(idx).map_err(map_error)?;
    Ok(match value_ref {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int64(i),
        ValueRef::Real(f) => Value::Float64(f),
        ValueRef::Text(s) => Value::String(String::from_utf8_lossy(s).to_string()),
        ValueRef::Blob(b) => Value::Bytes(b.to_vec()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_query_reports_declared_types() {
        let conn = SqliteConnection::open_in_memory().unwrap();
        conn.execute("CREATE TABLE t (id INTEGER PRIMARY KEY, label VARCHAR(20), data BLOB)", &[])
            .await
            .unwrap();
        conn.execute(
            "INSERT INTO t (label, data) VALUES (?1, ?2)",
            &[Value::from("x"), Value::Bytes(vec![0, 159, 146, 150])],
        )
        .await
        .unwrap();

        let result = conn.query("SELECT id, label, data, 1 + 1 AS two FROM t", &[]).await.unwrap();
        assert_eq!(result.columns[1].data_type.as_deref(), Some("VARCHAR(20)"));
        assert_eq!(result.columns[3].data_type, None);
        assert_eq!(
            result.rows[0].values,
            vec![
                Value::Int64(1),
                Value::from("x"),
                Value::Bytes(vec![0, 159, 146, 150]),
                Value::Int64(2),
            ]
        );
    }

    #[tokio::test]
    async fn test_statement_errors_are_query_errors() {
        let conn = SqliteConnection::open_in_memory().unwrap();
        let err = conn.query("SELECT * FROM missing", &[]).await.unwrap_err();
        assert!(matches!(err, CoreError::Query(_)), "{err}");
        assert!(!err.is_connection_error());
    }

    #[test]
    fn test_parameter_conversion() {
        use rusqlite::types::Value as Sql;
        assert_eq!(value_to_rusqlite(&Value::Bool(true)), Sql::Integer(1));
        assert_eq!(value_to_rusqlite(&Value::Int32(-4)), Sql::Integer(-4));
        assert_eq!(
            value_to_rusqlite(&Value::Decimal("10.50".into())),
            Sql::Text("10.50".into())
        );
        assert_eq!(value_to_rusqlite(&Value::Array(vec![])), Sql::Null);
    }
}
