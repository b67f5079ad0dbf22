//! Dialect identity, capabilities and the provider trait

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{
    CoreError, DialectOperation, LiteralStyle, ObjectKind, QueryResult, QuoteStyle, Result, Value,
};

/// Supported database families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectId {
    MySql,
    Postgres,
    Sqlite,
    MsSql,
}

impl DialectId {
    pub const ALL: [DialectId; 4] = [
        DialectId::MySql,
        DialectId::Postgres,
        DialectId::Sqlite,
        DialectId::MsSql,
    ];

    /// Map a driver name to its dialect family
    pub fn from_driver_name(driver: &str) -> Option<Self> {
        match driver.to_lowercase().as_str() {
            "mysql" | "mariadb" => Some(DialectId::MySql),
            "postgres" | "postgresql" | "pg" | "redshift" => Some(DialectId::Postgres),
            "sqlite" | "sqlite3" => Some(DialectId::Sqlite),
            "mssql" | "sqlserver" | "sql server" | "tds" => Some(DialectId::MsSql),
            _ => None,
        }
    }

    /// Human-readable name
    pub fn name(self) -> &'static str {
        match self {
            DialectId::MySql => "MySQL",
            DialectId::Postgres => "PostgreSQL",
            DialectId::Sqlite => "SQLite",
            DialectId::MsSql => "SQL Server",
        }
    }

    /// Canonical driver name
    pub fn driver_name(self) -> &'static str {
        match self {
            DialectId::MySql => "mysql",
            DialectId::Postgres => "postgresql",
            DialectId::Sqlite => "sqlite",
            DialectId::MsSql => "mssql",
        }
    }
}

impl fmt::Display for DialectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for DialectId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_driver_name(s)
            .ok_or_else(|| CoreError::Configuration(format!("unknown dialect: {s}")))
    }
}

/// What a dialect can express
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialectCapabilities {
    /// `INSERT INTO t (..) VALUES (..), (..)`
    pub multi_row_insert: bool,
    /// A native statement returns a table's `CREATE TABLE` text
    pub table_source: bool,
    pub views: bool,
    pub procedures: bool,
    pub functions: bool,
    pub triggers: bool,
    pub table_comments: bool,
    pub fulltext_index: bool,
    /// Column type/nullability/default can be altered in place
    pub alter_column: bool,
    /// `CREATE DATABASE`/`CREATE SCHEMA` is meaningful for dumps
    pub create_schema: bool,
}

impl DialectCapabilities {
    pub fn supports_kind(&self, kind: ObjectKind) -> bool {
        match kind {
            ObjectKind::Table => true,
            ObjectKind::View => self.views,
            ObjectKind::Procedure => self.procedures,
            ObjectKind::Function => self.functions,
            ObjectKind::Trigger => self.triggers,
        }
    }
}

/// Dialect-specific SQL generation.
///
/// One implementation exists per database family. A dump target resolves its
/// provider once and every rendering goes through it.
pub trait DialectProvider: Send + Sync {
    fn id(&self) -> DialectId;

    fn capabilities(&self) -> DialectCapabilities;

    fn quote_style(&self) -> QuoteStyle;

    fn literal_style(&self) -> LiteralStyle {
        LiteralStyle::Standard
    }

    /// Render an operation as one or more statements, without trailing `;`.
    ///
    /// Fails with [`CoreError::UnsupportedOperation`] when the dialect has no
    /// equivalent, never with a partial rendering.
    fn render_statements(&self, op: &DialectOperation) -> Result<Vec<String>>;

    /// Render an operation as text; multi-statement renderings are joined with `;\n`.
    fn render(&self, op: &DialectOperation) -> Result<String> {
        Ok(self.render_statements(op)?.join(";\n"))
    }

    fn unsupported(&self, op: &DialectOperation) -> CoreError {
        CoreError::unsupported(self.id(), op.name())
    }

    fn quote(&self, identifier: &str) -> Result<String> {
        self.quote_style().quote(identifier)
    }

    fn unquote(&self, quoted: &str) -> Result<String> {
        self.quote_style().unquote(quoted)
    }

    /// Schema-qualified, quoted object name. An empty schema yields the bare name.
    fn qualify(&self, schema: &str, name: &str) -> Result<String> {
        if schema.is_empty() {
            self.quote(name)
        } else {
            Ok(format!("{}.{}", self.quote(schema)?, self.quote(name)?))
        }
    }

    fn escape_literal(&self, value: &str) -> String {
        self.literal_style().escape(value)
    }

    fn quote_literal(&self, value: &str) -> String {
        self.literal_style().quote(value)
    }

    fn bool_literal(&self, value: bool) -> &'static str {
        if value { "TRUE" } else { "FALSE" }
    }

    fn bytes_literal(&self, bytes: &[u8]) -> String {
        format!("X'{}'", hex::encode_upper(bytes))
    }

    /// SQL literal for a value read from this dialect
    fn render_value(&self, value: &Value) -> String {
        match value {
            Value::Null => "NULL".to_string(),
            Value::Bool(v) => self.bool_literal(*v).to_string(),
            Value::Int32(v) => v.to_string(),
            Value::Int64(v) => v.to_string(),
            Value::Float64(v) if v.is_finite() => v.to_string(),
            Value::Float64(v) => self.quote_literal(&v.to_string()),
            Value::Decimal(v) => v.clone(),
            Value::String(v) => self.quote_literal(v),
            Value::Bytes(v) => self.bytes_literal(v),
            Value::Uuid(v) => self.quote_literal(&v.to_string()),
            Value::Date(v) => self.quote_literal(&v.format("%Y-%m-%d").to_string()),
            Value::Time(v) => self.quote_literal(&v.format("%H:%M:%S%.f").to_string()),
            Value::DateTime(v) => {
                self.quote_literal(&v.format("%Y-%m-%d %H:%M:%S%.f").to_string())
            }
            Value::DateTimeUtc(v) => {
                self.quote_literal(&v.naive_utc().format("%Y-%m-%d %H:%M:%S%.f").to_string())
            }
            Value::Json(v) => self.quote_literal(&v.to_string()),
            Value::Array(items) => self.quote_literal(&array_literal(items)),
        }
    }

    /// Dialect normalisation of one stored DDL text
    fn normalize_source(&self, _kind: ObjectKind, source: String) -> String {
        source.trim_end().trim_end_matches(';').to_string()
    }

    /// Extract DDL text from the result of a `ShowTableSource`/`ShowObjectSource`
    /// query, applying dialect normalisation. `None` when the object was not found.
    fn read_source(&self, kind: ObjectKind, result: &QueryResult) -> Result<Option<String>> {
        Ok(self.read_sources(kind, result)?.into_iter().next())
    }

    /// Every DDL text of a multi-row source result, in row order. Rows with a
    /// NULL source are skipped.
    fn read_sources(&self, kind: ObjectKind, result: &QueryResult) -> Result<Vec<String>> {
        Ok(result
            .rows
            .iter()
            .filter_map(|row| {
                row.text("source")
                    .or_else(|| row.get(0).and_then(Value::as_text))
            })
            .map(|source| self.normalize_source(kind, source))
            .collect())
    }

    /// Statements opening a dump script
    fn script_header(&self) -> Vec<String> {
        Vec::new()
    }

    /// Statements closing a dump script
    fn script_footer(&self) -> Vec<String> {
        Vec::new()
    }

    /// Statements that create and select the schema before its objects
    fn schema_preamble(&self, schema: &str) -> Result<Vec<String>>;

    fn drop_statement(&self, kind: ObjectKind, schema: &str, name: &str) -> Result<String> {
        Ok(format!(
            "DROP {} IF EXISTS {}",
            kind.keyword(),
            self.qualify(schema, name)?
        ))
    }

    /// Delimiter that must frame procedural bodies in a script, if any
    fn routine_delimiter(&self) -> Option<&'static str> {
        None
    }

    /// Upper bound on `VALUES` tuples in one `INSERT`
    fn max_rows_per_insert(&self) -> Option<usize> {
        None
    }

    /// Column clause marking an auto-increment column in synthesized DDL
    fn auto_increment_clause(&self) -> Option<&'static str> {
        None
    }

    /// Schema naming objects in dump scripts. Dialects whose stored DDL is
    /// unqualified return an empty schema so drops and inserts match it; the
    /// schema preamble then selects the target schema.
    fn script_schema<'a>(&self, schema: &'a str) -> &'a str {
        schema
    }

    /// Column that orders rows stably when a table has no primary key
    fn implicit_row_order(&self) -> Option<&'static str> {
        None
    }

    /// Statement toggling explicit inserts into auto-increment columns, for
    /// engines that reject them by default
    fn identity_insert(&self, _schema: &str, _table: &str, _enable: bool) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Array literal body: `{"a","b",NULL}`. Elements are double-quoted with `\`
/// and `"` escaped; nested arrays stay bare.
fn array_literal(items: &[Value]) -> String {
    let elements = items
        .iter()
        .map(|item| match item {
            Value::Null => "NULL".to_string(),
            Value::Array(nested) => array_literal(nested),
            other => {
                let text = other.as_text().unwrap_or_default();
                format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
            }
        })
        .collect::<Vec<_>>();
    format!("{{{}}}", elements.join(","))
}
