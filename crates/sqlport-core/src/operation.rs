//! Logical operations a dialect provider renders into SQL text
//!
//! Callers describe *what* they want with raw, unquoted names. Only a
//! [`DialectProvider`](crate::DialectProvider) turns an operation into text,
//! quoting every identifier and literal it emits.

use serde::{Deserialize, Serialize};

use crate::ObjectKind;

/// Default value of a column definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ColumnDefault {
    /// A string literal, escaped and quoted when rendered
    Literal(String),
    /// A SQL expression emitted verbatim (`0`, `CURRENT_TIMESTAMP`, `now()`)
    Expression(String),
}

/// Full definition of a column as edited in a table designer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    #[serde(default)]
    pub default_value: Option<ColumnDefault>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub auto_increment: bool,
    #[serde(default)]
    pub primary_key: bool,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
            default_value: None,
            comment: None,
            auto_increment: false,
            primary_key: false,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub fn default_value(mut self, default: ColumnDefault) -> Self {
        self.default_value = Some(default);
        self
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// Table-level edit: rename and/or comment change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableChange {
    pub schema: String,
    pub table: String,
    #[serde(default)]
    pub new_name: Option<String>,
    #[serde(default)]
    pub new_comment: Option<String>,
}

impl TableChange {
    pub fn is_empty(&self) -> bool {
        self.new_name.as_deref().is_none_or(|name| name == self.table)
            && self.new_comment.is_none()
    }
}

/// Column edit from an old definition to a new one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnChange {
    pub schema: String,
    pub table: String,
    pub old: ColumnDefinition,
    pub new: ColumnDefinition,
}

impl ColumnChange {
    pub fn renames(&self) -> bool {
        self.old.name != self.new.name
    }

    pub fn is_empty(&self) -> bool {
        self.old == self.new
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    #[default]
    Normal,
    Unique,
    Fulltext,
}

/// Index to create. When `name` is `None` the provider derives
/// `idx_<table>_<col1>_<col2>...`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDefinition {
    pub schema: String,
    pub table: String,
    #[serde(default)]
    pub name: Option<String>,
    pub columns: Vec<String>,
    #[serde(default)]
    pub kind: IndexKind,
}

impl IndexDefinition {
    pub fn resolved_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("idx_{}_{}", self.table, self.columns.join("_")))
    }
}

/// A bounded read of one table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageQuery {
    pub schema: String,
    pub table: String,
    pub page_size: u64,
    /// Rows to skip; `None` and `Some(0)` both render without an offset clause
    #[serde(default)]
    pub offset: Option<u64>,
    /// Columns to order by. Without them row order is whatever the engine returns.
    #[serde(default)]
    pub order_by: Vec<String>,
    /// Columns to select; empty selects every column
    #[serde(default)]
    pub columns: Vec<String>,
}

impl PageQuery {
    pub fn new(schema: impl Into<String>, table: impl Into<String>, page_size: u64) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
            page_size,
            offset: None,
            order_by: Vec::new(),
            columns: Vec::new(),
        }
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn order_by(mut self, columns: Vec<String>) -> Self {
        self.order_by = columns;
        self
    }

    pub fn columns(mut self, columns: Vec<String>) -> Self {
        self.columns = columns;
        self
    }

    /// Offset to render, if any
    pub fn effective_offset(&self) -> Option<u64> {
        self.offset.filter(|offset| *offset > 0)
    }
}

/// A logical operation, rendered per dialect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DialectOperation {
    /// Uniform column listing: `name, type, nullable, key, default_value, comment, extra`
    ShowColumns { schema: String, table: String },
    /// One row per indexed column: `index_name, column_name, non_unique, seq, index_type, is_primary`
    ShowIndex { schema: String, table: String },
    /// Native `CREATE TABLE` source
    ShowTableSource { schema: String, table: String },
    /// Stored `CREATE INDEX` sources of one table, one `source` row each, for
    /// dialects whose table source leaves indexes out
    ShowIndexSource { schema: String, table: String },
    /// Source of a view, procedure, function or trigger
    ShowObjectSource {
        kind: ObjectKind,
        schema: String,
        name: String,
    },
    /// Names of all objects of a kind, single `name` column
    ListObjects { kind: ObjectKind, schema: String },
    /// Catalog statistics for one table: `name, comment, table_rows, data_length, auto_increment, row_format`
    ShowTableStatus { schema: String, table: String },
    AddColumn {
        schema: String,
        table: String,
        column: ColumnDefinition,
    },
    UpdateTable(TableChange),
    UpdateColumn(ColumnChange),
    CreateIndex(IndexDefinition),
    DropIndex {
        schema: String,
        table: String,
        name: String,
    },
    BuildPageQuery(PageQuery),
    DropTable { schema: String, table: String },
    TruncateTable { schema: String, table: String },
    /// `SELECT MAX(column) AS max_value` over one table
    SelectMax {
        schema: String,
        table: String,
        column: String,
    },
}

impl DialectOperation {
    /// Operation tag used in error messages and logs
    pub fn name(&self) -> String {
        match self {
            Self::ShowColumns { .. } => "ShowColumns".into(),
            Self::ShowIndex { .. } => "ShowIndex".into(),
            Self::ShowTableSource { .. } => "ShowTableSource".into(),
            Self::ShowIndexSource { .. } => "ShowIndexSource".into(),
            Self::ShowObjectSource { kind, .. } => format!("ShowObjectSource({kind})"),
            Self::ListObjects { kind, .. } => format!("ListObjects({kind})"),
            Self::ShowTableStatus { .. } => "ShowTableStatus".into(),
            Self::AddColumn { .. } => "AddColumn".into(),
            Self::UpdateTable(_) => "UpdateTable".into(),
            Self::UpdateColumn(_) => "UpdateColumn".into(),
            Self::CreateIndex(_) => "CreateIndex".into(),
            Self::DropIndex { .. } => "DropIndex".into(),
            Self::BuildPageQuery(_) => "BuildPageQuery".into(),
            Self::DropTable { .. } => "DropTable".into(),
            Self::TruncateTable { .. } => "TruncateTable".into(),
            Self::SelectMax { .. } => "SelectMax".into(),
        }
    }
}
