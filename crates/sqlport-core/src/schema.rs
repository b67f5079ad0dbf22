//! Schema data model shared by introspection, services and dumps

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kinds of schema objects that can be listed, sourced and dumped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Table,
    View,
    Procedure,
    Function,
    Trigger,
}

impl ObjectKind {
    pub const ALL: [ObjectKind; 5] = [
        ObjectKind::Table,
        ObjectKind::View,
        ObjectKind::Procedure,
        ObjectKind::Function,
        ObjectKind::Trigger,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ObjectKind::Table => "table",
            ObjectKind::View => "view",
            ObjectKind::Procedure => "procedure",
            ObjectKind::Function => "function",
            ObjectKind::Trigger => "trigger",
        }
    }

    /// Keyword used in DDL (`CREATE <keyword>`, `DROP <keyword>`)
    pub fn keyword(self) -> &'static str {
        match self {
            ObjectKind::Table => "TABLE",
            ObjectKind::View => "VIEW",
            ObjectKind::Procedure => "PROCEDURE",
            ObjectKind::Function => "FUNCTION",
            ObjectKind::Trigger => "TRIGGER",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named schema object
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectRef {
    pub kind: ObjectKind,
    pub name: String,
}

impl ObjectRef {
    pub fn new(kind: ObjectKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }

    pub fn table(name: impl Into<String>) -> Self {
        Self::new(ObjectKind::Table, name)
    }

    pub fn view(name: impl Into<String>) -> Self {
        Self::new(ObjectKind::View, name)
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.name)
    }
}

/// Table-level metadata snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableMeta {
    pub name: String,
    #[serde(default)]
    pub comment: Option<String>,
    /// Row count estimate from the catalog
    #[serde(default)]
    pub rows: Option<u64>,
    #[serde(default)]
    pub data_length: Option<u64>,
    #[serde(default)]
    pub auto_increment: Option<u64>,
    #[serde(default)]
    pub row_format: Option<String>,
}

impl TableMeta {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    fn has_storage_stats(&self) -> bool {
        self.auto_increment.is_some() || self.row_format.is_some()
    }

    /// Hover text for object trees; empty when the engine reports no storage stats
    pub fn tooltip(&self) -> String {
        if !self.has_storage_stats() {
            return String::new();
        }
        let auto_increment = self
            .auto_increment
            .map(|v| v.to_string())
            .unwrap_or_else(|| "null".to_string());
        format!(
            "AUTO_INCREMENT : {}\nROW_FORMAT : {}",
            auto_increment,
            self.row_format.as_deref().unwrap_or("")
        )
    }

    /// Short description: comment followed by the row estimate when known
    pub fn description(&self) -> String {
        let mut description = self.comment.clone().unwrap_or_default();
        if let Some(rows) = self.rows.filter(|rows| *rows > 0) {
            if !description.is_empty() {
                description.push(' ');
            }
            description.push_str(&format!("Rows {rows}"));
        }
        description
    }
}

/// Role a column plays in the table's keys
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyRole {
    #[default]
    None,
    Primary,
    Unique,
    Index,
}

impl KeyRole {
    /// Parse the `PRI`/`UNI`/`MUL` codes the column listing queries produce
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_uppercase().as_str() {
            "PRI" | "P" | "PRIMARY" => KeyRole::Primary,
            "UNI" | "U" | "UNIQUE" => KeyRole::Unique,
            "MUL" | "I" | "INDEX" => KeyRole::Index,
            _ => KeyRole::None,
        }
    }

    pub fn is_key(self) -> bool {
        self != KeyRole::None
    }
}

/// Column metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnMeta {
    pub name: String,
    /// Data type (database-specific string)
    pub data_type: String,
    pub nullable: bool,
    #[serde(default)]
    pub key: KeyRole,
    /// Default value expression as reported by the catalog
    #[serde(default)]
    pub default_value: Option<String>,
    /// Position in the table, contiguous from 0
    pub ordinal: usize,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub auto_increment: bool,
}

impl ColumnMeta {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
            ..Default::default()
        }
    }

    pub fn is_primary_key(&self) -> bool {
        self.key == KeyRole::Primary
    }
}

/// Index metadata, one entry per index with columns in index order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexMeta {
    pub name: String,
    pub table: String,
    pub columns: Vec<String>,
    pub unique: bool,
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub index_type: Option<String>,
}

/// Table metadata together with its columns, the unit the schema cache stores
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableSnapshot {
    pub table: TableMeta,
    pub columns: Vec<ColumnMeta>,
}

impl TableSnapshot {
    pub fn primary_key(&self) -> Vec<&ColumnMeta> {
        self.columns.iter().filter(|c| c.is_primary_key()).collect()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&ColumnMeta> {
        self.columns.iter().find(|c| c.name == name)
    }
}
