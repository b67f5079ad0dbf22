use serde::{Deserialize, Serialize};
use sqlport_core::{ColumnMeta, DialectId, IndexMeta, QueryResult};

/// Everything a table designer needs to edit one table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDesignData {
    pub table: String,
    pub comment: Option<String>,
    pub columns: Vec<ColumnMeta>,
    pub indexes: Vec<IndexMeta>,
    /// First primary-key column, if the table has one
    pub primary_key: Option<String>,
    pub dialect: DialectId,
}

/// First page of a table together with the statement that produced it
#[derive(Debug, Clone)]
pub struct TablePage {
    pub sql: String,
    pub result: QueryResult,
}
