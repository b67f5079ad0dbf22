//! Schema introspection through a dialect provider
//!
//! Every catalog read is a rendered [`DialectOperation`] executed on the
//! connection, then parsed from the uniform column labels the providers emit.

use indexmap::IndexMap;
use std::collections::HashSet;
use std::sync::Arc;

use sqlport_core::{
    ColumnMeta, Connection, CoreError, DialectOperation, DialectProvider, IndexDefinition,
    IndexKind, IndexMeta, KeyRole, ObjectKind, QueryResult, Result, Row, TableMeta,
    TableSnapshot,
};

use crate::cache::{CacheKey, SchemaCache};

pub struct SchemaIntrospector {
    connection: Arc<dyn Connection>,
    provider: &'static dyn DialectProvider,
}

impl SchemaIntrospector {
    pub fn new(connection: Arc<dyn Connection>, provider: &'static dyn DialectProvider) -> Self {
        Self {
            connection,
            provider,
        }
    }

    pub fn provider(&self) -> &'static dyn DialectProvider {
        self.provider
    }

    pub fn connection(&self) -> &Arc<dyn Connection> {
        &self.connection
    }

    fn cache_key(&self, schema: &str, object: &str) -> CacheKey {
        CacheKey::new(self.connection.connection_id(), schema, object)
    }

    /// Render and run a catalog query. Rendering errors pass through untouched;
    /// execution errors are attributed to `object`.
    async fn run(&self, op: &DialectOperation, object: &str) -> Result<QueryResult> {
        let sql = self.provider.render(op)?;
        tracing::debug!(operation = %op.name(), object = %object, sql = %sql, "introspection query");
        self.connection
            .query(&sql, &[])
            .await
            .map_err(|e| CoreError::introspection(object, e))
    }

    /// Table metadata and columns, served from `cache` when present
    #[tracing::instrument(skip(self, cache))]
    pub async fn table_snapshot(
        &self,
        schema: &str,
        table: &str,
        cache: Option<&SchemaCache>,
    ) -> Result<TableSnapshot> {
        let key = self.cache_key(schema, table);
        if let Some(snapshot) = cache.and_then(|c| c.get_snapshot(&key)) {
            return Ok(snapshot);
        }

        let columns = self.columns(schema, table).await?;
        let table_meta = self.table_meta(schema, table).await?;
        let snapshot = TableSnapshot {
            table: table_meta,
            columns,
        };
        if let Some(cache) = cache {
            cache.set_snapshot(key, snapshot.clone());
        }
        Ok(snapshot)
    }

    /// Columns in physical order with ordinals renumbered from 0
    pub async fn columns(&self, schema: &str, table: &str) -> Result<Vec<ColumnMeta>> {
        let object = qualified(schema, table);
        let result = self
            .run(
                &DialectOperation::ShowColumns {
                    schema: schema.to_string(),
                    table: table.to_string(),
                },
                &object,
            )
            .await?;

        let columns = parse_columns(&result).map_err(|e| CoreError::introspection(&object, e))?;
        if columns.is_empty() {
            return Err(CoreError::introspection(
                &object,
                CoreError::NotFound(format!("table {object} has no columns or does not exist")),
            ));
        }
        Ok(columns)
    }

    /// Catalog statistics; a table the catalog does not report yields bare metadata
    pub async fn table_meta(&self, schema: &str, table: &str) -> Result<TableMeta> {
        let object = qualified(schema, table);
        let result = self
            .run(
                &DialectOperation::ShowTableStatus {
                    schema: schema.to_string(),
                    table: table.to_string(),
                },
                &object,
            )
            .await?;
        Ok(result
            .rows
            .first()
            .map(|row| parse_table_meta(table, row))
            .unwrap_or_else(|| TableMeta::new(table)))
    }

    /// Indexes grouped from the one-row-per-column listing
    pub async fn indexes(
        &self,
        schema: &str,
        table: &str,
        cache: Option<&SchemaCache>,
    ) -> Result<Vec<IndexMeta>> {
        let key = self.cache_key(schema, table);
        if let Some(indexes) = cache.and_then(|c| c.get_indexes(&key)) {
            return Ok(indexes);
        }
        let result = self
            .run(
                &DialectOperation::ShowIndex {
                    schema: schema.to_string(),
                    table: table.to_string(),
                },
                &qualified(schema, table),
            )
            .await?;
        let indexes = group_indexes(table, &result);
        if let Some(cache) = cache {
            cache.set_indexes(key, indexes.clone());
        }
        Ok(indexes)
    }

    /// `CREATE TABLE` text, native when the dialect has it, otherwise synthesised
    /// from columns and indexes
    #[tracing::instrument(skip(self, cache))]
    pub async fn table_source(
        &self,
        schema: &str,
        table: &str,
        cache: Option<&SchemaCache>,
    ) -> Result<String> {
        if !self.provider.capabilities().table_source {
            return self.synthesize_table_source(schema, table, cache).await;
        }
        let object = qualified(schema, table);
        let result = self
            .run(
                &DialectOperation::ShowTableSource {
                    schema: schema.to_string(),
                    table: table.to_string(),
                },
                &object,
            )
            .await?;
        self.provider
            .read_source(ObjectKind::Table, &result)?
            .ok_or_else(|| {
                CoreError::introspection(&object, CoreError::NotFound(format!("table {object}")))
            })
    }

    async fn synthesize_table_source(
        &self,
        schema: &str,
        table: &str,
        cache: Option<&SchemaCache>,
    ) -> Result<String> {
        let snapshot = self.table_snapshot(schema, table, cache).await?;
        let indexes = self.indexes(schema, table, cache).await?;
        let provider = self.provider;

        let mut lines = Vec::with_capacity(snapshot.columns.len() + 1);
        for column in &snapshot.columns {
            let mut line = format!("    {} {}", provider.quote(&column.name)?, column.data_type);
            if !column.nullable {
                line.push_str(" NOT NULL");
            }
            // The identity clause replaces a sequence default such as `nextval(...)`
            let identity = provider
                .auto_increment_clause()
                .filter(|_| column.auto_increment);
            match (&column.default_value, identity) {
                (_, Some(clause)) => {
                    line.push(' ');
                    line.push_str(clause);
                }
                (Some(default), None) => line.push_str(&format!(" DEFAULT {default}")),
                (None, None) => {}
            }
            lines.push(line);
        }
        let primary_key: Vec<String> = snapshot
            .primary_key()
            .iter()
            .map(|c| provider.quote(&c.name))
            .collect::<Result<_>>()?;
        if !primary_key.is_empty() {
            lines.push(format!("    PRIMARY KEY ({})", primary_key.join(", ")));
        }

        let mut statements = vec![format!(
            "CREATE TABLE {} (\n{}\n)",
            provider.qualify(schema, table)?,
            lines.join(",\n")
        )];
        for index in indexes.iter().filter(|index| !index.primary) {
            statements.push(provider.render(&DialectOperation::CreateIndex(IndexDefinition {
                schema: schema.to_string(),
                table: table.to_string(),
                name: Some(index.name.clone()),
                columns: index.columns.clone(),
                kind: if index.unique {
                    IndexKind::Unique
                } else {
                    IndexKind::Normal
                },
            }))?);
        }
        Ok(statements.join(";\n"))
    }

    /// Stored `CREATE INDEX` statements of a table, for dialects whose native
    /// table source leaves them out. Empty everywhere else.
    pub async fn index_sources(&self, schema: &str, table: &str) -> Result<Vec<String>> {
        let op = DialectOperation::ShowIndexSource {
            schema: schema.to_string(),
            table: table.to_string(),
        };
        if !self.provider.capabilities().table_source {
            return Ok(Vec::new());
        }
        let result = match self.run(&op, &qualified(schema, table)).await {
            Err(e) if e.is_unsupported() => return Ok(Vec::new()),
            other => other?,
        };
        self.provider.read_sources(ObjectKind::Table, &result)
    }

    /// Source of a view, procedure, function or trigger
    #[tracing::instrument(skip(self))]
    pub async fn object_source(&self, kind: ObjectKind, schema: &str, name: &str) -> Result<String> {
        if kind == ObjectKind::Table {
            return self.table_source(schema, name, None).await;
        }
        let object = qualified(schema, name);
        let result = self
            .run(
                &DialectOperation::ShowObjectSource {
                    kind,
                    schema: schema.to_string(),
                    name: name.to_string(),
                },
                &object,
            )
            .await?;
        self.provider.read_source(kind, &result)?.ok_or_else(|| {
            CoreError::introspection(&object, CoreError::NotFound(format!("{kind} {object}")))
        })
    }

    /// Sorted, de-duplicated names of every object of a kind
    pub async fn list_objects(&self, kind: ObjectKind, schema: &str) -> Result<Vec<String>> {
        let result = self
            .run(
                &DialectOperation::ListObjects {
                    kind,
                    schema: schema.to_string(),
                },
                schema,
            )
            .await?;
        let mut names: Vec<String> = result
            .rows
            .iter()
            .filter_map(|row| row.text("name").or_else(|| row.get(0).and_then(|v| v.as_text())))
            .collect();
        names.sort();
        names.dedup();
        tracing::debug!(kind = %kind, schema = %schema, count = names.len(), "listed objects");
        Ok(names)
    }
}

fn qualified(schema: &str, object: &str) -> String {
    if schema.is_empty() {
        object.to_string()
    } else {
        format!("{schema}.{object}")
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn parse_columns(result: &QueryResult) -> Result<Vec<ColumnMeta>> {
    let mut seen = HashSet::new();
    let mut columns = Vec::with_capacity(result.rows.len());
    for row in &result.rows {
        let Some(name) = row.text("name") else {
            continue;
        };
        if !seen.insert(name.clone()) {
            return Err(CoreError::InvalidInput(format!(
                "column {name} listed more than once"
            )));
        }
        let extra = row.text("extra").unwrap_or_default();
        columns.push(ColumnMeta {
            ordinal: columns.len(),
            data_type: row.text("type").unwrap_or_default(),
            nullable: row
                .get_by_name("nullable")
                .and_then(|v| v.as_bool())
                .unwrap_or(true),
            key: KeyRole::from_code(&row.text("key").unwrap_or_default()),
            default_value: row.text("default_value"),
            comment: non_empty(row.text("comment")),
            auto_increment: extra.to_ascii_lowercase().contains("auto_increment"),
            name,
        });
    }
    Ok(columns)
}

fn parse_table_meta(table: &str, row: &Row) -> TableMeta {
    let number = |name: &str| row.get_by_name(name).and_then(|v| v.as_u64());
    TableMeta {
        name: row.text("name").unwrap_or_else(|| table.to_string()),
        comment: non_empty(row.text("comment")),
        rows: number("table_rows"),
        data_length: number("data_length"),
        auto_increment: number("auto_increment"),
        row_format: non_empty(row.text("row_format")),
    }
}

fn group_indexes(table: &str, result: &QueryResult) -> Vec<IndexMeta> {
    let mut grouped: IndexMap<String, (IndexMeta, Vec<(i64, String)>)> = IndexMap::new();
    for row in &result.rows {
        let (Some(name), Some(column)) = (row.text("index_name"), row.text("column_name")) else {
            continue;
        };
        let seq = row.get_by_name("seq").and_then(|v| v.as_i64()).unwrap_or(0);
        let entry = grouped.entry(name.clone()).or_insert_with(|| {
            let non_unique = row
                .get_by_name("non_unique")
                .and_then(|v| v.as_bool())
                .unwrap_or(true);
            let primary = row
                .get_by_name("is_primary")
                .and_then(|v| v.as_bool())
                .unwrap_or(false);
            (
                IndexMeta {
                    name: name.clone(),
                    table: table.to_string(),
                    columns: Vec::new(),
                    unique: !non_unique || primary,
                    primary,
                    index_type: non_empty(row.text("index_type")),
                },
                Vec::new(),
            )
        });
        entry.1.push((seq, column));
    }

    grouped
        .into_values()
        .map(|(mut index, mut columns)| {
            columns.sort_by_key(|(seq, _)| *seq);
            index.columns = columns.into_iter().map(|(_, column)| column).collect();
            index
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlport_core::Value;

    #[test]
    fn test_group_indexes_orders_columns_by_sequence() {
        let result = QueryResult::from_rows(
            &["index_name", "column_name", "non_unique", "seq", "index_type", "is_primary"],
            vec![
                vec!["idx_name_email".into(), "email".into(), Value::Int64(0), Value::Int64(2), "BTREE".into(), Value::Int64(0)],
                vec!["PRIMARY".into(), "id".into(), Value::Int64(0), Value::Int64(1), "BTREE".into(), Value::Int64(1)],
                vec!["idx_name_email".into(), "name".into(), Value::Int64(0), Value::Int64(1), "BTREE".into(), Value::Int64(0)],
            ],
        );
        let indexes = group_indexes("users", &result);
        assert_eq!(indexes.len(), 2);
        assert_eq!(indexes[0].name, "idx_name_email");
        assert_eq!(indexes[0].columns, vec!["name", "email"]);
        assert!(indexes[0].unique);
        assert!(!indexes[0].primary);
        assert!(indexes[1].primary);
    }

    #[test]
    fn test_parse_columns_rejects_duplicates() {
        let result = QueryResult::from_rows(
            &["name", "type"],
            vec![vec!["id".into(), "int".into()], vec!["id".into(), "int".into()]],
        );
        assert!(matches!(parse_columns(&result), Err(CoreError::InvalidInput(_))));
    }

    #[test]
    fn test_parse_table_meta_treats_blank_as_missing() {
        let result = QueryResult::from_rows(
            &["name", "comment", "table_rows", "data_length", "auto_increment", "row_format"],
            vec![vec![
                "users".into(),
                "".into(),
                Value::Int64(12),
                Value::Null,
                Value::Int64(13),
                "Dynamic".into(),
            ]],
        );
        let meta = parse_table_meta("users", &result.rows[0]);
        assert_eq!(meta.comment, None);
        assert_eq!(meta.rows, Some(12));
        assert_eq!(meta.data_length, None);
        assert_eq!(meta.auto_increment, Some(13));
        assert_eq!(meta.row_format.as_deref(), Some("Dynamic"));
    }
}
