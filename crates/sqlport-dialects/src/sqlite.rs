//! SQLite rendering
//!
//! Catalog reads use the `pragma_*` table-valued functions so every listing is
//! a plain SELECT with the same column labels the server dialects produce.

use sqlport_core::{
    ColumnChange, CoreError, DialectCapabilities, DialectId, DialectOperation, DialectProvider,
    IndexKind, ObjectKind, QuoteStyle, Result, TableChange,
};

use crate::common::{self, ColumnSyntax};

const COLUMN_SYNTAX: ColumnSyntax = ColumnSyntax {
    auto_increment: None,
    inline_comment: false,
};

#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// `main` and the empty schema both mean the primary database
    fn is_main(schema: &str) -> bool {
        schema.is_empty() || schema.eq_ignore_ascii_case("main")
    }

    /// Arguments for a `pragma_*` table-valued function
    fn pragma_args(&self, target: &str, schema: &str) -> String {
        if Self::is_main(schema) {
            self.quote_literal(target)
        } else {
            format!("{}, {}", self.quote_literal(target), self.quote_literal(schema))
        }
    }

    fn master_table(&self, schema: &str) -> Result<String> {
        if Self::is_main(schema) {
            Ok("sqlite_master".to_string())
        } else {
            Ok(format!("{}.sqlite_master", self.quote(schema)?))
        }
    }

    fn master_type(kind: ObjectKind) -> Option<&'static str> {
        match kind {
            ObjectKind::Table => Some("table"),
            ObjectKind::View => Some("view"),
            ObjectKind::Trigger => Some("trigger"),
            ObjectKind::Procedure | ObjectKind::Function => None,
        }
    }

    fn show_columns(&self, schema: &str, table: &str) -> String {
        format!(
            "SELECT p.name AS name, p.type AS type, \
             CASE WHEN p.\"notnull\" = 1 THEN 'NO' ELSE 'YES' END AS nullable, \
             CASE WHEN p.pk > 0 THEN 'PRI' ELSE '' END AS key, \
             p.dflt_value AS default_value, NULL AS comment, '' AS extra \
             FROM pragma_table_info({}) AS p ORDER BY p.cid",
            self.pragma_args(table, schema)
        )
    }

    fn show_index(&self, schema: &str, table: &str) -> String {
        let index_info = if Self::is_main(schema) {
            "pragma_index_info(il.name)".to_string()
        } else {
            format!("pragma_index_info(il.name, {})", self.quote_literal(schema))
        };
        format!(
            "SELECT il.name AS index_name, ii.name AS column_name, \
             CASE WHEN il.\"unique\" = 1 THEN 0 ELSE 1 END AS non_unique, \
             ii.seqno + 1 AS seq, il.origin AS index_type, \
             CASE WHEN il.origin = 'pk' THEN 1 ELSE 0 END AS is_primary \
             FROM pragma_index_list({}) AS il, {} AS ii \
             ORDER BY il.name, ii.seqno",
            self.pragma_args(table, schema),
            index_info
        )
    }

    fn source_query(&self, kind: ObjectKind, schema: &str, name: &str) -> Result<String> {
        let Some(object_type) = Self::master_type(kind) else {
            return Err(CoreError::unsupported(
                self.id(),
                format!("ShowObjectSource({kind})"),
            ));
        };
        Ok(format!(
            "SELECT sql AS source FROM {} WHERE type = '{}' AND name = {}",
            self.master_table(schema)?,
            object_type,
            self.quote_literal(name)
        ))
    }

    fn list_objects(&self, kind: ObjectKind, schema: &str) -> Result<String> {
        let Some(object_type) = Self::master_type(kind) else {
            return Err(CoreError::unsupported(self.id(), format!("ListObjects({kind})")));
        };
        Ok(format!(
            "SELECT name AS name FROM {} WHERE type = '{}' AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\' ORDER BY name",
            self.master_table(schema)?,
            object_type
        ))
    }

    fn update_table(&self, change: &TableChange) -> Result<Vec<String>> {
        if change.is_empty() {
            return Err(common::no_change("table update"));
        }
        if change.new_comment.is_some() {
            return Err(CoreError::unsupported(self.id(), "UpdateTable(comment)"));
        }
        match change.new_name.as_deref() {
            Some(new_name) => Ok(vec![format!(
                "ALTER TABLE {} RENAME TO {}",
                self.qualify(&change.schema, &change.table)?,
                self.quote(new_name)?
            )]),
            None => Err(common::no_change("table update")),
        }
    }

    fn update_column(&self, change: &ColumnChange) -> Result<Vec<String>> {
        if change.is_empty() {
            return Err(common::no_change("column update"));
        }
        let mut renamed_only = change.old.clone();
        renamed_only.name = change.new.name.clone();
        if renamed_only != change.new {
            // Only RENAME COLUMN exists; type, nullability and defaults need a table rebuild
            return Err(CoreError::unsupported(
                self.id(),
                "UpdateColumn(type, nullability, default or comment change)",
            ));
        }
        Ok(vec![format!(
            "ALTER TABLE {} RENAME COLUMN {} TO {}",
            self.qualify(&change.schema, &change.table)?,
            self.quote(&change.old.name)?,
            self.quote(&change.new.name)?
        )])
    }
}

impl DialectProvider for SqliteDialect {
    fn id(&self) -> DialectId {
        DialectId::Sqlite
    }

    fn capabilities(&self) -> DialectCapabilities {
        DialectCapabilities {
            multi_row_insert: true,
            table_source: true,
            views: true,
            procedures: false,
            functions: false,
            triggers: true,
            table_comments: false,
            fulltext_index: false,
            alter_column: false,
            create_schema: false,
        }
    }

    fn quote_style(&self) -> QuoteStyle {
        QuoteStyle::DoubleQuote
    }

    fn qualify(&self, schema: &str, name: &str) -> Result<String> {
        if Self::is_main(schema) {
            self.quote(name)
        } else {
            Ok(format!("{}.{}", self.quote(schema)?, self.quote(name)?))
        }
    }

    fn bool_literal(&self, value: bool) -> &'static str {
        if value { "1" } else { "0" }
    }

    fn render_statements(&self, op: &DialectOperation) -> Result<Vec<String>> {
        let sql = match op {
            DialectOperation::ShowColumns { schema, table } => self.show_columns(schema, table),
            DialectOperation::ShowIndex { schema, table } => self.show_index(schema, table),
            DialectOperation::ShowTableStatus { schema, table } => format!(
                "SELECT name AS name, NULL AS comment, NULL AS table_rows, NULL AS data_length, \
                 NULL AS auto_increment, NULL AS row_format FROM {} \
                 WHERE type = 'table' AND name = {}",
                self.master_table(schema)?,
                self.quote_literal(table)
            ),
            DialectOperation::ShowTableSource { schema, table } => {
                self.source_query(ObjectKind::Table, schema, table)?
            }
            DialectOperation::ShowObjectSource { kind, schema, name } => {
                self.source_query(*kind, schema, name)?
            }
            // Automatic indexes have no stored SQL
            DialectOperation::ShowIndexSource { schema, table } => format!(
                "SELECT sql AS source FROM {} WHERE type = 'index' AND tbl_name = {} \
                 AND sql IS NOT NULL ORDER BY name",
                self.master_table(schema)?,
                self.quote_literal(table)
            ),
            DialectOperation::ListObjects { kind, schema } => self.list_objects(*kind, schema)?,
            DialectOperation::AddColumn {
                schema,
                table,
                column,
            } => format!(
                "ALTER TABLE {} ADD COLUMN {}",
                self.qualify(schema, table)?,
                common::column_definition(self, column, COLUMN_SYNTAX)?
            ),
            DialectOperation::UpdateTable(change) => return self.update_table(change),
            DialectOperation::UpdateColumn(change) => return self.update_column(change),
            DialectOperation::CreateIndex(index) => {
                if index.kind == IndexKind::Fulltext {
                    return Err(CoreError::unsupported(self.id(), "CreateIndex(fulltext)"));
                }
                common::ensure_index_columns(index)?;
                // The index lives in the table's database; the table name stays unqualified
                format!(
                    "CREATE {}INDEX {} ON {} ({})",
                    if index.kind == IndexKind::Unique { "UNIQUE " } else { "" },
                    self.qualify(&index.schema, &index.resolved_name())?,
                    self.quote(&index.table)?,
                    common::column_list(self, &index.columns)?
                )
            }
            DialectOperation::DropIndex { schema, name, .. } => {
                format!("DROP INDEX {}", self.qualify(schema, name)?)
            }
            DialectOperation::BuildPageQuery(page) => common::limit_offset_page(self, page)?,
            DialectOperation::DropTable { schema, table } => {
                format!("DROP TABLE {}", self.qualify(schema, table)?)
            }
            DialectOperation::TruncateTable { schema, table } => {
                format!("DELETE FROM {}", self.qualify(schema, table)?)
            }
            DialectOperation::SelectMax {
                schema,
                table,
                column,
            } => format!(
                "SELECT MAX({}) AS max_value FROM {}",
                self.quote(column)?,
                self.qualify(schema, table)?
            ),
        };
        Ok(vec![sql])
    }

    fn normalize_source(&self, _kind: ObjectKind, source: String) -> String {
        // Stored SQL may carry escaped newlines
        source
            .replace("\\n", "\n")
            .trim_end()
            .trim_end_matches(';')
            .to_string()
    }

    fn script_schema<'a>(&self, _schema: &'a str) -> &'a str {
        ""
    }

    fn implicit_row_order(&self) -> Option<&'static str> {
        Some("rowid")
    }

    fn script_header(&self) -> Vec<String> {
        vec![
            "PRAGMA foreign_keys = OFF".to_string(),
            "BEGIN TRANSACTION".to_string(),
        ]
    }

    fn script_footer(&self) -> Vec<String> {
        vec!["COMMIT".to_string(), "PRAGMA foreign_keys = ON".to_string()]
    }

    fn schema_preamble(&self, _schema: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sqlport_core::{ColumnDefinition, PageQuery, QueryResult, Value};

    fn render(op: DialectOperation) -> String {
        SqliteDialect.render(&op).unwrap()
    }

    #[test]
    fn test_main_schema_is_not_qualified() {
        assert_eq!(
            render(DialectOperation::BuildPageQuery(PageQuery::new("main", "orders", 50))),
            "SELECT * FROM \"orders\" LIMIT 50"
        );
        assert_eq!(
            render(DialectOperation::BuildPageQuery(PageQuery::new("aux", "orders", 50))),
            "SELECT * FROM \"aux\".\"orders\" LIMIT 50"
        );
    }

    #[test]
    fn test_truncate_is_delete() {
        assert_eq!(
            render(DialectOperation::TruncateTable {
                schema: "main".into(),
                table: "orders".into(),
            }),
            "DELETE FROM \"orders\""
        );
    }

    #[test]
    fn test_show_columns_uses_table_valued_pragma() {
        let sql = render(DialectOperation::ShowColumns {
            schema: "main".into(),
            table: "users".into(),
        });
        assert!(sql.contains("FROM pragma_table_info('users') AS p"));

        let attached = render(DialectOperation::ShowColumns {
            schema: "aux".into(),
            table: "users".into(),
        });
        assert!(attached.contains("pragma_table_info('users', 'aux')"));
    }

    #[test]
    fn test_routines_unsupported() {
        for kind in [ObjectKind::Procedure, ObjectKind::Function] {
            let err = SqliteDialect
                .render(&DialectOperation::ListObjects {
                    kind,
                    schema: "main".into(),
                })
                .unwrap_err();
            assert!(err.is_unsupported());
        }
    }

    #[test]
    fn test_update_column_only_renames() {
        let old = ColumnDefinition::new("name", "TEXT");
        let renamed = ColumnDefinition::new("full_name", "TEXT");
        assert_eq!(
            render(DialectOperation::UpdateColumn(ColumnChange {
                schema: "main".into(),
                table: "users".into(),
                old: old.clone(),
                new: renamed,
            })),
            "ALTER TABLE \"users\" RENAME COLUMN \"name\" TO \"full_name\""
        );

        let retyped = ColumnDefinition::new("full_name", "INTEGER");
        let err = SqliteDialect
            .render(&DialectOperation::UpdateColumn(ColumnChange {
                schema: "main".into(),
                table: "users".into(),
                old,
                new: retyped,
            }))
            .unwrap_err();
        assert!(err.is_unsupported());
    }

    #[test]
    fn test_table_comment_unsupported() {
        let err = SqliteDialect
            .render(&DialectOperation::UpdateTable(TableChange {
                schema: "main".into(),
                table: "users".into(),
                new_name: None,
                new_comment: Some("people".into()),
            }))
            .unwrap_err();
        assert!(err.is_unsupported());
    }

    #[test]
    fn test_read_source_unescapes_newlines() {
        let result = QueryResult::from_rows(
            &["source"],
            vec![vec![Value::from("CREATE TABLE t(\\n  id INTEGER\\n)")]],
        );
        assert_eq!(
            SqliteDialect.read_source(ObjectKind::Table, &result).unwrap().as_deref(),
            Some("CREATE TABLE t(\n  id INTEGER\n)")
        );
    }

    #[test]
    fn test_index_source_reads_stored_index_sql() {
        let sql = render(DialectOperation::ShowIndexSource {
            schema: "main".into(),
            table: "users".into(),
        });
        assert_eq!(
            sql,
            "SELECT sql AS source FROM sqlite_master WHERE type = 'index' AND tbl_name = 'users' \
             AND sql IS NOT NULL ORDER BY name"
        );

        let result = QueryResult::from_rows(
            &["source"],
            vec![
                vec![Value::from("CREATE UNIQUE INDEX idx_users_email ON users(email);")],
                vec![Value::Null],
                vec![Value::from("CREATE INDEX idx_users_name ON users(name)")],
            ],
        );
        assert_eq!(
            SqliteDialect.read_sources(ObjectKind::Table, &result).unwrap(),
            vec![
                "CREATE UNIQUE INDEX idx_users_email ON users(email)".to_string(),
                "CREATE INDEX idx_users_name ON users(name)".to_string(),
            ]
        );
    }

    #[test]
    fn test_scripts_name_objects_without_schema() {
        assert_eq!(SqliteDialect.script_schema("aux"), "");
        assert_eq!(SqliteDialect.implicit_row_order(), Some("rowid"));
    }
}
