//! PostgreSQL rendering

use sqlport_core::{
    ColumnChange, CoreError, DialectCapabilities, DialectId, DialectOperation, DialectProvider,
    IndexKind, ObjectKind, QuoteStyle, Result, TableChange,
};

use crate::common::{self, ColumnSyntax};

const COLUMN_SYNTAX: ColumnSyntax = ColumnSyntax {
    auto_increment: Some("GENERATED BY DEFAULT AS IDENTITY"),
    inline_comment: false,
};

#[derive(Debug, Default, Clone, Copy)]
pub struct PostgresDialect;

impl PostgresDialect {
    fn show_columns(&self, schema: &str, table: &str) -> String {
        let schema = self.quote_literal(schema);
        let table = self.quote_literal(table);
        format!(
            "SELECT c.column_name AS name, \
             COALESCE(pg_catalog.format_type(a.atttypid, a.atttypmod), c.data_type) AS type, \
             c.is_nullable AS nullable, \
             CASE WHEN pk.column_name IS NOT NULL THEN 'PRI' ELSE '' END AS key, \
             c.column_default AS default_value, d.description AS comment, \
             CASE WHEN c.is_identity = 'YES' OR c.column_default LIKE 'nextval(%' \
             THEN 'auto_increment' ELSE '' END AS extra \
             FROM information_schema.columns c \
             LEFT JOIN (SELECT kcu.column_name FROM information_schema.table_constraints tc \
             JOIN information_schema.key_column_usage kcu \
             ON tc.constraint_name = kcu.constraint_name AND tc.table_schema = kcu.table_schema \
             WHERE tc.constraint_type = 'PRIMARY KEY' AND tc.table_schema = {schema} \
             AND tc.table_name = {table}) pk ON pk.column_name = c.column_name \
             LEFT JOIN pg_catalog.pg_statio_all_tables st \
             ON st.schemaname = c.table_schema AND st.relname = c.table_name \
             LEFT JOIN pg_catalog.pg_attribute a \
             ON a.attrelid = st.relid AND a.attname = c.column_name \
             LEFT JOIN pg_catalog.pg_description d \
             ON d.objoid = st.relid AND d.objsubid = c.ordinal_position \
             WHERE c.table_schema = {schema} AND c.table_name = {table} \
             ORDER BY c.ordinal_position"
        )
    }

    fn show_index(&self, schema: &str, table: &str) -> String {
        format!(
            "SELECT i.relname AS index_name, a.attname AS column_name, \
             CASE WHEN ix.indisunique THEN 0 ELSE 1 END AS non_unique, k.ord AS seq, \
             am.amname AS index_type, CASE WHEN ix.indisprimary THEN 1 ELSE 0 END AS is_primary \
             FROM pg_catalog.pg_index ix \
             JOIN pg_catalog.pg_class t ON t.oid = ix.indrelid \
             JOIN pg_catalog.pg_class i ON i.oid = ix.indexrelid \
             JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace \
             JOIN pg_catalog.pg_am am ON am.oid = i.relam \
             CROSS JOIN LATERAL unnest(ix.indkey) WITH ORDINALITY AS k(attnum, ord) \
             JOIN pg_catalog.pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum \
             WHERE n.nspname = {} AND t.relname = {} \
             ORDER BY i.relname, k.ord",
            self.quote_literal(schema),
            self.quote_literal(table)
        )
    }

    fn show_table_status(&self, schema: &str, table: &str) -> String {
        format!(
            "SELECT c.relname AS name, obj_description(c.oid, 'pg_class') AS comment, \
             c.reltuples::bigint AS table_rows, pg_total_relation_size(c.oid) AS data_length, \
             NULL AS auto_increment, NULL AS row_format \
             FROM pg_catalog.pg_class c \
             JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace \
             WHERE n.nspname = {} AND c.relname = {} AND c.relkind IN ('r', 'p')",
            self.quote_literal(schema),
            self.quote_literal(table)
        )
    }

    fn show_object_source(&self, kind: ObjectKind, schema: &str, name: &str) -> Result<String> {
        let schema_lit = self.quote_literal(schema);
        let name_lit = self.quote_literal(name);
        Ok(match kind {
            ObjectKind::Table => {
                return Err(CoreError::unsupported(self.id(), "ShowObjectSource(table)"));
            }
            ObjectKind::View => {
                let qualified = self.qualify(schema, name)?;
                format!(
                    "SELECT {} || pg_get_viewdef({}::regclass, true) AS source",
                    self.quote_literal(&format!("CREATE OR REPLACE VIEW {qualified} AS\n")),
                    self.quote_literal(&qualified)
                )
            }
            ObjectKind::Procedure | ObjectKind::Function => format!(
                "SELECT pg_get_functiondef(p.oid) AS source \
                 FROM pg_catalog.pg_proc p \
                 JOIN pg_catalog.pg_namespace n ON n.oid = p.pronamespace \
                 WHERE n.nspname = {schema_lit} AND p.proname = {name_lit} AND p.prokind = '{}'",
                if kind == ObjectKind::Procedure { "p" } else { "f" }
            ),
            ObjectKind::Trigger => format!(
                "SELECT pg_get_triggerdef(t.oid, true) AS source \
                 FROM pg_catalog.pg_trigger t \
                 JOIN pg_catalog.pg_class c ON c.oid = t.tgrelid \
                 JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace \
                 WHERE n.nspname = {schema_lit} AND t.tgname = {name_lit} AND NOT t.tgisinternal"
            ),
        })
    }

    fn list_objects(&self, kind: ObjectKind, schema: &str) -> String {
        let schema = self.quote_literal(schema);
        match kind {
            ObjectKind::Table | ObjectKind::View => format!(
                "SELECT table_name AS name FROM information_schema.tables \
                 WHERE table_schema = {} AND table_type = '{}' ORDER BY table_name",
                schema,
                if kind == ObjectKind::Table { "BASE TABLE" } else { "VIEW" }
            ),
            ObjectKind::Procedure | ObjectKind::Function => format!(
                "SELECT p.proname AS name FROM pg_catalog.pg_proc p \
                 JOIN pg_catalog.pg_namespace n ON n.oid = p.pronamespace \
                 WHERE n.nspname = {} AND p.prokind = '{}' ORDER BY p.proname",
                schema,
                if kind == ObjectKind::Procedure { "p" } else { "f" }
            ),
            ObjectKind::Trigger => format!(
                "SELECT DISTINCT t.tgname AS name FROM pg_catalog.pg_trigger t \
                 JOIN pg_catalog.pg_class c ON c.oid = t.tgrelid \
                 JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace \
                 WHERE n.nspname = {} AND NOT t.tgisinternal ORDER BY t.tgname",
                schema
            ),
        }
    }

    fn comment_value(&self, comment: Option<&str>) -> String {
        match comment {
            Some(comment) if !comment.is_empty() => self.quote_literal(comment),
            _ => "NULL".to_string(),
        }
    }

    fn update_table(&self, change: &TableChange) -> Result<Vec<String>> {
        if change.is_empty() {
            return Err(common::no_change("table update"));
        }
        let table = self.qualify(&change.schema, &change.table)?;
        let mut statements = Vec::new();
        if let Some(comment) = &change.new_comment {
            statements.push(format!(
                "COMMENT ON TABLE {} IS {}",
                table,
                self.comment_value(Some(comment))
            ));
        }
        if let Some(new_name) = change.new_name.as_deref().filter(|n| *n != change.table) {
            statements.push(format!("ALTER TABLE {} RENAME TO {}", table, self.quote(new_name)?));
        }
        Ok(statements)
    }

    fn update_column(&self, change: &ColumnChange) -> Result<Vec<String>> {
        if change.is_empty() {
            return Err(common::no_change("column update"));
        }
        let (old, new) = (&change.old, &change.new);
        if old.auto_increment != new.auto_increment || old.primary_key != new.primary_key {
            // Identity and key changes need constraint names this operation does not carry
            return Err(CoreError::unsupported(
                self.id(),
                "UpdateColumn(identity or primary key change)",
            ));
        }
        let table = self.qualify(&change.schema, &change.table)?;
        let column = self.quote(&new.name)?;
        let mut statements = Vec::new();

        if change.renames() {
            statements.push(format!(
                "ALTER TABLE {} RENAME COLUMN {} TO {}",
                table,
                self.quote(&old.name)?,
                column
            ));
        }
        if old.data_type != new.data_type {
            statements.push(format!(
                "ALTER TABLE {} ALTER COLUMN {} TYPE {}",
                table,
                column,
                new.data_type.trim()
            ));
        }
        if old.nullable != new.nullable {
            let action = if new.nullable { "DROP NOT NULL" } else { "SET NOT NULL" };
            statements.push(format!("ALTER TABLE {} ALTER COLUMN {} {}", table, column, action));
        }
        if old.default_value != new.default_value {
            statements.push(match &new.default_value {
                Some(default) => format!(
                    "ALTER TABLE {} ALTER COLUMN {} SET DEFAULT {}",
                    table,
                    column,
                    common::render_default(self, default)
                ),
                None => format!("ALTER TABLE {} ALTER COLUMN {} DROP DEFAULT", table, column),
            });
        }
        if old.comment != new.comment {
            statements.push(format!(
                "COMMENT ON COLUMN {}.{} IS {}",
                table,
                column,
                self.comment_value(new.comment.as_deref())
            ));
        }
        Ok(statements)
    }
}

impl DialectProvider for PostgresDialect {
    fn id(&self) -> DialectId {
        DialectId::Postgres
    }

    fn capabilities(&self) -> DialectCapabilities {
        DialectCapabilities {
            multi_row_insert: true,
            table_source: false,
            views: true,
            procedures: true,
            functions: true,
            triggers: true,
            table_comments: true,
            fulltext_index: false,
            alter_column: true,
            create_schema: true,
        }
    }

    fn quote_style(&self) -> QuoteStyle {
        QuoteStyle::DoubleQuote
    }

    fn bytes_literal(&self, bytes: &[u8]) -> String {
        format!("'\\x{}'::bytea", hex::encode(bytes))
    }

    fn render_statements(&self, op: &DialectOperation) -> Result<Vec<String>> {
        let sql = match op {
            DialectOperation::ShowColumns { schema, table } => self.show_columns(schema, table),
            DialectOperation::ShowIndex { schema, table } => self.show_index(schema, table),
            DialectOperation::ShowTableStatus { schema, table } => {
                self.show_table_status(schema, table)
            }
            // No server-side CREATE TABLE text; callers synthesise it from columns
            DialectOperation::ShowTableSource { .. } | DialectOperation::ShowIndexSource { .. } => {
                return Err(self.unsupported(op));
            }
            DialectOperation::ShowObjectSource { kind, schema, name } => {
                self.show_object_source(*kind, schema, name)?
            }
            DialectOperation::ListObjects { kind, schema } => self.list_objects(*kind, schema),
            DialectOperation::AddColumn {
                schema,
                table,
                column,
            } => {
                let qualified = self.qualify(schema, table)?;
                let mut statements = vec![format!(
                    "ALTER TABLE {} ADD COLUMN {}",
                    qualified,
                    common::column_definition(self, column, COLUMN_SYNTAX)?
                )];
                if let Some(comment) = &column.comment {
                    statements.push(format!(
                        "COMMENT ON COLUMN {}.{} IS {}",
                        qualified,
                        self.quote(&column.name)?,
                        self.comment_value(Some(comment))
                    ));
                }
                return Ok(statements);
            }
            DialectOperation::UpdateTable(change) => return self.update_table(change),
            DialectOperation::UpdateColumn(change) => return self.update_column(change),
            DialectOperation::CreateIndex(index) => {
                if index.kind == IndexKind::Fulltext {
                    return Err(CoreError::unsupported(self.id(), "CreateIndex(fulltext)"));
                }
                common::create_index(self, index, self.quote(&index.resolved_name())?)?
            }
            DialectOperation::DropIndex { schema, name, .. } => {
                format!("DROP INDEX {}", self.qualify(schema, name)?)
            }
            DialectOperation::BuildPageQuery(page) => common::limit_offset_page(self, page)?,
            DialectOperation::DropTable { schema, table } => {
                format!("DROP TABLE {}", self.qualify(schema, table)?)
            }
            DialectOperation::TruncateTable { schema, table } => {
                format!("TRUNCATE TABLE {}", self.qualify(schema, table)?)
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

    fn script_header(&self) -> Vec<String> {
        vec![
            "SET client_encoding = 'UTF8'".to_string(),
            "SET standard_conforming_strings = on".to_string(),
        ]
    }

    fn schema_preamble(&self, schema: &str) -> Result<Vec<String>> {
        if schema.is_empty() {
            return Ok(Vec::new());
        }
        let quoted = self.quote(schema)?;
        Ok(vec![
            format!("CREATE SCHEMA IF NOT EXISTS {quoted}"),
            format!("SET search_path TO {quoted}"),
        ])
    }

    fn auto_increment_clause(&self) -> Option<&'static str> {
        COLUMN_SYNTAX.auto_increment
    }

    fn drop_statement(&self, kind: ObjectKind, schema: &str, name: &str) -> Result<String> {
        match kind {
            // Routine sources are CREATE OR REPLACE; trigger drops need the owning table
            ObjectKind::Procedure | ObjectKind::Function | ObjectKind::Trigger => Err(
                CoreError::unsupported(self.id(), format!("DropStatement({kind})")),
            ),
            _ => Ok(format!(
                "DROP {} IF EXISTS {}",
                kind.keyword(),
                self.qualify(schema, name)?
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sqlport_core::{ColumnDefault, ColumnDefinition, IndexDefinition, PageQuery, Value};

    fn render(op: DialectOperation) -> String {
        PostgresDialect.render(&op).unwrap()
    }

    #[test]
    fn test_page_query_without_offset() {
        assert_eq!(
            render(DialectOperation::BuildPageQuery(PageQuery::new("shop", "orders", 50))),
            "SELECT * FROM \"shop\".\"orders\" LIMIT 50"
        );
    }

    #[test]
    fn test_table_source_is_unsupported() {
        let err = PostgresDialect
            .render(&DialectOperation::ShowTableSource {
                schema: "public".into(),
                table: "users".into(),
            })
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::UnsupportedOperation {
                dialect: DialectId::Postgres,
                ..
            }
        ));
    }

    #[test]
    fn test_update_table_renders_comment_and_rename_script() {
        let sql = render(DialectOperation::UpdateTable(TableChange {
            schema: "public".into(),
            table: "users".into(),
            new_name: Some("customers".into()),
            new_comment: Some("people who buy".into()),
        }));
        assert_eq!(
            sql,
            "COMMENT ON TABLE \"public\".\"users\" IS 'people who buy';\nALTER TABLE \"public\".\"users\" RENAME TO \"customers\""
        );
    }

    #[test]
    fn test_update_column_alters_each_changed_attribute() {
        let old = ColumnDefinition::new("name", "varchar(50)");
        let new = ColumnDefinition::new("full_name", "text")
            .not_null()
            .default_value(ColumnDefault::Literal("anon".into()));
        let statements = PostgresDialect
            .render_statements(&DialectOperation::UpdateColumn(ColumnChange {
                schema: "public".into(),
                table: "users".into(),
                old,
                new,
            }))
            .unwrap();
        assert_eq!(
            statements,
            vec![
                "ALTER TABLE \"public\".\"users\" RENAME COLUMN \"name\" TO \"full_name\"",
                "ALTER TABLE \"public\".\"users\" ALTER COLUMN \"full_name\" TYPE text",
                "ALTER TABLE \"public\".\"users\" ALTER COLUMN \"full_name\" SET NOT NULL",
                "ALTER TABLE \"public\".\"users\" ALTER COLUMN \"full_name\" SET DEFAULT 'anon'",
            ]
        );
    }

    #[test]
    fn test_add_column_comment_is_separate_statement() {
        let statements = PostgresDialect
            .render_statements(&DialectOperation::AddColumn {
                schema: "public".into(),
                table: "users".into(),
                column: ColumnDefinition::new("age", "integer").comment("years"),
            })
            .unwrap();
        assert_eq!(statements.len(), 2);
        assert_eq!(
            statements[1],
            "COMMENT ON COLUMN \"public\".\"users\".\"age\" IS 'years'"
        );
    }

    #[test]
    fn test_fulltext_index_unsupported() {
        let err = PostgresDialect
            .render(&DialectOperation::CreateIndex(IndexDefinition {
                schema: "public".into(),
                table: "posts".into(),
                name: None,
                columns: vec!["body".into()],
                kind: IndexKind::Fulltext,
            }))
            .unwrap_err();
        assert!(err.is_unsupported());
    }

    #[test]
    fn test_view_source_query_embeds_quoted_name() {
        let sql = render(DialectOperation::ShowObjectSource {
            kind: ObjectKind::View,
            schema: "public".into(),
            name: "active_users".into(),
        });
        assert!(sql.contains("pg_get_viewdef('\"public\".\"active_users\"'::regclass, true)"));
        assert!(sql.starts_with("SELECT 'CREATE OR REPLACE VIEW \"public\".\"active_users\" AS"));
    }

    #[test]
    fn test_bytea_literal() {
        assert_eq!(
            PostgresDialect.render_value(&Value::Bytes(vec![0xca, 0xfe])),
            "'\\xcafe'::bytea"
        );
        assert_eq!(PostgresDialect.render_value(&Value::Bool(false)), "FALSE");
    }

    #[test]
    fn test_show_columns_reports_full_type() {
        let sql = render(DialectOperation::ShowColumns {
            schema: "public".into(),
            table: "users".into(),
        });
        assert!(
            sql.contains("COALESCE(pg_catalog.format_type(a.atttypid, a.atttypmod), c.data_type) AS type"),
            "{sql}"
        );
        assert!(sql.contains("ON a.attrelid = st.relid AND a.attname = c.column_name"), "{sql}");
        assert_eq!(
            PostgresDialect.auto_increment_clause(),
            Some("GENERATED BY DEFAULT AS IDENTITY")
        );
    }

    #[test]
    fn test_array_elements_are_quoted() {
        let value = Value::Array(vec![
            Value::from("a,b"),
            Value::from("say \"hi\""),
            Value::Null,
            Value::from("back\\slash"),
            Value::Array(vec![Value::Int64(1), Value::Int64(2)]),
        ]);
        assert_eq!(
            PostgresDialect.render_value(&value),
            r#"'{"a,b","say \"hi\"",NULL,"back\\slash",{"1","2"}}'"#
        );
        assert_eq!(
            PostgresDialect.render_value(&Value::Array(vec![Value::from("it's")])),
            r#"'{"it''s"}'"#
        );
    }
}
