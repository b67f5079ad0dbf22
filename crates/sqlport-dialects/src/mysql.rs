//! MySQL / MariaDB rendering

use sqlport_core::{
    ColumnChange, CoreError, DialectCapabilities, DialectId, DialectOperation, DialectProvider,
    IndexKind, LiteralStyle, ObjectKind, QueryResult, QuoteStyle, Result, TableChange,
};

use crate::common::{self, ColumnSyntax};

const COLUMN_SYNTAX: ColumnSyntax = ColumnSyntax {
    auto_increment: Some("AUTO_INCREMENT"),
    inline_comment: true,
};

#[derive(Debug, Default, Clone, Copy)]
pub struct MySqlDialect;

impl MySqlDialect {
    fn show_columns(&self, schema: &str, table: &str) -> String {
        format!(
            "SELECT COLUMN_NAME AS name, COLUMN_TYPE AS type, IS_NULLABLE AS nullable, \
             COLUMN_KEY AS `key`, COLUMN_DEFAULT AS default_value, COLUMN_COMMENT AS comment, \
             EXTRA AS extra \
             FROM information_schema.COLUMNS \
             WHERE TABLE_SCHEMA = {} AND TABLE_NAME = {} \
             ORDER BY ORDINAL_POSITION",
            self.quote_literal(schema),
            self.quote_literal(table)
        )
    }

    fn show_index(&self, schema: &str, table: &str) -> String {
        format!(
            "SELECT INDEX_NAME AS index_name, COLUMN_NAME AS column_name, \
             NON_UNIQUE AS non_unique, SEQ_IN_INDEX AS seq, INDEX_TYPE AS index_type, \
             CASE WHEN INDEX_NAME = 'PRIMARY' THEN 1 ELSE 0 END AS is_primary \
             FROM information_schema.STATISTICS \
             WHERE TABLE_SCHEMA = {} AND TABLE_NAME = {} \
             ORDER BY INDEX_NAME, SEQ_IN_INDEX",
            self.quote_literal(schema),
            self.quote_literal(table)
        )
    }

    fn show_table_status(&self, schema: &str, table: &str) -> String {
        format!(
            "SELECT TABLE_NAME AS name, TABLE_COMMENT AS comment, TABLE_ROWS AS table_rows, \
             DATA_LENGTH AS data_length, AUTO_INCREMENT AS auto_increment, \
             ROW_FORMAT AS row_format \
             FROM information_schema.TABLES \
             WHERE TABLE_SCHEMA = {} AND TABLE_NAME = {}",
            self.quote_literal(schema),
            self.quote_literal(table)
        )
    }

    fn list_objects(&self, kind: ObjectKind, schema: &str) -> String {
        let schema = self.quote_literal(schema);
        match kind {
            ObjectKind::Table | ObjectKind::View => format!(
                "SELECT TABLE_NAME AS name FROM information_schema.TABLES \
                 WHERE TABLE_SCHEMA = {} AND TABLE_TYPE = '{}' ORDER BY TABLE_NAME",
                schema,
                if kind == ObjectKind::Table { "BASE TABLE" } else { "VIEW" }
            ),
            ObjectKind::Procedure | ObjectKind::Function => format!(
                "SELECT ROUTINE_NAME AS name FROM information_schema.ROUTINES \
                 WHERE ROUTINE_SCHEMA = {} AND ROUTINE_TYPE = '{}' ORDER BY ROUTINE_NAME",
                schema,
                kind.keyword()
            ),
            ObjectKind::Trigger => format!(
                "SELECT TRIGGER_NAME AS name FROM information_schema.TRIGGERS \
                 WHERE TRIGGER_SCHEMA = {} ORDER BY TRIGGER_NAME",
                schema
            ),
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
                "ALTER TABLE {} COMMENT = {}",
                table,
                self.quote_literal(comment)
            ));
        }
        if let Some(new_name) = change.new_name.as_deref().filter(|n| *n != change.table) {
            statements.push(format!(
                "ALTER TABLE {} RENAME TO {}",
                table,
                self.qualify(&change.schema, new_name)?
            ));
        }
        Ok(statements)
    }

    fn update_column(&self, change: &ColumnChange) -> Result<Vec<String>> {
        if change.is_empty() {
            return Err(common::no_change("column update"));
        }
        // CHANGE COLUMN restates the whole definition, so it covers renames too
        Ok(vec![format!(
            "ALTER TABLE {} CHANGE COLUMN {} {}",
            self.qualify(&change.schema, &change.table)?,
            self.quote(&change.old.name)?,
            common::column_definition(self, &change.new, COLUMN_SYNTAX)?
        )])
    }
}

impl DialectProvider for MySqlDialect {
    fn id(&self) -> DialectId {
        DialectId::MySql
    }

    fn capabilities(&self) -> DialectCapabilities {
        DialectCapabilities {
            multi_row_insert: true,
            table_source: true,
            views: true,
            procedures: true,
            functions: true,
            triggers: true,
            table_comments: true,
            fulltext_index: true,
            alter_column: true,
            create_schema: true,
        }
    }

    fn quote_style(&self) -> QuoteStyle {
        QuoteStyle::Backtick
    }

    fn literal_style(&self) -> LiteralStyle {
        LiteralStyle::Backslash
    }

    fn bool_literal(&self, value: bool) -> &'static str {
        if value { "1" } else { "0" }
    }

    fn render_statements(&self, op: &DialectOperation) -> Result<Vec<String>> {
        let sql = match op {
            DialectOperation::ShowColumns { schema, table } => self.show_columns(schema, table),
            DialectOperation::ShowIndex { schema, table } => self.show_index(schema, table),
            DialectOperation::ShowTableStatus { schema, table } => {
                self.show_table_status(schema, table)
            }
            DialectOperation::ShowTableSource { schema, table } => {
                format!("SHOW CREATE TABLE {}", self.qualify(schema, table)?)
            }
            // SHOW CREATE TABLE already carries the indexes
            DialectOperation::ShowIndexSource { .. } => return Err(self.unsupported(op)),
            DialectOperation::ShowObjectSource { kind, schema, name } => format!(
                "SHOW CREATE {} {}",
                kind.keyword(),
                self.qualify(schema, name)?
            ),
            DialectOperation::ListObjects { kind, schema } => self.list_objects(*kind, schema),
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
                common::ensure_index_columns(index)?;
                let kind = match index.kind {
                    IndexKind::Normal => "",
                    IndexKind::Unique => "UNIQUE ",
                    IndexKind::Fulltext => "FULLTEXT ",
                };
                format!(
                    "CREATE {}INDEX {} ON {} ({})",
                    kind,
                    self.quote(&index.resolved_name())?,
                    self.qualify(&index.schema, &index.table)?,
                    common::column_list(self, &index.columns)?
                )
            }
            DialectOperation::DropIndex {
                schema,
                table,
                name,
            } => format!(
                "ALTER TABLE {} DROP INDEX {}",
                self.qualify(schema, table)?,
                self.quote(name)?
            ),
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

    fn read_source(&self, kind: ObjectKind, result: &QueryResult) -> Result<Option<String>> {
        let Some(row) = result.rows.first() else {
            return Ok(None);
        };
        let column = match kind {
            ObjectKind::Table => "Create Table",
            ObjectKind::View => "Create View",
            ObjectKind::Procedure => "Create Procedure",
            ObjectKind::Function => "Create Function",
            ObjectKind::Trigger => "SQL Original Statement",
        };
        // Routine bodies come back NULL when the user lacks privileges on them
        Ok(row
            .text(column)
            .map(|source| source.trim_end().trim_end_matches(';').to_string()))
    }

    fn script_header(&self) -> Vec<String> {
        vec![
            "SET NAMES utf8mb4".to_string(),
            "SET FOREIGN_KEY_CHECKS = 0".to_string(),
        ]
    }

    fn script_footer(&self) -> Vec<String> {
        vec!["SET FOREIGN_KEY_CHECKS = 1".to_string()]
    }

    fn schema_preamble(&self, schema: &str) -> Result<Vec<String>> {
        if schema.is_empty() {
            return Err(CoreError::InvalidInput(
                "schema name is required to create a database".to_string(),
            ));
        }
        let quoted = self.quote(schema)?;
        Ok(vec![
            format!("CREATE DATABASE IF NOT EXISTS {quoted}"),
            format!("USE {quoted}"),
        ])
    }

    fn routine_delimiter(&self) -> Option<&'static str> {
        Some(";;")
    }

    fn auto_increment_clause(&self) -> Option<&'static str> {
        COLUMN_SYNTAX.auto_increment
    }

    // SHOW CREATE output names the object alone; `USE` picks the database
    fn script_schema<'a>(&self, _schema: &'a str) -> &'a str {
        ""
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sqlport_core::{ColumnDefault, ColumnDefinition, IndexDefinition, PageQuery, Value};

    fn render(op: DialectOperation) -> String {
        MySqlDialect.render(&op).unwrap()
    }

    #[test]
    fn test_page_query_without_offset() {
        let sql = render(DialectOperation::BuildPageQuery(PageQuery::new(
            "shop", "orders", 50,
        )));
        assert_eq!(sql, "SELECT * FROM `shop`.`orders` LIMIT 50");
    }

    #[test]
    fn test_page_query_with_offset_and_order() {
        let page = PageQuery::new("shop", "orders", 50)
            .offset(100)
            .order_by(vec!["id".into()]);
        assert_eq!(
            render(DialectOperation::BuildPageQuery(page)),
            "SELECT * FROM `shop`.`orders` ORDER BY `id` LIMIT 50 OFFSET 100"
        );
    }

    #[test]
    fn test_zero_page_size_is_invalid() {
        let err = MySqlDialect
            .render(&DialectOperation::BuildPageQuery(PageQuery::new("shop", "orders", 0)))
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));
    }

    #[test]
    fn test_catalog_queries_escape_literals() {
        let sql = render(DialectOperation::ShowColumns {
            schema: "shop".into(),
            table: "it's".into(),
        });
        assert!(sql.contains("TABLE_NAME = 'it''s'"));
        assert!(sql.contains("ORDER BY ORDINAL_POSITION"));
    }

    #[test]
    fn test_add_column_with_comment_and_default() {
        let column = ColumnDefinition::new("status", "varchar(20)")
            .not_null()
            .default_value(ColumnDefault::Literal("new".into()))
            .comment("order status");
        assert_eq!(
            render(DialectOperation::AddColumn {
                schema: "shop".into(),
                table: "orders".into(),
                column,
            }),
            "ALTER TABLE `shop`.`orders` ADD COLUMN `status` varchar(20) NOT NULL DEFAULT 'new' COMMENT 'order status'"
        );
    }

    #[test]
    fn test_update_column_uses_change_column() {
        let old = ColumnDefinition::new("name", "varchar(50)");
        let new = ColumnDefinition::new("full_name", "varchar(100)").not_null();
        let sql = render(DialectOperation::UpdateColumn(ColumnChange {
            schema: "shop".into(),
            table: "users".into(),
            old,
            new,
        }));
        assert_eq!(
            sql,
            "ALTER TABLE `shop`.`users` CHANGE COLUMN `name` `full_name` varchar(100) NOT NULL"
        );
    }

    #[test]
    fn test_update_table_comment_then_rename() {
        let sql = render(DialectOperation::UpdateTable(TableChange {
            schema: "shop".into(),
            table: "users".into(),
            new_name: Some("customers".into()),
            new_comment: Some("buyers".into()),
        }));
        assert_eq!(
            sql,
            "ALTER TABLE `shop`.`users` COMMENT = 'buyers';\nALTER TABLE `shop`.`users` RENAME TO `shop`.`customers`"
        );
    }

    #[test]
    fn test_empty_update_table_is_invalid() {
        let err = MySqlDialect
            .render(&DialectOperation::UpdateTable(TableChange {
                schema: "shop".into(),
                table: "users".into(),
                new_name: None,
                new_comment: None,
            }))
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));
    }

    #[test]
    fn test_fulltext_index() {
        let sql = render(DialectOperation::CreateIndex(IndexDefinition {
            schema: "shop".into(),
            table: "posts".into(),
            name: None,
            columns: vec!["body".into()],
            kind: IndexKind::Fulltext,
        }));
        assert_eq!(
            sql,
            "CREATE FULLTEXT INDEX `idx_posts_body` ON `shop`.`posts` (`body`)"
        );
    }

    #[test]
    fn test_read_source_picks_create_column() {
        let result = QueryResult::from_rows(
            &["Table", "Create Table"],
            vec![vec![
                Value::from("users"),
                Value::from("CREATE TABLE `users` (\n  `id` int NOT NULL\n)"),
            ]],
        );
        assert_eq!(
            MySqlDialect.read_source(ObjectKind::Table, &result).unwrap().as_deref(),
            Some("CREATE TABLE `users` (\n  `id` int NOT NULL\n)")
        );
        assert_eq!(
            MySqlDialect
                .read_source(ObjectKind::Table, &QueryResult::empty())
                .unwrap(),
            None
        );
    }

    #[test]
    fn test_values_use_backslash_escaping() {
        assert_eq!(MySqlDialect.render_value(&Value::from("a\\b'c")), "'a\\\\b''c'");
        assert_eq!(MySqlDialect.render_value(&Value::Bool(true)), "1");
        assert_eq!(MySqlDialect.render_value(&Value::Bytes(vec![0xde, 0xad])), "X'DEAD'");
        assert_eq!(MySqlDialect.render_value(&Value::Null), "NULL");
    }

    #[test]
    fn test_identifier_errors_surface() {
        let err = MySqlDialect
            .render(&DialectOperation::DropTable {
                schema: "shop".into(),
                table: String::new(),
            })
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidIdentifier { .. }));
    }

    #[test]
    fn test_script_objects_follow_show_create_naming() {
        assert_eq!(MySqlDialect.script_schema("shop"), "");
        assert_eq!(
            MySqlDialect
                .drop_statement(ObjectKind::Table, MySqlDialect.script_schema("shop"), "users")
                .unwrap(),
            "DROP TABLE IF EXISTS `users`"
        );
        assert_eq!(MySqlDialect.auto_increment_clause(), Some("AUTO_INCREMENT"));
    }
}
