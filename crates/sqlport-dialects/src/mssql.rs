//! SQL Server rendering

use sqlport_core::{
    ColumnChange, CoreError, DialectCapabilities, DialectId, DialectOperation, DialectProvider,
    IndexKind, ObjectKind, PageQuery, QuoteStyle, Result, TableChange,
};

use crate::common::{self, ColumnSyntax};

const COLUMN_SYNTAX: ColumnSyntax = ColumnSyntax {
    auto_increment: Some("IDENTITY(1,1)"),
    inline_comment: false,
};

/// SQL Server rejects more than this many row constructors per VALUES clause
const MAX_ROWS_PER_INSERT: usize = 1000;

/// Declared column type with its length, precision or scale, as DDL spells it.
/// `INFORMATION_SCHEMA.COLUMNS.DATA_TYPE` alone drops them.
const COLUMN_TYPE: &str = "CASE \
     WHEN c.DATA_TYPE IN ('text', 'ntext', 'image', 'xml', 'sql_variant', 'hierarchyid', 'geography', 'geometry') \
     THEN c.DATA_TYPE \
     WHEN c.CHARACTER_MAXIMUM_LENGTH = -1 THEN c.DATA_TYPE + '(max)' \
     WHEN c.CHARACTER_MAXIMUM_LENGTH IS NOT NULL \
     THEN c.DATA_TYPE + '(' + CAST(c.CHARACTER_MAXIMUM_LENGTH AS VARCHAR(10)) + ')' \
     WHEN c.DATA_TYPE IN ('decimal', 'numeric') \
     THEN c.DATA_TYPE + '(' + CAST(c.NUMERIC_PRECISION AS VARCHAR(10)) + ',' \
     + CAST(c.NUMERIC_SCALE AS VARCHAR(10)) + ')' \
     WHEN c.DATA_TYPE IN ('datetime2', 'datetimeoffset', 'time') \
     THEN c.DATA_TYPE + '(' + CAST(c.DATETIME_PRECISION AS VARCHAR(10)) + ')' \
     ELSE c.DATA_TYPE END";

#[derive(Debug, Default, Clone, Copy)]
pub struct MsSqlDialect;

impl MsSqlDialect {
    /// `N'[schema].[object]'`, the argument form `OBJECT_ID` and `sp_rename` expect
    fn object_name_literal(&self, schema: &str, name: &str) -> Result<String> {
        Ok(self.quote_literal(&self.qualify(schema, name)?))
    }

    fn show_columns(&self, schema: &str, table: &str) -> Result<String> {
        let object = self.object_name_literal(schema, table)?;
        let schema = self.quote_literal(schema);
        let table = self.quote_literal(table);
        Ok(format!(
            "SELECT c.COLUMN_NAME AS name, {COLUMN_TYPE} AS type, c.IS_NULLABLE AS nullable, \
             CASE WHEN pk.COLUMN_NAME IS NOT NULL THEN 'PRI' ELSE '' END AS [key], \
             c.COLUMN_DEFAULT AS default_value, CAST(ep.value AS NVARCHAR(4000)) AS comment, \
             CASE WHEN COLUMNPROPERTY(OBJECT_ID({object}), c.COLUMN_NAME, 'IsIdentity') = 1 \
             THEN 'auto_increment' ELSE '' END AS extra \
             FROM INFORMATION_SCHEMA.COLUMNS c \
             LEFT JOIN (SELECT ku.COLUMN_NAME FROM INFORMATION_SCHEMA.TABLE_CONSTRAINTS tc \
             JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE ku \
             ON tc.CONSTRAINT_NAME = ku.CONSTRAINT_NAME AND tc.TABLE_SCHEMA = ku.TABLE_SCHEMA \
             WHERE tc.CONSTRAINT_TYPE = 'PRIMARY KEY' AND tc.TABLE_SCHEMA = {schema} \
             AND tc.TABLE_NAME = {table}) pk ON pk.COLUMN_NAME = c.COLUMN_NAME \
             LEFT JOIN sys.extended_properties ep ON ep.major_id = OBJECT_ID({object}) \
             AND ep.minor_id = COLUMNPROPERTY(OBJECT_ID({object}), c.COLUMN_NAME, 'ColumnId') \
             AND ep.name = 'MS_Description' \
             WHERE c.TABLE_SCHEMA = {schema} AND c.TABLE_NAME = {table} \
             ORDER BY c.ORDINAL_POSITION"
        ))
    }

    fn show_index(&self, schema: &str, table: &str) -> Result<String> {
        Ok(format!(
            "SELECT i.name AS index_name, col.name AS column_name, \
             CASE WHEN i.is_unique = 1 THEN 0 ELSE 1 END AS non_unique, \
             ic.key_ordinal AS seq, i.type_desc AS index_type, \
             CAST(i.is_primary_key AS INT) AS is_primary \
             FROM sys.indexes i \
             JOIN sys.index_columns ic ON ic.object_id = i.object_id AND ic.index_id = i.index_id \
             JOIN sys.columns col ON col.object_id = ic.object_id AND col.column_id = ic.column_id \
             WHERE i.object_id = OBJECT_ID({}) AND ic.key_ordinal > 0 \
             ORDER BY i.name, ic.key_ordinal",
            self.object_name_literal(schema, table)?
        ))
    }

    fn show_table_status(&self, schema: &str, table: &str) -> Result<String> {
        Ok(format!(
            "SELECT t.name AS name, CAST(ep.value AS NVARCHAR(4000)) AS comment, \
             (SELECT SUM(p.rows) FROM sys.partitions p \
             WHERE p.object_id = t.object_id AND p.index_id IN (0, 1)) AS table_rows, \
             NULL AS data_length, NULL AS auto_increment, NULL AS row_format \
             FROM sys.tables t \
             LEFT JOIN sys.extended_properties ep ON ep.major_id = t.object_id \
             AND ep.minor_id = 0 AND ep.name = 'MS_Description' \
             WHERE t.object_id = OBJECT_ID({})",
            self.object_name_literal(schema, table)?
        ))
    }

    fn list_objects(&self, kind: ObjectKind, schema: &str) -> String {
        let schema = self.quote_literal(schema);
        match kind {
            ObjectKind::Table | ObjectKind::View => format!(
                "SELECT TABLE_NAME AS name FROM INFORMATION_SCHEMA.TABLES \
                 WHERE TABLE_SCHEMA = {} AND TABLE_TYPE = '{}' ORDER BY TABLE_NAME",
                schema,
                if kind == ObjectKind::Table { "BASE TABLE" } else { "VIEW" }
            ),
            ObjectKind::Procedure | ObjectKind::Function => format!(
                "SELECT ROUTINE_NAME AS name FROM INFORMATION_SCHEMA.ROUTINES \
                 WHERE ROUTINE_SCHEMA = {} AND ROUTINE_TYPE = '{}' ORDER BY ROUTINE_NAME",
                schema,
                kind.keyword()
            ),
            ObjectKind::Trigger => format!(
                "SELECT tr.name AS name FROM sys.triggers tr \
                 JOIN sys.objects o ON o.object_id = tr.parent_id \
                 WHERE SCHEMA_NAME(o.schema_id) = {} ORDER BY tr.name",
                schema
            ),
        }
    }

    /// Add or replace the `MS_Description` extended property of a table or column
    fn description(
        &self,
        schema: &str,
        table: &str,
        column: Option<&str>,
        comment: &str,
    ) -> Result<String> {
        let object = self.object_name_literal(schema, table)?;
        let minor_id = match column {
            Some(column) => format!(
                "COLUMNPROPERTY(OBJECT_ID({object}), {}, 'ColumnId')",
                self.quote_literal(column)
            ),
            None => "0".to_string(),
        };
        let mut target = format!(
            "N'SCHEMA', {}, N'TABLE', {}",
            self.quote_literal(schema),
            self.quote_literal(table)
        );
        if let Some(column) = column {
            target.push_str(&format!(", N'COLUMN', {}", self.quote_literal(column)));
        }
        let value = self.quote_literal(comment);
        Ok(format!(
            "IF EXISTS (SELECT 1 FROM sys.extended_properties WHERE major_id = OBJECT_ID({object}) \
             AND minor_id = {minor_id} AND name = N'MS_Description') \
             EXEC sp_updateextendedproperty N'MS_Description', {value}, {target} \
             ELSE EXEC sp_addextendedproperty N'MS_Description', {value}, {target}"
        ))
    }

    fn page_query(&self, page: &PageQuery) -> Result<String> {
        common::ensure_page_size(page)?;
        let columns = common::select_list(self, &page.columns)?;
        let table = self.qualify(&page.schema, &page.table)?;
        match page.effective_offset() {
            None => Ok(format!(
                "SELECT TOP {} {} FROM {}{}",
                page.page_size,
                columns,
                table,
                common::order_clause(self, &page.order_by)?
            )),
            Some(offset) => {
                // OFFSET .. FETCH requires an ORDER BY
                let order = if page.order_by.is_empty() {
                    " ORDER BY (SELECT NULL)".to_string()
                } else {
                    common::order_clause(self, &page.order_by)?
                };
                Ok(format!(
                    "SELECT {} FROM {}{} OFFSET {} ROWS FETCH NEXT {} ROWS ONLY",
                    columns, table, order, offset, page.page_size
                ))
            }
        }
    }

    fn update_table(&self, change: &TableChange) -> Result<Vec<String>> {
        if change.is_empty() {
            return Err(common::no_change("table update"));
        }
        let mut statements = Vec::new();
        if let Some(comment) = &change.new_comment {
            statements.push(self.description(&change.schema, &change.table, None, comment)?);
        }
        if let Some(new_name) = change.new_name.as_deref().filter(|n| *n != change.table) {
            statements.push(format!(
                "EXEC sp_rename {}, {}",
                self.object_name_literal(&change.schema, &change.table)?,
                self.quote_literal(new_name)
            ));
        }
        Ok(statements)
    }

    fn update_column(&self, change: &ColumnChange) -> Result<Vec<String>> {
        if change.is_empty() {
            return Err(common::no_change("column update"));
        }
        let (old, new) = (&change.old, &change.new);
        if old.auto_increment != new.auto_increment || old.primary_key != new.primary_key {
            return Err(CoreError::unsupported(
                self.id(),
                "UpdateColumn(identity or primary key change)",
            ));
        }
        if old.default_value != new.default_value && old.default_value.is_some() {
            // Existing defaults are named constraints that must be dropped by name
            return Err(CoreError::unsupported(
                self.id(),
                "UpdateColumn(replace existing default)",
            ));
        }

        let table = self.qualify(&change.schema, &change.table)?;
        let column = self.quote(&new.name)?;
        let mut statements = Vec::new();
        if change.renames() {
            statements.push(format!(
                "EXEC sp_rename {}, {}, N'COLUMN'",
                self.quote_literal(&format!("{}.{}", table, self.quote(&old.name)?)),
                self.quote_literal(&new.name)
            ));
        }
        if old.data_type != new.data_type || old.nullable != new.nullable {
            statements.push(format!(
                "ALTER TABLE {} ALTER COLUMN {} {} {}",
                table,
                column,
                new.data_type.trim(),
                if new.nullable { "NULL" } else { "NOT NULL" }
            ));
        }
        if let (None, Some(default)) = (&old.default_value, &new.default_value) {
            statements.push(format!(
                "ALTER TABLE {} ADD DEFAULT {} FOR {}",
                table,
                common::render_default(self, default),
                column
            ));
        }
        if old.comment != new.comment {
            statements.push(self.description(
                &change.schema,
                &change.table,
                Some(&new.name),
                new.comment.as_deref().unwrap_or(""),
            )?);
        }
        Ok(statements)
    }
}

impl DialectProvider for MsSqlDialect {
    fn id(&self) -> DialectId {
        DialectId::MsSql
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
        QuoteStyle::Bracket
    }

    fn quote_literal(&self, value: &str) -> String {
        format!("N'{}'", self.escape_literal(value))
    }

    fn bool_literal(&self, value: bool) -> &'static str {
        if value { "1" } else { "0" }
    }

    fn bytes_literal(&self, bytes: &[u8]) -> String {
        format!("0x{}", hex::encode_upper(bytes))
    }

    fn render_statements(&self, op: &DialectOperation) -> Result<Vec<String>> {
        let sql = match op {
            DialectOperation::ShowColumns { schema, table } => self.show_columns(schema, table)?,
            DialectOperation::ShowIndex { schema, table } => self.show_index(schema, table)?,
            DialectOperation::ShowTableStatus { schema, table } => {
                self.show_table_status(schema, table)?
            }
            DialectOperation::ShowTableSource { .. } | DialectOperation::ShowIndexSource { .. } => {
                return Err(self.unsupported(op));
            }
            DialectOperation::ShowObjectSource { kind, schema, name } => {
                if *kind == ObjectKind::Table {
                    return Err(self.unsupported(op));
                }
                format!(
                    "SELECT OBJECT_DEFINITION(OBJECT_ID({})) AS source",
                    self.object_name_literal(schema, name)?
                )
            }
            DialectOperation::ListObjects { kind, schema } => self.list_objects(*kind, schema),
            DialectOperation::AddColumn {
                schema,
                table,
                column,
            } => {
                let mut statements = vec![format!(
                    "ALTER TABLE {} ADD {}",
                    self.qualify(schema, table)?,
                    common::column_definition(self, column, COLUMN_SYNTAX)?
                )];
                if let Some(comment) = &column.comment {
                    statements.push(self.description(schema, table, Some(&column.name), comment)?);
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
            DialectOperation::DropIndex {
                schema,
                table,
                name,
            } => format!(
                "DROP INDEX {} ON {}",
                self.quote(name)?,
                self.qualify(schema, table)?
            ),
            DialectOperation::BuildPageQuery(page) => self.page_query(page)?,
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
        vec!["SET NOCOUNT ON".to_string()]
    }

    fn schema_preamble(&self, schema: &str) -> Result<Vec<String>> {
        if schema.is_empty() {
            return Ok(Vec::new());
        }
        let create = format!("CREATE SCHEMA {}", self.quote(schema)?);
        Ok(vec![format!(
            "IF SCHEMA_ID({}) IS NULL EXEC({})",
            self.quote_literal(schema),
            self.quote_literal(&create)
        )])
    }

    fn max_rows_per_insert(&self) -> Option<usize> {
        Some(MAX_ROWS_PER_INSERT)
    }

    fn auto_increment_clause(&self) -> Option<&'static str> {
        COLUMN_SYNTAX.auto_increment
    }

    fn identity_insert(&self, schema: &str, table: &str, enable: bool) -> Result<Option<String>> {
        Ok(Some(format!(
            "SET IDENTITY_INSERT {} {}",
            self.qualify(schema, table)?,
            if enable { "ON" } else { "OFF" }
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sqlport_core::{ColumnDefinition, Value};

    fn render(op: DialectOperation) -> String {
        MsSqlDialect.render(&op).unwrap()
    }

    #[test]
    fn test_page_query_uses_top_without_offset() {
        assert_eq!(
            render(DialectOperation::BuildPageQuery(PageQuery::new("shop", "orders", 50))),
            "SELECT TOP 50 * FROM [shop].[orders]"
        );
    }

    #[test]
    fn test_page_query_with_offset_needs_order() {
        assert_eq!(
            render(DialectOperation::BuildPageQuery(
                PageQuery::new("shop", "orders", 50).offset(50)
            )),
            "SELECT * FROM [shop].[orders] ORDER BY (SELECT NULL) OFFSET 50 ROWS FETCH NEXT 50 ROWS ONLY"
        );
        assert_eq!(
            render(DialectOperation::BuildPageQuery(
                PageQuery::new("shop", "orders", 10)
                    .offset(20)
                    .order_by(vec!["id".into()])
            )),
            "SELECT * FROM [shop].[orders] ORDER BY [id] OFFSET 20 ROWS FETCH NEXT 10 ROWS ONLY"
        );
    }

    #[test]
    fn test_rename_column_uses_sp_rename() {
        let sql = render(DialectOperation::UpdateColumn(ColumnChange {
            schema: "dbo".into(),
            table: "users".into(),
            old: ColumnDefinition::new("name", "nvarchar(50)"),
            new: ColumnDefinition::new("full_name", "nvarchar(50)"),
        }));
        assert_eq!(
            sql,
            "EXEC sp_rename N'[dbo].[users].[name]', N'full_name', N'COLUMN'"
        );
    }

    #[test]
    fn test_schema_preamble_escapes_nested_literal() {
        let statements = MsSqlDialect.schema_preamble("o'brien").unwrap();
        assert_eq!(
            statements,
            vec!["IF SCHEMA_ID(N'o''brien') IS NULL EXEC(N'CREATE SCHEMA [o''brien]')"]
        );
    }

    #[test]
    fn test_values_and_identity_insert() {
        assert_eq!(MsSqlDialect.render_value(&Value::from("héllo")), "N'héllo'");
        assert_eq!(MsSqlDialect.render_value(&Value::Bytes(vec![1, 255])), "0x01FF");
        assert_eq!(
            MsSqlDialect.identity_insert("dbo", "users", true).unwrap().as_deref(),
            Some("SET IDENTITY_INSERT [dbo].[users] ON")
        );
        assert_eq!(MsSqlDialect.max_rows_per_insert(), Some(1000));
    }

    #[test]
    fn test_show_columns_keeps_length_and_precision() {
        let sql = render(DialectOperation::ShowColumns {
            schema: "dbo".into(),
            table: "users".into(),
        });
        assert!(!sql.contains("c.DATA_TYPE AS type"), "{sql}");
        assert!(sql.contains("WHEN c.CHARACTER_MAXIMUM_LENGTH = -1 THEN c.DATA_TYPE + '(max)'"));
        assert!(sql.contains("CAST(c.CHARACTER_MAXIMUM_LENGTH AS VARCHAR(10))"));
        assert!(sql.contains("CAST(c.NUMERIC_SCALE AS VARCHAR(10))"));
        assert!(sql.contains("ELSE c.DATA_TYPE END AS type"));
        assert_eq!(MsSqlDialect.auto_increment_clause(), Some("IDENTITY(1,1)"));
    }
}
