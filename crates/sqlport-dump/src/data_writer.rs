//! Streams table rows into a dump as `INSERT` statements

use tokio_util::sync::CancellationToken;

use sqlport_core::{
    ColumnMeta, Connection, DialectOperation, DialectProvider, DumpSettings, InsertStyle,
    PageQuery, Result as CoreResult, Row,
};

use crate::{DataWriteSummary, DumpError, OutputSink};

/// Reads a table in offset pages of `batch_size` rows and writes each page as
/// one batch of inserts.
pub struct DataStreamWriter<'a> {
    connection: &'a dyn Connection,
    provider: &'static dyn DialectProvider,
    batch_size: u64,
    insert_style: InsertStyle,
}

impl<'a> DataStreamWriter<'a> {
    pub fn new(
        connection: &'a dyn Connection,
        provider: &'static dyn DialectProvider,
        settings: &DumpSettings,
    ) -> Self {
        Self {
            connection,
            provider,
            batch_size: settings.dump_batch_size.max(1),
            insert_style: settings.insert_style,
        }
    }

    pub fn with_batch_size(mut self, batch_size: u64) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    fn multi_row(&self) -> bool {
        self.insert_style == InsertStyle::MultiRow && self.provider.capabilities().multi_row_insert
    }

    /// Write every row of `table`. Reads stop at the first short page, so a
    /// table of `R` rows produces `ceil(R / batch_size)` batches.
    ///
    /// Rows are read from `schema` and inserted under the dialect's script
    /// schema. Once an identity-insert toggle has been written, its closing
    /// statement follows even when a later batch fails.
    #[tracing::instrument(skip(self, columns, sink, cancel), fields(batch_size = self.batch_size))]
    pub async fn write_table_data(
        &self,
        schema: &str,
        table: &str,
        columns: &[ColumnMeta],
        order_by: &[String],
        sink: &mut dyn OutputSink,
        cancel: &CancellationToken,
    ) -> Result<DataWriteSummary, DumpError> {
        let column_names: Vec<String> = columns.iter().map(|c| c.name.clone()).collect();
        let target_schema = self.provider.script_schema(schema);
        let identity = columns.iter().any(|c| c.auto_increment);
        let identity_on = self.identity_toggle(target_schema, table, identity, true)?;
        let identity_off = self.identity_toggle(target_schema, table, identity, false)?;

        let mut summary = DataWriteSummary::default();
        let mut identity_open = false;
        let streamed = async {
            let mut offset = 0u64;
            loop {
                if cancel.is_cancelled() {
                    summary.cancelled = true;
                    break;
                }

                let page = PageQuery::new(schema, table, self.batch_size)
                    .offset(offset)
                    .order_by(order_by.to_vec())
                    .columns(column_names.clone());
                let sql = self
                    .provider
                    .render(&DialectOperation::BuildPageQuery(page))
                    .map_err(|e| DumpError::from_core(table, e))?;
                tracing::debug!(sql = %sql, offset, "reading batch");
                let result = self
                    .connection
                    .query(&sql, &[])
                    .await
                    .map_err(|source| DumpError::DataRead {
                        table: table.to_string(),
                        source,
                    })?;

                let fetched = result.rows.len() as u64;
                if fetched == 0 {
                    break;
                }
                if !identity_open {
                    if let Some(statement) = &identity_on {
                        sink.write(&format!("{statement};\n")).await?;
                        identity_open = true;
                    }
                }

                let statements = self
                    .insert_statements(target_schema, table, &column_names, &result.rows)
                    .map_err(|e| DumpError::from_core(table, e))?;
                for statement in statements {
                    sink.write(&statement).await?;
                    sink.write(";\n").await?;
                }
                summary.rows += fetched;
                summary.batches += 1;
                tracing::debug!(table = %table, rows = fetched, batch = summary.batches, "wrote batch");

                if fetched < self.batch_size {
                    break;
                }
                offset += fetched;
            }
            Ok::<(), DumpError>(())
        }
        .await;

        if identity_open {
            if let Some(statement) = &identity_off {
                // A failed sink takes nothing more
                if !matches!(&streamed, Err(e) if e.is_fatal()) {
                    sink.write(&format!("{statement};\n")).await?;
                }
            }
        }
        streamed?;
        Ok(summary)
    }

    fn identity_toggle(
        &self,
        schema: &str,
        table: &str,
        identity: bool,
        enable: bool,
    ) -> Result<Option<String>, DumpError> {
        if !identity {
            return Ok(None);
        }
        self.provider
            .identity_insert(schema, table, enable)
            .map_err(|e| DumpError::from_core(table, e))
    }

    /// `INSERT` statements for one batch, without terminators
    pub fn insert_statements(
        &self,
        schema: &str,
        table: &str,
        columns: &[String],
        rows: &[Row],
    ) -> CoreResult<Vec<String>> {
        let prefix = format!(
            "INSERT INTO {} ({}) VALUES ",
            self.provider.qualify(schema, table)?,
            columns
                .iter()
                .map(|c| self.provider.quote(c))
                .collect::<CoreResult<Vec<_>>>()?
                .join(", ")
        );
        let tuples: Vec<String> = rows.iter().map(|row| self.tuple(row)).collect();

        if !self.multi_row() {
            return Ok(tuples.into_iter().map(|t| format!("{prefix}{t}")).collect());
        }
        let chunk = self
            .provider
            .max_rows_per_insert()
            .unwrap_or(tuples.len())
            .max(1);
        Ok(tuples
            .chunks(chunk)
            .map(|chunk| format!("{prefix}{}", chunk.join(", ")))
            .collect())
    }

    fn tuple(&self, row: &Row) -> String {
        let values = row
            .values
            .iter()
            .map(|value| self.provider.render_value(value))
            .collect::<Vec<_>>()
            .join(", ");
        format!("({values})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlport_core::{DialectId, Value};
    use sqlport_dialects::get_dialect;

    struct NoConnection;

    #[async_trait::async_trait]
    impl Connection for NoConnection {
        fn connection_id(&self) -> uuid::Uuid {
            uuid::Uuid::nil()
        }

        fn driver_name(&self) -> &str {
            "none"
        }

        async fn execute(
            &self,
            _sql: &str,
            _params: &[Value],
        ) -> CoreResult<sqlport_core::StatementResult> {
            Ok(Default::default())
        }

        async fn query(&self, _sql: &str, _params: &[Value]) -> CoreResult<sqlport_core::QueryResult> {
            Ok(sqlport_core::QueryResult::empty())
        }
    }

    fn rows(n: i64) -> Vec<Row> {
        (1..=n)
            .map(|i| {
                Row::new(
                    vec!["id".into(), "name".into()],
                    vec![Value::Int64(i), Value::String(format!("n'{i}"))],
                )
            })
            .collect()
    }

    fn columns() -> Vec<String> {
        vec!["id".into(), "name".into()]
    }

    #[test]
    fn test_multi_row_insert() {
        let settings = DumpSettings::default();
        let writer = DataStreamWriter::new(&NoConnection, get_dialect(DialectId::MySql), &settings);
        let statements = writer
            .insert_statements("shop", "users", &columns(), &rows(2))
            .unwrap();
        assert_eq!(
            statements,
            vec!["INSERT INTO `shop`.`users` (`id`, `name`) VALUES (1, 'n''1'), (2, 'n''2')"]
        );
    }

    #[test]
    fn test_single_row_style() {
        let settings = DumpSettings {
            insert_style: InsertStyle::SingleRow,
            ..Default::default()
        };
        let writer = DataStreamWriter::new(&NoConnection, get_dialect(DialectId::Postgres), &settings);
        let statements = writer
            .insert_statements("public", "users", &columns(), &rows(2))
            .unwrap();
        assert_eq!(statements.len(), 2);
        assert_eq!(
            statements[1],
            "INSERT INTO \"public\".\"users\" (\"id\", \"name\") VALUES (2, 'n''2')"
        );
    }

    #[test]
    fn test_mssql_splits_large_batches() {
        let settings = DumpSettings::default();
        let writer = DataStreamWriter::new(&NoConnection, get_dialect(DialectId::MsSql), &settings);
        let statements = writer
            .insert_statements("dbo", "users", &columns(), &rows(2500))
            .unwrap();
        assert_eq!(statements.len(), 3);
        assert!(statements[0].starts_with("INSERT INTO [dbo].[users] ([id], [name]) VALUES (1, N'n''1')"));
    }
}
