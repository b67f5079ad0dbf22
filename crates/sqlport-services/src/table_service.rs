//! Table operations service
//!
//! Opening a table, showing its source, dropping and truncating it, and
//! producing DML templates from its columns.

use std::sync::Arc;

use sqlport_core::{
    ColumnMeta, Connection, DialectOperation, DialectProvider, DumpSettings, PageQuery,
    TableSnapshot,
};
use sqlport_schema::{CacheKey, SchemaCache, SchemaIntrospector};

use crate::error::{ServiceError, ServiceResult};
use crate::primary_key_registry::PrimaryKeyRegistry;
use crate::view_models::TablePage;

/// Resolve the dialect provider for a connection's driver
pub(crate) fn provider_for(connection: &dyn Connection) -> ServiceResult<&'static dyn DialectProvider> {
    sqlport_dialects::dialect_for_driver(connection.driver_name())
        .map_err(|_| ServiceError::UnknownDialect(connection.driver_name().to_string()))
}

/// Service for table-level operations
///
/// Handles:
/// - Opening a table with the configured page size
/// - Showing `CREATE TABLE` source
/// - Drop and truncate, invalidating cached metadata
/// - INSERT/UPDATE/DELETE templates with `$column` placeholders
pub struct TableService {
    default_page_size: u64,
    cache: Option<Arc<SchemaCache>>,
}

impl TableService {
    /// Create a new table service
    ///
    /// # Arguments
    ///
    /// * `default_page_size` - Rows fetched when a table is opened
    pub fn new(default_page_size: u64) -> Self {
        Self {
            default_page_size,
            cache: None,
        }
    }

    pub fn from_settings(settings: &DumpSettings) -> Self {
        Self::new(settings.default_page_size)
    }

    /// Share a schema cache; drops and truncates invalidate the affected table
    pub fn with_cache(mut self, cache: Arc<SchemaCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn default_page_size(&self) -> u64 {
        self.default_page_size
    }

    fn introspector(&self, connection: &Arc<dyn Connection>) -> ServiceResult<SchemaIntrospector> {
        let provider = provider_for(connection.as_ref())?;
        Ok(SchemaIntrospector::new(connection.clone(), provider))
    }

    async fn snapshot(
        &self,
        connection: &Arc<dyn Connection>,
        schema: &str,
        table: &str,
    ) -> ServiceResult<TableSnapshot> {
        self.introspector(connection)?
            .table_snapshot(schema, table, self.cache.as_deref())
            .await
            .map_err(|e| ServiceError::SchemaLoadFailed(e.to_string()))
    }

    fn invalidate(&self, connection: &dyn Connection, schema: &str, table: &str) {
        if let Some(cache) = &self.cache {
            cache.invalidate(&CacheKey::new(connection.connection_id(), schema, table));
        }
    }

    /// Run the first page of a table
    #[tracing::instrument(skip(self, connection))]
    pub async fn open_table(
        &self,
        connection: Arc<dyn Connection>,
        schema: &str,
        table: &str,
    ) -> ServiceResult<TablePage> {
        let provider = provider_for(connection.as_ref())?;
        let sql = provider
            .render(&DialectOperation::BuildPageQuery(PageQuery::new(
                schema,
                table,
                self.default_page_size,
            )))
            .map_err(ServiceError::from_render)?;

        tracing::debug!("Opening table, SQL: {}", sql);

        let result = connection
            .query(&sql, &[])
            .await
            .map_err(|e| ServiceError::TableOperationFailed(e.to_string()))?;
        Ok(TablePage { sql, result })
    }

    /// `CREATE TABLE` text for a table
    #[tracing::instrument(skip(self, connection))]
    pub async fn show_source(
        &self,
        connection: Arc<dyn Connection>,
        schema: &str,
        table: &str,
    ) -> ServiceResult<String> {
        self.introspector(&connection)?
            .table_source(schema, table, self.cache.as_deref())
            .await
            .map_err(|e| {
                if e.is_unsupported() {
                    ServiceError::Unsupported(e.to_string())
                } else {
                    ServiceError::SchemaLoadFailed(e.to_string())
                }
            })
    }

    #[tracing::instrument(skip(self, connection))]
    pub async fn drop_table(
        &self,
        connection: Arc<dyn Connection>,
        schema: &str,
        table: &str,
    ) -> ServiceResult<()> {
        let op = DialectOperation::DropTable {
            schema: schema.to_string(),
            table: table.to_string(),
        };
        self.execute_table_operation(&connection, &op, schema, table)
            .await?;
        tracing::info!(table = %table, "Table dropped successfully");
        Ok(())
    }

    /// Remove every row of a table
    #[tracing::instrument(skip(self, connection))]
    pub async fn truncate_table(
        &self,
        connection: Arc<dyn Connection>,
        schema: &str,
        table: &str,
    ) -> ServiceResult<()> {
        let op = DialectOperation::TruncateTable {
            schema: schema.to_string(),
            table: table.to_string(),
        };
        self.execute_table_operation(&connection, &op, schema, table)
            .await?;
        tracing::info!(table = %table, "Table truncated successfully");
        Ok(())
    }

    async fn execute_table_operation(
        &self,
        connection: &Arc<dyn Connection>,
        op: &DialectOperation,
        schema: &str,
        table: &str,
    ) -> ServiceResult<u64> {
        let provider = provider_for(connection.as_ref())?;
        let statements = provider
            .render_statements(op)
            .map_err(ServiceError::from_render)?;
        let result = connection.execute_all(&statements).await;
        self.invalidate(connection.as_ref(), schema, table);
        result.map_err(|e| {
            ServiceError::TableOperationFailed(format!("{} on {} failed: {}", op.name(), table, e))
        })
    }

    /// `INSERT` with one `$column` placeholder per column
    #[tracing::instrument(skip(self, connection))]
    pub async fn insert_template(
        &self,
        connection: Arc<dyn Connection>,
        schema: &str,
        table: &str,
    ) -> ServiceResult<String> {
        let provider = provider_for(connection.as_ref())?;
        let snapshot = self.snapshot(&connection, schema, table).await?;
        let names = quoted_names(provider, snapshot.columns.iter())?;
        let values: Vec<String> = snapshot
            .columns
            .iter()
            .map(|c| placeholder(&c.name))
            .collect();
        Ok(format!(
            "INSERT INTO {} (\n    {}\n)\nVALUES (\n    {}\n)",
            qualify(provider, schema, table)?,
            names.join(",\n    "),
            values.join(",\n    ")
        ))
    }

    /// `UPDATE` setting every non-identifying column, filtered on the row identity
    #[tracing::instrument(skip(self, connection))]
    pub async fn update_template(
        &self,
        connection: Arc<dyn Connection>,
        schema: &str,
        table: &str,
    ) -> ServiceResult<String> {
        let provider = provider_for(connection.as_ref())?;
        let snapshot = self.snapshot(&connection, schema, table).await?;
        let identity = row_identity(&snapshot, table)?;

        let mut assigned: Vec<&ColumnMeta> = snapshot
            .columns
            .iter()
            .filter(|c| !identity.iter().any(|key| key.name == c.name))
            .collect();
        // Tables whose every column identifies the row still get a usable SET list
        if assigned.is_empty() {
            assigned = snapshot.columns.iter().collect();
        }

        Ok(format!(
            "UPDATE {}\nSET\n    {}\nWHERE\n    {}",
            qualify(provider, schema, table)?,
            assignments(provider, assigned.into_iter())?.join(",\n    "),
            assignments(provider, identity.into_iter())?.join("\n    AND ")
        ))
    }

    /// `DELETE` filtered on the row identity
    #[tracing::instrument(skip(self, connection))]
    pub async fn delete_template(
        &self,
        connection: Arc<dyn Connection>,
        schema: &str,
        table: &str,
    ) -> ServiceResult<String> {
        let provider = provider_for(connection.as_ref())?;
        let snapshot = self.snapshot(&connection, schema, table).await?;
        let identity = row_identity(&snapshot, table)?;
        Ok(format!(
            "DELETE FROM {}\nWHERE\n    {}",
            qualify(provider, schema, table)?,
            assignments(provider, identity.into_iter())?.join("\n    AND ")
        ))
    }

    /// Current maximum of the table's registered primary key.
    ///
    /// Returns 0 without querying when no key is registered, and 0 when the
    /// maximum is NULL or not an integer.
    #[tracing::instrument(skip(self, connection, registry))]
    pub async fn max_primary_key(
        &self,
        connection: Arc<dyn Connection>,
        schema: &str,
        table: &str,
        registry: &PrimaryKeyRegistry,
    ) -> ServiceResult<i64> {
        let key = CacheKey::new(connection.connection_id(), schema, table);
        let Some(column) = registry.primary_key(&key) else {
            return Ok(0);
        };

        let provider = provider_for(connection.as_ref())?;
        let sql = provider
            .render(&DialectOperation::SelectMax {
                schema: schema.to_string(),
                table: table.to_string(),
                column,
            })
            .map_err(ServiceError::from_render)?;
        let result = connection
            .query(&sql, &[])
            .await
            .map_err(|e| ServiceError::TableOperationFailed(e.to_string()))?;

        Ok(result
            .rows
            .first()
            .and_then(|row| row.get_by_name("max_value").or_else(|| row.get(0)))
            .and_then(|value| value.as_i64())
            .unwrap_or(0))
    }
}

impl Default for TableService {
    fn default() -> Self {
        Self::from_settings(&DumpSettings::default())
    }
}

/// Columns that identify a row: the primary key, else every keyed column
fn row_identity<'a>(snapshot: &'a TableSnapshot, table: &str) -> ServiceResult<Vec<&'a ColumnMeta>> {
    let primary = snapshot.primary_key();
    if !primary.is_empty() {
        return Ok(primary);
    }
    let keyed: Vec<&ColumnMeta> = snapshot.columns.iter().filter(|c| c.key.is_key()).collect();
    if keyed.is_empty() {
        return Err(ServiceError::NoRowIdentity(table.to_string()));
    }
    Ok(keyed)
}

fn placeholder(column: &str) -> String {
    format!("${column}")
}

fn qualify(provider: &dyn DialectProvider, schema: &str, table: &str) -> ServiceResult<String> {
    provider
        .qualify(schema, table)
        .map_err(ServiceError::from_render)
}

fn quoted_names<'a>(
    provider: &dyn DialectProvider,
    columns: impl Iterator<Item = &'a ColumnMeta>,
) -> ServiceResult<Vec<String>> {
    columns
        .map(|c| provider.quote(&c.name).map_err(ServiceError::from_render))
        .collect()
}

/// `"column" = $column` for each column
fn assignments<'a>(
    provider: &dyn DialectProvider,
    columns: impl Iterator<Item = &'a ColumnMeta>,
) -> ServiceResult<Vec<String>> {
    columns
        .map(|c| {
            Ok(format!(
                "{} = {}",
                provider.quote(&c.name).map_err(ServiceError::from_render)?,
                placeholder(&c.name)
            ))
        })
        .collect()
}
