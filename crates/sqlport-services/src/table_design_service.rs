//! Table design service
//!
//! Request/response operations behind a table designer: load the design data
//! for a table, then apply one change at a time. Every change is rendered by
//! the connection's dialect provider, executed, and followed by invalidation
//! of the cached metadata it touched.

use std::sync::Arc;

use sqlport_core::{
    ColumnChange, ColumnDefinition, Connection, DialectOperation, IndexDefinition, TableChange,
};
use sqlport_schema::{CacheKey, SchemaCache, SchemaIntrospector};
use uuid::Uuid;

use crate::error::{ServiceError, ServiceResult};
use crate::table_service::provider_for;
use crate::view_models::TableDesignData;

/// What a design change invalidates
enum Scope<'a> {
    Table { schema: &'a str, table: &'a str },
    Schema(&'a str),
}

/// Service for table design operations
///
/// Handles:
/// - Loading columns, indexes, primary key and comment for editing
/// - Renaming and commenting tables
/// - Adding and altering columns
/// - Creating and dropping indexes
/// - Executing hand-written DDL
#[derive(Default)]
pub struct TableDesignService {
    cache: Option<Arc<SchemaCache>>,
}

impl TableDesignService {
    /// Create a new table design service
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cache(mut self, cache: Arc<SchemaCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Load an existing table's structure for editing
    #[tracing::instrument(skip(self, connection))]
    pub async fn design_data(
        &self,
        connection: Arc<dyn Connection>,
        schema: &str,
        table: &str,
    ) -> ServiceResult<TableDesignData> {
        let provider = provider_for(connection.as_ref())?;
        let introspector = SchemaIntrospector::new(connection.clone(), provider);
        let cache = self.cache.as_deref();

        let indexes = introspector
            .indexes(schema, table, cache)
            .await
            .map_err(|e| ServiceError::SchemaLoadFailed(e.to_string()))?;
        let snapshot = introspector
            .table_snapshot(schema, table, cache)
            .await
            .map_err(|e| ServiceError::SchemaLoadFailed(e.to_string()))?;

        let primary_key = snapshot.primary_key().first().map(|c| c.name.clone());
        Ok(TableDesignData {
            table: table.to_string(),
            comment: snapshot.table.comment,
            columns: snapshot.columns,
            indexes,
            primary_key,
            dialect: provider.id(),
        })
    }

    /// Rename a table and/or change its comment
    #[tracing::instrument(skip(self, connection))]
    pub async fn update_table(
        &self,
        connection: Arc<dyn Connection>,
        change: TableChange,
    ) -> ServiceResult<u64> {
        let schema = change.schema.clone();
        self.apply(
            &connection,
            DialectOperation::UpdateTable(change),
            Scope::Schema(&schema),
        )
        .await
    }

    #[tracing::instrument(skip(self, connection))]
    pub async fn update_column(
        &self,
        connection: Arc<dyn Connection>,
        change: ColumnChange,
    ) -> ServiceResult<u64> {
        let (schema, table) = (change.schema.clone(), change.table.clone());
        self.apply(
            &connection,
            DialectOperation::UpdateColumn(change),
            Scope::Table {
                schema: &schema,
                table: &table,
            },
        )
        .await
    }

    #[tracing::instrument(skip(self, connection))]
    pub async fn add_column(
        &self,
        connection: Arc<dyn Connection>,
        schema: &str,
        table: &str,
        column: ColumnDefinition,
    ) -> ServiceResult<u64> {
        self.apply(
            &connection,
            DialectOperation::AddColumn {
                schema: schema.to_string(),
                table: table.to_string(),
                column,
            },
            Scope::Table { schema, table },
        )
        .await
    }

    #[tracing::instrument(skip(self, connection))]
    pub async fn create_index(
        &self,
        connection: Arc<dyn Connection>,
        index: IndexDefinition,
    ) -> ServiceResult<u64> {
        let (schema, table) = (index.schema.clone(), index.table.clone());
        self.apply(
            &connection,
            DialectOperation::CreateIndex(index),
            Scope::Table {
                schema: &schema,
                table: &table,
            },
        )
        .await
    }

    #[tracing::instrument(skip(self, connection))]
    pub async fn drop_index(
        &self,
        connection: Arc<dyn Connection>,
        schema: &str,
        table: &str,
        name: &str,
    ) -> ServiceResult<u64> {
        self.apply(
            &connection,
            DialectOperation::DropIndex {
                schema: schema.to_string(),
                table: table.to_string(),
                name: name.to_string(),
            },
            Scope::Table { schema, table },
        )
        .await
    }

    /// Execute DDL typed by the user, then forget everything cached for the schema
    #[tracing::instrument(skip(self, connection, sql))]
    pub async fn execute_raw(
        &self,
        connection: Arc<dyn Connection>,
        schema: &str,
        sql: &str,
    ) -> ServiceResult<u64> {
        tracing::debug!("Executing design SQL: {}", sql);
        let result = connection.execute(sql, &[]).await;
        self.invalidate(connection.connection_id(), Scope::Schema(schema));
        let result = result.map_err(|e| ServiceError::DesignFailed(e.to_string()))?;
        Ok(result.affected_rows)
    }

    async fn apply(
        &self,
        connection: &Arc<dyn Connection>,
        op: DialectOperation,
        scope: Scope<'_>,
    ) -> ServiceResult<u64> {
        let provider = provider_for(connection.as_ref())?;
        let statements = provider
            .render_statements(&op)
            .map_err(ServiceError::from_render)?;

        // A failure part-way through may still have changed the table
        let result = connection.execute_all(&statements).await;
        self.invalidate(connection.connection_id(), scope);
        let affected = result.map_err(|e| {
            ServiceError::DesignFailed(format!("{} failed: {}", op.name(), e))
        })?;

        tracing::info!(
            operation = %op.name(),
            statement_count = statements.len(),
            "Table design change applied"
        );
        Ok(affected)
    }

    fn invalidate(&self, connection_id: Uuid, scope: Scope<'_>) {
        let Some(cache) = &self.cache else {
            return;
        };
        match scope {
            Scope::Table { schema, table } => {
                cache.invalidate(&CacheKey::new(connection_id, schema, table))
            }
            Scope::Schema(schema) => cache.invalidate_schema(connection_id, schema),
        }
    }
}
