//! Connection trait consumed by introspection, services and dumps

use crate::{QueryResult, Result, StatementResult, Value};
use async_trait::async_trait;
use uuid::Uuid;

/// A database connection
///
/// Implementations are used sequentially by a single task; they only need to be
/// `Send + Sync` so they can be shared behind an `Arc`.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Stable identity of this connection, used as the schema cache key
    fn connection_id(&self) -> Uuid;

    /// Get the driver name (e.g., "sqlite", "postgresql", "mysql")
    fn driver_name(&self) -> &str;

    /// Execute a statement that does not return rows (DDL, INSERT/UPDATE/DELETE)
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<StatementResult>;

    /// Execute a query that returns rows (SELECT, SHOW, PRAGMA)
    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult>;

    /// Execute several statements in order, stopping at the first failure
    async fn execute_all(&self, statements: &[String]) -> Result<u64> {
        let mut affected = 0;
        for sql in statements {
            tracing::debug!(sql = %sql, "executing statement");
            affected += self.execute(sql, &[]).await?.affected_rows;
        }
        Ok(affected)
    }
}
