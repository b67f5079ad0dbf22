//! Common test utilities and mocks

use async_trait::async_trait;
use std::sync::Arc;
use sqlport_core::{
    Connection, CoreError, QueryResult, Result, StatementResult, Value,
};
use uuid::Uuid;

/// Mock connection answering catalog queries by SQL substring.
///
/// The first registered pattern contained in a query wins. Queries matching
/// a failure pattern return an error instead.
pub struct MockConnection {
    pub id: Uuid,
    pub driver: String,
    pub query_responses: Vec<(String, QueryResult)>,
    pub failing_patterns: Vec<String>,
    /// Log of all SQL queries executed, for assertion in tests
    pub query_log: Arc<parking_lot::Mutex<Vec<String>>>,
}

impl MockConnection {
    pub fn new(driver: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            driver: driver.into(),
            query_responses: vec![],
            failing_patterns: vec![],
            query_log: Arc::new(parking_lot::Mutex::new(Vec::new())),
        }
    }

    /// Register a response for queries containing the given SQL pattern.
    pub fn with_query_response(
        mut self,
        sql_contains: impl Into<String>,
        result: QueryResult,
    ) -> Self {
        self.query_responses.push((sql_contains.into(), result));
        self
    }

    pub fn with_failure_on(mut self, sql_contains: impl Into<String>) -> Self {
        self.failing_patterns.push(sql_contains.into());
        self
    }

    pub fn query_count(&self) -> usize {
        self.query_log.lock().len()
    }

    pub fn query_log(&self) -> Vec<String> {
        self.query_log.lock().clone()
    }
}

#[async_trait]
impl Connection for MockConnection {
    fn connection_id(&self) -> Uuid {
        self.id
    }

    fn driver_name(&self) -> &str {
        &self.driver
    }

    async fn execute(&self, _sql: &str, _params: &[Value]) -> Result<StatementResult> {
        Ok(StatementResult::default())
    }

    async fn query(&self, sql: &str, _params: &[Value]) -> Result<QueryResult> {
        self.query_log.lock().push(sql.to_string());

        if self.failing_patterns.iter().any(|p| sql.contains(p.as_str())) {
            return Err(CoreError::Connection("connection reset by peer".into()));
        }
        for (pattern, result) in &self.query_responses {
            if sql.contains(pattern.as_str()) {
                return Ok(result.clone());
            }
        }
        Ok(QueryResult::empty())
    }
}

pub fn columns_result(rows: Vec<(&str, &str, &str, &str, Option<&str>, &str)>) -> QueryResult {
    QueryResult::from_rows(
        &["name", "type", "nullable", "key", "default_value", "comment", "extra"],
        rows.into_iter()
            .map(|(name, data_type, nullable, key, default, extra)| {
                vec![
                    name.into(),
                    data_type.into(),
                    nullable.into(),
                    key.into(),
                    default.map(Value::from).unwrap_or(Value::Null),
                    Value::from(""),
                    extra.into(),
                ]
            })
            .collect(),
    )
}

/// `users(id PK auto_increment, name NOT NULL, email NULL)`
pub fn users_columns() -> QueryResult {
    columns_result(vec![
        ("id", "int", "NO", "PRI", None, "auto_increment"),
        ("name", "varchar(100)", "NO", "", None, ""),
        ("email", "varchar(255)", "YES", "UNI", None, ""),
    ])
}

pub fn users_indexes() -> QueryResult {
    QueryResult::from_rows(
        &["index_name", "column_name", "non_unique", "seq", "index_type", "is_primary"],
        vec![
            vec!["PRIMARY".into(), "id".into(), Value::Int64(0), Value::Int64(1), "BTREE".into(), Value::Int64(1)],
            vec!["users_email_key".into(), "email".into(), Value::Int64(0), Value::Int64(1), "BTREE".into(), Value::Int64(0)],
        ],
    )
}

pub fn names_result(names: &[&str]) -> QueryResult {
    QueryResult::from_rows(
        &["name"],
        names.iter().map(|n| vec![Value::from(*n)]).collect(),
    )
}
