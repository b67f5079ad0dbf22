//! Common test utilities and mocks

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use sqlport_core::{Connection, CoreError, QueryResult, Result, StatementResult, Value};

/// Mock connection for testing service-layer logic without a real database.
///
/// Queries are answered by the first registered response whose pattern the SQL
/// contains. Both queries and executed statements are logged for assertions.
pub struct MockConnection {
    pub id: Uuid,
    pub driver: String,
    pub query_responses: Vec<(String, QueryResult)>,
    /// Statements containing one of these patterns fail
    pub failing_patterns: Vec<String>,
    pub query_log: Arc<parking_lot::Mutex<Vec<String>>>,
    pub execute_log: Arc<parking_lot::Mutex<Vec<String>>>,
}

impl MockConnection {
    pub fn new(driver: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            driver: driver.into(),
            query_responses: vec![],
            failing_patterns: vec![],
            query_log: Arc::new(parking_lot::Mutex::new(Vec::new())),
            execute_log: Arc::new(parking_lot::Mutex::new(Vec::new())),
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

    pub fn query_log(&self) -> Vec<String> {
        self.query_log.lock().clone()
    }

    pub fn execute_log(&self) -> Vec<String> {
        self.execute_log.lock().clone()
    }

    fn fails(&self, sql: &str) -> bool {
        self.failing_patterns.iter().any(|p| sql.contains(p.as_str()))
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

    async fn execute(&self, sql: &str, _params: &[Value]) -> Result<StatementResult> {
        self.execute_log.lock().push(sql.to_string());
        if self.fails(sql) {
            return Err(CoreError::Query(format!("Execute failed: {sql}")));
        }
        Ok(StatementResult {
            affected_rows: 1,
            warnings: Vec::new(),
        })
    }

    async fn query(&self, sql: &str, _params: &[Value]) -> Result<QueryResult> {
        self.query_log.lock().push(sql.to_string());
        if self.fails(sql) {
            return Err(CoreError::Query(format!("Query failed: {sql}")));
        }
        for (pattern, result) in &self.query_responses {
            if sql.contains(pattern.as_str()) {
                return Ok(result.clone());
            }
        }
        Ok(QueryResult::empty())
    }
}

pub fn mock_query_result(columns: Vec<&str>, rows: Vec<Vec<Value>>) -> QueryResult {
    QueryResult::from_rows(&columns, rows)
}

/// Uniform column listing rows: `(name, type, nullable, key, extra)`
pub fn columns_result(columns: Vec<(&str, &str, &str, &str, &str)>) -> QueryResult {
    mock_query_result(
        vec!["name", "type", "nullable", "key", "default_value", "comment", "extra"],
        columns
            .into_iter()
            .map(|(name, data_type, nullable, key, extra)| {
                vec![
                    Value::from(name),
                    Value::from(data_type),
                    Value::from(nullable),
                    Value::from(key),
                    Value::Null,
                    Value::Null,
                    Value::from(extra),
                ]
            })
            .collect(),
    )
}

pub fn users_columns() -> QueryResult {
    columns_result(vec![
        ("id", "int", "NO", "PRI", "auto_increment"),
        ("name", "varchar(100)", "NO", "", ""),
        ("email", "varchar(255)", "YES", "UNI", ""),
    ])
}

/// MySQL connection answering the `shop.users` catalog queries
pub fn mysql_users() -> MockConnection {
    MockConnection::new("mysql")
        .with_query_response("information_schema.COLUMNS", users_columns())
        .with_query_response(
            "information_schema.TABLES",
            mock_query_result(
                vec!["name", "comment", "table_rows", "data_length", "auto_increment", "row_format"],
                vec![vec![
                    Value::from("users"),
                    Value::from("registered users"),
                    Value::Int64(3),
                    Value::Int64(16384),
                    Value::Int64(4),
                    Value::from("Dynamic"),
                ]],
            ),
        )
        .with_query_response(
            "information_schema.STATISTICS",
            mock_query_result(
                vec!["index_name", "column_name", "non_unique", "seq", "index_type", "is_primary"],
                vec![
                    vec![
                        Value::from("PRIMARY"),
                        Value::from("id"),
                        Value::Int64(0),
                        Value::Int64(1),
                        Value::from("BTREE"),
                        Value::Int64(1),
                    ],
                    vec![
                        Value::from("users_email_key"),
                        Value::from("email"),
                        Value::Int64(0),
                        Value::Int64(1),
                        Value::from("BTREE"),
                        Value::Int64(0),
                    ],
                ],
            ),
        )
}
