//! Common test utilities and mocks

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use sqlport_core::{Connection, CoreError, QueryResult, Result, StatementResult, Value};
use sqlport_dump::{MemorySink, OutputSink};
use uuid::Uuid;

enum Response {
    Fixed(QueryResult),
    /// Rows served according to the `LIMIT`/`OFFSET` of each query
    Paged(QueryResult),
}

/// Mock connection answering queries by SQL substrings.
///
/// A response applies when the query contains every one of its patterns; the
/// first applicable response wins. Queries containing a failure pattern fail.
pub struct MockConnection {
    pub id: Uuid,
    pub driver: String,
    responses: Vec<(Vec<String>, Response)>,
    failing_patterns: Vec<String>,
    /// Log of all SQL queries executed, for assertion in tests
    pub query_log: Arc<Mutex<Vec<String>>>,
}

impl MockConnection {
    pub fn new(driver: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            driver: driver.into(),
            responses: vec![],
            failing_patterns: vec![],
            query_log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_query_response(self, sql_contains: &str, result: QueryResult) -> Self {
        self.with_response_matching(&[sql_contains], result)
    }

    pub fn with_response_matching(mut self, patterns: &[&str], result: QueryResult) -> Self {
        self.responses.push((
            patterns.iter().map(|p| p.to_string()).collect(),
            Response::Fixed(result),
        ));
        self
    }

    pub fn with_paged_rows(mut self, sql_contains: &str, result: QueryResult) -> Self {
        self.responses
            .push((vec![sql_contains.to_string()], Response::Paged(result)));
        self
    }

    pub fn with_failure_on(mut self, sql_contains: &str) -> Self {
        self.failing_patterns.push(sql_contains.to_string());
        self
    }

    pub fn query_log(&self) -> Vec<String> {
        self.query_log.lock().clone()
    }

    pub fn queries_containing(&self, pattern: &str) -> usize {
        self.query_log
            .lock()
            .iter()
            .filter(|sql| sql.contains(pattern))
            .count()
    }
}

fn number_after(sql: &str, keyword: &str) -> Option<usize> {
    let start = sql.find(keyword)? + keyword.len();
    sql[start..]
        .split_whitespace()
        .next()
        .and_then(|n| n.parse().ok())
}

fn page(result: &QueryResult, sql: &str) -> QueryResult {
    let limit = number_after(sql, " LIMIT ")
        .or_else(|| number_after(sql, "SELECT TOP "))
        .or_else(|| number_after(sql, " FETCH NEXT "))
        .unwrap_or(usize::MAX);
    let offset = number_after(sql, " OFFSET ").unwrap_or(0);
    let mut page = result.clone();
    page.rows = result.rows.iter().skip(offset).take(limit).cloned().collect();
    page
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
            return Err(CoreError::Query(format!("query failed: {sql}")));
        }
        for (patterns, response) in &self.responses {
            if patterns.iter().all(|p| sql.contains(p.as_str())) {
                return Ok(match response {
                    Response::Fixed(result) => result.clone(),
                    Response::Paged(result) => page(result, sql),
                });
            }
        }
        Ok(QueryResult::empty())
    }
}

pub fn columns_result(rows: Vec<(&str, &str, &str, &str, &str)>) -> QueryResult {
    QueryResult::from_rows(
        &["name", "type", "nullable", "key", "default_value", "comment", "extra"],
        rows.into_iter()
            .map(|(name, data_type, nullable, key, extra)| {
                vec![
                    name.into(),
                    data_type.into(),
                    nullable.into(),
                    key.into(),
                    Value::Null,
                    Value::from(""),
                    extra.into(),
                ]
            })
            .collect(),
    )
}

pub fn user_rows(count: i64) -> QueryResult {
    QueryResult::from_rows(
        &["id", "name"],
        (1..=count)
            .map(|i| vec![Value::Int64(i), Value::String(((b'a' + ((i - 1) % 26) as u8) as char).to_string())])
            .collect(),
    )
}

pub fn show_create(column: &str, name: &str, source: &str) -> QueryResult {
    QueryResult::from_rows(&["Name", column], vec![vec![name.into(), source.into()]])
}

pub const USERS_DDL: &str = "CREATE TABLE `users` (\n  `id` int NOT NULL AUTO_INCREMENT,\n  `name` varchar(20) DEFAULT NULL,\n  PRIMARY KEY (`id`)\n) ENGINE=InnoDB";

/// MySQL connection with schema `shop` holding `users(id int PK, name varchar)`
/// and `count` rows
pub fn mysql_users(count: i64) -> MockConnection {
    MockConnection::new("mysql")
        .with_query_response(
            "SHOW CREATE TABLE `shop`.`users`",
            show_create("Create Table", "users", USERS_DDL),
        )
        .with_response_matching(
            &["information_schema.COLUMNS", "TABLE_NAME = 'users'"],
            columns_result(vec![
                ("id", "int", "NO", "PRI", ""),
                ("name", "varchar(20)", "YES", "", ""),
            ]),
        )
        .with_paged_rows("FROM `shop`.`users`", user_rows(count))
}

/// Sink that cancels a token once it has seen `trigger` in the output
pub struct CancellingSink {
    pub inner: MemorySink,
    pub trigger: String,
    pub token: sqlport_dump::CancellationToken,
}

#[async_trait]
impl OutputSink for CancellingSink {
    async fn write(&mut self, text: &str) -> std::io::Result<()> {
        self.inner.write(text).await?;
        if text.contains(self.trigger.as_str()) {
            self.token.cancel();
        }
        Ok(())
    }

    async fn finish(&mut self) -> std::io::Result<()> {
        self.inner.finish().await
    }
}

/// Sink whose writes always fail
pub struct FailingSink;

#[async_trait]
impl OutputSink for FailingSink {
    async fn write(&mut self, _text: &str) -> std::io::Result<()> {
        Err(std::io::Error::other("disk full"))
    }

    async fn finish(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
