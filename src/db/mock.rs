//! Mock database clients for testing.
//!
//! `MockDatabaseClient` records every statement it receives so tests can
//! assert execution order (the isolation directive must precede its paired
//! query). `FailingDatabaseClient` fails a chosen operation to exercise the
//! coordinator's error paths.

use super::{DatabaseClient, QueryResult};
use crate::error::{BridgeError, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Shared statement log, cloneable for post-hoc assertions.
pub type StatementLog = Arc<Mutex<Vec<String>>>;

/// A mock database client that returns predefined results.
pub struct MockDatabaseClient {
    log: StatementLog,
    result: QueryResult,
}

impl MockDatabaseClient {
    /// Creates a new mock client returning an empty result set.
    pub fn new() -> Self {
        Self {
            log: Arc::new(Mutex::new(Vec::new())),
            result: QueryResult::new(),
        }
    }

    /// Creates a mock client that answers every query with the given result.
    pub fn with_result(result: QueryResult) -> Self {
        Self {
            log: Arc::new(Mutex::new(Vec::new())),
            result,
        }
    }

    /// Returns a handle to the statement log.
    pub fn statement_log(&self) -> StatementLog {
        Arc::clone(&self.log)
    }

    fn record(&self, kind: &str, sql: &str) {
        self.log
            .lock()
            .expect("statement log poisoned")
            .push(format!("{kind}:{sql}"));
    }
}

impl Default for MockDatabaseClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    async fn exec(&mut self, sql: &str) -> Result<()> {
        self.record("exec", sql);
        Ok(())
    }

    async fn query(&mut self, sql: &str) -> Result<QueryResult> {
        self.record("query", sql);
        Ok(self.result.clone())
    }

    async fn ping(&mut self) -> Result<()> {
        self.record("ping", "");
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.record("close", "");
        Ok(())
    }
}

/// Which operation of a [`FailingDatabaseClient`] fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// `exec` fails with an execution error.
    Exec,
    /// `query` fails with a query (dispatch) error.
    Query,
    /// `query` fails with a row-iteration error.
    RowIteration,
}

/// A mock database client whose chosen operation always fails.
pub struct FailingDatabaseClient {
    mode: FailureMode,
    message: String,
    log: StatementLog,
}

impl FailingDatabaseClient {
    /// Creates a client failing the given operation with the given driver
    /// message.
    pub fn new(mode: FailureMode, message: impl Into<String>) -> Self {
        Self {
            mode,
            message: message.into(),
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Returns a handle to the statement log of attempted operations.
    pub fn statement_log(&self) -> StatementLog {
        Arc::clone(&self.log)
    }

    fn record(&self, kind: &str, sql: &str) {
        self.log
            .lock()
            .expect("statement log poisoned")
            .push(format!("{kind}:{sql}"));
    }
}

#[async_trait]
impl DatabaseClient for FailingDatabaseClient {
    async fn exec(&mut self, sql: &str) -> Result<()> {
        self.record("exec", sql);
        if self.mode == FailureMode::Exec {
            return Err(BridgeError::execution(self.message.clone()));
        }
        Ok(())
    }

    async fn query(&mut self, sql: &str) -> Result<QueryResult> {
        self.record("query", sql);
        match self.mode {
            FailureMode::Query => Err(BridgeError::query(self.message.clone())),
            FailureMode::RowIteration => Err(BridgeError::row_iteration(self.message.clone())),
            FailureMode::Exec => Ok(QueryResult::new()),
        }
    }

    async fn ping(&mut self) -> Result<()> {
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.record("close", "");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{ColumnInfo, Value};

    #[tokio::test]
    async fn test_mock_records_statements_in_order() {
        let mut client = MockDatabaseClient::new();
        let log = client.statement_log();

        client.exec("SET NOCOUNT ON").await.unwrap();
        client.query("SELECT 1").await.unwrap();

        let entries = log.lock().unwrap();
        assert_eq!(
            entries.as_slice(),
            ["exec:SET NOCOUNT ON", "query:SELECT 1"]
        );
    }

    #[tokio::test]
    async fn test_mock_returns_configured_result() {
        let result = QueryResult::with_data(
            vec![ColumnInfo::new("n", "int")],
            vec![vec![Value::Int(7)]],
        );
        let mut client = MockDatabaseClient::with_result(result);

        let out = client.query("SELECT n FROM t").await.unwrap();
        assert_eq!(out.rows, vec![vec![Value::Int(7)]]);
    }

    #[tokio::test]
    async fn test_failing_exec() {
        let mut client = FailingDatabaseClient::new(FailureMode::Exec, "boom");
        let err = client.exec("CREATE TABLE t (id INT)").await.unwrap_err();
        assert_eq!(err.to_string(), "SQL execution failed: boom");
    }

    #[tokio::test]
    async fn test_failing_query_modes() {
        let mut client = FailingDatabaseClient::new(FailureMode::Query, "invalid column");
        let err = client.query("SELECT x").await.unwrap_err();
        assert!(matches!(err, BridgeError::Query(_)));

        let mut client = FailingDatabaseClient::new(FailureMode::RowIteration, "reset");
        let err = client.query("SELECT x").await.unwrap_err();
        assert!(matches!(err, BridgeError::RowIteration(_)));
    }
}
