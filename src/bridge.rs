//! Execution coordinator owning the shared database handle.
//!
//! `SqlBridge` drives the per-call pipeline: classify and rewrite the
//! incoming text, pick the execution strategy for its category, run it on
//! the shared client, and fold the result into an [`ExecOutcome`]. The
//! lossy collapse of that outcome into a single nullable C string happens
//! only in the FFI adapter, never here.

use tokio::sync::Mutex;
use tracing::debug;

use crate::db::{self, DatabaseClient};
use crate::error::{BridgeError, Result};
use crate::rewrite::{classify_and_rewrite, split_isolation_directive};

/// Outcome of one execution call.
///
/// Exactly one variant per call; errors travel separately as `BridgeError`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecOutcome {
    /// Non-row-returning statement completed.
    Done,
    /// Row-returning statement completed; payload is a JSON array of
    /// objects, one per row, keyed by column name. Empty result sets yield
    /// `"[]"`, never `Done`, so the boundary channel stays unambiguous.
    Rows(String),
}

/// Coordinator holding the process's single shared database handle.
///
/// The handle lives behind one async mutex held for the duration of each
/// connect/disconnect/execute call. Holding the lock across the isolation
/// directive and its paired query is what pins both statements to the same
/// session with no interleaving, the correctness-critical invariant of the
/// pipeline.
pub struct SqlBridge {
    handle: Mutex<Option<Box<dyn DatabaseClient>>>,
}

impl SqlBridge {
    /// Creates a bridge with no connection.
    pub fn new() -> Self {
        Self {
            handle: Mutex::new(None),
        }
    }

    /// Creates a bridge around an already-connected client.
    ///
    /// This is the dependency-injection seam used by tests and embedders.
    pub fn with_client(client: Box<dyn DatabaseClient>) -> Self {
        Self {
            handle: Mutex::new(Some(client)),
        }
    }

    /// Returns true if a connection is currently installed.
    pub async fn is_connected(&self) -> bool {
        self.handle.lock().await.is_some()
    }

    /// Connects to the database using an ADO-style connection string.
    ///
    /// Any prior handle is released before the new one is installed. A
    /// failed connect leaves the bridge disconnected, never half-open.
    pub async fn connect(&self, conn_str: &str) -> Result<()> {
        let mut slot = self.handle.lock().await;

        if let Some(mut old) = slot.take() {
            debug!("replacing existing connection");
            let _ = old.close().await;
        }

        let client = db::connect(conn_str).await?;
        *slot = Some(client);
        Ok(())
    }

    /// Closes the connection. Idempotent; a no-op when not connected.
    pub async fn disconnect(&self) {
        let mut slot = self.handle.lock().await;
        if let Some(mut client) = slot.take() {
            let _ = client.close().await;
            debug!("disconnected");
        }
    }

    /// Classifies, rewrites, and executes one SQL statement.
    pub async fn execute(&self, sql: &str) -> Result<ExecOutcome> {
        let mut slot = self.handle.lock().await;
        let client = slot.as_mut().ok_or(BridgeError::NotConnected)?;

        let (category, rewritten) = classify_and_rewrite(sql);
        debug!(category = %category, "executing statement");

        if !category.returns_rows() {
            client.exec(&rewritten).await?;
            return Ok(ExecOutcome::Done);
        }

        let mut paired_query = None;
        if let Some((directive, query)) = split_isolation_directive(&rewritten) {
            // The directive runs first, on the same session; if it fails
            // the paired query is never attempted.
            client
                .exec(directive)
                .await
                .map_err(|e| BridgeError::isolation(driver_message(e)))?;
            paired_query = Some(query.to_string());
        }
        // No directive means the caller supplied their own WITH (SNAPSHOT)
        // hint; run the rewritten text as-is.
        let query_text = paired_query.unwrap_or(rewritten);

        let result = client.query(&query_text).await?;
        let json = result.to_json()?;
        Ok(ExecOutcome::Rows(json))
    }
}

impl Default for SqlBridge {
    fn default() -> Self {
        Self::new()
    }
}

/// Pulls the raw driver message back out of an error so it can be rewrapped
/// under a different variant.
fn driver_message(err: BridgeError) -> String {
    match err {
        BridgeError::Open(m)
        | BridgeError::Handshake(m)
        | BridgeError::Execution(m)
        | BridgeError::Isolation(m)
        | BridgeError::Query(m)
        | BridgeError::RowIteration(m)
        | BridgeError::Serialization(m) => m,
        BridgeError::NotConnected => err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{ColumnInfo, FailureMode, FailingDatabaseClient, MockDatabaseClient, QueryResult, Value};
    use crate::rewrite::ISOLATION_DIRECTIVE;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_execute_before_connect_is_not_connected() {
        let bridge = SqlBridge::new();
        let err = bridge.execute("SELECT 1").await.unwrap_err();
        assert!(matches!(err, BridgeError::NotConnected));
        assert!(err.to_string().to_lowercase().contains("not connected"));
    }

    #[tokio::test]
    async fn test_create_table_gets_rewritten_and_executed() {
        let client = MockDatabaseClient::new();
        let log = client.statement_log();
        let bridge = SqlBridge::with_client(Box::new(client));

        let outcome = bridge
            .execute("CREATE TABLE T (name VARCHAR(10))")
            .await
            .unwrap();

        assert_eq!(outcome, ExecOutcome::Done);
        let entries = log.lock().unwrap();
        assert_eq!(
            entries.as_slice(),
            ["exec:CREATE TABLE T (ID INT PRIMARY KEY IDENTITY(1,1), name VARCHAR(10))"]
        );
    }

    #[tokio::test]
    async fn test_select_runs_directive_then_query_in_order() {
        let result = QueryResult::with_data(
            vec![ColumnInfo::new("id", "int"), ColumnInfo::new("name", "nvarchar")],
            vec![
                vec![Value::Int(1), Value::String("Alice".to_string())],
                vec![Value::Int(2), Value::String("Bob".to_string())],
            ],
        );
        let client = MockDatabaseClient::with_result(result);
        let log = client.statement_log();
        let bridge = SqlBridge::with_client(Box::new(client));

        let outcome = bridge.execute("SELECT * FROM T").await.unwrap();

        let entries = log.lock().unwrap();
        assert_eq!(
            entries.as_slice(),
            [
                format!("exec:{ISOLATION_DIRECTIVE}"),
                "query:SELECT * FROM T".to_string(),
            ]
        );

        let ExecOutcome::Rows(json) = outcome else {
            panic!("expected a row payload");
        };
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        let array = parsed.as_array().unwrap();
        assert_eq!(array.len(), 2);
        for object in array {
            let object = object.as_object().unwrap();
            assert!(object.contains_key("id"));
            assert!(object.contains_key("name"));
        }
    }

    #[tokio::test]
    async fn test_select_with_hint_skips_directive() {
        let client = MockDatabaseClient::new();
        let log = client.statement_log();
        let bridge = SqlBridge::with_client(Box::new(client));

        let outcome = bridge
            .execute("SELECT * FROM T WITH (SNAPSHOT)")
            .await
            .unwrap();

        assert_eq!(outcome, ExecOutcome::Rows("[]".to_string()));
        let entries = log.lock().unwrap();
        assert_eq!(
            entries.as_slice(),
            ["query:SELECT * FROM T WITH (SNAPSHOT)"]
        );
    }

    #[tokio::test]
    async fn test_other_statement_passes_through() {
        let client = MockDatabaseClient::new();
        let log = client.statement_log();
        let bridge = SqlBridge::with_client(Box::new(client));

        let outcome = bridge
            .execute("INSERT INTO T VALUES (1, 'x')")
            .await
            .unwrap();

        assert_eq!(outcome, ExecOutcome::Done);
        let entries = log.lock().unwrap();
        assert_eq!(entries.as_slice(), ["exec:INSERT INTO T VALUES (1, 'x')"]);
    }

    #[tokio::test]
    async fn test_directive_failure_suppresses_query() {
        let client = FailingDatabaseClient::new(FailureMode::Exec, "snapshot isolation is disabled");
        let log = client.statement_log();
        let bridge = SqlBridge::with_client(Box::new(client));

        let err = bridge.execute("SELECT * FROM T").await.unwrap_err();

        assert_eq!(
            err.to_string(),
            "Failed to set isolation level: snapshot isolation is disabled"
        );
        let entries = log.lock().unwrap();
        // Only the directive was attempted; the paired query never ran.
        assert_eq!(entries.as_slice(), [format!("exec:{ISOLATION_DIRECTIVE}")]);
    }

    #[tokio::test]
    async fn test_query_failure_message() {
        let client = FailingDatabaseClient::new(FailureMode::Query, "invalid column");
        let bridge = SqlBridge::with_client(Box::new(client));

        let err = bridge.execute("SELECT x FROM T").await.unwrap_err();
        assert_eq!(err.to_string(), "Query execution failed: invalid column");
    }

    #[tokio::test]
    async fn test_row_iteration_failure_message() {
        let client = FailingDatabaseClient::new(FailureMode::RowIteration, "connection reset");
        let bridge = SqlBridge::with_client(Box::new(client));

        let err = bridge.execute("SELECT x FROM T").await.unwrap_err();
        assert_eq!(err.to_string(), "Row iteration error: connection reset");
    }

    #[tokio::test]
    async fn test_execution_failure_message() {
        let client = FailingDatabaseClient::new(FailureMode::Exec, "table exists");
        let bridge = SqlBridge::with_client(Box::new(client));

        let err = bridge.execute("CREATE TABLE T (id INT PRIMARY KEY)").await.unwrap_err();
        assert_eq!(err.to_string(), "SQL execution failed: table exists");
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let client = MockDatabaseClient::new();
        let log = client.statement_log();
        let bridge = SqlBridge::with_client(Box::new(client));

        assert!(bridge.is_connected().await);
        bridge.disconnect().await;
        assert!(!bridge.is_connected().await);
        bridge.disconnect().await;
        assert!(!bridge.is_connected().await);

        let entries = log.lock().unwrap();
        assert_eq!(entries.as_slice(), ["close:"]);
    }

    #[tokio::test]
    async fn test_failed_connect_releases_prior_handle() {
        let client = MockDatabaseClient::new();
        let log = client.statement_log();
        let bridge = SqlBridge::with_client(Box::new(client));

        // Nothing listens on this address; the connect must fail fast and
        // leave the bridge disconnected.
        let err = bridge
            .connect("server=tcp:127.0.0.1,1;user id=sa;password=x;database=d")
            .await;
        assert!(err.is_err());

        // The prior handle was released before the attempt.
        assert!(log.lock().unwrap().contains(&"close:".to_string()));
        assert!(!bridge.is_connected().await);

        let err = bridge.execute("SELECT 1").await.unwrap_err();
        assert!(matches!(err, BridgeError::NotConnected));
    }
}
