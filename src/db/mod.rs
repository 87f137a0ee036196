//! Database abstraction layer for sqlbridge.
//!
//! Provides a trait-based interface for database operations, allowing the
//! execution coordinator to be tested against in-memory backends.

mod mock;
mod mssql;
mod types;

pub use mock::{FailingDatabaseClient, FailureMode, MockDatabaseClient, StatementLog};
pub use mssql::MssqlClient;
pub use types::{ColumnInfo, QueryResult, Row, Value};

use crate::error::Result;
use async_trait::async_trait;

/// Opens a database client for the given ADO-style connection string.
///
/// This is the central factory function for database connections. The
/// connection string is passed through to the driver unparsed; the returned
/// client has already survived a liveness check.
pub async fn connect(conn_str: &str) -> Result<Box<dyn DatabaseClient>> {
    let client = MssqlClient::connect(conn_str).await?;
    Ok(Box::new(client))
}

/// Trait defining the interface for database clients.
///
/// Methods take `&mut self` deliberately: exclusive access to the client is
/// exclusive access to its session, which is what lets a caller run a
/// dependent statement pair (isolation directive, then query) without
/// another statement interleaving.
#[async_trait]
pub trait DatabaseClient: Send {
    /// Executes a non-row-returning statement.
    async fn exec(&mut self, sql: &str) -> Result<()>;

    /// Executes a row-returning statement and collects the full result set.
    async fn query(&mut self, sql: &str) -> Result<QueryResult>;

    /// Verifies the connection is alive.
    async fn ping(&mut self) -> Result<()>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<()>;
}
