//! Microsoft SQL Server client implementation.
//!
//! Provides the `MssqlClient` struct that implements the `DatabaseClient`
//! trait using tiberius over a plain TCP stream. One client owns exactly one
//! session; there is no pooling by design.

use crate::db::{ColumnInfo, DatabaseClient, QueryResult, Row, Value};
use crate::error::{BridgeError, Result};
use async_trait::async_trait;
use futures::TryStreamExt;
use tiberius::{Client, Config, QueryItem};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{debug, warn};

/// Statement used for the post-connect liveness check.
const PING_QUERY: &str = "SELECT 1";

/// SQL Server database client holding a single live session.
///
/// The slot is `None` once the client has been closed; the bridge never
/// hands out a closed client, the check in each method is a guard against
/// misuse of the type on its own.
pub struct MssqlClient {
    client: Option<Client<Compat<TcpStream>>>,
}

impl std::fmt::Debug for MssqlClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MssqlClient")
            .field("connected", &self.client.is_some())
            .finish()
    }
}

impl MssqlClient {
    /// Opens a connection using an ADO-style connection string
    /// (`server=...;user id=...;password=...;database=...`), passed through
    /// to the driver unparsed.
    ///
    /// The connection must survive a liveness check before it is returned;
    /// a client that fails the check is closed, never handed out half-open.
    pub async fn connect(conn_str: &str) -> Result<Self> {
        let config =
            Config::from_ado_string(conn_str).map_err(|e| BridgeError::open(e.to_string()))?;

        let tcp = TcpStream::connect(config.get_addr())
            .await
            .map_err(|e| BridgeError::open(e.to_string()))?;
        tcp.set_nodelay(true)
            .map_err(|e| BridgeError::open(e.to_string()))?;

        let client = Client::connect(config, tcp.compat_write())
            .await
            .map_err(|e| BridgeError::open(e.to_string()))?;

        let mut this = Self {
            client: Some(client),
        };

        if let Err(e) = this.ping().await {
            // Release the half-open session before reporting the failure.
            let _ = this.close().await;
            return Err(e);
        }

        debug!("connected to SQL Server");
        Ok(this)
    }

    fn session(&mut self) -> Result<&mut Client<Compat<TcpStream>>> {
        self.client.as_mut().ok_or(BridgeError::NotConnected)
    }
}

#[async_trait]
impl DatabaseClient for MssqlClient {
    async fn exec(&mut self, sql: &str) -> Result<()> {
        let client = self.session()?;

        // simple_query keeps session-level SET statements in session scope,
        // which the RPC path (sp_executesql) would not.
        let stream = client
            .simple_query(sql)
            .await
            .map_err(|e| BridgeError::execution(e.to_string()))?;

        stream
            .into_results()
            .await
            .map_err(|e| BridgeError::execution(e.to_string()))?;

        Ok(())
    }

    async fn query(&mut self, sql: &str) -> Result<QueryResult> {
        let client = self.session()?;

        let mut stream = client
            .simple_query(sql)
            .await
            .map_err(|e| BridgeError::query(e.to_string()))?;

        let mut columns: Vec<ColumnInfo> = Vec::new();
        let mut rows: Vec<Row> = Vec::new();
        let mut received_any = false;

        loop {
            let item = match stream.try_next().await {
                Ok(item) => item,
                // A rejection before any result arrived is a dispatch
                // failure; after that it is a mid-stream failure and the
                // accumulated rows are discarded with it.
                Err(e) if !received_any => return Err(BridgeError::query(e.to_string())),
                Err(e) => return Err(BridgeError::row_iteration(e.to_string())),
            };

            let Some(item) = item else { break };
            received_any = true;

            match item {
                QueryItem::Metadata(meta) => {
                    // Only the first result set's shape is kept; the shim
                    // does not split multi-statement batches.
                    if columns.is_empty() {
                        columns = meta
                            .columns()
                            .iter()
                            .map(|col| {
                                ColumnInfo::new(col.name(), format!("{:?}", col.column_type()))
                            })
                            .collect();
                    }
                }
                QueryItem::Row(row) => rows.push(convert_row(&row)),
            }
        }

        Ok(QueryResult::with_data(columns, rows))
    }

    async fn ping(&mut self) -> Result<()> {
        let client = self.session()?;

        let stream = client
            .simple_query(PING_QUERY)
            .await
            .map_err(|e| BridgeError::handshake(e.to_string()))?;

        stream
            .into_results()
            .await
            .map_err(|e| BridgeError::handshake(e.to_string()))?;

        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(client) = self.client.take() {
            if let Err(e) = client.close().await {
                warn!("error while closing SQL Server session: {e}");
            }
        }
        Ok(())
    }
}

/// Converts a tiberius row to our Row type.
fn convert_row(row: &tiberius::Row) -> Row {
    (0..row.columns().len())
        .map(|idx| convert_value(row, idx))
        .collect()
}

/// Converts a single column value from a tiberius row to our Value type.
///
/// Tries decodes from most to least specific; a typed decode that matches
/// the wire value but carries NULL short-circuits to `Value::Null`. Values
/// of a kind with no mapping degrade to NULL rather than failing the row.
fn convert_value(row: &tiberius::Row, idx: usize) -> Value {
    macro_rules! try_decode {
        ($ty:ty, $map:expr) => {
            match row.try_get::<$ty, _>(idx) {
                Ok(Some(v)) => return $map(v),
                Ok(None) => return Value::Null,
                Err(_) => {}
            }
        };
    }

    try_decode!(bool, Value::Bool);
    try_decode!(u8, |v: u8| Value::Int(i64::from(v)));
    try_decode!(i16, |v: i16| Value::Int(i64::from(v)));
    try_decode!(i32, |v: i32| Value::Int(i64::from(v)));
    try_decode!(i64, Value::Int);
    try_decode!(f32, |v: f32| Value::Float(f64::from(v)));
    try_decode!(f64, Value::Float);
    try_decode!(tiberius::numeric::Numeric, |v| Value::Float(f64::from(v)));
    try_decode!(&str, |v: &str| Value::String(v.to_string()));
    try_decode!(&[u8], |v: &[u8]| Value::Bytes(v.to_vec()));
    try_decode!(tiberius::Uuid, |v: tiberius::Uuid| Value::String(
        v.to_string()
    ));
    try_decode!(chrono::NaiveDateTime, |v: chrono::NaiveDateTime| {
        Value::String(v.to_string())
    });
    try_decode!(chrono::NaiveDate, |v: chrono::NaiveDate| Value::String(
        v.to_string()
    ));
    try_decode!(chrono::NaiveTime, |v: chrono::NaiveTime| Value::String(
        v.to_string()
    ));
    try_decode!(
        chrono::DateTime<chrono::Utc>,
        |v: chrono::DateTime<chrono::Utc>| Value::String(v.to_rfc3339())
    );

    Value::Null
}

#[cfg(test)]
mod tests {
    use super::*;

    // Note: These tests require a running SQL Server instance.
    // They are skipped unless SQLBRIDGE_TEST_URL is set to an ADO-style
    // connection string.

    fn get_test_connection_string() -> Option<String> {
        std::env::var("SQLBRIDGE_TEST_URL").ok()
    }

    async fn get_test_client() -> Option<MssqlClient> {
        let conn_str = get_test_connection_string()?;
        MssqlClient::connect(&conn_str).await.ok()
    }

    #[tokio::test]
    async fn test_connect_and_ping() {
        let Some(mut client) = get_test_client().await else {
            eprintln!("Skipping test: SQLBRIDGE_TEST_URL not set");
            return;
        };

        client.ping().await.unwrap();
        client.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_query_returns_columns_and_rows() {
        let Some(mut client) = get_test_client().await else {
            eprintln!("Skipping test: SQLBRIDGE_TEST_URL not set");
            return;
        };

        let result = client
            .query("SELECT 1 AS num, 'hello' AS greeting")
            .await
            .unwrap();

        assert_eq!(result.columns.len(), 2);
        assert_eq!(result.columns[0].name, "num");
        assert_eq!(result.columns[1].name, "greeting");
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0][0], Value::Int(1));
        assert_eq!(result.rows[0][1], Value::String("hello".to_string()));

        client.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_query_error_on_bad_statement() {
        let Some(mut client) = get_test_client().await else {
            eprintln!("Skipping test: SQLBRIDGE_TEST_URL not set");
            return;
        };

        let result = client.query("SELECT * FROM nonexistent_table_xyz").await;
        assert!(result.is_err());

        client.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_connect_error_on_bad_connection_string() {
        let result = MssqlClient::connect("server=nonexistent.invalid.host,1433").await;
        assert!(result.is_err());
        assert!(matches!(
            result.unwrap_err(),
            BridgeError::Open(_) | BridgeError::Handshake(_)
        ));
    }

    #[tokio::test]
    async fn test_closed_client_reports_not_connected() {
        let Some(mut client) = get_test_client().await else {
            eprintln!("Skipping test: SQLBRIDGE_TEST_URL not set");
            return;
        };

        client.close().await.unwrap();
        let result = client.exec("SELECT 1").await;
        assert!(matches!(result.unwrap_err(), BridgeError::NotConnected));
    }
}
