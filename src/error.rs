//! Error types for sqlbridge.
//!
//! Defines the main error enum used throughout the library. Every error is
//! terminal for the call that produced it; the FFI layer renders errors as
//! `"ERROR: ..."` strings for the caller.

use thiserror::Error;

/// Main error type for sqlbridge operations.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// The driver rejected the connection string or the TCP connect failed.
    #[error("Failed to open connection: {0}")]
    Open(String),

    /// The connection opened but the liveness check failed.
    #[error("Failed to connect to database: {0}")]
    Handshake(String),

    /// An execute call arrived before any successful connect.
    #[error("Database not connected. Call connect_db first.")]
    NotConnected,

    /// A non-row-returning statement was rejected by the database.
    #[error("SQL execution failed: {0}")]
    Execution(String),

    /// The snapshot-isolation directive failed; the paired query was never run.
    #[error("Failed to set isolation level: {0}")]
    Isolation(String),

    /// Query dispatch was rejected by the database.
    #[error("Query execution failed: {0}")]
    Query(String),

    /// The result cursor failed mid-stream; accumulated rows are discarded.
    #[error("Row iteration error: {0}")]
    RowIteration(String),

    /// The row set could not be rendered as JSON.
    #[error("Failed to marshal JSON: {0}")]
    Serialization(String),
}

impl BridgeError {
    /// Creates an open-connection error with the given message.
    pub fn open(msg: impl Into<String>) -> Self {
        Self::Open(msg.into())
    }

    /// Creates a handshake (liveness check) error with the given message.
    pub fn handshake(msg: impl Into<String>) -> Self {
        Self::Handshake(msg.into())
    }

    /// Creates an execution error with the given message.
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }

    /// Creates an isolation-setup error with the given message.
    pub fn isolation(msg: impl Into<String>) -> Self {
        Self::Isolation(msg.into())
    }

    /// Creates a query error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates a row-iteration error with the given message.
    pub fn row_iteration(msg: impl Into<String>) -> Self {
        Self::RowIteration(msg.into())
    }

    /// Creates a serialization error with the given message.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Returns the error category as a string for logging purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Open(_) | Self::Handshake(_) => "Connection Error",
            Self::NotConnected => "Not Connected",
            Self::Execution(_) => "Execution Error",
            Self::Isolation(_) => "Isolation Setup Error",
            Self::Query(_) => "Query Error",
            Self::RowIteration(_) => "Row Iteration Error",
            Self::Serialization(_) => "Serialization Error",
        }
    }
}

/// Result type alias using BridgeError.
pub type Result<T> = std::result::Result<T, BridgeError>;
