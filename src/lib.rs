//! sqlbridge - A lightweight SQL Server access shim behind a C FFI boundary.
//!
//! Accepts raw SQL text, applies two policy-driven rewrites (default
//! primary key injection for `CREATE TABLE`, snapshot-isolation setup for
//! `SELECT`), executes the result against a single shared connection, and
//! hands back a success signal, a JSON row set, or an error message through
//! caller-owned, callee-allocated strings.

pub mod bridge;
pub mod db;
pub mod error;
pub mod ffi;
pub mod logging;
pub mod rewrite;

pub use bridge::{ExecOutcome, SqlBridge};
pub use error::{BridgeError, Result};
