//! C ABI boundary adapter.
//!
//! Exposes the four boundary operations (`connect_db`, `disconnect_db`,
//! `execute_sql`, `free_string`) over `extern "C"`, collapsing the internal
//! [`ExecOutcome`](crate::bridge::ExecOutcome) into the boundary's single
//! nullable string channel: null for bare success, a JSON array for
//! row-returning success, `"ERROR: ..."` text for any failure.
//!
//! Every non-null string returned here is allocated by this module and must
//! be released exactly once through `free_string`. A registry of live
//! allocations makes double-free and foreign-pointer release safe no-ops
//! instead of faults.
//!
//! The async pipeline runs to completion on a process-global runtime before
//! any entry point returns; callers observe plain blocking calls.

use std::collections::HashSet;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::sync::Mutex;

use once_cell::sync::{Lazy, OnceCell};
use tokio::runtime::Runtime;
use tracing::warn;

use crate::bridge::{ExecOutcome, SqlBridge};
use crate::logging;

/// The process-wide bridge instance behind the C ABI.
static BRIDGE: Lazy<SqlBridge> = Lazy::new(SqlBridge::new);

static RT: OnceCell<Runtime> = OnceCell::new();

/// Pointers handed out by [`into_boundary_string`] and not yet released.
static LIVE_STRINGS: Lazy<Mutex<HashSet<usize>>> = Lazy::new(|| Mutex::new(HashSet::new()));

fn runtime() -> &'static Runtime {
    RT.get_or_init(|| {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("failed to build tokio runtime")
    })
}

/// Allocates a boundary string and records it as live.
fn into_boundary_string(s: String) -> *mut c_char {
    // Interior NULs cannot cross the boundary; driver messages should never
    // contain them, but a replacement beats a lost message.
    let sanitized = CString::new(s)
        .unwrap_or_else(|e| {
            let bytes = e
                .into_vec()
                .into_iter()
                .map(|b| if b == 0 { b' ' } else { b })
                .collect::<Vec<u8>>();
            CString::new(bytes).unwrap_or_default()
        });

    let ptr = sanitized.into_raw();
    LIVE_STRINGS
        .lock()
        .expect("boundary string registry poisoned")
        .insert(ptr as usize);
    ptr
}

fn error_string(msg: impl std::fmt::Display) -> *mut c_char {
    into_boundary_string(format!("ERROR: {msg}"))
}

/// Reads a caller-owned C string. Returns `None` for a null pointer.
///
/// # Safety
///
/// `ptr`, when non-null, must point to a NUL-terminated string valid for
/// the duration of the call.
unsafe fn read_input(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
}

/// Establishes the shared database connection.
///
/// Returns null on success, or a newly allocated `"ERROR: ..."` message on
/// failure. The connection string is an opaque ADO-style `key=value;` list
/// (`server=...;user id=...;password=...;database=...`) passed through to
/// the driver unparsed. Reconnecting over a live connection releases the
/// old one first.
///
/// The caller must release a non-null return value with `free_string`.
///
/// # Safety
///
/// `conn_str`, when non-null, must point to a NUL-terminated string valid
/// for the duration of the call.
#[no_mangle]
pub unsafe extern "C" fn connect_db(conn_str: *const c_char) -> *mut c_char {
    logging::init_file_logging();

    let Some(conn_str) = read_input(conn_str) else {
        return error_string("Failed to open connection: connection string pointer was null");
    };

    match runtime().block_on(BRIDGE.connect(&conn_str)) {
        Ok(()) => std::ptr::null_mut(),
        Err(e) => {
            warn!(category = e.category(), "connect failed: {e}");
            error_string(e)
        }
    }
}

/// Closes the shared database connection. Idempotent; a no-op when nothing
/// is connected.
#[no_mangle]
pub extern "C" fn disconnect_db() {
    logging::init_file_logging();
    runtime().block_on(BRIDGE.disconnect());
}

/// Processes and executes one SQL statement.
///
/// Returns null when a non-row-returning statement succeeds, a newly
/// allocated JSON array (possibly `[]`) when a row-returning statement
/// succeeds, or a newly allocated `"ERROR: ..."` message on any failure.
///
/// The caller must release a non-null return value with `free_string`.
///
/// # Safety
///
/// `sql`, when non-null, must point to a NUL-terminated string valid for
/// the duration of the call.
#[no_mangle]
pub unsafe extern "C" fn execute_sql(sql: *const c_char) -> *mut c_char {
    logging::init_file_logging();

    let Some(sql) = read_input(sql) else {
        return error_string("SQL execution failed: statement pointer was null");
    };

    match runtime().block_on(BRIDGE.execute(&sql)) {
        Ok(ExecOutcome::Done) => std::ptr::null_mut(),
        Ok(ExecOutcome::Rows(json)) => into_boundary_string(json),
        Err(e) => {
            warn!(category = e.category(), "execute failed: {e}");
            error_string(e)
        }
    }
}

/// Releases a string previously returned by `connect_db` or `execute_sql`.
///
/// Null pointers, pointers already released, and pointers this library
/// never allocated are all safe no-ops.
///
/// # Safety
///
/// Safe to call with any pointer value; only pointers found in the live
/// allocation registry are reclaimed.
#[no_mangle]
pub unsafe extern "C" fn free_string(s: *mut c_char) {
    if s.is_null() {
        return;
    }

    let was_live = LIVE_STRINGS
        .lock()
        .expect("boundary string registry poisoned")
        .remove(&(s as usize));

    if was_live {
        drop(CString::from_raw(s));
    }
}
