//! Logging configuration for sqlbridge.
//!
//! A shared library must not write to its host process's terminal uninvited,
//! so logging stays off unless the `SQLBRIDGE_LOG` environment variable is
//! set. When it is, its value is the filter directive (e.g. `info`,
//! `sqlbridge=debug`) and output goes to a log file.

use std::fs::{self, File};
use std::path::PathBuf;
use std::sync::Once;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Initializes file logging if `SQLBRIDGE_LOG` is set.
///
/// Safe to call from every FFI entry point; only the first call does any
/// work. Log location: `SQLBRIDGE_LOG_FILE` when set, otherwise
/// `~/.local/state/sqlbridge/sqlbridge.log` on Linux (XDG state directory)
/// or the platform-appropriate state/config directory elsewhere.
pub fn init_file_logging() {
    INIT.call_once(|| {
        let Ok(filter) = std::env::var("SQLBRIDGE_LOG") else {
            return;
        };

        let log_path = get_log_path();

        if let Some(parent) = log_path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                eprintln!("Warning: Could not create log directory: {e}");
                return;
            }
        }

        let log_file = match File::create(&log_path) {
            Ok(f) => f,
            Err(e) => {
                eprintln!("Warning: Could not create log file: {e}");
                return;
            }
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new(filter))
            .with_writer(log_file)
            .with_ansi(false) // No ANSI colors in file output
            .try_init();
    });
}

/// Initializes logging to stderr.
///
/// For embedders using the crate as a plain Rust library, where stderr is
/// theirs to spend.
pub fn init_stderr_logging() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .try_init();
    });
}

/// Returns the path for the log file.
pub fn get_log_path() -> PathBuf {
    if let Ok(path) = std::env::var("SQLBRIDGE_LOG_FILE") {
        return PathBuf::from(path);
    }

    // Try state directory first (XDG_STATE_HOME on Linux)
    if let Some(state_dir) = dirs::state_dir() {
        return state_dir.join("sqlbridge").join("sqlbridge.log");
    }

    // Fall back to config directory
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("sqlbridge").join("sqlbridge.log");
    }

    // Last resort: temp directory
    std::env::temp_dir().join("sqlbridge.log")
}
