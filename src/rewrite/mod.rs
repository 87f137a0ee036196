//! Statement classification and rewrite module.
//!
//! Inspects incoming SQL text, decides its category from a case-insensitive
//! prefix test, and applies the category-specific textual transformation.
//! Pure functions of the input text; no I/O, never fails. Malformed input
//! is passed through unchanged by policy.

mod rules;

pub use rules::{inject_primary_key, inject_snapshot_isolation, split_isolation_directive};

use std::fmt;

/// The isolation directive prepended to `Select` statements. When a rewritten
/// statement starts with this line, the coordinator must execute it as a
/// separate statement on the same session as the query that follows.
pub const ISOLATION_DIRECTIVE: &str = "SET TRANSACTION ISOLATION LEVEL SNAPSHOT;";

/// Column definition injected into `CREATE TABLE` statements that declare no
/// primary key. T-SQL identity column, matching the SQL Server target.
pub const DEFAULT_PRIMARY_KEY_COLUMN: &str = "ID INT PRIMARY KEY IDENTITY(1,1), ";

/// The coarse kind of SQL statement, driving rewrite and execution strategy.
///
/// Decided once per call from the trimmed, case-folded prefix; never
/// re-derived from the rewritten text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementCategory {
    /// `CREATE TABLE ...`, gets the default-primary-key rewrite.
    CreateTable,
    /// `SELECT ...`, gets the snapshot-isolation rewrite and runs as a
    /// row-returning query.
    Select,
    /// Everything else, passed through verbatim and executed directly.
    Other,
}

impl StatementCategory {
    /// Returns true if statements of this category return rows.
    pub fn returns_rows(&self) -> bool {
        matches!(self, Self::Select)
    }
}

impl fmt::Display for StatementCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateTable => write!(f, "CREATE TABLE"),
            Self::Select => write!(f, "SELECT"),
            Self::Other => write!(f, "Other"),
        }
    }
}

/// Classifies the statement from its prefix.
///
/// The prefix test runs on a trimmed, upper-cased copy; the original text is
/// never modified here. Multi-statement text is not split; only the leading
/// keyword counts.
pub fn classify(sql: &str) -> StatementCategory {
    let trimmed_upper = sql.trim().to_uppercase();

    if trimmed_upper.starts_with("CREATE TABLE") {
        StatementCategory::CreateTable
    } else if trimmed_upper.starts_with("SELECT") {
        StatementCategory::Select
    } else {
        StatementCategory::Other
    }
}

/// Classifies the statement and applies its category-specific rewrite.
///
/// Rewrites apply to the original-case text. `Other` statements come back
/// unchanged. Applying this function to its own output is a no-op: the
/// rewrite rules detect their injected markers and the prepended directive
/// shifts an already-rewritten `Select` into the `Other` category.
pub fn classify_and_rewrite(sql: &str) -> (StatementCategory, String) {
    let category = classify(sql);

    let rewritten = match category {
        StatementCategory::CreateTable => inject_primary_key(sql),
        StatementCategory::Select => inject_snapshot_isolation(sql),
        StatementCategory::Other => sql.to_string(),
    };

    (category, rewritten)
}
