//! The two rewrite rules and the directive-split helper.
//!
//! Both rules are deliberately tolerant: text that does not look the way the
//! rule expects is returned unchanged rather than rejected.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{DEFAULT_PRIMARY_KEY_COLUMN, ISOLATION_DIRECTIVE};

/// Matches a `WITH ( SNAPSHOT )` table hint anywhere in the text, with
/// arbitrary whitespace and any casing.
static SNAPSHOT_HINT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bWITH\s*\(\s*SNAPSHOT\s*\)").expect("static regex must compile")
});

/// Injects a default identity primary key into a `CREATE TABLE` statement
/// that declares none.
///
/// The column definition is inserted immediately after the first `(` in the
/// raw text. This is a compatibility contract: the first parenthesis is used
/// even when it belongs to a table name or default-value clause, because
/// downstream consumers depend on the literal-first-paren behavior. No
/// attempt is made to parse the column list.
pub fn inject_primary_key(sql: &str) -> String {
    // Caller already declared a key, any casing.
    if sql.to_uppercase().contains("PRIMARY KEY") {
        return sql.to_string();
    }

    // No column list to inject into; pass through rather than guess.
    let Some(paren) = sql.find('(') else {
        return sql.to_string();
    };

    let mut rewritten = String::with_capacity(sql.len() + DEFAULT_PRIMARY_KEY_COLUMN.len());
    rewritten.push_str(&sql[..=paren]);
    rewritten.push_str(DEFAULT_PRIMARY_KEY_COLUMN);
    rewritten.push_str(&sql[paren + 1..]);
    rewritten
}

/// Prepends the snapshot-isolation directive to a `SELECT` statement.
///
/// Skipped when the text already carries a `WITH (SNAPSHOT)` hint or already
/// starts with the directive line; both checks keep the rewrite idempotent.
pub fn inject_snapshot_isolation(sql: &str) -> String {
    if SNAPSHOT_HINT.is_match(sql) {
        return sql.to_string();
    }

    if sql.starts_with(ISOLATION_DIRECTIVE) {
        return sql.to_string();
    }

    format!("{ISOLATION_DIRECTIVE}\n{sql}")
}

/// Splits a rewritten statement into its isolation directive and the query
/// that follows it.
///
/// Returns `None` when the text does not start with the directive line,
/// which happens when the caller supplied their own `WITH (SNAPSHOT)` hint.
/// The query half is trimmed, matching what gets dispatched to the server.
pub fn split_isolation_directive(rewritten: &str) -> Option<(&str, &str)> {
    let rest = rewritten.strip_prefix(ISOLATION_DIRECTIVE)?;
    let query = rest.strip_prefix('\n').unwrap_or(rest);
    Some((ISOLATION_DIRECTIVE, query.trim()))
}
