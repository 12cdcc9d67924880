//! Identifier validation and quoting for both dialects.
//!
//! SQL identifiers (table names, column names, database names) cannot be
//! passed as statement parameters, so every identifier that reaches dynamic
//! SQL goes through one of the quoting functions here:
//!
//! - SQLite (source): `"name"` with embedded `"` doubled
//! - MySQL (destination): `` `name` `` with embedded `` ` `` doubled
//!
//! Quoting is total. Names that no dialect can represent (empty, NUL bytes,
//! over-long) are rejected earlier by [`validate_identifier`], which the
//! config validator and the schema reader call.

use crate::error::{MigrateError, Result};

/// Maximum identifier length accepted by MySQL for tables and columns.
pub const MAX_IDENTIFIER_LENGTH: usize = 64;

/// Validate an identifier for security issues.
///
/// Rejects:
/// - Empty identifiers
/// - Identifiers containing null bytes (injection vector)
/// - Identifiers exceeding the MySQL length limit
///
/// # Errors
///
/// Returns `MigrateError::Config` for invalid identifiers with a descriptive message.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(MigrateError::Config(
            "Identifier cannot be empty".to_string(),
        ));
    }

    if name.contains('\0') {
        return Err(MigrateError::Config(format!(
            "SECURITY: Identifier contains null byte (possible injection attempt): {:?}",
            name
        )));
    }

    if name.chars().count() > MAX_IDENTIFIER_LENGTH {
        return Err(MigrateError::Config(format!(
            "Identifier exceeds maximum length of {} characters: {:?}",
            MAX_IDENTIFIER_LENGTH, name
        )));
    }

    Ok(())
}

/// Quote a SQLite identifier.
///
/// ```
/// use sqlite_mysql_migrate::core::identifier::quote_sqlite;
/// assert_eq!(quote_sqlite("users"), "\"users\"");
/// assert_eq!(quote_sqlite("odd\"name"), "\"odd\"\"name\"");
/// ```
pub fn quote_sqlite(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a MySQL identifier using backticks.
///
/// ```
/// use sqlite_mysql_migrate::core::identifier::quote_mysql;
/// assert_eq!(quote_mysql("users"), "`users`");
/// assert_eq!(quote_mysql("table`name"), "`table``name`");
/// ```
pub fn quote_mysql(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Quote and join a column list for MySQL.
pub fn mysql_column_list(columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| quote_mysql(c))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Quote and join a column list for SQLite.
pub fn sqlite_column_list(columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| quote_sqlite(c))
        .collect::<Vec<_>>()
        .join(", ")
}
