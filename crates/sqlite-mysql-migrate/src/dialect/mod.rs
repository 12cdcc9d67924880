//! MySQL statement generation.
//!
//! Everything here is pure string building: default-literal normalization,
//! `CREATE TABLE` generation from a source [`Table`], and the handful of
//! session statements the orchestrator issues around it. Identifiers are
//! quoted with [`quote_mysql`]; SQLite-side queries use [`quote_sqlite`].
//!
//! Table DDL fixes the destination storage policy (InnoDB, `utf8mb4`,
//! `utf8mb4_unicode_ci`). It is guarded with `IF NOT EXISTS`, so re-running
//! against an existing table leaves its definition untouched.

use regex::Regex;
use std::sync::LazyLock;

use crate::core::identifier::{mysql_column_list, quote_mysql, quote_sqlite, sqlite_column_list};
use crate::core::schema::{Column, Table};
use crate::typemap::sqlite_to_mysql;

/// Storage engine and encoding clause appended to every table.
pub const TABLE_OPTIONS: &str = "ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci";

/// Character set clause for `CREATE DATABASE`.
pub const DATABASE_OPTIONS: &str = "CHARACTER SET utf8mb4 COLLATE utf8mb4_unicode_ci";

static INTEGER_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-+]?\d+$").expect("valid integer regex"));

static DECIMAL_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-+]?\d*\.\d+$").expect("valid decimal regex"));

/// Convert a SQLite default literal into MySQL syntax.
///
/// - `NULL` and `CURRENT_TIMESTAMP` (any case) are returned uppercased
/// - integer and decimal numerals are returned unchanged
/// - anything else becomes a single-quoted string literal; one surrounding
///   pair of `'` or `"` is removed first, along with its escaping
///
/// Always returns `Some`. Callers only invoke this when the column has a
/// default at all, so "no default" and "default NULL" stay distinct.
pub fn normalize_default(raw: &str) -> Option<String> {
    let val = raw.trim();
    let upper = val.to_uppercase();
    if upper == "NULL" || upper == "CURRENT_TIMESTAMP" {
        return Some(upper);
    }

    if INTEGER_LITERAL.is_match(val) || DECIMAL_LITERAL.is_match(val) {
        return Some(val.to_string());
    }

    let text = if let Some(inner) = strip_quotes(val, '\'') {
        inner.replace("''", "'")
    } else if let Some(inner) = strip_quotes(val, '"') {
        inner.replace("\"\"", "\"")
    } else {
        val.to_string()
    };

    Some(format!("'{}'", text.replace('\'', "''")))
}

fn strip_quotes(val: &str, quote: char) -> Option<&str> {
    if val.len() >= 2 && val.starts_with(quote) && val.ends_with(quote) {
        Some(&val[1..val.len() - 1])
    } else {
        None
    }
}

/// Render one column definition: name, mapped type, nullability, default.
pub fn column_definition(col: &Column) -> String {
    let mut def = format!("{} {}", quote_mysql(&col.name), sqlite_to_mysql(&col.data_type));

    if col.not_null {
        def.push_str(" NOT NULL");
    }

    if let Some(default) = col.default.as_deref().and_then(normalize_default) {
        def.push_str(" DEFAULT ");
        def.push_str(&default);
    }

    def
}

/// Build the `CREATE TABLE IF NOT EXISTS` statement for a source table.
///
/// Columns keep declaration order. A `PRIMARY KEY` clause is appended only
/// when the table has one, listing key columns by key position.
pub fn build_create_table(table: &Table) -> String {
    let mut defs: Vec<String> = table.columns.iter().map(column_definition).collect();

    if table.has_pk() {
        defs.push(format!("PRIMARY KEY ({})", mysql_column_list(&table.primary_key)));
    }

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n  {}\n) {}",
        quote_mysql(&table.name),
        defs.join(",\n  "),
        TABLE_OPTIONS
    )
}

pub fn drop_table_sql(table: &str) -> String {
    format!("DROP TABLE IF EXISTS {}", quote_mysql(table))
}

pub fn create_database_sql(database: &str) -> String {
    format!(
        "CREATE DATABASE IF NOT EXISTS {} {}",
        quote_mysql(database),
        DATABASE_OPTIONS
    )
}

pub fn use_database_sql(database: &str) -> String {
    format!("USE {}", quote_mysql(database))
}

pub fn foreign_key_checks_sql(enabled: bool) -> String {
    format!("SET FOREIGN_KEY_CHECKS = {}", u8::from(enabled))
}

/// Parameterized multi-row INSERT: `rows` tuples of one `?` per column.
pub fn insert_sql(table: &str, columns: &[String], rows: usize) -> String {
    let tuple = format!("({})", vec!["?"; columns.len()].join(", "));
    let values: Vec<String> = std::iter::repeat_n(tuple, rows.max(1)).collect();

    format!(
        "INSERT INTO {} ({}) VALUES {}",
        quote_mysql(table),
        mysql_column_list(columns),
        values.join(", ")
    )
}

/// SQLite query reading `columns` of `table` in the given order.
pub fn select_sql(table: &str, columns: &[String]) -> String {
    format!(
        "SELECT {} FROM {}",
        sqlite_column_list(columns),
        quote_sqlite(table)
    )
}

/// SQLite row count query.
pub fn count_sql(table: &str) -> String {
    format!("SELECT COUNT(*) FROM {}", quote_sqlite(table))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::fixtures::{col, users_table};

    #[test]
    fn test_normalize_keywords() {
        assert_eq!(normalize_default("NULL").as_deref(), Some("NULL"));
        assert_eq!(normalize_default(" null ").as_deref(), Some("NULL"));
        assert_eq!(
            normalize_default("CURRENT_TIMESTAMP").as_deref(),
            Some("CURRENT_TIMESTAMP")
        );
        assert_eq!(
            normalize_default("current_timestamp").as_deref(),
            Some("CURRENT_TIMESTAMP")
        );
    }

    #[test]
    fn test_normalize_numbers() {
        assert_eq!(normalize_default("42").as_deref(), Some("42"));
        assert_eq!(normalize_default("-7").as_deref(), Some("-7"));
        assert_eq!(normalize_default("+3.14").as_deref(), Some("+3.14"));
        assert_eq!(normalize_default(".5").as_deref(), Some(".5"));
        // Not a numeral by these rules
        assert_eq!(normalize_default("1e5").as_deref(), Some("'1e5'"));
        assert_eq!(normalize_default("5.").as_deref(), Some("'5.'"));
    }

    #[test]
    fn test_normalize_quoted_strings() {
        assert_eq!(normalize_default("'abc'").as_deref(), Some("'abc'"));
        assert_eq!(normalize_default("\"abc\"").as_deref(), Some("'abc'"));
        assert_eq!(normalize_default("'it''s'").as_deref(), Some("'it''s'"));
        assert_eq!(normalize_default("\"it's\"").as_deref(), Some("'it''s'"));
        assert_eq!(normalize_default("''").as_deref(), Some("''"));
    }

    #[test]
    fn test_normalize_bare_strings() {
        assert_eq!(normalize_default("O'Brien").as_deref(), Some("'O''Brien'"));
        assert_eq!(normalize_default("active").as_deref(), Some("'active'"));
        assert_eq!(normalize_default("'").as_deref(), Some("''''"));
        assert_eq!(
            normalize_default("(datetime('now'))").as_deref(),
            Some("'(datetime(''now''))'")
        );
    }

    #[test]
    fn test_column_definition() {
        let c = Column {
            not_null: true,
            default: Some("'pending'".to_string()),
            ..col("status", "VARCHAR(20)")
        };
        assert_eq!(
            column_definition(&c),
            "`status` VARCHAR(20) NOT NULL DEFAULT 'pending'"
        );
        assert_eq!(column_definition(&col("note", "")), "`note` TEXT");
    }

    #[test]
    fn test_null_default_differs_from_no_default() {
        let with_null = Column {
            default: Some("NULL".to_string()),
            ..col("x", "INTEGER")
        };
        assert_eq!(column_definition(&with_null), "`x` INT DEFAULT NULL");
        assert_eq!(column_definition(&col("x", "INTEGER")), "`x` INT");
    }

    #[test]
    fn test_build_create_table_users() {
        let ddl = build_create_table(&users_table());
        assert_eq!(
            ddl,
            "CREATE TABLE IF NOT EXISTS `users` (\n  \
             `id` INT,\n  \
             `name` TEXT NOT NULL,\n  \
             `age` INT DEFAULT 0,\n  \
             PRIMARY KEY (`id`)\n\
             ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci"
        );
    }

    #[test]
    fn test_build_create_table_single_pk_clause_and_order() {
        let table = Table::new(
            "pairs",
            vec![
                col("b", "TEXT"),
                Column {
                    pk_ordinal: 1,
                    ..col("a", "INTEGER")
                },
            ],
        );
        let ddl = build_create_table(&table);
        assert_eq!(ddl.matches("PRIMARY KEY").count(), 1);
        assert!(ddl.find("`b` TEXT").unwrap() < ddl.find("`a` INT").unwrap());
        assert!(ddl.contains("PRIMARY KEY (`a`)"));
    }

    #[test]
    fn test_build_create_table_without_pk() {
        let table = Table::new("log", vec![col("line", "TEXT")]);
        let ddl = build_create_table(&table);
        assert!(!ddl.contains("PRIMARY KEY"));
        assert!(ddl.contains("`line` TEXT\n)"));
    }

    #[test]
    fn test_build_create_table_quotes_identifiers() {
        let table = Table::new("we`ird", vec![col("co`l", "INT")]);
        let ddl = build_create_table(&table);
        assert!(ddl.starts_with("CREATE TABLE IF NOT EXISTS `we``ird` ("));
        assert!(ddl.contains("`co``l` INT"));
    }

    #[test]
    fn test_session_statements() {
        assert_eq!(drop_table_sql("users"), "DROP TABLE IF EXISTS `users`");
        assert_eq!(
            create_database_sql("app"),
            "CREATE DATABASE IF NOT EXISTS `app` CHARACTER SET utf8mb4 COLLATE utf8mb4_unicode_ci"
        );
        assert_eq!(use_database_sql("app"), "USE `app`");
        assert_eq!(foreign_key_checks_sql(false), "SET FOREIGN_KEY_CHECKS = 0");
        assert_eq!(foreign_key_checks_sql(true), "SET FOREIGN_KEY_CHECKS = 1");
    }

    #[test]
    fn test_insert_sql() {
        let cols = vec!["id".to_string(), "name".to_string()];
        assert_eq!(
            insert_sql("users", &cols, 1),
            "INSERT INTO `users` (`id`, `name`) VALUES (?, ?)"
        );
        assert_eq!(
            insert_sql("users", &cols, 2),
            "INSERT INTO `users` (`id`, `name`) VALUES (?, ?), (?, ?)"
        );
    }

    #[test]
    fn test_sqlite_queries() {
        let cols = vec!["id".to_string(), "na\"me".to_string()];
        assert_eq!(
            select_sql("users", &cols),
            "SELECT \"id\", \"na\"\"me\" FROM \"users\""
        );
        assert_eq!(count_sql("users"), "SELECT COUNT(*) FROM \"users\"");
    }
}
