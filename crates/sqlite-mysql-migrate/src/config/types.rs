//! Configuration type definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Source database configuration (SQLite).
    pub source: SourceConfig,

    /// Target database configuration (MySQL/MariaDB).
    pub target: TargetConfig,

    /// Migration behavior configuration.
    #[serde(default)]
    pub migration: MigrationConfig,
}

/// Source database (SQLite) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Path to the SQLite database file.
    pub path: PathBuf,
}

/// Target database (MySQL) configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Database host (default: 127.0.0.1).
    #[serde(default = "default_host")]
    pub host: String,

    /// Database port (default: 3306).
    #[serde(default = "default_mysql_port")]
    pub port: u16,

    /// Username (default: root).
    #[serde(default = "default_user")]
    pub user: String,

    /// Password.
    #[serde(default)]
    pub password: String,

    /// Target database name.
    pub database: String,
}

impl fmt::Debug for TargetConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("database", &self.database)
            .finish()
    }
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_mysql_port(),
            user: default_user(),
            password: String::new(),
            database: String::new(),
        }
    }
}

/// Migration behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Create the target database if it does not exist (default: true).
    #[serde(default = "default_true")]
    pub create_database: bool,

    /// Drop each target table before recreating it (default: false).
    #[serde(default)]
    pub drop_recreate: bool,

    /// Disable foreign key checks for the session during import (default: true).
    #[serde(default = "default_true")]
    pub disable_foreign_key_checks: bool,

    /// Rows fetched, inserted and committed together (default: 1000).
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Tables to migrate, in order. Empty means every source table.
    #[serde(default)]
    pub tables: Vec<String>,

    /// What to do when a table's DDL or data copy fails (default: abort).
    #[serde(default)]
    pub on_table_error: TableErrorPolicy,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            create_database: true,
            drop_recreate: false,
            disable_foreign_key_checks: true,
            batch_size: default_batch_size(),
            tables: Vec::new(),
            on_table_error: TableErrorPolicy::default(),
        }
    }
}

/// Policy for per-table DDL and data-copy failures.
///
/// Schema read failures always skip the table and connection failures always
/// abort; this only governs statement failures in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableErrorPolicy {
    /// Stop the run at the first failing table.
    #[default]
    Abort,

    /// Log the failure and continue with the next table.
    Skip,
}

// Default value functions for serde
fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_mysql_port() -> u16 {
    3306
}

fn default_user() -> String {
    "root".to_string()
}

fn default_batch_size() -> usize {
    1000
}

fn default_true() -> bool {
    true
}
