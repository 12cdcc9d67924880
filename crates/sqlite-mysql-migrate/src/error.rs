//! Error types for the migration library.

use thiserror::Error;

/// MySQL server error code for a rejected user/password.
pub const ER_ACCESS_DENIED_ERROR: u16 = 1045;

/// MySQL server error code for an unknown database.
pub const ER_BAD_DB_ERROR: u16 = 1049;

/// Main error type for migration operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Destination unreachable, authentication failure or lost session.
    /// Always fatal to the run.
    #[error("Connection error: {message}")]
    Connection {
        message: String,
        /// Server error code when the server rejected the session.
        code: Option<u16>,
    },

    /// Source database error outside of a per-table step.
    #[error("Source database error: {0}")]
    Source(#[from] sqlx::Error),

    /// A destination statement was rejected by the server.
    #[error("MySQL error {code}: {message}")]
    Statement { code: u16, message: String },

    /// Table metadata could not be introspected. The table is skipped.
    #[error("Schema read failed for table {table}: {message}")]
    SchemaRead { table: String, message: String },

    /// Creating or dropping the destination table failed.
    #[error("DDL failed for table {table}: {message}")]
    Ddl { table: String, message: String },

    /// Copying rows for a table failed after zero or more committed batches.
    #[error("Data copy failed for table {table}: {message}")]
    DataCopy { table: String, message: String },

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Migration was cancelled (SIGINT, etc.)
    #[error("Migration cancelled")]
    Cancelled,
}

impl MigrateError {
    /// Create a Connection error without a server code.
    pub fn connection(message: impl ToString) -> Self {
        MigrateError::Connection {
            message: message.to_string(),
            code: None,
        }
    }

    /// Create a SchemaRead error.
    pub fn schema_read(table: impl Into<String>, message: impl ToString) -> Self {
        MigrateError::SchemaRead {
            table: table.into(),
            message: message.to_string(),
        }
    }

    /// Create a Ddl error.
    pub fn ddl(table: impl Into<String>, message: impl ToString) -> Self {
        MigrateError::Ddl {
            table: table.into(),
            message: message.to_string(),
        }
    }

    /// Create a DataCopy error.
    pub fn data_copy(table: impl Into<String>, message: impl ToString) -> Self {
        MigrateError::DataCopy {
            table: table.into(),
            message: message.to_string(),
        }
    }

    /// Whether this error means the destination session can no longer be
    /// trusted. Such errors abort the run regardless of table error policy.
    pub fn is_connection_level(&self) -> bool {
        matches!(self, MigrateError::Connection { .. } | MigrateError::Cancelled)
    }

    /// Wrap a statement-level error with table context for the DDL step.
    /// Connection-level errors pass through untouched.
    pub fn in_ddl(self, table: &str) -> Self {
        match self {
            e if e.is_connection_level() => e,
            e @ MigrateError::Ddl { .. } => e,
            e => MigrateError::ddl(table, e),
        }
    }

    /// Wrap a statement-level error with table context for the copy step.
    /// Connection-level errors pass through untouched.
    pub fn in_copy(self, table: &str) -> Self {
        match self {
            e if e.is_connection_level() => e,
            e @ MigrateError::DataCopy { .. } => e,
            e => MigrateError::data_copy(table, e),
        }
    }

    /// Operator hint for well-known server rejections.
    pub fn hint(&self) -> Option<&'static str> {
        let code = match self {
            MigrateError::Connection { code, .. } => *code,
            MigrateError::Statement { code, .. } => Some(*code),
            _ => None,
        };
        match code {
            Some(ER_ACCESS_DENIED_ERROR) => Some("Check your MySQL user/password."),
            Some(ER_BAD_DB_ERROR) => Some("Database does not exist and could not be created."),
            _ => None,
        }
    }

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> u8 {
        match self {
            MigrateError::Config(_) | MigrateError::Yaml(_) => 2,
            MigrateError::Connection { .. } => 3,
            MigrateError::Cancelled => 130,
            _ => 1,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        // Add error chain for wrapped errors
        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        if let Some(hint) = self.hint() {
            output.push_str(&format!("\nHint: {}", hint));
        }

        output
    }
}

impl From<mysql_async::Error> for MigrateError {
    /// Server-side rejections stay statement-level; everything else
    /// (IO, protocol, driver state) means the session is gone.
    fn from(err: mysql_async::Error) -> Self {
        match err {
            mysql_async::Error::Server(server) => MigrateError::Statement {
                code: server.code,
                message: server.message,
            },
            other => MigrateError::connection(other),
        }
    }
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
