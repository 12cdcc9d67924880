//! Schema metadata types for tables and columns.
//!
//! A [`Table`] is read fresh for every table the orchestrator processes and
//! dropped once that table's migration step is done.

use serde::{Deserialize, Serialize};

/// Column metadata as declared in the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name, unique within its table.
    pub name: String,

    /// Declared source type string, e.g. `VARCHAR(40)` or `INTEGER`.
    pub data_type: String,

    /// Whether the column is declared NOT NULL.
    pub not_null: bool,

    /// Default literal in raw source syntax. `None` means no default,
    /// which is distinct from a `NULL` default.
    pub default: Option<String>,

    /// Position of the column in the table declaration (0-based).
    pub ordinal_pos: i64,

    /// Position within the primary key (1-based), 0 if not part of it.
    pub pk_ordinal: i64,
}

impl Column {
    /// Check if the column is part of the primary key.
    pub fn is_primary_key(&self) -> bool {
        self.pk_ordinal > 0
    }
}

/// Table metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Table name.
    pub name: String,

    /// Column definitions in declaration order. This is also the INSERT
    /// column order during data copy.
    pub columns: Vec<Column>,

    /// Primary key column names, ordered by key position.
    pub primary_key: Vec<String>,
}

impl Table {
    /// Build a table from columns, deriving the primary key from
    /// each column's key position.
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        let mut pk: Vec<&Column> = columns.iter().filter(|c| c.is_primary_key()).collect();
        pk.sort_by_key(|c| c.pk_ordinal);
        let primary_key = pk.into_iter().map(|c| c.name.clone()).collect();

        Self {
            name: name.into(),
            columns,
            primary_key,
        }
    }

    /// Column names in declaration order.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Check if the table has a primary key.
    pub fn has_pk(&self) -> bool {
        !self.primary_key.is_empty()
    }

    /// Find the first column name that appears more than once.
    pub fn duplicate_column(&self) -> Option<&str> {
        let mut seen = std::collections::HashSet::new();
        self.columns
            .iter()
            .find(|c| !seen.insert(c.name.as_str()))
            .map(|c| c.name.as_str())
    }
}
