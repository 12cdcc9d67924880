//! SQL value types for row transfer.
//!
//! SQLite stores every value in one of five storage classes regardless of
//! the declared column type, so rows are carried as those classes and left
//! to MySQL to coerce into the destination column type.

/// A single cell value as stored by the source.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// NULL.
    Null,

    /// 64-bit signed integer (INTEGER storage class).
    Integer(i64),

    /// 64-bit floating point (REAL storage class).
    Real(f64),

    /// UTF-8 text (TEXT storage class).
    Text(String),

    /// Raw bytes (BLOB storage class).
    Blob(Vec<u8>),
}

impl From<SqlValue> for mysql_async::Value {
    fn from(value: SqlValue) -> Self {
        match value {
            SqlValue::Null => mysql_async::Value::NULL,
            SqlValue::Integer(i) => mysql_async::Value::Int(i),
            SqlValue::Real(f) => mysql_async::Value::Double(f),
            SqlValue::Text(s) => mysql_async::Value::Bytes(s.into_bytes()),
            SqlValue::Blob(b) => mysql_async::Value::Bytes(b),
        }
    }
}

/// A batch of rows, each row in table column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    pub rows: Vec<Vec<SqlValue>>,
}

impl Batch {
    /// Create a batch from rows.
    pub fn new(rows: Vec<Vec<SqlValue>>) -> Self {
        Self { rows }
    }

    /// Number of rows in the batch.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the batch has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
