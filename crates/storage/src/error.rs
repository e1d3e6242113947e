use thiserror::Error;

use crate::TupleAddress;

/// Errors returned by the row storage layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// A value does not fit the declared column type.
    #[error("column {column}: expected {expected}, found {found}")]
    TypeMismatch {
        column: String,
        expected: String,
        found: String,
    },
    /// An integer is outside the range its column can hold.
    #[error("column {column}: value {value} out of range")]
    ValueOutOfRange { column: String, value: i64 },
    /// A string is longer than the column's data capacity.
    #[error("column {column}: string of {len} bytes exceeds capacity {capacity}")]
    StringTooLong {
        column: String,
        len: usize,
        capacity: usize,
    },
    /// A string contains a byte the varchar layout cannot represent.
    #[error("column {column}: string contains a NUL byte")]
    InvalidString { column: String },
    /// Wrong number of values for a schema, or an invalid column reference.
    #[error("expected {expected} columns, got {found}")]
    ColumnCount { expected: usize, found: usize },
    /// A schema definition or byte image is inconsistent.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),
    /// No live row is stored at the address.
    #[error("no row at address {0}")]
    UnknownAddress(TupleAddress),
}

/// Convenience alias for storage results.
pub type StorageResult<T> = Result<T, StorageError>;
