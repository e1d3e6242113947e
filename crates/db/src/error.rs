use index::IndexError;
use storage::{StorageError, TupleAddress};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("table {table}: row violates unique index {index}")]
    ConstraintViolation { table: String, index: String },
    #[error("no row at {0}")]
    RowNotFound(TupleAddress),
    #[error("table {table} has no index {index}")]
    UnknownIndex { table: String, index: String },
    #[error("table {table} already has an index named {index}")]
    DuplicateIndex { table: String, index: String },
    #[error("index error: {0}")]
    Index(#[from] IndexError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type TableResult<T> = Result<T, TableError>;
