use storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("index {index}: {operation} is not supported")]
    Unsupported {
        index: String,
        operation: &'static str,
    },
    #[error("invalid index configuration: {0}")]
    Configuration(String),
    #[error("index {index}: key of {size} bytes exceeds the {limit} byte limit")]
    KeyTooLarge {
        index: String,
        size: usize,
        limit: usize,
    },
    #[error("search key mismatch: {0}")]
    KeyMismatch(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type IndexResult<T> = Result<T, IndexError>;
