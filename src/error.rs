use thiserror::Error;

/// Configuration and validation errors raised by the grid engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GridError {
    /// A non-divider row action was declared without a label.
    #[error("label is required for row action #{index}")]
    MissingActionLabel { index: usize },
    #[error("duplicate column id `{0}`")]
    DuplicateColumnId(String),
    #[error("unknown column `{0}`")]
    UnknownColumn(String),
    #[error("column `{0}` cannot be sorted")]
    NotSortable(String),
    #[error("column `{0}` cannot be hidden")]
    NotHideable(String),
    #[error("column `{0}` cannot be pinned")]
    NotPinnable(String),
    #[error("column `{0}` cannot be resized")]
    NotResizable(String),
    #[error("column `{0}` has no accessor")]
    NoAccessor(String),
    #[error("page size must be greater than zero")]
    InvalidPageSize,
}

pub type Result<T> = core::result::Result<T, GridError>;

/// Failures reported by a [`crate::KeyValueStore`] backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage backend unavailable: {0}")]
    Backend(String),
    #[error("failed to encode grid state: {0}")]
    Encode(#[from] serde_json::Error),
}
