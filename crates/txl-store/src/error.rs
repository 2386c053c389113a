/// Errors from versioned store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failure inside the backend.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The query predicate is malformed (empty field name, empty disjunction).
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Keys must be non-empty.
    #[error("key must not be empty")]
    EmptyKey,

    /// The caller cancelled the operation before it reached the backend.
    #[error("operation cancelled")]
    Cancelled,

    /// Another process holds the journal open.
    #[error("journal {path:?} is locked by another process")]
    Locked { path: std::path::PathBuf },

    /// The journal holds a damaged frame that is not a torn tail.
    #[error("journal corrupt at offset {offset}: {reason}")]
    Corrupt { offset: u64, reason: String },

    /// A backend lock was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    LockPoisoned,
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
