use txl_store::StoreError;
use txl_types::TypeError;

use crate::keys::Keyspace;

/// Coarse classification of a [`LedgerError`], for callers that branch on
/// the failure kind without inspecting its payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    InvalidTimestamp,
    DuplicateRecord,
    NotFound,
    CorruptRecord,
    StoreFailure,
}

/// Errors produced by ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Malformed or empty input, rejected before any store call.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid timestamp {value:?}: {reason}")]
    InvalidTimestamp { value: String, reason: String },

    #[error("{keyspace} {id} already exists")]
    DuplicateRecord { keyspace: Keyspace, id: String },

    #[error("{keyspace} {id} does not exist")]
    NotFound { keyspace: Keyspace, id: String },

    /// The store returned bytes that do not decode to the expected record.
    #[error("corrupt record at key {key:?}: {reason}")]
    CorruptRecord { key: String, reason: String },

    /// I/O, query, or cancellation failure from the store boundary.
    #[error("store failure: {0}")]
    StoreFailure(#[from] StoreError),
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::InvalidTimestamp { .. } => ErrorKind::InvalidTimestamp,
            Self::DuplicateRecord { .. } => ErrorKind::DuplicateRecord,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::CorruptRecord { .. } => ErrorKind::CorruptRecord,
            Self::StoreFailure(_) => ErrorKind::StoreFailure,
        }
    }
}

impl From<TypeError> for LedgerError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::InvalidTimestamp { value, reason } => Self::InvalidTimestamp { value, reason },
            other @ TypeError::InvalidAmount { .. } => Self::InvalidArgument(other.to_string()),
        }
    }
}

/// Result alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
