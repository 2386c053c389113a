//! Key namespacing.
//!
//! Transactions are stored under their raw id; audit entries under
//! `AUDIT_<id>`. Every read and write path builds keys through this module.

use std::fmt;

use crate::error::{LedgerError, LedgerResult};

/// Prefix separating the audit keyspace from the transaction keyspace.
pub const AUDIT_PREFIX: &str = "AUDIT_";

/// The two disjoint record namespaces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Keyspace {
    Transaction,
    Audit,
}

impl Keyspace {
    /// Classify a stored key.
    pub fn of(key: &str) -> Self {
        if key.starts_with(AUDIT_PREFIX) {
            Self::Audit
        } else {
            Self::Transaction
        }
    }

    /// Storage key for `id` in this keyspace, without validation.
    pub fn key_for(self, id: &str) -> String {
        match self {
            Self::Transaction => id.to_string(),
            Self::Audit => format!("{AUDIT_PREFIX}{id}"),
        }
    }
}

impl fmt::Display for Keyspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transaction => write!(f, "transaction"),
            Self::Audit => write!(f, "audit log"),
        }
    }
}

fn require_id(keyspace: Keyspace, id: &str) -> LedgerResult<()> {
    if id.trim().is_empty() {
        return Err(LedgerError::InvalidArgument(format!(
            "{keyspace} id must not be empty"
        )));
    }
    Ok(())
}

/// Storage key for a transaction id.
///
/// Ids beginning with [`AUDIT_PREFIX`] are rejected: they would land in the
/// audit keyspace.
pub fn transaction_key(id: &str) -> LedgerResult<String> {
    require_id(Keyspace::Transaction, id)?;
    if id.starts_with(AUDIT_PREFIX) {
        return Err(LedgerError::InvalidArgument(format!(
            "transaction id {id:?} uses the reserved prefix {AUDIT_PREFIX:?}"
        )));
    }
    Ok(Keyspace::Transaction.key_for(id))
}

/// Storage key for an audit log id.
pub fn audit_key(id: &str) -> LedgerResult<String> {
    require_id(Keyspace::Audit, id)?;
    Ok(Keyspace::Audit.key_for(id))
}
