//! Ledger records and the caller input that produces them.
//!
//! `Transaction` and `AuditLog` are the stored shapes. `NewTransaction` and
//! `NewAuditLog` carry caller fields only; the engine stamps the rest.

use serde::{Deserialize, Serialize};
use txl_types::{Amount, Timestamp};

use crate::codec::Record;
use crate::error::{LedgerError, LedgerResult};
use crate::keys::{self, Keyspace};

/// A committed financial movement.
///
/// Never overwritten once stored. `provenance_id` and `recorded_at` are
/// stamped by the engine from the invocation context.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    #[serde(rename = "type")]
    pub txn_type: String,
    pub amount: Amount,
    pub currency: String,
    pub from_account: String,
    pub to_account: String,
    /// When the movement happened, as supplied by the caller.
    #[serde(rename = "timestamp")]
    pub event_timestamp: Timestamp,
    pub status: String,
    pub metadata: String,
    /// Correlation id of the invocation that wrote the record.
    #[serde(alias = "blockchainTxn")]
    pub provenance_id: String,
    /// When the ledger stored the record.
    #[serde(rename = "createdAt")]
    pub recorded_at: Timestamp,
}

impl Transaction {
    /// Returns `true` if `account` is the source or the destination.
    pub fn involves(&self, account: &str) -> bool {
        self.from_account == account || self.to_account == account
    }
}

impl Record for Transaction {
    const KEYSPACE: Keyspace = Keyspace::Transaction;

    fn id(&self) -> &str {
        &self.id
    }
}

/// An administrative trail entry. Rewriting the same id appends a revision.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLog {
    pub id: String,
    pub action_type: String,
    pub actor_user_id: String,
    pub resource_type: String,
    pub resource_id: String,
    pub before_value: String,
    pub after_value: String,
    #[serde(rename = "timestamp")]
    pub event_timestamp: Timestamp,
    #[serde(rename = "createdAt")]
    pub recorded_at: Timestamp,
}

impl Record for AuditLog {
    const KEYSPACE: Keyspace = Keyspace::Audit;

    fn id(&self) -> &str {
        &self.id
    }
}

/// Caller-supplied fields for a new transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NewTransaction {
    pub id: String,
    pub txn_type: String,
    pub amount: Amount,
    pub currency: String,
    pub from_account: String,
    pub to_account: String,
    /// RFC-3339 text; parsed by the engine.
    pub timestamp: String,
    pub status: String,
    pub metadata: String,
}

impl NewTransaction {
    /// Argument checks that need no store access. The timestamp is checked
    /// separately so that it surfaces as `InvalidTimestamp`.
    pub fn validate(&self) -> LedgerResult<()> {
        keys::transaction_key(&self.id)?;
        if self.txn_type.trim().is_empty() {
            return Err(LedgerError::InvalidArgument(
                "transaction type must not be empty".into(),
            ));
        }
        if self.currency.len() != 3 || !self.currency.bytes().all(|b| b.is_ascii_alphabetic()) {
            return Err(LedgerError::InvalidArgument(format!(
                "currency {:?} is not a 3-letter code",
                self.currency
            )));
        }
        if self.from_account.trim().is_empty() && self.to_account.trim().is_empty() {
            return Err(LedgerError::InvalidArgument(
                "at least one of fromAccount/toAccount is required".into(),
            ));
        }
        Ok(())
    }
}

/// Caller-supplied fields for a new audit entry.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NewAuditLog {
    pub id: String,
    pub action_type: String,
    pub actor_user_id: String,
    pub resource_type: String,
    pub resource_id: String,
    pub before_value: String,
    pub after_value: String,
    /// RFC-3339 text; parsed by the engine.
    pub timestamp: String,
}

impl NewAuditLog {
    pub fn validate(&self) -> LedgerResult<()> {
        keys::audit_key(&self.id).map(|_| ())
    }
}
