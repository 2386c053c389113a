//! Transaction ledger and audit log for TXL.
//!
//! This crate provides:
//! - `Transaction` / `AuditLog` records and their JSON wire shape
//! - `LedgerWriter` / `LedgerReader` trait boundaries
//! - `LedgerEngine`, generic over any `txl_store::VersionedStore`
//! - Key namespacing that keeps audit entries out of the transaction keyspace
//! - `TransactionContext` for correlation ids, clocks and cancellation
//! - BLAKE3 content hashes for verifying stored transactions

pub mod codec;
pub mod context;
pub mod engine;
pub mod error;
pub mod integrity;
pub mod keys;
pub mod records;
pub mod traits;

pub use codec::{Record, RecordCodec};
pub use context::{CancelHandle, FixedContext, InvocationContext, TransactionContext};
pub use engine::{account_predicate, LedgerEngine, DEFAULT_ACCOUNT_LIMIT};
pub use error::{ErrorKind, LedgerError, LedgerResult};
pub use integrity::{transaction_hash, TRANSACTION_HASH_DOMAIN};
pub use keys::{Keyspace, AUDIT_PREFIX};
pub use records::{AuditLog, NewAuditLog, NewTransaction, Transaction};
pub use traits::{LedgerReader, LedgerWriter};
