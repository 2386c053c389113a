//! Wire shape of ledger records.
//!
//! Records are stored as compact JSON documents so the store's document
//! query can see their fields. Encoding is deterministic (fixed field order,
//! no whitespace) and round-trip exact.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{LedgerError, LedgerResult};
use crate::keys::Keyspace;
use crate::records::{AuditLog, Transaction};

/// A record type the codec can store.
pub trait Record: Serialize + DeserializeOwned {
    /// Keyspace the record lives in.
    const KEYSPACE: Keyspace;

    /// Caller-supplied identifier.
    fn id(&self) -> &str;

    /// Storage key for this record.
    fn storage_key(&self) -> String {
        Self::KEYSPACE.key_for(self.id())
    }
}

/// Stateless encoder/decoder for [`Record`]s.
pub struct RecordCodec;

impl RecordCodec {
    pub fn encode<R: Record>(record: &R) -> LedgerResult<Vec<u8>> {
        serde_json::to_vec(record).map_err(|e| LedgerError::CorruptRecord {
            key: record.storage_key(),
            reason: format!("encode failed: {e}"),
        })
    }

    /// Decode bytes read from `key`.
    ///
    /// An absent value never reaches the codec; a present but empty value is
    /// corrupt like any other undecodable payload.
    pub fn decode<R: Record>(key: &str, bytes: &[u8]) -> LedgerResult<R> {
        serde_json::from_slice(bytes).map_err(|e| LedgerError::CorruptRecord {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }

    pub fn encode_transaction(tx: &Transaction) -> LedgerResult<Vec<u8>> {
        Self::encode(tx)
    }

    pub fn decode_transaction(key: &str, bytes: &[u8]) -> LedgerResult<Transaction> {
        Self::decode(key, bytes)
    }

    pub fn encode_audit_log(entry: &AuditLog) -> LedgerResult<Vec<u8>> {
        Self::encode(entry)
    }

    pub fn decode_audit_log(key: &str, bytes: &[u8]) -> LedgerResult<AuditLog> {
        Self::decode(key, bytes)
    }
}
