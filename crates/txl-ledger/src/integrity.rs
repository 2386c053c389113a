//! Content hashes for committed transactions.
//!
//! A transaction's hash is BLAKE3 over its stored JSON encoding, prefixed
//! with a domain tag so the same bytes hashed for another purpose never
//! collide with a transaction hash.

use crate::codec::RecordCodec;
use crate::error::{LedgerError, LedgerResult};
use crate::records::Transaction;

/// Domain tag mixed into every transaction hash.
pub const TRANSACTION_HASH_DOMAIN: &str = "txl-transaction-v1";

/// Digest length in bytes.
pub const HASH_LEN: usize = 32;

fn digest(tx: &Transaction) -> LedgerResult<[u8; HASH_LEN]> {
    let bytes = RecordCodec::encode_transaction(tx)?;
    let mut hasher = blake3::Hasher::new();
    hasher.update(TRANSACTION_HASH_DOMAIN.as_bytes());
    hasher.update(b":");
    hasher.update(&bytes);
    Ok(*hasher.finalize().as_bytes())
}

/// Lowercase hex hash of `tx` as it is stored.
pub fn transaction_hash(tx: &Transaction) -> LedgerResult<String> {
    Ok(hex::encode(digest(tx)?))
}

/// Parse a hex digest as accepted by [`verify_hash`].
pub fn parse_hash(hash: &str) -> LedgerResult<[u8; HASH_LEN]> {
    let bytes = hex::decode(hash.trim())
        .map_err(|e| LedgerError::InvalidArgument(format!("hash is not hex: {e}")))?;
    <[u8; HASH_LEN]>::try_from(bytes.as_slice()).map_err(|_| {
        LedgerError::InvalidArgument(format!(
            "hash must be {HASH_LEN} bytes, got {}",
            bytes.len()
        ))
    })
}

/// Whether `tx` hashes to `expected`.
pub fn verify_hash(tx: &Transaction, expected: &[u8; HASH_LEN]) -> LedgerResult<bool> {
    Ok(digest(tx)? == *expected)
}
