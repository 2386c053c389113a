//! The ledger engine: validation, stamping, key namespacing and decoding on
//! top of a [`VersionedStore`].

use tracing::{debug, warn};
use txl_store::{Predicate, StoreError, VersionedStore};
use txl_types::Timestamp;

use crate::codec::{Record, RecordCodec};
use crate::context::TransactionContext;
use crate::error::{LedgerError, LedgerResult};
use crate::integrity;
use crate::keys::{self, Keyspace};
use crate::records::{AuditLog, NewAuditLog, NewTransaction, Transaction};
use crate::traits::{LedgerReader, LedgerWriter};

/// Page size used by callers that do not pick one.
pub const DEFAULT_ACCOUNT_LIMIT: usize = 100;

/// Predicate selecting transactions where `account_id` is either side.
///
/// The account id is carried as a value, never spliced into query text.
pub fn account_predicate(account_id: &str) -> Predicate {
    Predicate::any_of(vec![
        Predicate::eq("fromAccount", account_id),
        Predicate::eq("toAccount", account_id),
    ])
}

/// Transaction ledger and audit log over a versioned store.
///
/// The engine is stateless apart from the store handle, so one instance can
/// be shared across threads (`LedgerEngine<Arc<S>>` or `&LedgerEngine<S>`).
pub struct LedgerEngine<S> {
    store: S,
}

impl<S: VersionedStore> LedgerEngine<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    fn ensure_live(ctx: &dyn TransactionContext) -> LedgerResult<()> {
        if ctx.is_cancelled() {
            return Err(StoreError::Cancelled.into());
        }
        Ok(())
    }

    fn read_latest<R: Record>(&self, key: &str, id: &str) -> LedgerResult<R> {
        match self.store.get(key)? {
            Some(bytes) => Self::decode_at(key, id, &bytes),
            None => Err(LedgerError::NotFound {
                keyspace: R::KEYSPACE,
                id: id.to_string(),
            }),
        }
    }

    fn read_history<R: Record>(&self, key: &str, id: &str) -> LedgerResult<Vec<R>> {
        self.store
            .history_of(key)?
            .iter()
            .map(|revision| Self::decode_at(key, id, &revision.value))
            .collect()
    }

    /// Decode and check that the record belongs to the key it was read from.
    fn decode_at<R: Record>(key: &str, id: &str, bytes: &[u8]) -> LedgerResult<R> {
        let record: R = RecordCodec::decode(key, bytes)?;
        if record.id() != id {
            warn!(key, stored_id = record.id(), "record id does not match its key");
            return Err(LedgerError::CorruptRecord {
                key: key.to_string(),
                reason: format!("stored id {:?} does not match key", record.id()),
            });
        }
        Ok(record)
    }
}

impl<S: VersionedStore> LedgerWriter for LedgerEngine<S> {
    fn create_transaction(
        &self,
        ctx: &dyn TransactionContext,
        new: NewTransaction,
    ) -> LedgerResult<Transaction> {
        new.validate()?;
        let correlation_id = ctx.correlation_id();
        if correlation_id.is_empty() {
            return Err(LedgerError::InvalidArgument(
                "context correlation id must not be empty".into(),
            ));
        }
        if self.transaction_exists(ctx, &new.id)? {
            warn!(id = %new.id, "rejecting duplicate transaction");
            return Err(LedgerError::DuplicateRecord {
                keyspace: Keyspace::Transaction,
                id: new.id,
            });
        }
        let event_timestamp = Timestamp::parse(&new.timestamp)?;

        let tx = Transaction {
            id: new.id,
            txn_type: new.txn_type,
            amount: new.amount,
            currency: new.currency,
            from_account: new.from_account,
            to_account: new.to_account,
            event_timestamp,
            status: new.status,
            metadata: new.metadata,
            provenance_id: correlation_id,
            recorded_at: ctx.now(),
        };
        let key = tx.storage_key();
        let bytes = RecordCodec::encode_transaction(&tx)?;

        Self::ensure_live(ctx)?;
        if !self.store.put_if_absent(&key, &bytes)? {
            warn!(key = %key, "rejecting duplicate transaction after conditional put");
            return Err(LedgerError::DuplicateRecord {
                keyspace: Keyspace::Transaction,
                id: tx.id,
            });
        }
        debug!(key = %key, provenance = %tx.provenance_id, "transaction recorded");
        Ok(tx)
    }

    fn create_audit_log(
        &self,
        ctx: &dyn TransactionContext,
        new: NewAuditLog,
    ) -> LedgerResult<AuditLog> {
        new.validate()?;
        let event_timestamp = Timestamp::parse(&new.timestamp)?;
        let entry = AuditLog {
            id: new.id,
            action_type: new.action_type,
            actor_user_id: new.actor_user_id,
            resource_type: new.resource_type,
            resource_id: new.resource_id,
            before_value: new.before_value,
            after_value: new.after_value,
            event_timestamp,
            recorded_at: ctx.now(),
        };
        let key = entry.storage_key();
        let bytes = RecordCodec::encode_audit_log(&entry)?;

        Self::ensure_live(ctx)?;
        self.store.put(&key, &bytes)?;
        debug!(key = %key, action = %entry.action_type, "audit entry recorded");
        Ok(entry)
    }
}

impl<S: VersionedStore> LedgerReader for LedgerEngine<S> {
    fn get_transaction(&self, ctx: &dyn TransactionContext, id: &str) -> LedgerResult<Transaction> {
        let key = keys::transaction_key(id)?;
        Self::ensure_live(ctx)?;
        self.read_latest(&key, id)
    }

    fn transaction_exists(&self, ctx: &dyn TransactionContext, id: &str) -> LedgerResult<bool> {
        let key = keys::transaction_key(id)?;
        Self::ensure_live(ctx)?;
        Ok(self.store.contains(&key)?)
    }

    fn transaction_history(
        &self,
        ctx: &dyn TransactionContext,
        id: &str,
    ) -> LedgerResult<Vec<Transaction>> {
        let key = keys::transaction_key(id)?;
        Self::ensure_live(ctx)?;
        self.read_history(&key, id)
    }

    fn account_transactions(
        &self,
        ctx: &dyn TransactionContext,
        account_id: &str,
        limit: Option<usize>,
    ) -> LedgerResult<Vec<Transaction>> {
        if account_id.trim().is_empty() {
            return Err(LedgerError::InvalidArgument(
                "account id must not be empty".into(),
            ));
        }
        if limit == Some(0) {
            return Err(LedgerError::InvalidArgument("limit must be at least 1".into()));
        }
        Self::ensure_live(ctx)?;

        let predicate = account_predicate(account_id);
        debug!(selector = %predicate, "querying account transactions");
        let mut out = Vec::new();
        for hit in self.store.query(&predicate)? {
            if Keyspace::of(&hit.key) != Keyspace::Transaction {
                continue;
            }
            let tx: Transaction = Self::decode_at(&hit.key, &hit.key, &hit.value)?;
            if tx.involves(account_id) {
                out.push(tx);
            }
        }
        out.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at).then_with(|| a.id.cmp(&b.id)));
        if let Some(limit) = limit {
            out.truncate(limit);
        }
        Ok(out)
    }

    fn verify_transaction(
        &self,
        ctx: &dyn TransactionContext,
        id: &str,
        expected_hash: &str,
    ) -> LedgerResult<bool> {
        let expected = integrity::parse_hash(expected_hash)?;
        let tx = self.get_transaction(ctx, id)?;
        let matches = integrity::verify_hash(&tx, &expected)?;
        if !matches {
            warn!(id, "transaction hash mismatch");
        }
        Ok(matches)
    }

    fn get_audit_log(&self, ctx: &dyn TransactionContext, id: &str) -> LedgerResult<AuditLog> {
        let key = keys::audit_key(id)?;
        Self::ensure_live(ctx)?;
        self.read_latest(&key, id)
    }

    fn audit_log_history(
        &self,
        ctx: &dyn TransactionContext,
        id: &str,
    ) -> LedgerResult<Vec<AuditLog>> {
        let key = keys::audit_key(id)?;
        Self::ensure_live(ctx)?;
        self.read_history(&key, id)
    }
}

impl<S: std::fmt::Debug> std::fmt::Debug for LedgerEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerEngine")
            .field("store", &self.store)
            .finish()
    }
}
