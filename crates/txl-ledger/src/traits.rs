use crate::context::TransactionContext;
use crate::error::LedgerResult;
use crate::records::{AuditLog, NewAuditLog, NewTransaction, Transaction};

/// Write boundary for ledger records.
pub trait LedgerWriter: Send + Sync {
    /// Record a new transaction. Fails with `DuplicateRecord` if the id is
    /// already committed.
    fn create_transaction(
        &self,
        ctx: &dyn TransactionContext,
        new: NewTransaction,
    ) -> LedgerResult<Transaction>;

    /// Record an audit entry, appending a revision if the id already exists.
    fn create_audit_log(
        &self,
        ctx: &dyn TransactionContext,
        new: NewAuditLog,
    ) -> LedgerResult<AuditLog>;
}

/// Read boundary for ledger records.
pub trait LedgerReader: Send + Sync {
    fn get_transaction(&self, ctx: &dyn TransactionContext, id: &str) -> LedgerResult<Transaction>;

    fn transaction_exists(&self, ctx: &dyn TransactionContext, id: &str) -> LedgerResult<bool>;

    /// Every stored revision for the transaction id, oldest first.
    fn transaction_history(
        &self,
        ctx: &dyn TransactionContext,
        id: &str,
    ) -> LedgerResult<Vec<Transaction>>;

    /// Transactions where `account_id` is the source or destination, newest
    /// `recorded_at` first (ties by id), at most `limit` of them. `None` means
    /// no limit.
    fn account_transactions(
        &self,
        ctx: &dyn TransactionContext,
        account_id: &str,
        limit: Option<usize>,
    ) -> LedgerResult<Vec<Transaction>>;

    /// Whether the stored transaction hashes to `expected_hash` (hex).
    fn verify_transaction(
        &self,
        ctx: &dyn TransactionContext,
        id: &str,
        expected_hash: &str,
    ) -> LedgerResult<bool>;

    fn get_audit_log(&self, ctx: &dyn TransactionContext, id: &str) -> LedgerResult<AuditLog>;

    /// Every stored revision for the audit id, oldest first.
    fn audit_log_history(
        &self,
        ctx: &dyn TransactionContext,
        id: &str,
    ) -> LedgerResult<Vec<AuditLog>>;
}
