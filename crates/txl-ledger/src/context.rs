//! Invocation context: identity, clock, and cancellation.
//!
//! The engine has no clock and no identity of its own. Everything it stamps
//! onto a record comes from the [`TransactionContext`] passed to the call.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use txl_types::Timestamp;
use uuid::Uuid;

/// Caller-side execution context for one ledger operation.
pub trait TransactionContext {
    /// Identifier of the invocation; stamped as a transaction's `provenanceId`.
    fn correlation_id(&self) -> String;

    /// Time source for `recordedAt`.
    fn now(&self) -> Timestamp;

    /// Whether the caller has abandoned the operation.
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Shared cancellation flag for an [`InvocationContext`].
#[derive(Clone, Debug, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Production context: UUID v7 correlation id and the system clock.
#[derive(Clone, Debug)]
pub struct InvocationContext {
    correlation_id: String,
    cancel: CancelHandle,
}

impl InvocationContext {
    /// A context with a fresh, time-ordered correlation id.
    pub fn new() -> Self {
        Self::with_correlation_id(Uuid::now_v7().to_string())
    }

    /// A context that reuses an upstream correlation id (e.g. a request id).
    pub fn with_correlation_id(correlation_id: impl Into<String>) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            cancel: CancelHandle::default(),
        }
    }

    /// Handle that cancels this context from another thread.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }
}

impl Default for InvocationContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionContext for InvocationContext {
    fn correlation_id(&self) -> String {
        self.correlation_id.clone()
    }

    fn now(&self) -> Timestamp {
        Timestamp::now()
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Deterministic context with a pinned correlation id and instant.
#[derive(Clone, Debug)]
pub struct FixedContext {
    correlation_id: String,
    now: Timestamp,
    cancelled: bool,
}

impl FixedContext {
    pub fn new(correlation_id: impl Into<String>, now: Timestamp) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            now,
            cancelled: false,
        }
    }

    /// The same context, already cancelled.
    pub fn cancelled(self) -> Self {
        Self {
            cancelled: true,
            ..self
        }
    }
}

impl TransactionContext for FixedContext {
    fn correlation_id(&self) -> String {
        self.correlation_id.clone()
    }

    fn now(&self) -> Timestamp {
        self.now
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invocation_ids_are_unique() {
        let a = InvocationContext::new();
        let b = InvocationContext::new();
        assert_ne!(a.correlation_id(), b.correlation_id());
        assert!(Uuid::parse_str(&a.correlation_id()).is_ok());
        assert!(!a.now().is_epoch());
    }

    #[test]
    fn cancel_handle_is_shared() {
        let ctx = InvocationContext::with_correlation_id("req-1");
        let handle = ctx.cancel_handle();
        assert!(!ctx.is_cancelled());
        handle.cancel();
        assert!(ctx.is_cancelled());
        assert_eq!(ctx.correlation_id(), "req-1");
    }

    #[test]
    fn fixed_context_is_pinned() {
        let at = Timestamp::parse("2024-01-01T00:00:00Z").unwrap();
        let ctx = FixedContext::new("corr", at);
        assert_eq!(ctx.now(), at);
        assert_eq!(ctx.correlation_id(), "corr");
        assert!(!ctx.is_cancelled());
        assert!(ctx.cancelled().is_cancelled());
    }
}
