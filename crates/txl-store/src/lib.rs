//! Versioned key-value storage for the TXL ledger.
//!
//! The ledger engine never talks to a concrete database. It consumes the
//! [`VersionedStore`] capability: latest-value reads, writes that append to a
//! per-key revision history, history retrieval in commit order, and a
//! document query over JSON values.
//!
//! # Storage Backends
//!
//! - [`InMemoryVersionedStore`]: `HashMap`-based store for tests and embedding
//! - [`JournalStore`]: append-only, CRC-framed journal file replayed on open
//!
//! # Design Rules
//!
//! 1. Every `put` appends a revision; nothing is ever rewritten in place.
//! 2. History is returned oldest first, in commit order.
//! 3. An absent key is `Ok(None)`, never an error.
//! 4. Queries see only the latest revision of each key.
//! 5. The store never interprets values except to evaluate a [`Predicate`].
//! 6. All I/O errors are propagated, never silently ignored.
//! 7. A journal file is owned by one open store at a time.

pub mod error;
pub mod journal;
pub mod memory;
pub mod predicate;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use journal::{JournalConfig, JournalStore, SyncMode};
pub use memory::InMemoryVersionedStore;
pub use predicate::Predicate;
pub use traits::{QueryHit, Revision, VersionedStore};
