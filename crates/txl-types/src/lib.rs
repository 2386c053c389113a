//! Foundation types for the TXL transaction ledger.
//!
//! Every other TXL crate depends on `txl-types`. The types here carry no
//! storage or ledger semantics; they only guarantee that values which reach
//! the ledger are well formed and round-trip exactly through their wire
//! representation.
//!
//! # Key Types
//!
//! - [`Timestamp`]: UTC instant with nanosecond precision, RFC-3339 on the wire
//! - [`Amount`]: non-negative decimal that preserves its scale (`100.00`)

pub mod amount;
pub mod error;
pub mod timestamp;

pub use amount::Amount;
pub use error::TypeError;
pub use timestamp::Timestamp;
