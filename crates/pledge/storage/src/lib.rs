//! Pledge ledger storage.
//!
//! Four logical tables and one log:
//! - identity registry (keyed by address, write-once)
//! - commitment ledger (keyed by address, generations retained)
//! - period list (indexed, append or overwrite-in-place)
//! - global config (single row) and pool totals
//! - append-only, BLAKE3 hash-linked audit log
//!
//! Writes go through [`WriteBatch`], which a backend applies all-or-nothing.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

mod error;
pub mod memory;
mod model;
mod traits;

pub use error::{StorageError, StorageResult};
pub use memory::InMemoryLedgerStore;
pub use model::{verify_audit_chain, AuditAppend, AuditRecord, BatchOp, WriteBatch};
pub use traits::{LedgerStore, QueryWindow};
