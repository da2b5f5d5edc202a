//! # pledge-ledger
//!
//! Token-denominated commitments with a non-refundable fee, a refundable
//! pool and a fixed revocation window.
//!
//! Components, leaf first:
//!
//! - **Identity registry** (`register_identity`, `is_registered`): one
//!   immutable timestamp per identity, required before committing
//! - **Period scheduler** (`define_period`, `adjust_current_period`,
//!   `current_period_index`, `period_stats`): admin-defined windows with
//!   append-only aggregates
//! - **Fee splitter**: pool leg into custody, fee leg to the treasury
//! - **Commitment ledger** (`create_commitment`, `revoke_commitment`,
//!   `has_active_commitment`, `get_commitment`): at most one active
//!   commitment per identity; revocation only within the window
//! - **Admin control plane** (`set_controls`, `rotate_treasury`, `pause`,
//!   `unpause`, ...): gated to the configured administrator
//!
//! All of them are methods on [`PledgeLedger`], which serialises every call
//! behind one lock and rejects same-thread re-entry from token callbacks.

#![deny(unsafe_code)]

mod admin;
mod clock;
mod commitment;
mod error;
mod guard;
mod identity;
mod ledger;
mod scheduler;
mod settings;
mod splitter;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ErrorCategory, LedgerError, LedgerResult};
pub use guard::{Entered, ReentrancyGuard};
pub use ledger::{PledgeLedger, Solvency};
pub use settings::LedgerSettings;
pub use splitter::Settlement;

pub use pledge_storage::{AuditRecord, InMemoryLedgerStore, LedgerStore, QueryWindow};
pub use pledge_token::{FungibleToken, InMemoryToken, TokenError, TransferHook, TransferReceipt};
pub use pledge_types::*;
