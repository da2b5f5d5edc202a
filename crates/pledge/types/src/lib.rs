//! # pledge-types
//!
//! Shared vocabulary for the pledge ledger:
//!
//! - **Addresses**: 20-byte account identifiers and 32-byte opaque handle blobs
//! - **Time**: unix-second timestamps and the protocol constants built on them
//! - **Records**: identity records, commitments (one live generation per
//!   identity), periods with running aggregates, the global config singleton
//! - **Events**: the typed audit events appended by every write
//!
//! All amounts are in the token's smallest unit (6 decimals).

#![deny(unsafe_code)]

mod address;
mod commitment;
mod config;
mod event;
mod period;
mod time;

pub use address::{Address, AddressParseError, HandleId};
pub use commitment::{Commitment, CommitmentStatus, IdentityRecord};
pub use config::{Controls, GlobalConfig, PoolTotals};
pub use event::LedgerEvent;
pub use period::{Period, PeriodIndex};
pub use time::Timestamp;

/// Token amount in the smallest unit.
pub type Amount = u64;

/// Decimal places of the pledge token.
pub const TOKEN_DECIMALS: u32 = 6;

/// One whole token in smallest units.
pub const ONE_UNIT: Amount = 10u64.pow(TOKEN_DECIMALS);

/// Default minimum commitment (1 unit).
pub const DEFAULT_MIN_AMOUNT: Amount = ONE_UNIT;

/// Default maximum commitment (1,000,000 units).
pub const DEFAULT_MAX_AMOUNT: Amount = 1_000_000 * ONE_UNIT;

/// Default non-refundable fee per commitment (1 unit).
pub const DEFAULT_BASE_FEE: Amount = ONE_UNIT;

/// Revocation window after creation, in seconds.
pub const REVOCATION_WINDOW_SECS: u64 = 24 * 60 * 60;

/// Default upper bound on commitment text length, in bytes.
pub const DEFAULT_MAX_TEXT_LEN: usize = 280;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_unit_follows_token_decimals() {
        assert_eq!(ONE_UNIT, 1_000_000);
        assert_eq!(DEFAULT_MAX_AMOUNT / ONE_UNIT, 1_000_000);
    }
}
