use serde::{Deserialize, Serialize};

use crate::{Address, Amount, Controls, HandleId, PeriodIndex, Timestamp};

/// Audit event appended after every successful write.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LedgerEvent {
    IdentityRegistered {
        identity: Address,
        registered_at: Timestamp,
    },
    CommitmentCreated {
        identity: Address,
        amount: Amount,
        fee: Amount,
        treasury: Address,
        handle: HandleId,
        period_index: Option<PeriodIndex>,
        generation: u32,
        created_at: Timestamp,
    },
    CommitmentRevoked {
        identity: Address,
        refunded: Amount,
        generation: u32,
        revoked_at: Timestamp,
    },
    PeriodDefined {
        index: PeriodIndex,
        start_time: Timestamp,
        end_time: Timestamp,
        restricted_mode: bool,
    },
    PeriodAdjusted {
        index: PeriodIndex,
        start_time: Timestamp,
        end_time: Timestamp,
    },
    ControlsSet {
        controls: Controls,
    },
    TreasuryRotated {
        previous: Address,
        current: Address,
    },
    BaseFeeSet {
        previous: Amount,
        current: Amount,
    },
    AdministrationTransferred {
        previous: Address,
        current: Address,
    },
    Paused {
        reason: String,
    },
    Unpaused {
        reason: String,
    },
}

impl LedgerEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerEvent::IdentityRegistered { .. } => "identity_registered",
            LedgerEvent::CommitmentCreated { .. } => "commitment_created",
            LedgerEvent::CommitmentRevoked { .. } => "commitment_revoked",
            LedgerEvent::PeriodDefined { .. } => "period_defined",
            LedgerEvent::PeriodAdjusted { .. } => "period_adjusted",
            LedgerEvent::ControlsSet { .. } => "controls_set",
            LedgerEvent::TreasuryRotated { .. } => "treasury_rotated",
            LedgerEvent::BaseFeeSet { .. } => "base_fee_set",
            LedgerEvent::AdministrationTransferred { .. } => "administration_transferred",
            LedgerEvent::Paused { .. } => "paused",
            LedgerEvent::Unpaused { .. } => "unpaused",
        }
    }
}
