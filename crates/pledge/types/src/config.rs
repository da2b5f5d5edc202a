use serde::{Deserialize, Serialize};

use crate::{Address, Amount};

/// Global configuration singleton. Written only by the admin control plane.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Privileged caller for every admin operation
    pub admin: Address,
    /// Program custody address holding pooled funds
    pub custody: Address,
    /// Token in which commitments are denominated
    pub token: Address,
    /// Fee destination
    pub treasury: Address,
    pub base_fee: Amount,
    pub min_amount: Amount,
    pub max_amount: Amount,
    pub paused: bool,
    /// Commitments only inside an open period
    pub restricted_mode: bool,
    /// Reject commitments whose handle identifier is all zeros
    pub require_handle: bool,
    pub max_text_len: usize,
    pub revocation_window_secs: u64,
}

impl GlobalConfig {
    pub fn controls(&self) -> Controls {
        Controls {
            restricted_mode: self.restricted_mode,
            require_handle: self.require_handle,
            min_amount: self.min_amount,
            max_amount: self.max_amount,
        }
    }
}

/// Fields updated together by `set_controls`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Controls {
    pub restricted_mode: bool,
    pub require_handle: bool,
    pub min_amount: Amount,
    pub max_amount: Amount,
}

/// Running pool accounting kept alongside the records.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolTotals {
    /// Sum of amounts of active commitments (what could be refunded)
    pub pooled: Amount,
    /// Fees routed to any treasury since genesis
    pub fees_routed: Amount,
}
