use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Amount, Timestamp};

/// Index of a period; assigned in definition order starting at 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeriodIndex(pub u64);

impl fmt::Display for PeriodIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Administrator-defined commitment window with running aggregates.
///
/// Aggregates only ever grow; revocation does not decrement them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub index: PeriodIndex,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub total_commitments: u64,
    pub total_volume: Amount,
    pub restricted_mode_was_active: bool,
}

impl Period {
    pub fn new(index: PeriodIndex, start_time: Timestamp, end_time: Timestamp, restricted: bool) -> Self {
        Self {
            index,
            start_time,
            end_time,
            total_commitments: 0,
            total_volume: 0,
            restricted_mode_was_active: restricted,
        }
    }

    /// `start_time <= now <= end_time`.
    pub fn contains(&self, now: Timestamp) -> bool {
        self.start_time <= now && now <= self.end_time
    }

    /// Fold one commitment into the aggregates.
    pub fn record_commitment(&mut self, amount: Amount, restricted_mode: bool) {
        self.total_commitments = self.total_commitments.saturating_add(1);
        self.total_volume = self.total_volume.saturating_add(amount);
        self.restricted_mode_was_active |= restricted_mode;
    }
}
