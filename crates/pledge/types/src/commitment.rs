use serde::{Deserialize, Serialize};

use crate::{Address, Amount, HandleId, PeriodIndex, Timestamp};

/// One-time identity record. Written once by the identity itself, never
/// mutated or removed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub identity: Address,
    /// Self-declared timestamp; never later than the time it was recorded
    pub registered_at: Timestamp,
    /// When the record was written
    pub recorded_at: Timestamp,
}

/// A commitment generation.
///
/// An identity holds at most one active generation. Revoked generations stay
/// in the history; a new generation may start once the latest is revoked.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commitment {
    pub owner: Address,
    /// Pooled (refundable) amount in smallest units; the fee is not included
    pub amount: Amount,
    /// Fee routed to the treasury when this generation was created
    pub fee_paid: Amount,
    pub commitment_text: String,
    pub handle: HandleId,
    pub created_at: Timestamp,
    pub is_active: bool,
    /// Period open at creation, if any
    pub period_index: Option<PeriodIndex>,
    /// 1-based generation counter for this identity
    pub generation: u32,
    pub revoked_at: Option<Timestamp>,
}

impl Commitment {
    /// Last instant at which revocation is still accepted.
    pub fn revocation_deadline(&self, window_secs: u64) -> Timestamp {
        self.created_at.plus_secs(window_secs)
    }

    /// `now - created_at <= window`.
    pub fn is_revocable_at(&self, now: Timestamp, window_secs: u64) -> bool {
        self.is_active && now.secs_since(self.created_at) <= window_secs
    }

    pub fn status_at(&self, now: Timestamp, window_secs: u64) -> CommitmentStatus {
        if self.is_active {
            CommitmentStatus::Active {
                revocable: self.is_revocable_at(now, window_secs),
            }
        } else {
            CommitmentStatus::Revoked
        }
    }
}

/// Per-identity lifecycle state of the latest generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CommitmentStatus {
    /// No generation has ever been created
    None,
    /// Live; `revocable` is false once the window has elapsed (final)
    Active { revocable: bool },
    /// Cancelled inside the window
    Revoked,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::REVOCATION_WINDOW_SECS;

    fn sample(created_at: u64) -> Commitment {
        Commitment {
            owner: Address::derive("alice"),
            amount: 10_000_000,
            fee_paid: 1_000_000,
            commitment_text: "walk every day".into(),
            handle: HandleId::from_handle("alice"),
            created_at: Timestamp::from_secs(created_at),
            is_active: true,
            period_index: Some(PeriodIndex(0)),
            generation: 1,
            revoked_at: None,
        }
    }

    #[test]
    fn window_is_inclusive() {
        let c = sample(1_000);
        let edge = Timestamp::from_secs(1_000 + REVOCATION_WINDOW_SECS);
        assert!(c.is_revocable_at(edge, REVOCATION_WINDOW_SECS));
        assert!(!c.is_revocable_at(edge.plus_secs(1), REVOCATION_WINDOW_SECS));
        assert_eq!(c.revocation_deadline(REVOCATION_WINDOW_SECS), edge);
    }

    #[test]
    fn status_reflects_activity_and_window() {
        let mut c = sample(0);
        assert_eq!(
            c.status_at(Timestamp::from_secs(10), REVOCATION_WINDOW_SECS),
            CommitmentStatus::Active { revocable: true }
        );
        assert_eq!(
            c.status_at(Timestamp::from_secs(REVOCATION_WINDOW_SECS + 1), REVOCATION_WINDOW_SECS),
            CommitmentStatus::Active { revocable: false }
        );
        c.is_active = false;
        assert_eq!(
            c.status_at(Timestamp::from_secs(10), REVOCATION_WINDOW_SECS),
            CommitmentStatus::Revoked
        );
    }
}
