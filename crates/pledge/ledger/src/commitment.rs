//! Commitment ledger: create, revoke and read per-identity commitments.
//!
//! Per identity generation: `None -> Active -> Revoked`. An active commitment
//! whose revocation window has elapsed stays active for good. A new
//! generation may start only once the latest one is revoked.

use pledge_storage::{BatchOp, LedgerStore, StorageError, WriteBatch};
use pledge_types::{
    Address, Amount, Commitment, CommitmentStatus, GlobalConfig, HandleId, LedgerEvent, PoolTotals,
};
use tracing::{debug, info, warn};

use crate::error::{LedgerError, LedgerResult};
use crate::ledger::{audit, load_config, roll_back, PledgeLedger};
use crate::scheduler::open_period;
use crate::splitter;

impl<S: LedgerStore> PledgeLedger<S> {
    /// Pledge `amount` (plus the base fee) behind `commitment_text`.
    ///
    /// Preconditions are checked in a fixed order, each with its own error:
    /// paused, registration, existing active commitment, amount bounds, open
    /// period (restricted mode only), handle (when required), text bounds.
    pub fn create_commitment(
        &self,
        caller: &Address,
        commitment_text: &str,
        handle: HandleId,
        amount: Amount,
    ) -> LedgerResult<Commitment> {
        let mut session = self.session()?;
        let now = session.now;
        let store = &mut *session.store;
        let config = load_config(store)?;

        if config.paused {
            return Err(LedgerError::SystemPaused);
        }
        if store.identity(caller)?.is_none() {
            return Err(LedgerError::IdentityNotRegistered);
        }
        let previous = store.latest_commitment(caller)?;
        if previous.as_ref().is_some_and(|c| c.is_active) {
            return Err(LedgerError::AlreadyCommitted);
        }
        if amount < config.min_amount {
            return Err(LedgerError::AmountTooLow {
                amount,
                min: config.min_amount,
            });
        }
        if amount > config.max_amount {
            return Err(LedgerError::AmountTooHigh {
                amount,
                max: config.max_amount,
            });
        }
        let period = open_period(store, now)?;
        if config.restricted_mode && period.is_none() {
            return Err(LedgerError::OutsideActiveWindow);
        }
        if config.require_handle && handle.is_zero() {
            return Err(LedgerError::MissingHandle);
        }
        validate_text(commitment_text, &config)?;

        splitter::preflight(self.token(), &config, caller, amount)?;

        let commitment = Commitment {
            owner: *caller,
            amount,
            fee_paid: config.base_fee,
            commitment_text: commitment_text.to_string(),
            handle,
            created_at: now,
            is_active: true,
            period_index: period.as_ref().map(|p| p.index),
            generation: previous.map_or(1, |c| c.generation.saturating_add(1)),
            revoked_at: None,
        };

        let totals = store.pool_totals()?;
        let updated_totals = PoolTotals {
            pooled: totals
                .pooled
                .checked_add(amount)
                .ok_or(LedgerError::Overflow("pooled total"))?,
            fees_routed: totals.fees_routed.saturating_add(config.base_fee),
        };

        let mut effects = WriteBatch::new().with(BatchOp::PushCommitment(commitment.clone()));
        let mut undo = WriteBatch::new().with(BatchOp::PopCommitment(*caller));
        if let Some(period) = &period {
            let mut updated = period.clone();
            updated.record_commitment(amount, config.restricted_mode);
            effects.push(BatchOp::PutPeriod(updated));
            undo.push(BatchOp::PutPeriod(period.clone()));
        }
        effects.push(BatchOp::PutPoolTotals(updated_totals));
        undo.push(BatchOp::PutPoolTotals(totals));
        effects.push(audit(
            now,
            *caller,
            LedgerEvent::CommitmentCreated {
                identity: *caller,
                amount,
                fee: config.base_fee,
                treasury: config.treasury,
                handle,
                period_index: commitment.period_index,
                generation: commitment.generation,
                created_at: now,
            },
        ));
        undo.push(BatchOp::PopAudit);

        store.apply(effects)?;

        let settlement = match splitter::settle(self.token(), &config, caller, amount) {
            Ok(settlement) => settlement,
            Err(err) => {
                warn!(identity = %caller, amount, error = %err, "Settlement failed; rolling back commitment");
                roll_back(store, undo, "create_commitment");
                return Err(err);
            }
        };

        info!(
            identity = %caller,
            amount,
            fee = settlement.fee,
            generation = commitment.generation,
            period = ?commitment.period_index,
            "Commitment created"
        );
        Ok(commitment)
    }

    /// Cancel the caller's active commitment inside the revocation window and
    /// refund the pooled amount. The fee is not refunded and period
    /// aggregates are left as they are. Works while paused.
    pub fn revoke_commitment(&self, caller: &Address) -> LedgerResult<Commitment> {
        let mut session = self.session()?;
        let now = session.now;
        let store = &mut *session.store;
        let config = load_config(store)?;

        let active = store
            .latest_commitment(caller)?
            .filter(|c| c.is_active)
            .ok_or(LedgerError::NoActiveCommitment)?;
        if !active.is_revocable_at(now, config.revocation_window_secs) {
            debug!(identity = %caller, created_at = %active.created_at, "Revocation window closed");
            return Err(LedgerError::RevocationWindowExpired {
                deadline: active.revocation_deadline(config.revocation_window_secs),
            });
        }

        let totals = store.pool_totals()?;
        let updated_totals = PoolTotals {
            pooled: totals.pooled.checked_sub(active.amount).ok_or_else(|| {
                StorageError::InvariantViolation(format!(
                    "pooled total {} below active amount {}",
                    totals.pooled, active.amount
                ))
            })?,
            fees_routed: totals.fees_routed,
        };

        let mut revoked = active.clone();
        revoked.is_active = false;
        revoked.revoked_at = Some(now);

        // State first: a callback during the refund sees the commitment as revoked.
        store.apply(
            WriteBatch::new()
                .with(BatchOp::ReplaceLatestCommitment(revoked.clone()))
                .with(BatchOp::PutPoolTotals(updated_totals))
                .with(audit(
                    now,
                    *caller,
                    LedgerEvent::CommitmentRevoked {
                        identity: *caller,
                        refunded: revoked.amount,
                        generation: revoked.generation,
                        revoked_at: now,
                    },
                )),
        )?;

        if let Err(err) = splitter::refund(self.token(), &config, caller, active.amount) {
            warn!(identity = %caller, amount = active.amount, error = %err, "Refund failed; restoring commitment");
            roll_back(
                store,
                WriteBatch::new()
                    .with(BatchOp::ReplaceLatestCommitment(active))
                    .with(BatchOp::PutPoolTotals(totals))
                    .with(BatchOp::PopAudit),
                "revoke_commitment",
            );
            return Err(err);
        }

        info!(
            identity = %caller,
            refunded = revoked.amount,
            generation = revoked.generation,
            "Commitment revoked"
        );
        Ok(revoked)
    }

    pub fn has_active_commitment(&self, identity: &Address) -> LedgerResult<bool> {
        let session = self.session()?;
        Ok(session
            .store
            .latest_commitment(identity)?
            .is_some_and(|c| c.is_active))
    }

    /// Latest generation for `identity`, active or revoked.
    pub fn get_commitment(&self, identity: &Address) -> LedgerResult<Option<Commitment>> {
        let session = self.session()?;
        Ok(session.store.latest_commitment(identity)?)
    }

    /// Every generation for `identity`, oldest first.
    pub fn commitment_history(&self, identity: &Address) -> LedgerResult<Vec<Commitment>> {
        let session = self.session()?;
        Ok(session.store.commitment_history(identity)?)
    }

    pub fn commitment_status(&self, identity: &Address) -> LedgerResult<CommitmentStatus> {
        let session = self.session()?;
        let config = load_config(&*session.store)?;
        Ok(match session.store.latest_commitment(identity)? {
            Some(c) => c.status_at(session.now, config.revocation_window_secs),
            None => CommitmentStatus::None,
        })
    }
}

fn validate_text(text: &str, config: &GlobalConfig) -> LedgerResult<()> {
    if text.trim().is_empty() {
        return Err(LedgerError::EmptyCommitmentText);
    }
    if text.len() > config.max_text_len {
        return Err(LedgerError::CommitmentTextTooLong {
            len: text.len(),
            max: config.max_text_len,
        });
    }
    Ok(())
}
