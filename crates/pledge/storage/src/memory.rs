//! In-memory reference implementation of [`LedgerStore`].
//!
//! Deterministic and test-friendly. Batches are applied op by op with an undo
//! log; a failing op rolls back everything applied before it.

use std::collections::HashMap;

use pledge_types::{
    Address, Commitment, GlobalConfig, IdentityRecord, Period, PeriodIndex, PoolTotals,
};
use uuid::Uuid;

use crate::model::{compute_audit_hash, AuditAppend, AuditRecord, BatchOp, WriteBatch};
use crate::traits::{LedgerStore, QueryWindow};
use crate::{StorageError, StorageResult};

/// In-memory ledger store.
#[derive(Default)]
pub struct InMemoryLedgerStore {
    identities: HashMap<Address, IdentityRecord>,
    commitments: HashMap<Address, Vec<Commitment>>,
    periods: Vec<Period>,
    config: Option<GlobalConfig>,
    pool: PoolTotals,
    audits: Vec<AuditRecord>,
}

enum Undo {
    RemoveIdentity(Address),
    PopCommitment(Address),
    PushCommitment(Commitment),
    RestoreLatest(Commitment),
    RestorePeriod(Period),
    TruncatePeriods(usize),
    RestoreConfig(Option<GlobalConfig>),
    RestorePool(PoolTotals),
    PopAudit,
    PushAudit(AuditRecord),
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn apply_op(&mut self, op: BatchOp) -> StorageResult<Undo> {
        match op {
            BatchOp::PutIdentity(record) => {
                if self.identities.contains_key(&record.identity) {
                    return Err(StorageError::Conflict(format!(
                        "identity {} already recorded",
                        record.identity
                    )));
                }
                let identity = record.identity;
                self.identities.insert(identity, record);
                Ok(Undo::RemoveIdentity(identity))
            }
            BatchOp::PushCommitment(commitment) => {
                let owner = commitment.owner;
                let generations = self.commitments.entry(owner).or_default();
                if generations.last().is_some_and(|latest| latest.is_active) {
                    return Err(StorageError::InvariantViolation(format!(
                        "{} already has an active commitment",
                        owner
                    )));
                }
                generations.push(commitment);
                Ok(Undo::PopCommitment(owner))
            }
            BatchOp::ReplaceLatestCommitment(commitment) => {
                let owner = commitment.owner;
                let latest = self
                    .commitments
                    .get_mut(&owner)
                    .and_then(|generations| generations.last_mut())
                    .ok_or_else(|| StorageError::NotFound(format!("commitment for {}", owner)))?;
                if latest.generation != commitment.generation {
                    return Err(StorageError::InvariantViolation(format!(
                        "generation mismatch for {}: stored {}, given {}",
                        owner, latest.generation, commitment.generation
                    )));
                }
                let previous = std::mem::replace(latest, commitment);
                Ok(Undo::RestoreLatest(previous))
            }
            BatchOp::PopCommitment(owner) => {
                let popped = self
                    .commitments
                    .get_mut(&owner)
                    .and_then(|generations| generations.pop())
                    .ok_or_else(|| StorageError::NotFound(format!("commitment for {}", owner)))?;
                Ok(Undo::PushCommitment(popped))
            }
            BatchOp::PutPeriod(period) => {
                let slot = usize::try_from(period.index.0)
                    .map_err(|_| StorageError::InvalidInput(format!("period {}", period.index)))?;
                let len = self.periods.len();
                if slot < len {
                    let previous = std::mem::replace(&mut self.periods[slot], period);
                    Ok(Undo::RestorePeriod(previous))
                } else if slot == len {
                    self.periods.push(period);
                    Ok(Undo::TruncatePeriods(len))
                } else {
                    Err(StorageError::InvalidInput(format!(
                        "period {} would leave a gap after {} periods",
                        period.index, len
                    )))
                }
            }
            BatchOp::PutConfig(config) => {
                let previous = self.config.replace(config);
                Ok(Undo::RestoreConfig(previous))
            }
            BatchOp::PutPoolTotals(totals) => {
                let previous = std::mem::replace(&mut self.pool, totals);
                Ok(Undo::RestorePool(previous))
            }
            BatchOp::AppendAudit(event) => {
                self.push_audit(event)?;
                Ok(Undo::PopAudit)
            }
            BatchOp::PopAudit => {
                let popped = self
                    .audits
                    .pop()
                    .ok_or_else(|| StorageError::NotFound("audit record".to_string()))?;
                Ok(Undo::PushAudit(popped))
            }
        }
    }

    fn undo(&mut self, undo: Undo) {
        match undo {
            Undo::RemoveIdentity(identity) => {
                self.identities.remove(&identity);
            }
            Undo::PopCommitment(owner) => {
                if let Some(generations) = self.commitments.get_mut(&owner) {
                    generations.pop();
                    if generations.is_empty() {
                        self.commitments.remove(&owner);
                    }
                }
            }
            Undo::PushCommitment(commitment) => {
                self.commitments
                    .entry(commitment.owner)
                    .or_default()
                    .push(commitment);
            }
            Undo::RestoreLatest(commitment) => {
                if let Some(latest) = self
                    .commitments
                    .get_mut(&commitment.owner)
                    .and_then(|generations| generations.last_mut())
                {
                    *latest = commitment;
                }
            }
            Undo::RestorePeriod(period) => {
                if let Some(slot) = usize::try_from(period.index.0)
                    .ok()
                    .and_then(|i| self.periods.get_mut(i))
                {
                    *slot = period;
                }
            }
            Undo::TruncatePeriods(len) => self.periods.truncate(len),
            Undo::RestoreConfig(config) => self.config = config,
            Undo::RestorePool(totals) => self.pool = totals,
            Undo::PopAudit => {
                self.audits.pop();
            }
            Undo::PushAudit(record) => self.audits.push(record),
        }
    }

    fn push_audit(&mut self, event: AuditAppend) -> StorageResult<()> {
        let previous_hash = self.audits.last().map(|e| e.hash.clone());
        let sequence = self.audits.len() as u64 + 1;
        let hash = compute_audit_hash(
            event.timestamp,
            &event.actor,
            &event.event,
            previous_hash.as_deref(),
            sequence,
        )?;

        self.audits.push(AuditRecord {
            event_id: format!("audit-{}", Uuid::new_v4()),
            sequence,
            timestamp: event.timestamp,
            actor: event.actor,
            event: event.event,
            previous_hash,
            hash,
        });
        Ok(())
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn identity(&self, identity: &Address) -> StorageResult<Option<IdentityRecord>> {
        Ok(self.identities.get(identity).cloned())
    }

    fn latest_commitment(&self, identity: &Address) -> StorageResult<Option<Commitment>> {
        Ok(self
            .commitments
            .get(identity)
            .and_then(|generations| generations.last())
            .cloned())
    }

    fn commitment_history(&self, identity: &Address) -> StorageResult<Vec<Commitment>> {
        Ok(self.commitments.get(identity).cloned().unwrap_or_default())
    }

    fn period(&self, index: PeriodIndex) -> StorageResult<Option<Period>> {
        Ok(usize::try_from(index.0)
            .ok()
            .and_then(|i| self.periods.get(i))
            .cloned())
    }

    fn periods(&self) -> StorageResult<Vec<Period>> {
        Ok(self.periods.clone())
    }

    fn config(&self) -> StorageResult<Option<GlobalConfig>> {
        Ok(self.config.clone())
    }

    fn pool_totals(&self) -> StorageResult<PoolTotals> {
        Ok(self.pool)
    }

    fn apply(&mut self, batch: WriteBatch) -> StorageResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let mut applied: Vec<Undo> = Vec::with_capacity(batch.len());
        for op in batch.into_ops() {
            match self.apply_op(op) {
                Ok(undo) => applied.push(undo),
                Err(err) => {
                    for undo in applied.into_iter().rev() {
                        self.undo(undo);
                    }
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    fn list_audit(&self, window: QueryWindow) -> StorageResult<Vec<AuditRecord>> {
        let mut values = self.audits.clone();
        values.sort_by(|a, b| b.sequence.cmp(&a.sequence));
        Ok(apply_window(values, window))
    }

    fn latest_audit_hash(&self) -> StorageResult<Option<String>> {
        Ok(self.audits.last().map(|e| e.hash.clone()))
    }
}

fn apply_window<T>(items: Vec<T>, window: QueryWindow) -> Vec<T> {
    let iter = items.into_iter().skip(window.offset);
    if window.limit == 0 {
        iter.collect()
    } else {
        iter.take(window.limit).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verify_audit_chain;
    use pledge_types::{HandleId, LedgerEvent, Timestamp};

    fn commitment(owner: Address, generation: u32, active: bool) -> Commitment {
        Commitment {
            owner,
            amount: 5_000_000,
            fee_paid: 1_000_000,
            commitment_text: "read daily".to_string(),
            handle: HandleId::from_handle("owner"),
            created_at: Timestamp::from_secs(1_000),
            is_active: active,
            period_index: None,
            generation,
            revoked_at: None,
        }
    }

    fn period(index: u64) -> Period {
        Period::new(
            PeriodIndex(index),
            Timestamp::from_secs(0),
            Timestamp::from_secs(100),
            false,
        )
    }

    #[test]
    fn failing_op_rolls_back_whole_batch() {
        let mut store = InMemoryLedgerStore::new();
        let owner = Address::derive("alice");

        let batch = WriteBatch::new()
            .with(BatchOp::PushCommitment(commitment(owner, 1, true)))
            .with(BatchOp::PutPoolTotals(PoolTotals {
                pooled: 5_000_000,
                fees_routed: 1_000_000,
            }))
            .with(BatchOp::PutPeriod(period(3)));

        let result = store.apply(batch);
        assert!(matches!(result, Err(StorageError::InvalidInput(_))));
        assert_eq!(store.latest_commitment(&owner).unwrap(), None);
        assert_eq!(store.pool_totals().unwrap(), PoolTotals::default());
        assert!(store.periods().unwrap().is_empty());
    }

    #[test]
    fn cannot_push_over_active_generation() {
        let mut store = InMemoryLedgerStore::new();
        let owner = Address::derive("alice");
        store
            .apply(WriteBatch::new().with(BatchOp::PushCommitment(commitment(owner, 1, true))))
            .unwrap();

        let result =
            store.apply(WriteBatch::new().with(BatchOp::PushCommitment(commitment(owner, 2, true))));
        assert!(matches!(result, Err(StorageError::InvariantViolation(_))));
        assert_eq!(store.commitment_history(&owner).unwrap().len(), 1);
    }

    #[test]
    fn generations_are_retained() {
        let mut store = InMemoryLedgerStore::new();
        let owner = Address::derive("alice");
        store
            .apply(WriteBatch::new().with(BatchOp::PushCommitment(commitment(owner, 1, true))))
            .unwrap();
        store
            .apply(
                WriteBatch::new()
                    .with(BatchOp::ReplaceLatestCommitment(commitment(owner, 1, false)))
                    .with(BatchOp::PushCommitment(commitment(owner, 2, true))),
            )
            .unwrap();

        let history = store.commitment_history(&owner).unwrap();
        assert_eq!(history.len(), 2);
        assert!(!history[0].is_active);
        assert_eq!(store.latest_commitment(&owner).unwrap().unwrap().generation, 2);
    }

    #[test]
    fn identity_is_write_once() {
        let mut store = InMemoryLedgerStore::new();
        let record = IdentityRecord {
            identity: Address::derive("alice"),
            registered_at: Timestamp::from_secs(10),
            recorded_at: Timestamp::from_secs(20),
        };
        store
            .apply(WriteBatch::new().with(BatchOp::PutIdentity(record.clone())))
            .unwrap();
        let again = store.apply(WriteBatch::new().with(BatchOp::PutIdentity(record)));
        assert!(matches!(again, Err(StorageError::Conflict(_))));
    }

    #[test]
    fn periods_append_in_order_and_overwrite_in_place() {
        let mut store = InMemoryLedgerStore::new();
        store
            .apply(WriteBatch::new().with(BatchOp::PutPeriod(period(0))))
            .unwrap();
        let mut updated = period(0);
        updated.total_commitments = 4;
        store
            .apply(WriteBatch::new().with(BatchOp::PutPeriod(updated)))
            .unwrap();
        assert_eq!(store.periods().unwrap().len(), 1);
        assert_eq!(
            store.period(PeriodIndex(0)).unwrap().unwrap().total_commitments,
            4
        );
    }

    #[test]
    fn audit_chain_hashes_are_linked() {
        let mut store = InMemoryLedgerStore::new();
        let actor = Address::derive("admin");
        store
            .apply(WriteBatch::new().with(audit(1, LedgerEvent::Paused {
                reason: "maintenance".to_string(),
            })))
            .unwrap();
        store
            .apply(WriteBatch::new().with(audit(2, LedgerEvent::Unpaused {
                reason: "done".to_string(),
            })))
            .unwrap();

        let newest_first = store.list_audit(QueryWindow::default()).unwrap();
        let (second, first) = (&newest_first[0], &newest_first[1]);
        assert_eq!(second.sequence, 2);
        assert_eq!(second.actor, actor);
        assert_eq!(second.previous_hash, Some(first.hash.clone()));
        assert_eq!(store.latest_audit_hash().unwrap(), Some(second.hash.clone()));

        let mut ascending = newest_first;
        ascending.reverse();
        verify_audit_chain(&ascending).unwrap();

        ascending[0].event = LedgerEvent::Paused {
            reason: "rewritten".to_string(),
        };
        assert!(matches!(
            verify_audit_chain(&ascending),
            Err(StorageError::BrokenChain { sequence: 1, .. })
        ));
    }

    #[test]
    fn audit_record_rolls_back_with_its_batch() {
        let mut store = InMemoryLedgerStore::new();
        let owner = Address::derive("alice");

        let result = store.apply(
            WriteBatch::new()
                .with(BatchOp::PushCommitment(commitment(owner, 1, true)))
                .with(audit(1, LedgerEvent::Paused {
                    reason: "first".to_string(),
                }))
                .with(BatchOp::PutPeriod(period(5))),
        );
        assert!(result.is_err());
        assert!(store.list_audit(QueryWindow::default()).unwrap().is_empty());
        assert_eq!(store.latest_commitment(&owner).unwrap(), None);
    }

    #[test]
    fn pop_audit_undoes_the_newest_record() {
        let mut store = InMemoryLedgerStore::new();
        store
            .apply(WriteBatch::new().with(audit(1, LedgerEvent::Paused {
                reason: "kept".to_string(),
            })))
            .unwrap();
        let kept = store.latest_audit_hash().unwrap();
        store
            .apply(WriteBatch::new().with(audit(2, LedgerEvent::Unpaused {
                reason: "dropped".to_string(),
            })))
            .unwrap();

        store.apply(WriteBatch::new().with(BatchOp::PopAudit)).unwrap();
        assert_eq!(store.latest_audit_hash().unwrap(), kept);

        // a failing batch puts a popped record back
        let failing = WriteBatch::new()
            .with(BatchOp::PopAudit)
            .with(BatchOp::PopCommitment(Address::derive("nobody")));
        assert!(matches!(store.apply(failing), Err(StorageError::NotFound(_))));
        assert_eq!(store.latest_audit_hash().unwrap(), kept);
    }

    fn audit(at: u64, event: LedgerEvent) -> BatchOp {
        BatchOp::AppendAudit(AuditAppend {
            timestamp: Timestamp::from_secs(at),
            actor: Address::derive("admin"),
            event,
        })
    }
}
