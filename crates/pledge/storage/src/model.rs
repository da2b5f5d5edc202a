use pledge_types::{
    Address, Commitment, GlobalConfig, IdentityRecord, LedgerEvent, Period, PoolTotals, Timestamp,
};
use serde::{Deserialize, Serialize};

use crate::{StorageError, StorageResult};

/// One table mutation inside a [`WriteBatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    /// Insert an identity record; conflicts if one exists
    PutIdentity(IdentityRecord),
    /// Start a new generation; the previous latest must be inactive
    PushCommitment(Commitment),
    /// Overwrite the latest generation of `commitment.owner`
    ReplaceLatestCommitment(Commitment),
    /// Drop the latest generation (only used to undo a `PushCommitment`)
    PopCommitment(Address),
    /// Overwrite an existing period or append the next index
    PutPeriod(Period),
    PutConfig(GlobalConfig),
    PutPoolTotals(PoolTotals),
    /// Append a hash-linked audit record for the write this batch carries
    AppendAudit(AuditAppend),
    /// Drop the newest audit record (only used to undo an `AppendAudit`)
    PopAudit,
}

/// Ordered set of mutations applied atomically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: BatchOp) -> &mut Self {
        self.ops.push(op);
        self
    }

    pub fn with(mut self, op: BatchOp) -> Self {
        self.ops.push(op);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn into_ops(self) -> Vec<BatchOp> {
        self.ops
    }
}

/// Audit append payload. Hashes and sequencing are assigned by storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditAppend {
    pub timestamp: Timestamp,
    pub actor: Address,
    pub event: LedgerEvent,
}

/// Persistent tamper-evident audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub event_id: String,
    pub sequence: u64,
    pub timestamp: Timestamp,
    pub actor: Address,
    pub event: LedgerEvent,
    pub previous_hash: Option<String>,
    pub hash: String,
}

pub(crate) fn compute_audit_hash(
    timestamp: Timestamp,
    actor: &Address,
    event: &LedgerEvent,
    previous_hash: Option<&str>,
    sequence: u64,
) -> StorageResult<String> {
    let serializable = serde_json::json!({
        "previous_hash": previous_hash,
        "sequence": sequence,
        "timestamp": timestamp,
        "actor": actor,
        "event": event,
    });
    let serialized = serde_json::to_vec(&serializable)
        .map_err(|e| StorageError::Serialization(e.to_string()))?;
    Ok(blake3::hash(&serialized).to_hex().to_string())
}

/// Recompute every link of an audit chain given in ascending sequence order.
pub fn verify_audit_chain(records: &[AuditRecord]) -> StorageResult<()> {
    let mut previous: Option<&str> = None;
    for (position, record) in records.iter().enumerate() {
        let expected_sequence = position as u64 + 1;
        if record.sequence != expected_sequence {
            return Err(StorageError::BrokenChain {
                sequence: record.sequence,
                reason: format!("expected sequence {}", expected_sequence),
            });
        }
        if record.previous_hash.as_deref() != previous {
            return Err(StorageError::BrokenChain {
                sequence: record.sequence,
                reason: "previous hash does not match".to_string(),
            });
        }
        let hash = compute_audit_hash(
            record.timestamp,
            &record.actor,
            &record.event,
            previous,
            record.sequence,
        )?;
        if hash != record.hash {
            return Err(StorageError::BrokenChain {
                sequence: record.sequence,
                reason: "content hash mismatch".to_string(),
            });
        }
        previous = Some(record.hash.as_str());
    }
    Ok(())
}
