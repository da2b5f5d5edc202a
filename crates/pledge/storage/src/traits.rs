use pledge_types::{Address, Commitment, GlobalConfig, IdentityRecord, Period, PeriodIndex, PoolTotals};

use crate::model::{AuditRecord, WriteBatch};
use crate::StorageResult;

/// Generic query window for paged reads.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryWindow {
    pub limit: usize,
    pub offset: usize,
}

/// Persisted ledger state.
///
/// Reads take `&self`; every mutation goes through [`LedgerStore::apply`],
/// which must either apply the whole batch or leave the store untouched.
pub trait LedgerStore: Send {
    fn identity(&self, identity: &Address) -> StorageResult<Option<IdentityRecord>>;

    /// Latest commitment generation for `identity`.
    fn latest_commitment(&self, identity: &Address) -> StorageResult<Option<Commitment>>;

    /// Every generation for `identity`, oldest first.
    fn commitment_history(&self, identity: &Address) -> StorageResult<Vec<Commitment>>;

    fn period(&self, index: PeriodIndex) -> StorageResult<Option<Period>>;

    /// All periods in index order.
    fn periods(&self) -> StorageResult<Vec<Period>>;

    /// `None` until the ledger has been initialised.
    fn config(&self) -> StorageResult<Option<GlobalConfig>>;

    fn pool_totals(&self) -> StorageResult<PoolTotals>;

    /// Apply every operation or none. Audit records travel in the same
    /// batch as the state they describe.
    fn apply(&mut self, batch: WriteBatch) -> StorageResult<()>;

    /// Read events newest-first.
    fn list_audit(&self, window: QueryWindow) -> StorageResult<Vec<AuditRecord>>;

    fn latest_audit_hash(&self) -> StorageResult<Option<String>>;
}
