use std::sync::{Arc, Mutex, MutexGuard};

use pledge_storage::{
    verify_audit_chain, AuditAppend, AuditRecord, BatchOp, InMemoryLedgerStore, LedgerStore,
    QueryWindow, StorageError, WriteBatch,
};
use pledge_token::FungibleToken;
use pledge_types::{Address, Amount, GlobalConfig, LedgerEvent, PoolTotals, Timestamp};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::clock::Clock;
use crate::error::{LedgerError, LedgerResult};
use crate::guard::{Entered, ReentrancyGuard};
use crate::settings::LedgerSettings;

/// The pledge ledger.
///
/// One store behind one mutex: every call, read or write, runs alone and in a
/// single total order. Writes follow checks, then effects (one atomic batch),
/// then token interactions; a failed interaction is undone with a
/// compensating batch before the error is returned.
pub struct PledgeLedger<S: LedgerStore = InMemoryLedgerStore> {
    store: Mutex<S>,
    token: Arc<dyn FungibleToken>,
    clock: Arc<dyn Clock>,
    guard: ReentrancyGuard,
}

/// Exclusive access to the store for one call.
pub(crate) struct Session<'a, S> {
    // Released before the store lock.
    _entered: Entered<'a>,
    pub(crate) store: MutexGuard<'a, S>,
    pub(crate) now: Timestamp,
}

/// Pool solvency snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Solvency {
    /// Sum of amounts the ledger could be asked to refund
    pub pooled: Amount,
    /// Token balance actually held in custody
    pub custody_balance: Amount,
    pub fees_routed: Amount,
    pub solvent: bool,
}

impl<S: LedgerStore> PledgeLedger<S> {
    /// Open a ledger over `store`.
    ///
    /// A fresh store is initialised from `settings`; a store that already
    /// holds a config keeps it, and only the token binding is checked.
    pub fn new(
        settings: LedgerSettings,
        mut store: S,
        token: Arc<dyn FungibleToken>,
        clock: Arc<dyn Clock>,
    ) -> LedgerResult<Self> {
        settings.validate()?;

        match store.config()? {
            Some(existing) => {
                if existing.token != token.address() {
                    return Err(LedgerError::InvalidSettings(format!(
                        "store is bound to token {}, got {}",
                        existing.token,
                        token.address()
                    )));
                }
                info!(admin = %existing.admin, paused = existing.paused, "Resumed pledge ledger");
            }
            None => {
                if settings.token != token.address() {
                    return Err(LedgerError::InvalidSettings(format!(
                        "settings name token {}, got {}",
                        settings.token,
                        token.address()
                    )));
                }
                store.apply(WriteBatch::new().with(BatchOp::PutConfig(settings.global_config())))?;
                info!(
                    admin = %settings.admin,
                    treasury = %settings.treasury,
                    base_fee = settings.base_fee,
                    min_amount = settings.min_amount,
                    max_amount = settings.max_amount,
                    "Initialised pledge ledger"
                );
            }
        }

        Ok(Self {
            store: Mutex::new(store),
            token,
            clock,
            guard: ReentrancyGuard::new(),
        })
    }

    pub(crate) fn session(&self) -> LedgerResult<Session<'_, S>> {
        self.guard.check()?;
        let store = self
            .store
            .lock()
            .map_err(|_| StorageError::Backend("ledger store lock poisoned".to_string()))?;
        let entered = self.guard.enter()?;
        Ok(Session {
            _entered: entered,
            store,
            now: self.clock.now(),
        })
    }

    pub(crate) fn token(&self) -> &dyn FungibleToken {
        self.token.as_ref()
    }

    /// Current time as the ledger sees it.
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub fn config(&self) -> LedgerResult<GlobalConfig> {
        let session = self.session()?;
        load_config(&*session.store)
    }

    pub fn pool_totals(&self) -> LedgerResult<PoolTotals> {
        let session = self.session()?;
        Ok(session.store.pool_totals()?)
    }

    /// Compare what the ledger owes against what custody holds.
    pub fn solvency(&self) -> LedgerResult<Solvency> {
        let session = self.session()?;
        let config = load_config(&*session.store)?;
        let totals = session.store.pool_totals()?;
        let custody_balance = self.token.balance_of(&config.custody)?;
        Ok(Solvency {
            pooled: totals.pooled,
            custody_balance,
            fees_routed: totals.fees_routed,
            solvent: totals.pooled <= custody_balance,
        })
    }

    /// Audit records, newest first.
    pub fn audit_log(&self, window: QueryWindow) -> LedgerResult<Vec<AuditRecord>> {
        let session = self.session()?;
        Ok(session.store.list_audit(window)?)
    }

    /// Recompute every audit hash link.
    pub fn verify_audit_chain(&self) -> LedgerResult<usize> {
        let session = self.session()?;
        let mut records = session.store.list_audit(QueryWindow::default())?;
        records.reverse();
        verify_audit_chain(&records)?;
        Ok(records.len())
    }
}

pub(crate) fn load_config<S: LedgerStore>(store: &S) -> LedgerResult<GlobalConfig> {
    store
        .config()?
        .ok_or_else(|| LedgerError::from(StorageError::NotFound("global config".to_string())))
}

pub(crate) fn require_admin(config: &GlobalConfig, caller: &Address) -> LedgerResult<()> {
    if config.admin != *caller {
        return Err(LedgerError::Unauthorized);
    }
    Ok(())
}

/// Audit record for a write, applied in the same batch as its effects.
pub(crate) fn audit(now: Timestamp, actor: Address, event: LedgerEvent) -> BatchOp {
    BatchOp::AppendAudit(AuditAppend {
        timestamp: now,
        actor,
        event,
    })
}

/// Apply a compensating batch after a failed interaction.
pub(crate) fn roll_back<S: LedgerStore>(store: &mut S, batch: WriteBatch, op: &'static str) {
    if let Err(err) = store.apply(batch) {
        error!(op, error = %err, "Compensating batch failed; ledger state needs inspection");
    }
}
