//! Commitment period scheduler.
//!
//! Policy: `define_period` always appends a new period; it never reconfigures
//! an existing one (that is `adjust_current_period`'s job). When periods
//! overlap, the most recently defined period containing `now` is the open one.

use pledge_storage::{BatchOp, LedgerStore, WriteBatch};
use pledge_types::{Address, LedgerEvent, Period, PeriodIndex, Timestamp};
use tracing::info;

use crate::error::{LedgerError, LedgerResult};
use crate::ledger::{audit, load_config, require_admin, PledgeLedger};

impl<S: LedgerStore> PledgeLedger<S> {
    /// Append a period and set the global restricted-mode flag.
    pub fn define_period(
        &self,
        caller: &Address,
        start: Timestamp,
        end: Timestamp,
        restricted_mode: bool,
    ) -> LedgerResult<PeriodIndex> {
        let mut session = self.session()?;
        let now = session.now;
        let store = &mut *session.store;
        let mut config = load_config(store)?;

        require_admin(&config, caller)?;
        validate_range(start, end)?;

        let index = PeriodIndex(store.periods()?.len() as u64);
        config.restricted_mode = restricted_mode;
        store.apply(
            WriteBatch::new()
                .with(BatchOp::PutPeriod(Period::new(index, start, end, restricted_mode)))
                .with(BatchOp::PutConfig(config))
                .with(audit(
                    now,
                    *caller,
                    LedgerEvent::PeriodDefined {
                        index,
                        start_time: start,
                        end_time: end,
                        restricted_mode,
                    },
                )),
        )?;

        info!(index = %index, start = %start, end = %end, restricted_mode, "Period defined");
        Ok(index)
    }

    /// Move the boundaries of the open period, keeping its aggregates.
    pub fn adjust_current_period(
        &self,
        caller: &Address,
        new_start: Timestamp,
        new_end: Timestamp,
    ) -> LedgerResult<Period> {
        let mut session = self.session()?;
        let now = session.now;
        let store = &mut *session.store;
        let config = load_config(store)?;

        require_admin(&config, caller)?;
        validate_range(new_start, new_end)?;
        let mut period = open_period(store, now)?.ok_or(LedgerError::NoOpenPeriod)?;

        period.start_time = new_start;
        period.end_time = new_end;
        store.apply(
            WriteBatch::new()
                .with(BatchOp::PutPeriod(period.clone()))
                .with(audit(
                    now,
                    *caller,
                    LedgerEvent::PeriodAdjusted {
                        index: period.index,
                        start_time: new_start,
                        end_time: new_end,
                    },
                )),
        )?;

        info!(index = %period.index, start = %new_start, end = %new_end, "Period adjusted");
        Ok(period)
    }

    /// Index of the period containing now, or `None` outside every period.
    pub fn current_period_index(&self) -> LedgerResult<Option<PeriodIndex>> {
        let session = self.session()?;
        Ok(open_period(&*session.store, session.now)?.map(|p| p.index))
    }

    pub fn period_stats(&self, index: PeriodIndex) -> LedgerResult<Period> {
        let session = self.session()?;
        session
            .store
            .period(index)?
            .ok_or(LedgerError::UnknownPeriod(index))
    }

    pub fn periods(&self) -> LedgerResult<Vec<Period>> {
        let session = self.session()?;
        Ok(session.store.periods()?)
    }

    pub fn period_count(&self) -> LedgerResult<u64> {
        let session = self.session()?;
        Ok(session.store.periods()?.len() as u64)
    }
}

pub(crate) fn open_period<S: LedgerStore>(store: &S, now: Timestamp) -> LedgerResult<Option<Period>> {
    Ok(store.periods()?.into_iter().rev().find(|p| p.contains(now)))
}

fn validate_range(start: Timestamp, end: Timestamp) -> LedgerResult<()> {
    if end <= start {
        return Err(LedgerError::InvalidRange { start, end });
    }
    Ok(())
}
