//! Identity registry: a one-time, immutable timestamp per identity.

use pledge_storage::{BatchOp, LedgerStore, WriteBatch};
use pledge_types::{Address, IdentityRecord, LedgerEvent, Timestamp};
use tracing::{debug, info};

use crate::error::{LedgerError, LedgerResult};
use crate::ledger::{audit, PledgeLedger};

impl<S: LedgerStore> PledgeLedger<S> {
    /// Record `timestamp` for `caller`. Fails if a record exists or the
    /// timestamp is in the future.
    pub fn register_identity(
        &self,
        caller: &Address,
        timestamp: Timestamp,
    ) -> LedgerResult<IdentityRecord> {
        let mut session = self.session()?;
        let now = session.now;
        let store = &mut *session.store;

        if store.identity(caller)?.is_some() {
            debug!(identity = %caller, "Identity already registered");
            return Err(LedgerError::AlreadyRegistered);
        }
        if timestamp > now {
            return Err(LedgerError::FutureTimestamp { timestamp, now });
        }

        let record = IdentityRecord {
            identity: *caller,
            registered_at: timestamp,
            recorded_at: now,
        };
        store.apply(
            WriteBatch::new()
                .with(BatchOp::PutIdentity(record.clone()))
                .with(audit(
                    now,
                    *caller,
                    LedgerEvent::IdentityRegistered {
                        identity: *caller,
                        registered_at: timestamp,
                    },
                )),
        )?;

        info!(identity = %caller, registered_at = %timestamp, "Identity registered");
        Ok(record)
    }

    pub fn is_registered(&self, identity: &Address) -> LedgerResult<bool> {
        let session = self.session()?;
        Ok(session.store.identity(identity)?.is_some())
    }

    pub fn identity_record(&self, identity: &Address) -> LedgerResult<Option<IdentityRecord>> {
        let session = self.session()?;
        Ok(session.store.identity(identity)?)
    }
}
