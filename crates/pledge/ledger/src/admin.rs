//! Admin control plane. Every operation here is administrator-only.

use pledge_storage::{BatchOp, LedgerStore, WriteBatch};
use pledge_types::{Address, Amount, Controls, GlobalConfig, LedgerEvent};
use tracing::{info, warn};

use crate::error::{LedgerError, LedgerResult};
use crate::ledger::{audit, load_config, require_admin, PledgeLedger};
use crate::settings::validate_bounds;

impl<S: LedgerStore> PledgeLedger<S> {
    /// Update restricted mode, the handle requirement and the amount bounds
    /// together.
    pub fn set_controls(&self, caller: &Address, controls: Controls) -> LedgerResult<GlobalConfig> {
        self.update_config(caller, |config| {
            validate_bounds(controls.min_amount, controls.max_amount)?;
            config.restricted_mode = controls.restricted_mode;
            config.require_handle = controls.require_handle;
            config.min_amount = controls.min_amount;
            config.max_amount = controls.max_amount;
            info!(
                restricted_mode = controls.restricted_mode,
                require_handle = controls.require_handle,
                min_amount = controls.min_amount,
                max_amount = controls.max_amount,
                "Controls set"
            );
            Ok(LedgerEvent::ControlsSet { controls })
        })
    }

    /// Route fees from the next commitment onward to `new_treasury`.
    pub fn rotate_treasury(&self, caller: &Address, new_treasury: Address) -> LedgerResult<GlobalConfig> {
        self.update_config(caller, |config| {
            if new_treasury.is_zero() {
                return Err(LedgerError::ZeroAddress);
            }
            // Fees must never land in the refundable pool.
            if new_treasury == config.custody {
                return Err(LedgerError::CustodyRoleConflict { role: "treasury" });
            }
            let previous = std::mem::replace(&mut config.treasury, new_treasury);
            info!(previous = %previous, current = %new_treasury, "Treasury rotated");
            Ok(LedgerEvent::TreasuryRotated {
                previous,
                current: new_treasury,
            })
        })
    }

    /// Change the per-commitment fee from the next commitment onward.
    pub fn set_base_fee(&self, caller: &Address, fee: Amount) -> LedgerResult<GlobalConfig> {
        self.update_config(caller, |config| {
            let previous = std::mem::replace(&mut config.base_fee, fee);
            info!(previous, current = fee, "Base fee set");
            Ok(LedgerEvent::BaseFeeSet {
                previous,
                current: fee,
            })
        })
    }

    pub fn transfer_administration(
        &self,
        caller: &Address,
        new_admin: Address,
    ) -> LedgerResult<GlobalConfig> {
        self.update_config(caller, |config| {
            if new_admin.is_zero() {
                return Err(LedgerError::ZeroAddress);
            }
            if new_admin == config.custody {
                return Err(LedgerError::CustodyRoleConflict { role: "administrator" });
            }
            let previous = std::mem::replace(&mut config.admin, new_admin);
            warn!(previous = %previous, current = %new_admin, "Administration transferred");
            Ok(LedgerEvent::AdministrationTransferred {
                previous,
                current: new_admin,
            })
        })
    }

    /// Halt commitment creation. Revocation stays available.
    pub fn pause(&self, caller: &Address, reason: &str) -> LedgerResult<GlobalConfig> {
        self.update_config(caller, |config| {
            config.paused = true;
            warn!(reason, "Ledger paused");
            Ok(LedgerEvent::Paused {
                reason: reason.to_string(),
            })
        })
    }

    pub fn unpause(&self, caller: &Address, reason: &str) -> LedgerResult<GlobalConfig> {
        self.update_config(caller, |config| {
            config.paused = false;
            info!(reason, "Ledger unpaused");
            Ok(LedgerEvent::Unpaused {
                reason: reason.to_string(),
            })
        })
    }

    pub fn is_paused(&self) -> LedgerResult<bool> {
        Ok(self.config()?.paused)
    }

    fn update_config<F>(&self, caller: &Address, update: F) -> LedgerResult<GlobalConfig>
    where
        F: FnOnce(&mut GlobalConfig) -> LedgerResult<LedgerEvent>,
    {
        let mut session = self.session()?;
        let now = session.now;
        let store = &mut *session.store;
        let mut config = load_config(store)?;
        require_admin(&config, caller)?;

        let event = update(&mut config)?;
        store.apply(
            WriteBatch::new()
                .with(BatchOp::PutConfig(config.clone()))
                .with(audit(now, *caller, event)),
        )?;
        Ok(config)
    }
}
