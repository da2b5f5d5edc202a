use pledge_types::{
    Address, Amount, GlobalConfig, DEFAULT_BASE_FEE, DEFAULT_MAX_AMOUNT, DEFAULT_MAX_TEXT_LEN,
    DEFAULT_MIN_AMOUNT, REVOCATION_WINDOW_SECS,
};
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};

/// Deployment parameters used to initialise the global config.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerSettings {
    pub admin: Address,
    pub custody: Address,
    pub token: Address,
    pub treasury: Address,
    pub base_fee: Amount,
    pub min_amount: Amount,
    pub max_amount: Amount,
    pub restricted_mode: bool,
    pub require_handle: bool,
    pub max_text_len: usize,
    pub revocation_window_secs: u64,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            admin: Address::derive("pledge-admin"),
            custody: Address::derive("pledge-custody"),
            token: Address::derive("pledge-token"),
            treasury: Address::derive("pledge-treasury"),
            base_fee: DEFAULT_BASE_FEE,
            min_amount: DEFAULT_MIN_AMOUNT,
            max_amount: DEFAULT_MAX_AMOUNT,
            restricted_mode: false,
            require_handle: false,
            max_text_len: DEFAULT_MAX_TEXT_LEN,
            revocation_window_secs: REVOCATION_WINDOW_SECS,
        }
    }
}

impl LedgerSettings {
    pub fn validate(&self) -> LedgerResult<()> {
        for (role, address) in [
            ("admin", &self.admin),
            ("custody", &self.custody),
            ("token", &self.token),
            ("treasury", &self.treasury),
        ] {
            if address.is_zero() {
                return Err(LedgerError::InvalidSettings(format!("{} is the null address", role)));
            }
        }
        if self.custody == self.treasury || self.custody == self.admin {
            return Err(LedgerError::InvalidSettings(
                "custody must differ from treasury and admin".to_string(),
            ));
        }
        validate_bounds(self.min_amount, self.max_amount)?;
        if self.max_text_len == 0 {
            return Err(LedgerError::InvalidSettings(
                "max_text_len must be positive".to_string(),
            ));
        }
        if self.revocation_window_secs == 0 {
            return Err(LedgerError::InvalidSettings(
                "revocation_window_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Initial global config; the ledger starts unpaused.
    pub fn global_config(&self) -> GlobalConfig {
        GlobalConfig {
            admin: self.admin,
            custody: self.custody,
            token: self.token,
            treasury: self.treasury,
            base_fee: self.base_fee,
            min_amount: self.min_amount,
            max_amount: self.max_amount,
            paused: false,
            restricted_mode: self.restricted_mode,
            require_handle: self.require_handle,
            max_text_len: self.max_text_len,
            revocation_window_secs: self.revocation_window_secs,
        }
    }
}

pub(crate) fn validate_bounds(min: Amount, max: Amount) -> LedgerResult<()> {
    if min == 0 || min > max {
        return Err(LedgerError::InvalidBounds { min, max });
    }
    Ok(())
}
