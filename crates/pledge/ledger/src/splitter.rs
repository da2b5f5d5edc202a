//! Fee & treasury splitter.
//!
//! Moves a commitment's funds: the pool portion into custody, the base fee to
//! the treasury. Only the pool portion is ever refunded.

use pledge_token::{FungibleToken, TokenError};
use pledge_types::{Address, Amount, GlobalConfig};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::error::{LedgerError, LedgerResult};

/// Where a commitment's funds went.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    /// Refundable portion now held in custody
    pub pooled: Amount,
    /// Non-refundable portion sent to `treasury`
    pub fee: Amount,
    pub treasury: Address,
}

/// Check balance and allowance for `amount + base_fee` before any transfer.
pub(crate) fn preflight(
    token: &dyn FungibleToken,
    config: &GlobalConfig,
    identity: &Address,
    amount: Amount,
) -> LedgerResult<Amount> {
    let total = amount
        .checked_add(config.base_fee)
        .ok_or(LedgerError::Token(TokenError::Overflow))?;

    let available = token.balance_of(identity)?;
    if available < total {
        return Err(TokenError::InsufficientBalance {
            owner: *identity,
            needed: total,
            available,
        }
        .into());
    }
    let allowed = token.allowance(identity, &config.custody)?;
    if allowed < total {
        return Err(TokenError::InsufficientAllowance {
            owner: *identity,
            spender: config.custody,
            needed: total,
            available: allowed,
        }
        .into());
    }
    Ok(total)
}

/// Pull `amount + base_fee` into custody in one transfer, then forward the
/// fee to the treasury.
///
/// A failure on the identity's side (balance, allowance, frozen account)
/// happens in the single pull and moves nothing. If forwarding the fee fails
/// the full pull is returned from custody; the balance is restored but the
/// allowance spent by the pull stays spent.
pub(crate) fn settle(
    token: &dyn FungibleToken,
    config: &GlobalConfig,
    identity: &Address,
    amount: Amount,
) -> LedgerResult<Settlement> {
    let total = amount
        .checked_add(config.base_fee)
        .ok_or(LedgerError::Token(TokenError::Overflow))?;
    token.transfer_from(&config.custody, identity, &config.custody, total)?;
    debug!(identity = %identity, amount, fee = config.base_fee, "Commitment funds pulled into custody");

    if config.base_fee > 0 {
        if let Err(err) = token.transfer(&config.custody, &config.treasury, config.base_fee) {
            warn!(
                identity = %identity,
                treasury = %config.treasury,
                fee = config.base_fee,
                error = %err,
                "Fee forward failed; returning funds"
            );
            if let Err(refund_err) = token.transfer(&config.custody, identity, total) {
                error!(
                    identity = %identity,
                    amount = total,
                    error = %refund_err,
                    "Could not return funds after failed fee forward"
                );
            }
            return Err(err.into());
        }
        debug!(treasury = %config.treasury, fee = config.base_fee, "Fee forwarded");
    }

    Ok(Settlement {
        pooled: amount,
        fee: config.base_fee,
        treasury: config.treasury,
    })
}

/// Return a pooled amount from custody.
pub(crate) fn refund(
    token: &dyn FungibleToken,
    config: &GlobalConfig,
    identity: &Address,
    amount: Amount,
) -> LedgerResult<()> {
    token.transfer(&config.custody, identity, amount)?;
    debug!(identity = %identity, amount, "Pool refunded");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::LedgerSettings;
    use pledge_token::InMemoryToken;

    fn setup() -> (InMemoryToken, GlobalConfig, Address) {
        let settings = LedgerSettings::default();
        let token = InMemoryToken::new(settings.token);
        let alice = Address::derive("alice");
        token.mint(&alice, 20_000_000).unwrap();
        token.approve(&alice, &settings.custody, 20_000_000).unwrap();
        (token, settings.global_config(), alice)
    }

    #[test]
    fn settle_splits_pool_and_fee() {
        let (token, config, alice) = setup();
        let settlement = settle(&token, &config, &alice, 10_000_000).unwrap();
        assert_eq!(settlement.pooled, 10_000_000);
        assert_eq!(settlement.fee, config.base_fee);
        assert_eq!(token.balance_of(&config.custody).unwrap(), 10_000_000);
        assert_eq!(token.balance_of(&config.treasury).unwrap(), config.base_fee);
        assert_eq!(
            token.balance_of(&alice).unwrap(),
            20_000_000 - 10_000_000 - config.base_fee
        );
    }

    #[test]
    fn failed_fee_forward_returns_everything() {
        let (token, config, alice) = setup();
        token.freeze(&config.treasury).unwrap();

        let err = settle(&token, &config, &alice, 10_000_000).unwrap_err();
        assert_eq!(err, LedgerError::Token(TokenError::AccountFrozen(config.treasury)));
        assert_eq!(token.balance_of(&alice).unwrap(), 20_000_000);
        assert_eq!(token.balance_of(&config.custody).unwrap(), 0);
        assert_eq!(token.balance_of(&config.treasury).unwrap(), 0);
        assert_eq!(
            token.allowance(&alice, &config.custody).unwrap(),
            20_000_000 - 10_000_000 - config.base_fee
        );
    }

    #[test]
    fn identity_side_failure_leaves_allowance_intact() {
        let (token, config, alice) = setup();
        // covers the pool amount but not the fee
        token.approve(&alice, &config.custody, 10_000_000).unwrap();

        let err = settle(&token, &config, &alice, 10_000_000).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Token(TokenError::InsufficientAllowance { needed, .. })
                if needed == 10_000_000 + config.base_fee
        ));
        assert_eq!(token.allowance(&alice, &config.custody).unwrap(), 10_000_000);
        assert_eq!(token.balance_of(&alice).unwrap(), 20_000_000);
        assert_eq!(token.balance_of(&config.custody).unwrap(), 0);

        token.freeze(&alice).unwrap();
        token.approve(&alice, &config.custody, 20_000_000).unwrap();
        assert!(settle(&token, &config, &alice, 10_000_000).is_err());
        assert_eq!(token.allowance(&alice, &config.custody).unwrap(), 20_000_000);
    }

    #[test]
    fn preflight_covers_fee() {
        let (token, config, alice) = setup();
        let err = preflight(&token, &config, &alice, 20_000_000).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Token(TokenError::InsufficientBalance { needed, .. })
                if needed == 20_000_000 + config.base_fee
        ));
        assert_eq!(
            preflight(&token, &config, &alice, 5_000_000).unwrap(),
            5_000_000 + config.base_fee
        );
    }
}
