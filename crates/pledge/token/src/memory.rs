//! In-memory reference token.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use pledge_types::{Address, Amount};
use tracing::debug;

use crate::{FungibleToken, TokenError, TokenResult};

/// A completed transfer, as seen by a [`TransferHook`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferReceipt {
    /// Allowance spender for `transfer_from`; `None` for a direct transfer
    pub spender: Option<Address>,
    pub from: Address,
    pub to: Address,
    pub amount: Amount,
}

/// Code run after every successful transfer, outside the token's locks.
///
/// Models receiver callbacks: the hook may call back into whatever invoked
/// the transfer.
pub trait TransferHook: Send + Sync {
    fn on_transfer(&self, receipt: &TransferReceipt);
}

#[derive(Default)]
struct TokenBook {
    balances: HashMap<Address, Amount>,
    allowances: HashMap<(Address, Address), Amount>,
    frozen: HashSet<Address>,
    total_supply: Amount,
}

/// Deterministic in-memory token with approvals, freezing and a transfer hook.
pub struct InMemoryToken {
    address: Address,
    book: RwLock<TokenBook>,
    hook: RwLock<Option<Arc<dyn TransferHook>>>,
}

impl InMemoryToken {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            book: RwLock::new(TokenBook::default()),
            hook: RwLock::new(None),
        }
    }

    /// Credit `amount` to `to`, growing total supply.
    pub fn mint(&self, to: &Address, amount: Amount) -> TokenResult<()> {
        let mut book = self.write_book()?;
        let supply = book
            .total_supply
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;
        let balance = book.balances.entry(*to).or_insert(0);
        *balance = balance.checked_add(amount).ok_or(TokenError::Overflow)?;
        book.total_supply = supply;
        debug!(to = %to, amount, "Minted");
        Ok(())
    }

    /// Set the allowance `spender` may move out of `owner`.
    pub fn approve(&self, owner: &Address, spender: &Address, amount: Amount) -> TokenResult<()> {
        let mut book = self.write_book()?;
        book.allowances.insert((*owner, *spender), amount);
        debug!(owner = %owner, spender = %spender, amount, "Approved");
        Ok(())
    }

    /// Block all transfers from or to `account`.
    pub fn freeze(&self, account: &Address) -> TokenResult<()> {
        self.write_book()?.frozen.insert(*account);
        Ok(())
    }

    pub fn unfreeze(&self, account: &Address) -> TokenResult<()> {
        self.write_book()?.frozen.remove(account);
        Ok(())
    }

    pub fn total_supply(&self) -> TokenResult<Amount> {
        Ok(self.read_book()?.total_supply)
    }

    pub fn set_hook(&self, hook: Arc<dyn TransferHook>) -> TokenResult<()> {
        let mut guard = self
            .hook
            .write()
            .map_err(|_| TokenError::Backend("hook lock poisoned".to_string()))?;
        *guard = Some(hook);
        Ok(())
    }

    pub fn clear_hook(&self) -> TokenResult<()> {
        let mut guard = self
            .hook
            .write()
            .map_err(|_| TokenError::Backend("hook lock poisoned".to_string()))?;
        *guard = None;
        Ok(())
    }

    fn read_book(&self) -> TokenResult<std::sync::RwLockReadGuard<'_, TokenBook>> {
        self.book
            .read()
            .map_err(|_| TokenError::Backend("token book lock poisoned".to_string()))
    }

    fn write_book(&self) -> TokenResult<std::sync::RwLockWriteGuard<'_, TokenBook>> {
        self.book
            .write()
            .map_err(|_| TokenError::Backend("token book lock poisoned".to_string()))
    }

    fn move_balance(
        &self,
        spender: Option<&Address>,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> TokenResult<()> {
        {
            let mut book = self.write_book()?;

            if to.is_zero() {
                return Err(TokenError::NullRecipient);
            }
            for account in [from, to] {
                if book.frozen.contains(account) {
                    return Err(TokenError::AccountFrozen(*account));
                }
            }

            let available = book.balances.get(from).copied().unwrap_or(0);
            if available < amount {
                return Err(TokenError::InsufficientBalance {
                    owner: *from,
                    needed: amount,
                    available,
                });
            }

            if let Some(spender) = spender {
                let key = (*from, *spender);
                let allowed = book.allowances.get(&key).copied().unwrap_or(0);
                if allowed < amount {
                    return Err(TokenError::InsufficientAllowance {
                        owner: *from,
                        spender: *spender,
                        needed: amount,
                        available: allowed,
                    });
                }
                book.allowances.insert(key, allowed - amount);
            }

            if from != to {
                let credited = book
                    .balances
                    .get(to)
                    .copied()
                    .unwrap_or(0)
                    .checked_add(amount)
                    .ok_or(TokenError::Overflow)?;
                book.balances.insert(*from, available - amount);
                book.balances.insert(*to, credited);
            }
        }

        debug!(from = %from, to = %to, amount, "Transferred");

        let hook = self
            .hook
            .read()
            .map_err(|_| TokenError::Backend("hook lock poisoned".to_string()))?
            .clone();
        if let Some(hook) = hook {
            hook.on_transfer(&TransferReceipt {
                spender: spender.copied(),
                from: *from,
                to: *to,
                amount,
            });
        }
        Ok(())
    }
}

impl FungibleToken for InMemoryToken {
    fn address(&self) -> Address {
        self.address
    }

    fn balance_of(&self, owner: &Address) -> TokenResult<Amount> {
        Ok(self.read_book()?.balances.get(owner).copied().unwrap_or(0))
    }

    fn allowance(&self, owner: &Address, spender: &Address) -> TokenResult<Amount> {
        Ok(self
            .read_book()?
            .allowances
            .get(&(*owner, *spender))
            .copied()
            .unwrap_or(0))
    }

    fn transfer(&self, from: &Address, to: &Address, amount: Amount) -> TokenResult<()> {
        self.move_balance(None, from, to, amount)
    }

    fn transfer_from(
        &self,
        spender: &Address,
        owner: &Address,
        to: &Address,
        amount: Amount,
    ) -> TokenResult<()> {
        self.move_balance(Some(spender), owner, to, amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn token() -> InMemoryToken {
        InMemoryToken::new(Address::derive("usdc"))
    }

    #[test]
    fn mint_and_transfer() {
        let t = token();
        let (a, b) = (Address::derive("a"), Address::derive("b"));
        t.mint(&a, 100).unwrap();
        t.transfer(&a, &b, 40).unwrap();
        assert_eq!(t.balance_of(&a).unwrap(), 60);
        assert_eq!(t.balance_of(&b).unwrap(), 40);
        assert_eq!(t.total_supply().unwrap(), 100);
    }

    #[test]
    fn transfer_from_spends_allowance() {
        let t = token();
        let (owner, spender, to) = (
            Address::derive("owner"),
            Address::derive("spender"),
            Address::derive("to"),
        );
        t.mint(&owner, 100).unwrap();
        t.approve(&owner, &spender, 50).unwrap();

        t.transfer_from(&spender, &owner, &to, 30).unwrap();
        assert_eq!(t.allowance(&owner, &spender).unwrap(), 20);

        let err = t.transfer_from(&spender, &owner, &to, 30).unwrap_err();
        assert!(matches!(
            err,
            TokenError::InsufficientAllowance { needed: 30, available: 20, .. }
        ));
        assert_eq!(t.balance_of(&owner).unwrap(), 70);
    }

    #[test]
    fn insufficient_balance_leaves_book_untouched() {
        let t = token();
        let (a, b) = (Address::derive("a"), Address::derive("b"));
        t.mint(&a, 10).unwrap();
        let err = t.transfer(&a, &b, 11).unwrap_err();
        assert!(matches!(err, TokenError::InsufficientBalance { available: 10, .. }));
        assert_eq!(t.balance_of(&a).unwrap(), 10);
        assert_eq!(t.balance_of(&b).unwrap(), 0);
    }

    #[test]
    fn frozen_accounts_cannot_send_or_receive() {
        let t = token();
        let (a, b) = (Address::derive("a"), Address::derive("b"));
        t.mint(&a, 10).unwrap();
        t.freeze(&b).unwrap();
        assert_eq!(t.transfer(&a, &b, 1), Err(TokenError::AccountFrozen(b)));
        t.unfreeze(&b).unwrap();
        t.transfer(&a, &b, 1).unwrap();
    }

    #[test]
    fn null_recipient_rejected() {
        let t = token();
        let a = Address::derive("a");
        t.mint(&a, 10).unwrap();
        assert_eq!(t.transfer(&a, &Address::ZERO, 1), Err(TokenError::NullRecipient));
    }

    struct Recorder(Mutex<Vec<TransferReceipt>>);

    impl TransferHook for Recorder {
        fn on_transfer(&self, receipt: &TransferReceipt) {
            self.0.lock().unwrap().push(receipt.clone());
        }
    }

    #[test]
    fn hook_sees_completed_transfers() {
        let t = token();
        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        t.set_hook(recorder.clone()).unwrap();
        let (a, b) = (Address::derive("a"), Address::derive("b"));
        t.mint(&a, 10).unwrap();
        t.transfer(&a, &b, 4).unwrap();
        let _ = t.transfer(&a, &b, 100);

        let seen = recorder.0.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].amount, 4);
        assert_eq!(seen[0].spender, None);
    }
}
