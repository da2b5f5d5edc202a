//! # pledge-token
//!
//! The fungible-balance interface the pledge ledger consumes: balance query,
//! allowance query, and transfer on behalf of an owner. The ledger never
//! implements a token; it only calls through [`FungibleToken`].
//!
//! [`InMemoryToken`] is a deterministic reference implementation used by
//! tests and the CLI. It supports minting, approvals, account freezing and a
//! post-transfer hook, so callers can exercise failure and callback paths.

#![deny(unsafe_code)]

mod error;
mod memory;

pub use error::{TokenError, TokenResult};
pub use memory::{InMemoryToken, TransferHook, TransferReceipt};

use pledge_types::{Address, Amount};

/// Fungible-balance interface.
///
/// Implementations may run caller-controlled code during a transfer (hooks,
/// callbacks). Callers must treat every transfer as an external interaction.
pub trait FungibleToken: Send + Sync {
    /// Address identifying this token.
    fn address(&self) -> Address;

    fn balance_of(&self, owner: &Address) -> TokenResult<Amount>;

    /// Amount `spender` may still move out of `owner`'s balance.
    fn allowance(&self, owner: &Address, spender: &Address) -> TokenResult<Amount>;

    /// Move `amount` from `from` (the caller's own balance) to `to`.
    fn transfer(&self, from: &Address, to: &Address, amount: Amount) -> TokenResult<()>;

    /// Move `amount` from `owner` to `to`, spending `spender`'s allowance.
    fn transfer_from(
        &self,
        spender: &Address,
        owner: &Address,
        to: &Address,
        amount: Amount,
    ) -> TokenResult<()>;
}
