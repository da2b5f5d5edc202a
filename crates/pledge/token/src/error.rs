use pledge_types::{Address, Amount};
use thiserror::Error;

/// Errors raised by a token implementation. The ledger surfaces these verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("insufficient balance for {owner}: have {available}, need {needed}")]
    InsufficientBalance {
        owner: Address,
        needed: Amount,
        available: Amount,
    },

    #[error("insufficient allowance from {owner} to {spender}: have {available}, need {needed}")]
    InsufficientAllowance {
        owner: Address,
        spender: Address,
        needed: Amount,
        available: Amount,
    },

    #[error("account frozen: {0}")]
    AccountFrozen(Address),

    #[error("transfer to the null address")]
    NullRecipient,

    #[error("arithmetic overflow")]
    Overflow,

    #[error("token backend error: {0}")]
    Backend(String),
}

/// Result type for token operations.
pub type TokenResult<T> = Result<T, TokenError>;
