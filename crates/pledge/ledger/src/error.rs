use pledge_storage::StorageError;
use pledge_token::TokenError;
use pledge_types::{Amount, PeriodIndex, Timestamp};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Errors from the pledge ledger. Every failure leaves ledger state exactly as
/// it was before the call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    // --- Validation ---
    #[error("amount {amount} below minimum {min}")]
    AmountTooLow { amount: Amount, min: Amount },

    #[error("amount {amount} above maximum {max}")]
    AmountTooHigh { amount: Amount, max: Amount },

    #[error("invalid range: end {end} must be after start {start}")]
    InvalidRange { start: Timestamp, end: Timestamp },

    #[error("timestamp {timestamp} is after now ({now})")]
    FutureTimestamp { timestamp: Timestamp, now: Timestamp },

    #[error("invalid amount bounds: min {min}, max {max}")]
    InvalidBounds { min: Amount, max: Amount },

    #[error("commitment text is empty")]
    EmptyCommitmentText,

    #[error("commitment text is {len} bytes, limit {max}")]
    CommitmentTextTooLong { len: usize, max: usize },

    #[error("handle identifier required")]
    MissingHandle,

    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    // --- Invariant ---
    #[error("identity already registered")]
    AlreadyRegistered,

    #[error("identity not registered")]
    IdentityNotRegistered,

    #[error("identity already has an active commitment")]
    AlreadyCommitted,

    #[error("no active commitment")]
    NoActiveCommitment,

    #[error("no period is open")]
    NoOpenPeriod,

    #[error("unknown period {0}")]
    UnknownPeriod(PeriodIndex),

    // --- Authorization ---
    #[error("caller is not the administrator")]
    Unauthorized,

    #[error("null address not allowed")]
    ZeroAddress,

    #[error("{role} cannot be the custody address")]
    CustodyRoleConflict { role: &'static str },

    // --- Timing ---
    #[error("revocation window closed at {deadline}")]
    RevocationWindowExpired { deadline: Timestamp },

    #[error("no commitment period is active")]
    OutsideActiveWindow,

    // --- System halt ---
    #[error("system paused")]
    SystemPaused,

    // --- Dependency ---
    #[error(transparent)]
    Token(#[from] TokenError),

    // --- Internal ---
    #[error("re-entrant call rejected")]
    Reentrancy,

    #[error("arithmetic overflow in {0}")]
    Overflow(&'static str),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Failure class, for callers deciding whether a retry can help.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Fix the input and retry
    Validation,
    /// The caller's ordering of operations is wrong
    Invariant,
    /// Privileged operation misuse
    Authorization,
    /// Final for this attempt
    Timing,
    /// Retry after unpause
    SystemHalt,
    /// Raised by the token
    Dependency,
    Internal,
}

impl LedgerError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            LedgerError::AmountTooLow { .. }
            | LedgerError::AmountTooHigh { .. }
            | LedgerError::InvalidRange { .. }
            | LedgerError::FutureTimestamp { .. }
            | LedgerError::InvalidBounds { .. }
            | LedgerError::EmptyCommitmentText
            | LedgerError::CommitmentTextTooLong { .. }
            | LedgerError::MissingHandle
            | LedgerError::InvalidSettings(_) => ErrorCategory::Validation,
            LedgerError::AlreadyRegistered
            | LedgerError::IdentityNotRegistered
            | LedgerError::AlreadyCommitted
            | LedgerError::NoActiveCommitment
            | LedgerError::NoOpenPeriod
            | LedgerError::UnknownPeriod(_) => ErrorCategory::Invariant,
            LedgerError::Unauthorized
            | LedgerError::ZeroAddress
            | LedgerError::CustodyRoleConflict { .. } => ErrorCategory::Authorization,
            LedgerError::RevocationWindowExpired { .. } | LedgerError::OutsideActiveWindow => {
                ErrorCategory::Timing
            }
            LedgerError::SystemPaused => ErrorCategory::SystemHalt,
            LedgerError::Token(_) => ErrorCategory::Dependency,
            LedgerError::Reentrancy | LedgerError::Overflow(_) | LedgerError::Storage(_) => {
                ErrorCategory::Internal
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pledge_types::Address;

    #[test]
    fn categories_follow_taxonomy() {
        assert_eq!(
            LedgerError::AmountTooLow { amount: 1, min: 2 }.category(),
            ErrorCategory::Validation
        );
        assert_eq!(LedgerError::AlreadyCommitted.category(), ErrorCategory::Invariant);
        assert_eq!(LedgerError::ZeroAddress.category(), ErrorCategory::Authorization);
        assert_eq!(
            LedgerError::CustodyRoleConflict { role: "treasury" }.category(),
            ErrorCategory::Authorization
        );
        assert_eq!(LedgerError::OutsideActiveWindow.category(), ErrorCategory::Timing);
        assert_eq!(LedgerError::SystemPaused.category(), ErrorCategory::SystemHalt);
        assert_eq!(
            LedgerError::from(TokenError::AccountFrozen(Address::derive("x"))).category(),
            ErrorCategory::Dependency
        );
    }

    #[test]
    fn token_errors_display_verbatim() {
        let inner = TokenError::InsufficientBalance {
            owner: Address::derive("alice"),
            needed: 11,
            available: 10,
        };
        let outer = LedgerError::from(inner.clone());
        assert_eq!(outer.to_string(), inner.to_string());
    }
}
