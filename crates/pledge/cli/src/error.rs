//! CLI error types

use pledge_ledger::LedgerError;
use thiserror::Error;

/// CLI error types
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Script or account reference that cannot be resolved
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Ledger setup failed
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;
