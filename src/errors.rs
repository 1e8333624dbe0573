use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Unified error type for domain, engine, and storage layers.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("invalid amount: {0} cents (amount must be positive)")]
    InvalidAmount(i64),
    #[error("account not found: {0}")]
    UnknownAccount(Uuid),
    #[error("transaction not found: {0}")]
    UnknownTransaction(Uuid),
    #[error("cashbook entry not found: {0}")]
    UnknownCashbookEntry(Uuid),
    #[error("reminder not found: {0}")]
    UnknownReminder(Uuid),
    #[error("account {0} is locked by another operation")]
    ConcurrencyConflict(Uuid),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("storage failure: {0}")]
    Storage(String),
}
