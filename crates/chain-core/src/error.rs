use thiserror::Error;

/// Caller-input errors. All are raised synchronously at the point of
/// violation; none are retried internally. Integrity queries
/// (`Transaction::is_valid`, `Ledger::is_chain_valid`) report booleans
/// instead of raising.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    /// Key material that cannot act for the claimed signer identity.
    #[error("key mismatch: {0}")]
    KeyMismatch(String),

    #[error("cannot sign transactions for another wallet")]
    UnauthorizedSigner,

    #[error("transaction has no signature")]
    MissingSignature,

    #[error("transaction must include sender and recipient addresses")]
    IncompleteTransaction,

    #[error("cannot add an invalid transaction to the pending pool")]
    InvalidTransaction,

    #[error("transaction amount must be greater than zero")]
    NonPositiveAmount,

    /// Raised only when `SpendPolicy::RejectOverdraft` is switched on.
    #[error("insufficient balance: {available} available, {required} required")]
    InsufficientBalance { available: i64, required: u64 },
}
