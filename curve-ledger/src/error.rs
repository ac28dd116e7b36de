//! Error types for the ledger

use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Reason a transfer was refused by the admission rules.
///
/// The display strings are surfaced verbatim to callers.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Amount is below zero
    #[error("amount must be non-negative")]
    NegativeAmount,

    /// Amount is above the per-transfer limit
    #[error("amount exceeds maximum")]
    AmountExceedsMaximum,

    /// Sender's replayed balance does not cover the amount
    #[error("insufficient balance")]
    InsufficientBalance,

    /// Mint would push circulating supply past the cap
    #[error("exceeds maximum supply")]
    ExceedsMaximumSupply,
}

/// Ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// Transfer refused by validation, nothing was written
    #[error("{0}")]
    Rejected(#[from] Rejection),

    /// Storage error (RocksDB or other gateway)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Digest could not be produced
    #[error("Hashing unavailable: {0}")]
    Hashing(String),

    /// Block not found
    #[error("Block not found: {0}")]
    BlockNotFound(u64),

    /// Transaction not found
    #[error("Transaction not found: {0}")]
    TransactionNotFound(u64),

    /// Genesis has not been created yet
    #[error("Ledger not initialized")]
    NotInitialized,

    /// Invariant violation (chain linkage, supply accounting, etc.)
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Transfer was accepted for processing but never committed
    #[error("Transfer incomplete: {0}")]
    TransferIncomplete(String),

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// The rejection reason, if this is a validation failure
    pub fn rejection(&self) -> Option<Rejection> {
        match self {
            Error::Rejected(reason) => Some(*reason),
            _ => None,
        }
    }

    /// Whether the caller may retry with different parameters
    pub fn is_rejection(&self) -> bool {
        matches!(self, Error::Rejected(_))
    }
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_messages_are_verbatim() {
        let err: Error = Rejection::AmountExceedsMaximum.into();
        assert_eq!(err.to_string(), "amount exceeds maximum");
        assert_eq!(
            Error::from(Rejection::InsufficientBalance).to_string(),
            "insufficient balance"
        );
        assert_eq!(
            Error::from(Rejection::ExceedsMaximumSupply).to_string(),
            "exceeds maximum supply"
        );
    }

    #[test]
    fn test_rejection_accessor() {
        let err = Error::from(Rejection::InsufficientBalance);
        assert!(err.is_rejection());
        assert_eq!(err.rejection(), Some(Rejection::InsufficientBalance));

        let err = Error::NotInitialized;
        assert!(!err.is_rejection());
        assert_eq!(err.rejection(), None);
    }
}
