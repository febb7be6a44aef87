//! Liquidity Ledger Errors

use lib_types::{Amount, AssetId, Timestamp};
use thiserror::Error;

/// Failure reported by the external asset transfer capability
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("Insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: Amount, need: Amount },

    #[error("Transfer rejected: {0}")]
    Rejected(String),

    #[error("Transfer backend unavailable: {0}")]
    Unavailable(String),
}

/// Error during ledger operations
///
/// Every variant except [`AmmError::InvariantViolation`] is an ordinary,
/// caller-recoverable rejection. An invariant violation means the ledger
/// itself computed an inconsistent state; nothing is committed and the
/// condition should be treated as a critical alert.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmmError {
    #[error("Deadline {deadline} has passed (now {now})")]
    Expired { deadline: Timestamp, now: Timestamp },

    #[error("Invalid asset: {0}")]
    InvalidAsset(String),

    #[error("Pair requires two distinct assets, got {0} twice")]
    InvalidPair(AssetId),

    #[error("Swap path must name exactly two assets, got {0}")]
    InvalidPath(usize),

    #[error("Recipient cannot be the null address")]
    InvalidRecipient,

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Asset A amount {actual} below minimum {minimum}")]
    SlippageA { actual: Amount, minimum: Amount },

    #[error("Asset B amount {actual} below minimum {minimum}")]
    SlippageB { actual: Amount, minimum: Amount },

    #[error("Output amount {actual} below minimum {minimum}")]
    SlippageOut { actual: Amount, minimum: Amount },

    #[error("Required input {required} exceeds maximum {maximum}")]
    SlippageIn { required: Amount, maximum: Amount },

    #[error("Insufficient liquidity units: have {have}, need {need}")]
    InsufficientLiquidity { have: Amount, need: Amount },

    #[error("Pool has no liquidity")]
    EmptyPool,

    #[error("Liquidity amounts too small (would mint zero units)")]
    ZeroLiquidityMinted,

    #[error("Initial liquidity {minted} does not exceed locked minimum {minimum}")]
    MinimumLiquidity { minted: Amount, minimum: Amount },

    #[error("Swap output {amount_out} would exhaust reserve {reserve}")]
    ReserveExhausted { amount_out: Amount, reserve: Amount },

    #[error("Asset transfer failed for {asset}: {source}")]
    TransferFailed {
        asset: AssetId,
        #[source]
        source: TransferError,
    },

    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}

impl AmmError {
    /// Whether this error indicates a bug in the ledger rather than bad input
    pub fn is_fatal(&self) -> bool {
        matches!(self, AmmError::InvariantViolation(_))
    }
}

/// Result type for ledger operations
pub type AmmResult<T> = Result<T, AmmError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_only_invariant_violation_is_fatal() {
        assert!(AmmError::InvariantViolation("k decreased".into()).is_fatal());
        assert!(!AmmError::EmptyPool.is_fatal());
        assert!(!AmmError::Overflow.is_fatal());
        assert!(!AmmError::SlippageOut { actual: 1, minimum: 2 }.is_fatal());
    }

    #[test]
    fn test_transfer_failed_exposes_source() {
        let err = AmmError::TransferFailed {
            asset: AssetId::new([7u8; 32]),
            source: TransferError::InsufficientBalance { have: 1, need: 5 },
        };

        let source = err.source().map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("Insufficient balance: have 1, need 5"));
        assert!(err.to_string().starts_with("Asset transfer failed for 0707"));
    }
}
