//! Canonical Primitive Types for the Liquidity Ledger
//!
//! Rule: identifiers are fixed-size byte arrays, never strings.
//!
//! These types are the foundational building blocks for pool state:
//! - Fixed-size (no dynamic allocation)
//! - Deterministically serializable
//! - Totally ordered, so unordered pairs can be canonicalized

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// TYPE ALIASES
// ============================================================================

/// Token amounts, reserves and liquidity units (supports up to ~340 undecillion units)
pub type Amount = u128;

/// Basis points for percentage calculations (10000 = 100%)
pub type Bps = u16;

/// Unix timestamp in seconds
pub type Timestamp = u64;

/// Denominator for all basis-point arithmetic
pub const BPS_DENOMINATOR: Bps = 10_000;

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// 32-byte account address (liquidity holders, traders, custody accounts)
///
/// The zero address is the null holder. Liquidity locked on pool bootstrap
/// is credited to it and can never be withdrawn.
#[derive(
    Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize, Default,
)]
pub struct Address(pub [u8; 32]);

impl Address {
    /// Create a new Address from raw bytes
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Create a zeroed Address
    pub const fn zero() -> Self {
        Self([0u8; 32])
    }

    /// Get the underlying bytes
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Check if this is the zero address
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", hex::encode(&self.0[..8]))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl From<[u8; 32]> for Address {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

// ============================================================================
// ASSET TYPES
// ============================================================================

/// 32-byte fungible asset identifier
///
/// Ordering is byte-lexicographic and is only used to canonicalize pairs.
/// The zero identifier is the null asset and is never valid in a pool.
#[derive(
    Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize, Default,
)]
pub struct AssetId(pub [u8; 32]);

impl AssetId {
    /// Null asset identifier (all zeros)
    pub const NULL: Self = Self([0u8; 32]);

    /// Create a new AssetId from raw bytes
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the underlying bytes
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Check if this is the null asset
    pub fn is_null(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Debug for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "AssetId(NULL)")
        } else {
            write!(f, "AssetId({})", hex::encode(&self.0[..8]))
        }
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl From<[u8; 32]> for AssetId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for AssetId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

// ============================================================================
// TESTS
// ============================================================================
