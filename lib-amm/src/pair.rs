//! Canonical pair keying
//!
//! A pool is identified by the unordered set of its two assets. The key is
//! derived from the assets in ascending order, so `canon(a, b)` and
//! `canon(b, a)` always name the same pool. Reserves are stored in that
//! same canonical order (smaller asset in slot 0); [`ReserveOrder`] tells a
//! caller how to translate between its own (a, b) order and the slots.

use lib_types::AssetId;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::{AmmError, AmmResult};
use crate::PAIR_KEY_DOMAIN;

/// Order-independent identifier of an asset pair
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct PairKey(pub [u8; 32]);

impl PairKey {
    /// Get the underlying bytes
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PairKey({})", hex::encode(&self.0[..8]))
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Where the caller's first asset lives in canonical storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReserveOrder {
    /// Caller's asset A is canonical slot 0
    AFirst,
    /// Caller's asset A is canonical slot 1
    BFirst,
}

impl ReserveOrder {
    /// Map caller-ordered values `(a, b)` to canonical slots
    pub fn to_canonical<T>(self, a: T, b: T) -> [T; 2] {
        match self {
            ReserveOrder::AFirst => [a, b],
            ReserveOrder::BFirst => [b, a],
        }
    }

    /// Map canonical slots back to caller order `(a, b)`
    pub fn to_caller_order<T: Copy>(self, slots: [T; 2]) -> (T, T) {
        match self {
            ReserveOrder::AFirst => (slots[0], slots[1]),
            ReserveOrder::BFirst => (slots[1], slots[0]),
        }
    }

    /// Canonical slot index of the caller's asset A
    pub fn slot_of_a(self) -> usize {
        match self {
            ReserveOrder::AFirst => 0,
            ReserveOrder::BFirst => 1,
        }
    }
}

/// Resolve the canonical key and slot order for an unordered pair
///
/// # Errors
/// - `InvalidPair`: both identifiers are the same asset
pub fn canon(a: &AssetId, b: &AssetId) -> AmmResult<(PairKey, ReserveOrder)> {
    if a == b {
        return Err(AmmError::InvalidPair(*a));
    }

    let (order, low, high) = if a < b {
        (ReserveOrder::AFirst, a, b)
    } else {
        (ReserveOrder::BFirst, b, a)
    };

    Ok((derive_pair_key(low, high), order))
}

/// Pair key = Blake3(PAIR_KEY_DOMAIN || low || high)
fn derive_pair_key(low: &AssetId, high: &AssetId) -> PairKey {
    let mut hasher = blake3::Hasher::new();
    hasher.update(PAIR_KEY_DOMAIN);
    hasher.update(low.as_bytes());
    hasher.update(high.as_bytes());

    PairKey(*hasher.finalize().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn asset(id: u8) -> AssetId {
        AssetId::new([id; 32])
    }

    #[test]
    fn test_canon_is_order_independent() {
        let (key_ab, order_ab) = canon(&asset(1), &asset(2)).unwrap();
        let (key_ba, order_ba) = canon(&asset(2), &asset(1)).unwrap();

        assert_eq!(key_ab, key_ba);
        assert_eq!(order_ab, ReserveOrder::AFirst);
        assert_eq!(order_ba, ReserveOrder::BFirst);
    }

    #[test]
    fn test_canon_rejects_identical_assets() {
        assert_eq!(canon(&asset(3), &asset(3)), Err(AmmError::InvalidPair(asset(3))));
    }

    #[test]
    fn test_distinct_pairs_have_distinct_keys() {
        let (key_12, _) = canon(&asset(1), &asset(2)).unwrap();
        let (key_13, _) = canon(&asset(1), &asset(3)).unwrap();
        assert_ne!(key_12, key_13);
    }

    #[test]
    fn test_reserve_order_translation() {
        assert_eq!(ReserveOrder::AFirst.to_canonical(10, 20), [10, 20]);
        assert_eq!(ReserveOrder::BFirst.to_canonical(10, 20), [20, 10]);
        assert_eq!(ReserveOrder::BFirst.to_caller_order([20, 10]), (10, 20));
        assert_eq!(ReserveOrder::BFirst.slot_of_a(), 1);
    }

    proptest! {
        #[test]
        fn prop_pair_key_symmetric(a in any::<[u8; 32]>(), b in any::<[u8; 32]>()) {
            prop_assume!(a != b);
            let (key_ab, order_ab) = canon(&AssetId::new(a), &AssetId::new(b)).unwrap();
            let (key_ba, order_ba) = canon(&AssetId::new(b), &AssetId::new(a)).unwrap();

            prop_assert_eq!(key_ab, key_ba);
            prop_assert_ne!(order_ab, order_ba);
        }
    }
}
