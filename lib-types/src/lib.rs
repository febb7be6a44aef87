//! Pooled-liquidity ledger primitives.
//! Stable, protocol-neutral, behavior-free.
//!
//! Rule: identifiers are fixed-size byte arrays, never strings.

pub mod primitives;

pub use primitives::{Address, AssetId, Amount, Bps, Timestamp, BPS_DENOMINATOR};
