//! # Constant-Product Liquidity Pool Ledger
//!
//! Tracks pooled reserves of paired fungible assets, issues proportional
//! liquidity units to contributors and prices swaps with the constant
//! product formula (x * y = k).
//!
//! Custody of the underlying assets is not held here. Every movement of
//! value goes through an injected [`AssetTransfer`] capability, and the
//! ledger only commits its own state once those transfers have succeeded.
//!
//! ## Components
//! - [`pair`]: canonical, order-independent pair keys
//! - [`store`]: reserve ledger keyed by [`PairKey`] (get-or-default)
//! - [`liquidity`]: bootstrap / proportional minting and withdrawal
//! - [`pricing`]: swap output and input formulas, with and without fee
//! - [`ledger`]: atomic add / remove / swap operations
//! - [`queries`]: read-only views (reserves, balances, spot price, quotes)
//!
//! ## Security Invariants
//!
//! ### Invariant L1: Empty Iff Unissued
//! `reserve[0] == 0 && reserve[1] == 0` if and only if `total_liquidity == 0`.
//!
//! ### Invariant L2: Unit Conservation
//! `total_liquidity == sum(liquidity_of[h])` over all holders.
//!
//! ### Invariant L3: Product Monotonicity
//! After any swap: `reserve[0] * reserve[1] >= k_before`.
//!
//! ### Invariant L4: No Partial Commit
//! An operation either commits every ledger write and transfer or none.
//!
//! ## Usage
//!
//! ```ignore
//! use lib_amm::{AmmConfig, AmmLedger, InMemoryBalances, MemoryPoolStore};
//!
//! let ledger = AmmLedger::new(AmmConfig::default(), custody, MemoryPoolStore::new(), balances)?;
//! let added = ledger.add_liquidity(params)?;
//! ```

pub mod clock;
pub mod config;
pub mod errors;
pub mod events;
pub mod ledger;
pub mod liquidity;
pub mod locks;
pub mod math;
pub mod pair;
pub mod pool;
pub mod pricing;
pub mod queries;
pub mod store;
pub mod transfer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::AmmConfig;
pub use errors::{AmmError, AmmResult, TransferError};
pub use events::{EventSink, LedgerEvent, MemoryEventLog, TracingEventSink};
pub use ledger::{
    AddLiquidityParams, AddLiquidityResult, AmmLedger, RemoveLiquidityParams,
    RemoveLiquidityResult, SwapExactInParams, SwapExactOutParams, SwapResult,
};
pub use pair::{canon, PairKey, ReserveOrder};
pub use pool::Pool;
pub use pricing::{quote, quote_amount_out};
pub use queries::PoolView;
pub use store::{MemoryPoolStore, PoolStore};
pub use transfer::{AssetTransfer, InMemoryBalances};

pub use lib_types::{Address, Amount, AssetId, Bps, Timestamp};

/// Default swap fee in basis points (0.3% = 30 bps, the 997/1000 convention)
pub const DEFAULT_FEE_BPS: Bps = 30;

/// Maximum fee in basis points accepted by default configuration (10%)
pub const MAX_FEE_BPS: Bps = 1000;

/// Liquidity units permanently locked on bootstrap by default
pub const MINIMUM_LIQUIDITY: Amount = 1000;

/// Fixed-point scale used for spot prices (1e18)
pub const PRICE_SCALE: Amount = 1_000_000_000_000_000_000;

/// Domain separator for pair key derivation
pub const PAIR_KEY_DOMAIN: &[u8] = b"AMM_PAIR_KEY_V1";
