//! Ledger Events
//!
//! Every committed pool operation emits exactly one event. Events are
//! produced after the ledger write succeeds, never for rejected operations.

use lib_types::{Address, Amount, AssetId};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::pair::PairKey;

/// Pool operation notifications
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum LedgerEvent {
    /// Liquidity deposited and units minted
    LiquidityAdded {
        /// Pool the deposit went into
        pair: PairKey,
        /// Holder credited with the minted units
        holder: Address,
        asset_a: AssetId,
        asset_b: AssetId,
        amount_a: Amount,
        amount_b: Amount,
        units_minted: Amount,
    },

    /// Units burned and liquidity withdrawn
    LiquidityRemoved {
        pair: PairKey,
        /// Holder whose units were burned
        holder: Address,
        asset_a: AssetId,
        asset_b: AssetId,
        amount_a: Amount,
        amount_b: Amount,
        units_burned: Amount,
    },

    /// Swap executed
    Swap {
        pair: PairKey,
        trader: Address,
        asset_in: AssetId,
        asset_out: AssetId,
        amount_in: Amount,
        amount_out: Amount,
    },
}

impl LedgerEvent {
    /// Pool the event belongs to
    pub fn pair(&self) -> PairKey {
        match self {
            LedgerEvent::LiquidityAdded { pair, .. }
            | LedgerEvent::LiquidityRemoved { pair, .. }
            | LedgerEvent::Swap { pair, .. } => *pair,
        }
    }

    /// Short name of the event kind
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerEvent::LiquidityAdded { .. } => "liquidity_added",
            LedgerEvent::LiquidityRemoved { .. } => "liquidity_removed",
            LedgerEvent::Swap { .. } => "swap",
        }
    }
}

/// Receiver of ledger events
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &LedgerEvent);
}

/// Logs every event through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: &LedgerEvent) {
        match event {
            LedgerEvent::LiquidityAdded {
                pair,
                holder,
                amount_a,
                amount_b,
                units_minted,
                ..
            } => tracing::info!(
                "LiquidityAdded: pair {} holder {} deposited {}/{} for {} units",
                pair,
                holder,
                amount_a,
                amount_b,
                units_minted
            ),
            LedgerEvent::LiquidityRemoved {
                pair,
                holder,
                amount_a,
                amount_b,
                units_burned,
                ..
            } => tracing::info!(
                "LiquidityRemoved: pair {} holder {} burned {} units for {}/{}",
                pair,
                holder,
                units_burned,
                amount_a,
                amount_b
            ),
            LedgerEvent::Swap {
                pair,
                trader,
                amount_in,
                amount_out,
                ..
            } => tracing::info!(
                "Swap: pair {} trader {} paid {} received {}",
                pair,
                trader,
                amount_in,
                amount_out
            ),
        }
    }
}

/// Collects events in memory, in emission order
#[derive(Debug, Default)]
pub struct MemoryEventLog {
    events: RwLock<Vec<LedgerEvent>>,
}

impl MemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events so far
    pub fn events(&self) -> Vec<LedgerEvent> {
        self.events.read().clone()
    }

    /// Events for one pool
    pub fn for_pair(&self, pair: &PairKey) -> Vec<LedgerEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.pair() == *pair)
            .cloned()
            .collect()
    }

    /// Events of one kind (see [`LedgerEvent::kind`])
    pub fn of_kind(&self, kind: &str) -> Vec<LedgerEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.kind() == kind)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    pub fn last(&self) -> Option<LedgerEvent> {
        self.events.read().last().cloned()
    }
}

impl EventSink for MemoryEventLog {
    fn emit(&self, event: &LedgerEvent) {
        self.events.write().push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn swap_event(pair_byte: u8) -> LedgerEvent {
        LedgerEvent::Swap {
            pair: PairKey([pair_byte; 32]),
            trader: Address::new([1u8; 32]),
            asset_in: AssetId::new([2u8; 32]),
            asset_out: AssetId::new([3u8; 32]),
            amount_in: 10,
            amount_out: 9,
        }
    }

    #[test]
    fn test_memory_log_keeps_order_and_filters() {
        let log = MemoryEventLog::new();
        log.emit(&swap_event(1));
        log.emit(&swap_event(2));
        log.emit(&swap_event(1));

        assert_eq!(log.len(), 3);
        assert_eq!(log.for_pair(&PairKey([1u8; 32])).len(), 2);
        assert_eq!(log.of_kind("swap").len(), 3);
        assert!(log.of_kind("liquidity_added").is_empty());
        assert_eq!(log.last(), Some(swap_event(1)));
    }
}
