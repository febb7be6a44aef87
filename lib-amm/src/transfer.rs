//! Asset Transfer capability
//!
//! The ledger never holds value. Moving assets into and out of pool custody
//! is delegated to an [`AssetTransfer`] implementation supplied by the host.
//! Operations stage their legs through a [`TransferJournal`] so that a
//! failure part-way through can be unwound before anything is committed.

use lib_types::{Address, Amount, AssetId};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::{AmmError, AmmResult, TransferError};

/// External capability that moves assets
pub trait AssetTransfer: Send + Sync {
    /// Move `amount` of `asset` from `from` into `to` (pool custody)
    fn transfer_in(
        &self,
        asset: &AssetId,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), TransferError>;

    /// Move `amount` of `asset` out of pool custody to `to`
    fn transfer_out(&self, asset: &AssetId, to: &Address, amount: Amount)
        -> Result<(), TransferError>;
}

impl<T: AssetTransfer + ?Sized> AssetTransfer for Arc<T> {
    fn transfer_in(
        &self,
        asset: &AssetId,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), TransferError> {
        (**self).transfer_in(asset, from, to, amount)
    }

    fn transfer_out(
        &self,
        asset: &AssetId,
        to: &Address,
        amount: Amount,
    ) -> Result<(), TransferError> {
        (**self).transfer_out(asset, to, amount)
    }
}

// ============================================================================
// STAGED TRANSFERS
// ============================================================================

/// One movement of value staged by a pool operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferLeg {
    /// Payer to custody
    In {
        asset: AssetId,
        from: Address,
        amount: Amount,
    },
    /// Custody to receiver
    Out {
        asset: AssetId,
        to: Address,
        amount: Amount,
    },
}

impl TransferLeg {
    /// Asset moved by this leg
    pub fn asset(&self) -> AssetId {
        match self {
            TransferLeg::In { asset, .. } | TransferLeg::Out { asset, .. } => *asset,
        }
    }

    /// Amount moved by this leg
    pub fn amount(&self) -> Amount {
        match self {
            TransferLeg::In { amount, .. } | TransferLeg::Out { amount, .. } => *amount,
        }
    }

    /// The leg that undoes this one
    fn reversed(&self) -> TransferLeg {
        match *self {
            TransferLeg::In { asset, from, amount } => TransferLeg::Out {
                asset,
                to: from,
                amount,
            },
            TransferLeg::Out { asset, to, amount } => TransferLeg::In {
                asset,
                from: to,
                amount,
            },
        }
    }
}

/// Executes transfer legs and remembers them until commit
///
/// Dropping the journal without calling [`TransferJournal::commit`] keeps
/// the completed legs; callers must either commit or roll back explicitly.
pub struct TransferJournal<'a, T: AssetTransfer + ?Sized> {
    transfers: &'a T,
    custody: Address,
    completed: Vec<TransferLeg>,
}

impl<'a, T: AssetTransfer + ?Sized> TransferJournal<'a, T> {
    /// Start an empty journal against `custody`
    pub fn new(transfers: &'a T, custody: Address) -> Self {
        Self {
            transfers,
            custody,
            completed: Vec::with_capacity(2),
        }
    }

    /// Execute one leg; zero-amount legs are skipped
    ///
    /// # Errors
    /// - `TransferFailed`: the capability rejected the leg. Earlier legs are
    ///   still recorded and must be rolled back by the caller.
    pub fn execute(&mut self, leg: TransferLeg) -> AmmResult<()> {
        if leg.amount() == 0 {
            return Ok(());
        }
        tracing::debug!("Transfer leg: {:?}", leg);

        self.run(&leg).map_err(|source| AmmError::TransferFailed {
            asset: leg.asset(),
            source,
        })?;
        self.completed.push(leg);
        Ok(())
    }

    /// Legs that have completed so far
    pub fn completed(&self) -> &[TransferLeg] {
        &self.completed
    }

    /// Keep every completed leg
    pub fn commit(self) -> Vec<TransferLeg> {
        self.completed
    }

    /// Undo completed legs in reverse order
    ///
    /// Returns the number of compensations that failed; each failure leaves
    /// custody out of step with the ledger and is logged at error level.
    pub fn rollback(mut self) -> usize {
        let mut failures = 0;
        while let Some(leg) = self.completed.pop() {
            let undo = leg.reversed();
            if let Err(e) = self.run(&undo) {
                failures += 1;
                tracing::error!(
                    "Compensation failed: could not undo {:?} with {:?}: {}",
                    leg,
                    undo,
                    e
                );
            }
        }
        failures
    }

    fn run(&self, leg: &TransferLeg) -> Result<(), TransferError> {
        match leg {
            TransferLeg::In { asset, from, amount } => {
                self.transfers.transfer_in(asset, from, &self.custody, *amount)
            }
            TransferLeg::Out { asset, to, amount } => {
                self.transfers.transfer_out(asset, to, *amount)
            }
        }
    }
}

// ============================================================================
// IN-MEMORY BALANCES
// ============================================================================

/// In-process balance book implementing [`AssetTransfer`]
///
/// `transfer_out` always debits the custody account given at construction.
#[derive(Debug, Default)]
pub struct InMemoryBalances {
    custody: Address,
    balances: RwLock<HashMap<(AssetId, Address), Amount>>,
}

impl InMemoryBalances {
    /// Create an empty balance book with the given custody account
    pub fn new(custody: Address) -> Self {
        Self {
            custody,
            balances: RwLock::new(HashMap::new()),
        }
    }

    /// Custody account debited by `transfer_out`
    pub fn custody(&self) -> Address {
        self.custody
    }

    /// Balance of `holder` in `asset`
    pub fn balance_of(&self, asset: &AssetId, holder: &Address) -> Amount {
        self.balances
            .read()
            .get(&(*asset, *holder))
            .copied()
            .unwrap_or(0)
    }

    /// Credit `holder` out of thin air (funding accounts in tests and genesis)
    pub fn mint(&self, asset: &AssetId, holder: &Address, amount: Amount) {
        let mut balances = self.balances.write();
        let balance = balances.entry((*asset, *holder)).or_insert(0);
        *balance = balance.saturating_add(amount);
    }

    fn move_balance(
        &self,
        asset: &AssetId,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), TransferError> {
        let mut balances = self.balances.write();

        let have = balances.get(&(*asset, *from)).copied().unwrap_or(0);
        if have < amount {
            return Err(TransferError::InsufficientBalance { have, need: amount });
        }
        let to_balance = balances.get(&(*asset, *to)).copied().unwrap_or(0);
        let credited = to_balance
            .checked_add(amount)
            .ok_or_else(|| TransferError::Rejected("recipient balance overflow".to_string()))?;

        balances.insert((*asset, *from), have - amount);
        balances.insert((*asset, *to), credited);
        Ok(())
    }
}

impl AssetTransfer for InMemoryBalances {
    fn transfer_in(
        &self,
        asset: &AssetId,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), TransferError> {
        self.move_balance(asset, from, to, amount)
    }

    fn transfer_out(
        &self,
        asset: &AssetId,
        to: &Address,
        amount: Amount,
    ) -> Result<(), TransferError> {
        let custody = self.custody;
        self.move_balance(asset, &custody, to, amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(id: u8) -> AssetId {
        AssetId::new([id; 32])
    }

    fn account(id: u8) -> Address {
        Address::new([id; 32])
    }

    #[test]
    fn test_balances_move() {
        let book = InMemoryBalances::new(account(100));
        book.mint(&asset(1), &account(1), 1_000);

        book.transfer_in(&asset(1), &account(1), &account(100), 400).unwrap();
        book.transfer_out(&asset(1), &account(2), 150).unwrap();

        assert_eq!(book.balance_of(&asset(1), &account(1)), 600);
        assert_eq!(book.balance_of(&asset(1), &account(100)), 250);
        assert_eq!(book.balance_of(&asset(1), &account(2)), 150);
    }

    #[test]
    fn test_balances_insufficient() {
        let book = InMemoryBalances::new(account(100));
        book.mint(&asset(1), &account(1), 10);

        let result = book.transfer_in(&asset(1), &account(1), &account(100), 11);
        assert_eq!(result, Err(TransferError::InsufficientBalance { have: 10, need: 11 }));
        assert_eq!(book.balance_of(&asset(1), &account(1)), 10);
    }

    #[test]
    fn test_journal_rollback_restores_balances() {
        let book = InMemoryBalances::new(account(100));
        book.mint(&asset(1), &account(1), 500);
        book.mint(&asset(2), &account(1), 5);

        let mut journal = TransferJournal::new(&book, account(100));
        journal
            .execute(TransferLeg::In { asset: asset(1), from: account(1), amount: 500 })
            .unwrap();
        let err = journal
            .execute(TransferLeg::In { asset: asset(2), from: account(1), amount: 50 })
            .unwrap_err();

        assert!(matches!(err, AmmError::TransferFailed { asset, .. } if asset == self::asset(2)));
        assert_eq!(journal.completed().len(), 1);
        assert_eq!(journal.rollback(), 0);

        assert_eq!(book.balance_of(&asset(1), &account(1)), 500);
        assert_eq!(book.balance_of(&asset(1), &account(100)), 0);
    }

    #[test]
    fn test_journal_skips_zero_legs() {
        let book = InMemoryBalances::new(account(100));
        let mut journal = TransferJournal::new(&book, account(100));

        journal
            .execute(TransferLeg::Out { asset: asset(1), to: account(1), amount: 0 })
            .unwrap();
        assert!(journal.commit().is_empty());
    }

    #[test]
    fn test_journal_reports_failed_compensation() {
        let book = InMemoryBalances::new(account(100));
        book.mint(&asset(1), &account(100), 100);

        let mut journal = TransferJournal::new(&book, account(100));
        journal
            .execute(TransferLeg::Out { asset: asset(1), to: account(1), amount: 100 })
            .unwrap();

        // Receiver spends the funds before the undo runs
        book.transfer_in(&asset(1), &account(1), &account(2), 100).unwrap();
        assert_eq!(journal.rollback(), 1);
    }
}
