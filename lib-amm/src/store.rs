//! Reserve Ledger storage
//!
//! The store holds whole [`Pool`] records keyed by [`PairKey`]. It enforces
//! no business rules: a key that was never written reads back as the empty
//! pool, which is how pools come into existence.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::AmmResult;
use crate::pair::PairKey;
use crate::pool::Pool;

/// Trait for pool storage operations
///
/// Implementations should be provided by the hosting environment's storage
/// layer. Writes replace the whole pool record.
pub trait PoolStore: Send + Sync {
    /// Get a pool, or the empty pool if the key was never written
    fn get(&self, key: &PairKey) -> AmmResult<Pool>;

    /// Replace the pool stored under `key`
    fn put(&self, key: &PairKey, pool: &Pool) -> AmmResult<()>;

    /// Every key that has been written
    fn keys(&self) -> AmmResult<Vec<PairKey>>;
}

/// In-memory pool store
///
/// Thread-safe HashMap wrapped in Arc<RwLock> for concurrent access.
/// All data is lost on process termination.
#[derive(Clone, Debug, Default)]
pub struct MemoryPoolStore {
    pools: Arc<RwLock<HashMap<PairKey, Pool>>>,
}

impl MemoryPoolStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pools that have been written
    pub fn len(&self) -> usize {
        self.pools.read().len()
    }

    /// Whether no pool has been written yet
    pub fn is_empty(&self) -> bool {
        self.pools.read().is_empty()
    }
}

impl PoolStore for MemoryPoolStore {
    fn get(&self, key: &PairKey) -> AmmResult<Pool> {
        Ok(self.pools.read().get(key).cloned().unwrap_or_default())
    }

    fn put(&self, key: &PairKey, pool: &Pool) -> AmmResult<()> {
        self.pools.write().insert(*key, pool.clone());
        Ok(())
    }

    fn keys(&self) -> AmmResult<Vec<PairKey>> {
        let mut keys: Vec<PairKey> = self.pools.read().keys().copied().collect();
        keys.sort();
        Ok(keys)
    }
}

impl<S: PoolStore + ?Sized> PoolStore for Arc<S> {
    fn get(&self, key: &PairKey) -> AmmResult<Pool> {
        (**self).get(key)
    }

    fn put(&self, key: &PairKey, pool: &Pool) -> AmmResult<()> {
        (**self).put(key, pool)
    }

    fn keys(&self) -> AmmResult<Vec<PairKey>> {
        (**self).keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lib_types::{Address, AssetId};

    fn key(a: u8, b: u8) -> PairKey {
        crate::pair::canon(&AssetId::new([a; 32]), &AssetId::new([b; 32]))
            .unwrap()
            .0
    }

    #[test]
    fn test_missing_key_reads_empty_pool() {
        let store = MemoryPoolStore::new();
        assert_eq!(store.get(&key(1, 2)).unwrap(), Pool::default());
        assert!(store.is_empty());
    }

    #[test]
    fn test_put_replaces_whole_pool() {
        let store = MemoryPoolStore::new();
        let mut pool = Pool::default();
        pool.deposit(0, 10).unwrap();
        pool.deposit(1, 20).unwrap();
        pool.credit(Address::new([9u8; 32]), 14).unwrap();

        store.put(&key(1, 2), &pool).unwrap();
        assert_eq!(store.get(&key(2, 1)).unwrap(), pool);

        store.put(&key(1, 2), &Pool::default()).unwrap();
        assert_eq!(store.get(&key(1, 2)).unwrap(), Pool::default());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_keys_lists_written_pairs() {
        let store = MemoryPoolStore::new();
        store.put(&key(1, 2), &Pool::default()).unwrap();
        store.put(&key(1, 3), &Pool::default()).unwrap();

        let keys = store.keys().unwrap();
        assert_eq!(keys.len(), 2);
        assert!(keys.contains(&key(3, 1)));
    }

    #[test]
    fn test_shared_handle_sees_writes() {
        let store = Arc::new(MemoryPoolStore::new());
        let handle = Arc::clone(&store);

        let mut pool = Pool::default();
        pool.deposit(0, 1).unwrap();
        handle.put(&key(4, 5), &pool).unwrap();

        assert_eq!(PoolStore::get(&store, &key(4, 5)).unwrap().reserves, [1, 0]);
    }
}
