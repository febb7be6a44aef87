//! Per-pair operation locks.
//!
//! Every pool operation runs under its pair's mutex from first read to
//! commit, so operations on one pair are serialized while different pairs
//! proceed independently. An entry lives only while some operation holds
//! or waits on it.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use crate::pair::PairKey;

#[derive(Debug, Default)]
pub struct PairLocks {
    table: Mutex<HashMap<PairKey, Arc<Mutex<()>>>>,
}

impl PairLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock for `key`
    pub fn with_pair<R>(&self, key: &PairKey, f: impl FnOnce() -> R) -> R {
        let handle = self.handle(key);
        let result = {
            let _guard = handle.lock();
            f()
        };
        self.release(key, handle);
        result
    }

    /// Number of pairs currently locked or waited on
    pub fn len(&self) -> usize {
        self.table.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.lock().is_empty()
    }

    fn handle(&self, key: &PairKey) -> Arc<Mutex<()>> {
        Arc::clone(self.table.lock().entry(*key).or_default())
    }

    /// Drop our handle and remove the entry if nobody else holds one.
    /// Handles are only cloned under the table lock, so the count is stable here.
    fn release(&self, key: &PairKey, handle: Arc<Mutex<()>>) {
        let mut table = self.table.lock();
        drop(handle);
        if table.get(key).is_some_and(|h| Arc::strong_count(h) == 1) {
            table.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn test_entry_removed_after_use() {
        let locks = PairLocks::new();
        let value = locks.with_pair(&PairKey([1u8; 32]), || {
            assert_eq!(locks.len(), 1);
            7
        });

        assert_eq!(value, 7);
        assert!(locks.is_empty());
    }

    #[test]
    fn test_distinct_pairs_do_not_block() {
        let locks = PairLocks::new();
        locks.with_pair(&PairKey([1u8; 32]), || {
            locks.with_pair(&PairKey([2u8; 32]), || assert_eq!(locks.len(), 2));
        });
        assert!(locks.is_empty());
    }

    #[test]
    fn test_same_pair_is_serialized() {
        let locks = PairLocks::new();
        let inside = AtomicUsize::new(0);
        let max_seen = AtomicUsize::new(0);

        thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..100 {
                        locks.with_pair(&PairKey([9u8; 32]), || {
                            let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                            max_seen.fetch_max(now, Ordering::SeqCst);
                            inside.fetch_sub(1, Ordering::SeqCst);
                        });
                    }
                });
            }
        });

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert!(locks.is_empty());
    }
}
