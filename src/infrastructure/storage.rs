//! Storage implementations for entity state.
//!
//! Two backends implement the `Storage` port:
//! - [`SingleLockStorage`]: one reader-writer lock over the whole map. Every
//!   decision is serialized against every other, which is the default.
//! - [`ShardedStorage`]: DashMap shards. Decisions for one key remain atomic
//!   but different keys no longer contend on a single lock.

use crate::application::ports::Storage;
use ahash::RandomState;
use dashmap::DashMap;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Map guarded by a single `RwLock`.
///
/// A panic inside an accessor poisons the lock; the next caller recovers the
/// map as-is rather than propagating the panic.
#[derive(Debug)]
pub struct SingleLockStorage<K, V> {
    map: RwLock<HashMap<K, V, RandomState>>,
}

impl<K, V> SingleLockStorage<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            map: RwLock::new(HashMap::with_hasher(RandomState::new())),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<K, V, RandomState>> {
        self.map.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<K, V, RandomState>> {
        self.map.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<K, V> Default for SingleLockStorage<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Storage<K, V> for SingleLockStorage<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + Debug,
    V: Send + Sync + Debug,
{
    fn with_entry_mut<F, R>(&self, key: &K, factory: impl FnOnce() -> V, accessor: F) -> R
    where
        F: FnOnce(&mut V) -> R,
    {
        let mut map = self.write();
        if let Some(value) = map.get_mut(key) {
            return accessor(value);
        }
        let value = map.entry(key.clone()).or_insert_with(factory);
        accessor(value)
    }

    fn with_entry<F, R>(&self, key: &K, accessor: F) -> Option<R>
    where
        F: FnOnce(&V) -> R,
    {
        self.read().get(key).map(accessor)
    }

    fn len(&self) -> usize {
        self.read().len()
    }

    fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn clear(&self) {
        self.write().clear();
    }

    fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&K, &V),
    {
        for (key, value) in self.read().iter() {
            f(key, value);
        }
    }

    fn retain<F>(&self, f: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        self.write().retain(f);
    }
}

/// Thread-safe sharded storage backed by DashMap.
///
/// DashMap provides fine-grained locking per shard, so unrelated entities
/// never wait on each other.
#[derive(Debug)]
pub struct ShardedStorage<K, V>
where
    K: Eq + Hash,
{
    map: DashMap<K, V, RandomState>,
}

impl<K, V> ShardedStorage<K, V>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self {
            map: DashMap::with_hasher(RandomState::new()),
        }
    }
}

impl<K, V> Default for ShardedStorage<K, V>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Storage<K, V> for ShardedStorage<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + Debug,
    V: Send + Sync + Debug,
{
    fn with_entry_mut<F, R>(&self, key: &K, factory: impl FnOnce() -> V, accessor: F) -> R
    where
        F: FnOnce(&mut V) -> R,
    {
        if let Some(mut value) = self.map.get_mut(key) {
            return accessor(&mut value);
        }
        let mut value = self.map.entry(key.clone()).or_insert_with(factory);
        accessor(&mut value)
    }

    fn with_entry<F, R>(&self, key: &K, accessor: F) -> Option<R>
    where
        F: FnOnce(&V) -> R,
    {
        self.map.get(key).map(|value| accessor(&value))
    }

    fn len(&self) -> usize {
        self.map.len()
    }

    fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    fn clear(&self) {
        self.map.clear()
    }

    fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&K, &V),
    {
        for entry in self.map.iter() {
            f(entry.key(), entry.value());
        }
    }

    fn retain<F>(&self, f: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        self.map.retain(f);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn exercise<S: Storage<String, u32>>(storage: &S) {
        assert!(storage.is_empty());
        assert_eq!(storage.with_entry(&"a".to_string(), |v| *v), None);

        let first = storage.with_entry_mut(&"a".to_string(), || 10, |v| {
            *v += 1;
            *v
        });
        assert_eq!(first, 11);

        // Factory is not consulted for existing keys.
        let second = storage.with_entry_mut(&"a".to_string(), || 0, |v| *v);
        assert_eq!(second, 11);

        storage.with_entry_mut(&"b".to_string(), || 1, |_| ());
        assert_eq!(storage.len(), 2);

        let mut sum = 0;
        storage.for_each(|_, v| sum += *v);
        assert_eq!(sum, 12);

        storage.retain(|k, _| k == "b");
        assert_eq!(storage.len(), 1);
        assert_eq!(storage.with_entry(&"b".to_string(), |v| *v), Some(1));

        storage.clear();
        assert!(storage.is_empty());
    }

    #[test]
    fn test_single_lock_operations() {
        exercise(&SingleLockStorage::new());
    }

    #[test]
    fn test_sharded_operations() {
        exercise(&ShardedStorage::new());
    }

    #[test]
    fn test_arc_forwarding() {
        exercise(&Arc::new(SingleLockStorage::new()));
        exercise(&Arc::new(ShardedStorage::new()));
    }

    #[test]
    fn test_single_lock_recovers_from_poison() {
        let storage = Arc::new(SingleLockStorage::<String, u32>::new());
        let clone = Arc::clone(&storage);

        let result = thread::spawn(move || {
            clone.with_entry_mut(&"k".to_string(), || 1, |_| panic!("boom"));
        })
        .join();
        assert!(result.is_err());

        assert_eq!(storage.len(), 1);
        storage.with_entry_mut(&"k".to_string(), || 0, |v| *v += 1);
        assert_eq!(storage.with_entry(&"k".to_string(), |v| *v), Some(2));
    }

    #[test]
    fn test_concurrent_increments() {
        let storage = Arc::new(SingleLockStorage::<String, u64>::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let storage = Arc::clone(&storage);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        storage.with_entry_mut(&"shared".to_string(), || 0, |v| *v += 1);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(storage.with_entry(&"shared".to_string(), |v| *v), Some(8000));
    }
}
