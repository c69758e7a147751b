//! Central registry for per-entity throttling state.
//!
//! The registry is the only place entity state is created (lazily, on first
//! sight of a key) and, through [`EntityRegistry::cleanup`], destroyed.

use crate::application::ports::{Clock, Storage};
use crate::domain::{entity::EntityKey, state::EntityState};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Registry managing all entity throttling state.
///
/// Uses the Storage port for concurrent access.
///
/// This type is generic over the storage implementation. In production, use
/// `Arc<SingleLockStorage>`; `Arc<ShardedStorage>` trades cross-key
/// linearizability for less contention.
#[derive(Clone)]
pub struct EntityRegistry<S>
where
    S: Storage<EntityKey, EntityState> + Clone,
{
    storage: S,
    clock: Arc<dyn Clock>,
}

impl<S> EntityRegistry<S>
where
    S: Storage<EntityKey, EntityState> + Clone,
{
    /// Create a new registry over a storage backend and a clock.
    pub fn new(storage: S, clock: Arc<dyn Clock>) -> Self {
        Self { storage, clock }
    }

    /// Current time according to the registry's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Access or create the state for an entity.
    ///
    /// If this is the first time seeing this key, fresh state is created.
    /// The callback runs inside the storage lock.
    pub fn with_entity_state<F, R>(&self, key: &EntityKey, f: F) -> R
    where
        F: FnOnce(&mut EntityState) -> R,
    {
        self.storage.with_entry_mut(key, EntityState::new, f)
    }

    /// Read the state for an entity without creating it.
    pub fn inspect<F, R>(&self, key: &EntityKey, f: F) -> Option<R>
    where
        F: FnOnce(&EntityState) -> R,
    {
        self.storage.with_entry(key, f)
    }

    /// Returns true if state exists for the entity.
    pub fn contains(&self, key: &EntityKey) -> bool {
        self.inspect(key, |_| ()).is_some()
    }

    /// Get the number of tracked entities.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Clear all tracked state.
    pub fn clear(&self) {
        self.storage.clear();
    }

    /// Iterate over all entity states with a callback.
    pub fn for_each<F>(&self, f: F)
    where
        F: FnMut(&EntityKey, &EntityState),
    {
        self.storage.for_each(f);
    }

    /// Remove entities for which the predicate returns false.
    pub fn cleanup<F>(&self, f: F)
    where
        F: FnMut(&EntityKey, &mut EntityState) -> bool,
    {
        self.storage.retain(f);
    }
}
