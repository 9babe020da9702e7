use crate::append::Append;
use crate::error::Error;
use crate::stats::ShardStats;
use hashbrown::hash_map::Entry;
use hashbrown::HashMap;
use parking_lot::RwLock;
use std::sync::Arc;

/// A single shard: one partition of the keys behind its own read-write lock.
///
/// Every method takes the lock exactly once and releases it before
/// returning. Methods that run a caller closure hold the write lock for the
/// whole call, and the lock is not reentrant.
pub(crate) struct Shard<V> {
    map: RwLock<HashMap<String, Arc<V>>>,
    stats: ShardStats,
}

impl<V> Shard<V>
where
    V: Send + Sync,
{
    pub fn new(capacity: Option<usize>) -> Self {
        let map = match capacity {
            Some(capacity) => HashMap::with_capacity(capacity),
            None => HashMap::new(),
        };
        Self {
            map: RwLock::new(map),
            stats: ShardStats::new(),
        }
    }

    /// Insert or overwrite.
    pub fn set(&self, key: String, value: V) {
        let mut map = self.map.write();
        map.insert(key, Arc::new(value));
        self.stats.record_write();
    }

    /// Get a value by key, returning an Arc to enable zero-copy access.
    pub fn get(&self, key: &str) -> Option<Arc<V>> {
        let map = self.map.read();
        let result = map.get(key).cloned();
        if result.is_some() {
            self.stats.record_read();
        }
        result
    }

    /// Check if a key exists without cloning the value.
    pub fn contains_key(&self, key: &str) -> bool {
        self.map.read().contains_key(key)
    }

    /// Remove a key-value pair, returning the value if it existed.
    pub fn remove(&self, key: &str) -> Option<Arc<V>> {
        let mut map = self.map.write();
        let result = map.remove(key);
        if result.is_some() {
            self.stats.record_remove();
        }
        result
    }

    pub fn set_if_absent(&self, key: String, value: V) -> bool {
        let mut map = self.map.write();
        match map.entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(value));
                self.stats.record_write();
                true
            }
        }
    }

    /// Replace the value only if it currently equals `expected`.
    pub fn set_if_present(&self, key: &str, value: V, expected: &V) -> bool
    where
        V: PartialEq,
    {
        let mut map = self.map.write();
        match map.get_mut(key) {
            Some(slot) if **slot == *expected => {
                *slot = Arc::new(value);
                self.stats.record_write();
                true
            }
            _ => false,
        }
    }

    /// Append to a present value, or store `value` as-is when absent.
    /// Returns whether the key was present.
    pub fn add_if_present(&self, key: String, value: V) -> Result<bool, Error>
    where
        V: Append + Clone,
    {
        let mut map = self.map.write();
        match map.entry(key) {
            Entry::Occupied(mut slot) => {
                if !Arc::make_mut(slot.get_mut()).append_value(value) {
                    return Err(Error::NotAppendable {
                        key: slot.key().clone(),
                    });
                }
                self.stats.record_write();
                Ok(true)
            }
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(value));
                self.stats.record_write();
                Ok(false)
            }
        }
    }

    /// Store `combine(current, value)` under `key` and return what was stored.
    /// `combine` runs exactly once with the write lock held.
    pub fn upsert<F>(&self, key: String, value: V, combine: F) -> Arc<V>
    where
        F: FnOnce(Option<&V>, V) -> V,
    {
        let mut map = self.map.write();
        self.stats.record_write();
        match map.entry(key) {
            Entry::Occupied(mut slot) => {
                let stored = Arc::new(combine(Some(&**slot.get()), value));
                slot.insert(Arc::clone(&stored));
                stored
            }
            Entry::Vacant(slot) => {
                let stored = Arc::new(combine(None, value));
                slot.insert(Arc::clone(&stored));
                stored
            }
        }
    }

    /// Replace the value only if the key is present.
    pub fn update(&self, key: &str, value: V) -> bool {
        let mut map = self.map.write();
        match map.get_mut(key) {
            Some(slot) => {
                *slot = Arc::new(value);
                self.stats.record_write();
                true
            }
            None => false,
        }
    }

    /// Like `upsert`, but `combine` only runs when the key is present.
    pub fn update_with<F>(&self, key: &str, value: V, combine: F) -> bool
    where
        F: FnOnce(&V, V) -> V,
    {
        let mut map = self.map.write();
        match map.get_mut(key) {
            Some(slot) => {
                *slot = Arc::new(combine(&**slot, value));
                self.stats.record_write();
                true
            }
            None => false,
        }
    }

    /// Mutate a value in place, returning the new value if the key existed.
    ///
    /// Note: This requires `V: Clone` because if the value is shared (multiple
    /// `Arc` references exist), it will clone the value before modifying it.
    pub fn modify<F>(&self, key: &str, f: F) -> Option<Arc<V>>
    where
        F: FnOnce(&mut V),
        V: Clone,
    {
        let mut map = self.map.write();
        let slot = map.get_mut(key)?;
        f(Arc::make_mut(slot));
        self.stats.record_write();
        Some(Arc::clone(slot))
    }

    /// Get the number of entries in this shard.
    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.read().is_empty()
    }

    pub fn clear(&self) {
        self.map.write().clear();
    }

    /// Get a snapshot of statistics for this shard.
    pub fn stats(&self) -> crate::stats::ShardOps {
        self.stats.snapshot()
    }

    /// Get a read lock for iteration purposes.
    pub fn read_lock(&self) -> parking_lot::RwLockReadGuard<'_, HashMap<String, Arc<V>>> {
        self.map.read()
    }

    /// Copy this shard's entries (optionally only keys containing `pattern`)
    /// into a buffer sized to the shard, under a single read lock.
    pub fn copy_entries(&self, pattern: Option<&str>) -> Vec<(String, Arc<V>)> {
        let map = self.map.read();
        let mut entries = Vec::with_capacity(map.len());
        for (key, value) in map.iter() {
            if pattern.map_or(true, |p| key.contains(p)) {
                entries.push((key.clone(), Arc::clone(value)));
            }
        }
        entries
    }

    pub fn keys(&self) -> Vec<String> {
        self.map.read().keys().cloned().collect()
    }
}
