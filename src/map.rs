use crate::append::Append;
use crate::config::{create_hasher, Config};
use crate::error::Error;
use crate::hash::ShardHasher;
use crate::iter::{Iter, Snapshot};
use crate::shard::Shard;
use crate::stats::{ShardOps, Stats};
use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Thread-safe map from `String` keys to values of type `V`, split into a
/// fixed number of independently locked shards.
///
/// A key always lives in shard `hash(key) % shard_count`. Single-key
/// operations lock only that shard and are atomic with respect to it.
/// Aggregate operations (`count`, `keys`, `items`, `mset`, `for_each`, the
/// iterators) visit shards one lock at a time and give no cross-shard
/// consistency. Values are stored as `Arc<V>` so reads and snapshots share
/// them without copying.
///
/// # Callbacks and reentrancy
///
/// [`upsert`](Self::upsert), [`update_with`](Self::update_with) and
/// [`modify`](Self::modify) run the caller's closure while holding the
/// shard's write lock. The closure receives the current value directly and
/// must not call back into the same map: the lock is not reentrant and doing
/// so deadlocks. The same applies to [`for_each`](Self::for_each) and
/// [`for_each_concurrent`](Self::for_each_concurrent), which hold a read lock
/// while their closure runs.
///
/// # Example
///
/// ```rust
/// use cmap::ConcurrentMap;
///
/// let map = ConcurrentMap::new(16)?;
/// map.set("elephant", 1);
/// assert_eq!(*map.get("elephant").unwrap(), 1);
/// assert!(map.get("monkey").is_none());
/// # Ok::<(), cmap::Error>(())
/// ```
pub struct ConcurrentMap<V> {
    shards: Arc<[Shard<V>]>,
    hash: ShardHasher,
}

impl<V> ConcurrentMap<V>
where
    V: Send + Sync,
{
    /// Create a map with `shard_count` shards and the default hash.
    ///
    /// Fails with [`Error::InvalidShardCount`] when `shard_count` is 0.
    pub fn new(shard_count: usize) -> Result<Self, Error> {
        Self::with_config(Config::new().shard_count(shard_count)?)
    }

    /// Create a new map with custom config.
    pub fn with_config(config: Config) -> Result<Self, Error> {
        if config.shard_count == 0 {
            return Err(Error::InvalidShardCount);
        }
        Ok(Self::from_config(&config))
    }

    fn from_config(config: &Config) -> Self {
        let shards: Vec<Shard<V>> = (0..config.shard_count)
            .map(|_| Shard::new(config.capacity_per_shard))
            .collect();
        debug!(
            shard_count = config.shard_count,
            hash = ?config.hash_function,
            "created concurrent map"
        );

        Self {
            shards: shards.into(),
            hash: create_hasher(config.hash_function),
        }
    }

    /// Index of the shard that owns `key`. Stable for the map's lifetime.
    #[inline]
    pub fn shard_index(&self, key: &str) -> usize {
        (self.hash.hash_key(key) % self.shards.len() as u64) as usize
    }

    #[inline]
    fn shard(&self, key: &str) -> &Shard<V> {
        &self.shards[self.shard_index(key)]
    }

    /// Number of shards, fixed at construction.
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Insert or overwrite the value under `key`.
    pub fn set(&self, key: impl Into<String>, value: V) {
        let key = key.into();
        self.shard(&key).set(key, value);
    }

    /// Apply [`set`](Self::set) for every pair.
    ///
    /// Each pair takes its own shard lock, so the batch as a whole is not
    /// atomic and a concurrent reader may see part of it.
    pub fn mset<I, K>(&self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
    {
        for (key, value) in entries {
            self.set(key, value);
        }
    }

    /// Get a value by key. Returns an `Arc<V>` so you can share it without copying.
    pub fn get(&self, key: &str) -> Option<Arc<V>> {
        self.shard(key).get(key)
    }

    /// Whether `key` is present.
    pub fn has(&self, key: &str) -> bool {
        self.shard(key).contains_key(key)
    }

    /// Remove `key`. No-op if it is absent.
    pub fn remove(&self, key: &str) {
        self.shard(key).remove(key);
    }

    /// Atomically remove `key` and return the value it held.
    ///
    /// ```rust
    /// use cmap::ConcurrentMap;
    ///
    /// let map = ConcurrentMap::new(4)?;
    /// map.set("monkey", "banana");
    /// assert_eq!(*map.pop("monkey").unwrap(), "banana");
    /// assert!(map.pop("monkey").is_none());
    /// # Ok::<(), cmap::Error>(())
    /// ```
    pub fn pop(&self, key: &str) -> Option<Arc<V>> {
        self.shard(key).remove(key)
    }

    /// Insert only if `key` is missing. Returns whether the insert happened.
    pub fn set_if_absent(&self, key: impl Into<String>, value: V) -> bool {
        let key = key.into();
        self.shard(&key).set_if_absent(key, value)
    }

    /// Compare-and-swap: replace the value under `key` with `value` only if
    /// it currently equals `expected`. Returns whether the swap happened.
    ///
    /// ```rust
    /// use cmap::ConcurrentMap;
    ///
    /// let map = ConcurrentMap::new(4)?;
    /// map.set("stock", 10);
    /// assert!(!map.set_if_present("stock", 9, &11));
    /// assert!(map.set_if_present("stock", 9, &10));
    /// assert_eq!(*map.get("stock").unwrap(), 9);
    /// # Ok::<(), cmap::Error>(())
    /// ```
    pub fn set_if_present(&self, key: &str, value: V, expected: &V) -> bool
    where
        V: PartialEq,
    {
        self.shard(key).set_if_present(key, value, expected)
    }

    /// Append `value` to the sequence stored under `key`, or store `value`
    /// itself when the key is absent. Returns whether the key was present.
    ///
    /// Fails with [`Error::NotAppendable`] if the stored value rejects the
    /// append; the stored value is left as it was.
    ///
    /// ```rust
    /// use cmap::ConcurrentMap;
    /// use serde_json::json;
    ///
    /// let map = ConcurrentMap::new(4)?;
    /// assert!(!map.add_if_present("zoo", json!(["lion"]))?);
    /// assert!(map.add_if_present("zoo", json!("tiger"))?);
    /// assert_eq!(*map.get("zoo").unwrap(), json!(["lion", "tiger"]));
    ///
    /// map.set("name", json!("savanna"));
    /// assert!(map.add_if_present("name", json!("x")).is_err());
    /// # Ok::<(), cmap::Error>(())
    /// ```
    pub fn add_if_present(&self, key: impl Into<String>, value: V) -> Result<bool, Error>
    where
        V: Append + Clone,
    {
        let key = key.into();
        let result = self.shard(&key).add_if_present(key, value);
        if let Err(Error::NotAppendable { key }) = &result {
            warn!(%key, "append rejected by stored value");
        }
        result
    }

    /// Insert or update through `combine`, atomically.
    ///
    /// `combine` receives the current value (`None` when absent) and `value`,
    /// is called exactly once, and its result is stored and returned. It runs
    /// under the shard's write lock and must not touch this map.
    ///
    /// ```rust
    /// use cmap::ConcurrentMap;
    ///
    /// let map = ConcurrentMap::new(4)?;
    /// let push = |current: Option<&Vec<String>>, new: Vec<String>| -> Vec<String> {
    ///     match current {
    ///         Some(existing) => existing.iter().cloned().chain(new).collect(),
    ///         None => new,
    ///     }
    /// };
    /// map.upsert("marine", vec!["dolphin".to_string()], push);
    /// let stored = map.upsert("marine", vec!["whale".to_string()], push);
    /// assert_eq!(*stored, vec!["dolphin", "whale"]);
    /// # Ok::<(), cmap::Error>(())
    /// ```
    pub fn upsert<F>(&self, key: impl Into<String>, value: V, combine: F) -> Arc<V>
    where
        F: FnOnce(Option<&V>, V) -> V,
    {
        let key = key.into();
        self.shard(&key).upsert(key, value, combine)
    }

    /// Replace the value only if `key` is present. Returns whether it was.
    pub fn update(&self, key: &str, value: V) -> bool {
        self.shard(key).update(key, value)
    }

    /// Like [`upsert`](Self::upsert), but only acts when `key` is present.
    /// `combine` is not called for an absent key. Returns whether it acted.
    pub fn update_with<F>(&self, key: &str, value: V, combine: F) -> bool
    where
        F: FnOnce(&V, V) -> V,
    {
        self.shard(key).update_with(key, value, combine)
    }

    /// Mutate a value in place, returning the new value if the key existed.
    ///
    /// Note: This requires `V: Clone` because if the value is shared (multiple
    /// `Arc` references exist), it will clone the value before modifying it.
    ///
    /// ```rust
    /// use cmap::ConcurrentMap;
    ///
    /// let map = ConcurrentMap::new(4)?;
    /// map.set("counter", 0);
    ///
    /// map.modify("counter", |v| *v += 1);
    /// assert_eq!(*map.get("counter").unwrap(), 1);
    /// # Ok::<(), cmap::Error>(())
    /// ```
    pub fn modify<F>(&self, key: &str, f: F) -> Option<Arc<V>>
    where
        F: FnOnce(&mut V),
        V: Clone,
    {
        self.shard(key).modify(key, f)
    }

    /// Total number of entries, summed shard by shard.
    ///
    /// Not a global snapshot: a write between two shard visits may or may
    /// not be counted.
    pub fn count(&self) -> usize {
        self.shards.iter().map(|shard| shard.len()).sum()
    }

    /// Alias for [`count`](Self::count).
    pub fn len(&self) -> usize {
        self.count()
    }

    /// Check if the map is empty.
    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|shard| shard.is_empty())
    }

    /// Remove every entry, one shard at a time.
    pub fn clear(&self) {
        for shard in self.shards.iter() {
            shard.clear();
        }
    }

    /// All keys, gathered from every shard in parallel.
    pub fn keys(&self) -> Vec<String> {
        self.shards
            .par_iter()
            .flat_map_iter(|shard| shard.keys())
            .collect()
    }

    /// Buffered snapshot of every entry. See [`Snapshot`].
    ///
    /// ```rust
    /// use cmap::ConcurrentMap;
    ///
    /// let map = ConcurrentMap::new(8)?;
    /// map.set("key1", "value1");
    /// map.set("key2", "value2");
    ///
    /// let snapshot = map.iter_buffered();
    /// assert_eq!(snapshot.len(), 2);
    /// # Ok::<(), cmap::Error>(())
    /// ```
    pub fn iter_buffered(&self) -> Snapshot<V> {
        Snapshot::capture(&self.shards, None)
    }

    /// Buffered snapshot of the entries whose key contains `pattern`.
    pub fn iter_buffered_like(&self, pattern: &str) -> Snapshot<V> {
        Snapshot::capture(&self.shards, Some(pattern))
    }

    /// Lazily merged iterator over every entry. See [`Iter`].
    ///
    /// Dropping it early is safe and releases its producers.
    pub fn iter(&self) -> Iter<V>
    where
        V: 'static,
    {
        Iter::spawn(&self.shards)
    }

    /// Flatten the map into a single table.
    pub fn items(&self) -> HashMap<String, Arc<V>> {
        self.iter_buffered().collect()
    }

    /// Flatten the entries whose key contains `pattern` into a single table.
    pub fn items_like(&self, pattern: &str) -> HashMap<String, Arc<V>> {
        self.iter_buffered_like(pattern).collect()
    }

    /// Call `f` for every entry, shard by shard.
    ///
    /// Each shard's read lock is held while `f` runs over that shard, so `f`
    /// sees a consistent view of one shard at a time.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&str, &V),
    {
        for shard in self.shards.iter() {
            let map = shard.read_lock();
            for (key, value) in map.iter() {
                f(key, value);
            }
        }
    }

    /// Like [`for_each`](Self::for_each), but all shards are visited in
    /// parallel, so `f` is invoked concurrently from several threads.
    pub fn for_each_concurrent<F>(&self, f: F)
    where
        F: Fn(&str, &V) + Sync,
    {
        self.shards.par_iter().for_each(|shard| {
            let map = shard.read_lock();
            for (key, value) in map.iter() {
                f(key, value);
            }
        });
    }

    /// Number of entries in each shard.
    pub fn shard_loads(&self) -> Vec<usize> {
        self.shards.iter().map(|shard| shard.len()).collect()
    }

    /// Get detailed statistics about the map and its shards.
    pub fn stats(&self) -> Stats {
        let shard_sizes = self.shard_loads();
        let operations: Vec<ShardOps> = self.shards.iter().map(|s| s.stats()).collect();
        let size: usize = shard_sizes.iter().sum();

        Stats {
            size,
            shard_sizes,
            operations,
        }
    }
}

impl<V> Default for ConcurrentMap<V>
where
    V: Send + Sync,
{
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}
