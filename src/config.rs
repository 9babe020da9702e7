use crate::error::Error;
use crate::hash::ShardHasher;

/// Shard count used by `Config::default()` and `ConcurrentMap::default()`.
pub const DEFAULT_SHARD_COUNT: usize = 32;

/// Which hash function to use for shard assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashFunction {
    /// 32-bit FNV over the key bytes (default).
    #[default]
    Fnv32,
    /// Use ahash.
    AHash,
}

/// Configuration for a ConcurrentMap instance.
#[derive(Debug, Clone)]
pub struct Config {
    pub(crate) shard_count: usize,
    pub(crate) hash_function: HashFunction,
    pub(crate) capacity_per_shard: Option<usize>,
}

impl Config {
    /// Create a new config with defaults (32 shards, FNV).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of shards. Any count of at least 1 is accepted; keys
    /// are routed with `hash % shard_count`.
    pub fn shard_count(mut self, count: usize) -> Result<Self, Error> {
        if count == 0 {
            return Err(Error::InvalidShardCount);
        }
        self.shard_count = count;
        Ok(self)
    }

    /// Set the hash function to use.
    pub fn hash_function(mut self, hash_fn: HashFunction) -> Self {
        self.hash_function = hash_fn;
        self
    }

    /// Set initial capacity per shard. Total capacity will be approximately
    /// `capacity_per_shard * shard_count`.
    pub fn capacity_per_shard(mut self, capacity: usize) -> Self {
        self.capacity_per_shard = Some(capacity);
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            shard_count: DEFAULT_SHARD_COUNT,
            hash_function: HashFunction::Fnv32,
            capacity_per_shard: None,
        }
    }
}

/// Builder for creating a ConcurrentMap with custom configuration.
///
/// ```rust
/// use cmap::{ConcurrentMapBuilder, HashFunction};
///
/// let map = ConcurrentMapBuilder::new()
///     .shard_count(7)?
///     .hash_function(HashFunction::AHash)
///     .build::<u64>()?;
/// assert_eq!(map.shard_count(), 7);
/// # Ok::<(), cmap::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct ConcurrentMapBuilder {
    config: Config,
}

impl ConcurrentMapBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of shards. Must be greater than 0.
    pub fn shard_count(mut self, count: usize) -> Result<Self, Error> {
        self.config = self.config.shard_count(count)?;
        Ok(self)
    }

    /// Set the hash function to use.
    pub fn hash_function(mut self, hash_fn: HashFunction) -> Self {
        self.config = self.config.hash_function(hash_fn);
        self
    }

    /// Set initial capacity per shard.
    pub fn capacity_per_shard(mut self, capacity: usize) -> Self {
        self.config = self.config.capacity_per_shard(capacity);
        self
    }

    /// Build a ConcurrentMap with the configured settings.
    pub fn build<V>(self) -> Result<crate::ConcurrentMap<V>, Error>
    where
        V: Send + Sync,
    {
        crate::ConcurrentMap::with_config(self.config)
    }
}

/// Create a hash function instance based on the configuration.
pub(crate) fn create_hasher(hash_fn: HashFunction) -> ShardHasher {
    match hash_fn {
        HashFunction::Fnv32 => ShardHasher::Fnv32,
        HashFunction::AHash => ShardHasher::AHash,
    }
}
