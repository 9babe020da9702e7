//! Statistics and diagnostics types.

#[cfg(feature = "metrics")]
use std::sync::atomic::{AtomicU64, Ordering};

/// Per-shard operation statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShardOps {
    /// Number of successful lookups on this shard.
    pub reads: u64,
    /// Number of writes (inserts, replacements, upserts) on this shard.
    pub writes: u64,
    /// Number of removals on this shard.
    pub removes: u64,
}

/// Thread-safe statistics tracker for a single shard.
#[cfg(feature = "metrics")]
pub(crate) struct ShardStats {
    reads: AtomicU64,
    writes: AtomicU64,
    removes: AtomicU64,
}

#[cfg(feature = "metrics")]
impl ShardStats {
    pub fn new() -> Self {
        Self {
            reads: AtomicU64::new(0),
            writes: AtomicU64::new(0),
            removes: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_read(&self) {
        self.reads.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_remove(&self) {
        self.removes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ShardOps {
        ShardOps {
            reads: self.reads.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            removes: self.removes.load(Ordering::Relaxed),
        }
    }
}

/// Zero-sized placeholder when metrics are disabled.
#[cfg(not(feature = "metrics"))]
pub(crate) struct ShardStats;

#[cfg(not(feature = "metrics"))]
impl ShardStats {
    pub fn new() -> Self {
        ShardStats
    }

    #[inline]
    pub fn record_read(&self) {}

    #[inline]
    pub fn record_write(&self) {}

    #[inline]
    pub fn record_remove(&self) {}

    pub fn snapshot(&self) -> ShardOps {
        ShardOps::default()
    }
}

/// Aggregate statistics for a ConcurrentMap instance.
///
/// Sizes are read shard by shard, so under concurrent writes the figures are
/// a best-effort view rather than a global snapshot.
#[derive(Debug, Clone)]
pub struct Stats {
    /// Total number of entries across all shards.
    pub size: usize,
    /// Number of entries in each shard.
    pub shard_sizes: Vec<usize>,
    /// Operation counts for each shard (all zero without the `metrics` feature).
    pub operations: Vec<ShardOps>,
}

impl Stats {
    /// Largest shard size divided by the mean shard size.
    ///
    /// Returns 0.0 for an empty map.
    pub fn max_load_ratio(&self) -> f64 {
        if self.size == 0 || self.shard_sizes.is_empty() {
            return 0.0;
        }
        let avg = self.size as f64 / self.shard_sizes.len() as f64;
        let max = self.shard_sizes.iter().copied().max().unwrap_or(0);
        max as f64 / avg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_ratio_of_even_distribution_is_one() {
        let stats = Stats {
            size: 8,
            shard_sizes: vec![2, 2, 2, 2],
            operations: vec![ShardOps::default(); 4],
        };
        assert!((stats.max_load_ratio() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn load_ratio_of_empty_map_is_zero() {
        let stats = Stats {
            size: 0,
            shard_sizes: vec![0; 4],
            operations: vec![ShardOps::default(); 4],
        };
        assert_eq!(stats.max_load_ratio(), 0.0);
    }
}
