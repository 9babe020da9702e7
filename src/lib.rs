//! # cmap
//!
//! A thread-safe, string-keyed map for many threads sharing one table.
//!
//! Keys are split across a fixed number of shards, each behind its own
//! read-write lock, so operations on different shards never block each
//! other. A key is routed to shard `fnv32(key) % shard_count` for the whole
//! life of the map. Values are stored behind `Arc<V>` so reads share them
//! without copying.
//!
//! ## Guarantees
//!
//! - Every single-key operation (`set`, `get`, `pop`, `set_if_absent`,
//!   `set_if_present`, `add_if_present`, `upsert`, `update`, `update_with`)
//!   takes one shard lock once and is atomic with respect to that shard.
//! - Aggregate operations (`count`, `keys`, `items`, `mset`, `for_each`,
//!   the iterators) never hold more than one shard lock at a time. Each
//!   shard is seen consistently, the map as a whole is not.
//! - Closures passed to `upsert`, `update_with`, `modify` and `for_each` run
//!   under a shard lock and must not call back into the map. The locks are
//!   not reentrant; doing so deadlocks.
//!
//! ## Example
//!
//! ```rust
//! use cmap::ConcurrentMap;
//!
//! let map = ConcurrentMap::new(32)?;
//!
//! map.set("elephant", 3);
//! map.set("monkey", 7);
//! assert!(!map.set_if_absent("monkey", 8));
//!
//! map.upsert("monkey", 1, |current, new| current.copied().unwrap_or(0) + new);
//! assert_eq!(*map.get("monkey").unwrap(), 8);
//!
//! // Buffered snapshot: fully materialized, safe to abandon.
//! for (key, value) in map.iter_buffered() {
//!     println!("{}: {}", key, value);
//! }
//!
//! assert_eq!(map.count(), 2);
//! # Ok::<(), cmap::Error>(())
//! ```
//!
//! ## Configuration
//!
//! ```rust
//! use cmap::{ConcurrentMapBuilder, HashFunction};
//!
//! let map = ConcurrentMapBuilder::new()
//!     .shard_count(64)?
//!     .hash_function(HashFunction::Fnv32)
//!     .capacity_per_shard(128)
//!     .build::<String>()?;
//! # Ok::<(), cmap::Error>(())
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

/// Append capability used by `add_if_present`.
pub mod append;
/// Configuration and builder types.
pub mod config;
/// Error types.
pub mod error;
/// Hash function implementations.
pub mod hash;
/// Snapshot and lazy iterators.
pub mod iter;
/// Main ConcurrentMap implementation.
pub mod map;
mod ser;
mod shard;
/// Statistics and load introspection.
pub mod stats;

// Re-export main types
pub use append::Append;
pub use config::{Config, ConcurrentMapBuilder, HashFunction, DEFAULT_SHARD_COUNT};
pub use error::Error;
pub use hash::fnv32;
pub use iter::{Iter, Snapshot, Tuple};
pub use map::ConcurrentMap;
pub use stats::{ShardOps, Stats};
