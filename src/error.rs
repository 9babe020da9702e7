use thiserror::Error;

/// Errors that can occur when building or operating on a ConcurrentMap.
///
/// A missing key is never an error: lookups return `Option` instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The shard count is invalid (must be at least 1).
    #[error("shard count must be greater than 0")]
    InvalidShardCount,
    /// `add_if_present` found a stored value that cannot be appended to.
    #[error("value stored under key `{key}` is not an appendable sequence")]
    NotAppendable {
        /// Key whose stored value rejected the append.
        key: String,
    },
}
