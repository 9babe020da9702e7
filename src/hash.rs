use std::hash::{Hash, Hasher};

const FNV32_OFFSET_BASIS: u32 = 2_166_136_261;
const FNV32_PRIME: u32 = 16_777_619;

/// 32-bit FNV hash over a byte sequence.
///
/// Each byte is folded in as multiply-then-xor with wrapping arithmetic. The
/// output is stable across processes and platforms, so shard placement of a
/// key never changes between runs.
#[inline]
pub fn fnv32(bytes: &[u8]) -> u32 {
    let mut hash = FNV32_OFFSET_BASIS;
    for &byte in bytes {
        hash = hash.wrapping_mul(FNV32_PRIME);
        hash ^= u32::from(byte);
    }
    hash
}

/// Hash function implementation for shard assignment.
/// Uses an enum to avoid trait object limitations with generics.
#[derive(Debug, Clone, Copy, Default)]
pub enum ShardHasher {
    /// Bundled 32-bit FNV (default).
    #[default]
    Fnv32,
    /// AHash (stable for the lifetime of the process).
    AHash,
}

impl ShardHasher {
    /// Hash a key to determine which shard it belongs to.
    pub fn hash_key(&self, key: &str) -> u64 {
        match self {
            ShardHasher::Fnv32 => u64::from(fnv32(key.as_bytes())),
            ShardHasher::AHash => {
                let mut hasher = ahash::AHasher::default();
                key.hash(&mut hasher);
                hasher.finish()
            }
        }
    }
}
