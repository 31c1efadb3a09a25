//! # Key-Space Partitioning
//!
//! Decides which process owns a k-mer. Every process must compute the same
//! owner for the same key, so the hash is a fixed FNV-1a over the packed
//! key bytes rather than a per-process seeded hasher.

use crate::kmer::Kmer;
use crate::types::{KmerStoreError, ProcessId};

/// Result of a routing decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// The key is owned by this process.
    Local,
    /// The key is owned by another process.
    Remote(ProcessId),
}

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Stable 64-bit hash of a k-mer.
#[must_use]
pub fn kmer_hash(kmer: &Kmer) -> u64 {
    let bytes = kmer.bits().to_le_bytes();
    let len = [kmer.len() as u8];
    let mut hash = FNV_OFFSET;
    for byte in bytes.iter().chain(len.iter()) {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Hash-modulo partitioner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashPartitioner {
    partitions: u32,
    local: ProcessId,
}

impl HashPartitioner {
    pub fn new(partitions: u32, local: ProcessId) -> Result<Self, KmerStoreError> {
        if partitions == 0 {
            return Err(KmerStoreError::InvalidConfig(
                "partitions must be positive".to_string(),
            ));
        }
        if local.0 >= partitions {
            return Err(KmerStoreError::InvalidConfig(format!(
                "{} is outside 0..{}",
                local, partitions
            )));
        }
        Ok(Self { partitions, local })
    }

    #[must_use]
    pub const fn partitions(&self) -> u32 {
        self.partitions
    }

    #[must_use]
    pub const fn local(&self) -> ProcessId {
        self.local
    }

    /// Owner of `kmer`.
    #[must_use]
    pub fn owner(&self, kmer: &Kmer) -> ProcessId {
        ProcessId((kmer_hash(kmer) % self.partitions as u64) as u32)
    }

    /// Where a mutation of `kmer` must be applied.
    #[must_use]
    pub fn route(&self, kmer: &Kmer) -> Route {
        let owner = self.owner(kmer);
        if owner == self.local {
            Route::Local
        } else {
            Route::Remote(owner)
        }
    }

    #[must_use]
    pub fn is_local(&self, kmer: &Kmer) -> bool {
        self.route(kmer) == Route::Local
    }
}
