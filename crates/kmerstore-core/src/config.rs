//! # Store Configuration
//!
//! Construction-time settings of a store. A store copies its configuration
//! when built and never changes it afterwards; in particular the symbol
//! alphabet cannot be toggled once k-mers exist.
//!
//! The core only defines and validates the value. Reading it from a file
//! is the application's job.

use crate::kmer::Alphabet;
use crate::primitives::{
    DEFAULT_KMER_LENGTH, DEFAULT_MAX_PUMP_BATCH, DEFAULT_PUMP_WAIT_MS, MAX_KMER_LENGTH,
    MAX_PARTITIONS, MAX_PUMP_WAIT_MS,
};
use crate::types::{KmerStoreError, ProcessId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings fixed for the lifetime of a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Length of every key.
    pub kmer_length: usize,
    /// Interpret symbols as colour-space digits instead of nucleotides.
    pub colour_space: bool,
    /// Store each k-mer in its canonical orientation when loading reads.
    pub canonical: bool,
    /// Number of cooperating processes sharing the key space.
    pub partitions: u32,
    /// This process's rank, `0..partitions`.
    pub rank: u32,
    /// Longest a pump call waits for the first message.
    pub pump_wait_ms: u64,
    /// Most messages a single pump call applies.
    pub max_pump_batch: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kmer_length: DEFAULT_KMER_LENGTH,
            colour_space: false,
            canonical: false,
            partitions: 1,
            rank: 0,
            pump_wait_ms: DEFAULT_PUMP_WAIT_MS,
            max_pump_batch: DEFAULT_MAX_PUMP_BATCH,
        }
    }
}

impl StoreConfig {
    /// Single-process configuration with the given k.
    #[must_use]
    pub fn with_kmer_length(kmer_length: usize) -> Self {
        Self {
            kmer_length,
            ..Self::default()
        }
    }

    /// Check every field is within its supported range.
    pub fn validate(&self) -> Result<(), KmerStoreError> {
        if self.kmer_length == 0 || self.kmer_length > MAX_KMER_LENGTH {
            return Err(KmerStoreError::InvalidConfig(format!(
                "kmer_length must be in 1..={}, got {}",
                MAX_KMER_LENGTH, self.kmer_length
            )));
        }
        if self.partitions == 0 || self.partitions > MAX_PARTITIONS {
            return Err(KmerStoreError::InvalidConfig(format!(
                "partitions must be in 1..={}, got {}",
                MAX_PARTITIONS, self.partitions
            )));
        }
        if self.rank >= self.partitions {
            return Err(KmerStoreError::InvalidConfig(format!(
                "rank {} is outside 0..{}",
                self.rank, self.partitions
            )));
        }
        if self.pump_wait_ms > MAX_PUMP_WAIT_MS {
            return Err(KmerStoreError::InvalidConfig(format!(
                "pump_wait_ms must be at most {}",
                MAX_PUMP_WAIT_MS
            )));
        }
        if self.max_pump_batch == 0 {
            return Err(KmerStoreError::InvalidConfig(
                "max_pump_batch must be positive".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub const fn alphabet(&self) -> Alphabet {
        Alphabet::from_colour_space(self.colour_space)
    }

    #[must_use]
    pub const fn process_id(&self) -> ProcessId {
        ProcessId(self.rank)
    }

    #[must_use]
    pub const fn pump_wait(&self) -> Duration {
        Duration::from_millis(self.pump_wait_ms)
    }
}
