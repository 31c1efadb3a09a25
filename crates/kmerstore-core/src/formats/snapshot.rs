//! # Snapshot Format
//!
//! Binary serialization of a store's entries.
//!
//! Format: Header (5 bytes) + postcard-serialized snapshot.
//! - 4 bytes: Magic ("KMSN")
//! - 1 byte: Version
//!
//! Entries are written sorted by key, so two stores holding the same data
//! produce identical bytes regardless of hash-map iteration order.
//!
//! The payload size limit and header are validated before the payload is
//! parsed.

use crate::collection::Entry;
use crate::config::StoreConfig;
use crate::extension::KmerData;
use crate::kmer::Kmer;
use crate::primitives;
use crate::types::KmerStoreError;
use serde::{Deserialize, Serialize};
use std::path::Path;

// =============================================================================
// LIMITS
// =============================================================================

/// Maximum allowed snapshot size.
///
/// Checked BEFORE attempting deserialization. 4 GiB holds well over a
/// hundred million entries.
pub const MAX_SNAPSHOT_SIZE: u64 = 4 * 1024 * 1024 * 1024;

/// Header length in bytes.
const HEADER_LEN: usize = 5;

// =============================================================================
// FILE HEADER
// =============================================================================

fn header() -> [u8; HEADER_LEN] {
    let mut bytes = [0u8; HEADER_LEN];
    bytes[..4].copy_from_slice(primitives::MAGIC_BYTES);
    bytes[4] = primitives::FORMAT_VERSION;
    bytes
}

/// Check magic and version; `bytes` is at least `HEADER_LEN` long.
fn check_header(bytes: &[u8]) -> Result<(), KmerStoreError> {
    if &bytes[..4] != primitives::MAGIC_BYTES {
        return Err(KmerStoreError::DeserializationError(
            "Invalid magic bytes".to_string(),
        ));
    }
    if bytes[4] != primitives::FORMAT_VERSION {
        return Err(KmerStoreError::DeserializationError(format!(
            "Unsupported version: {} (expected {})",
            bytes[4],
            primitives::FORMAT_VERSION
        )));
    }
    Ok(())
}

// =============================================================================
// SNAPSHOT
// =============================================================================

/// Entries of a store plus the configuration they were recorded under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub kmer_length: u32,
    pub colour_space: bool,
    pub entries: Vec<(Kmer, KmerData)>,
}

impl Snapshot {
    /// Collect and sort entries.
    pub fn from_entries<'a>(config: &StoreConfig, entries: impl Iterator<Item = Entry<'a>>) -> Self {
        let mut entries: Vec<(Kmer, KmerData)> = entries.map(|(k, d)| (*k, *d)).collect();
        entries.sort_unstable_by_key(|(k, _)| *k);
        Self {
            kmer_length: config.kmer_length as u32,
            colour_space: config.colour_space,
            entries,
        }
    }

    /// Reject snapshots recorded with a different k or alphabet.
    pub fn check_compatible(&self, config: &StoreConfig) -> Result<(), KmerStoreError> {
        if self.kmer_length as usize != config.kmer_length {
            return Err(KmerStoreError::ConfigMismatch(format!(
                "snapshot k = {}, store k = {}",
                self.kmer_length, config.kmer_length
            )));
        }
        if self.colour_space != config.colour_space {
            return Err(KmerStoreError::ConfigMismatch(format!(
                "snapshot colour_space = {}, store colour_space = {}",
                self.colour_space, config.colour_space
            )));
        }
        Ok(())
    }
}

// =============================================================================
// SERIALIZATION FUNCTIONS
// =============================================================================

/// Serialize a snapshot to bytes (header + payload).
///
/// This is a pure transformation - no file I/O.
pub fn snapshot_to_bytes(snapshot: &Snapshot) -> Result<Vec<u8>, KmerStoreError> {
    let payload = postcard::to_stdvec(snapshot)
        .map_err(|e| KmerStoreError::SerializationError(e.to_string()))?;

    let mut result = Vec::with_capacity(HEADER_LEN + payload.len());
    result.extend_from_slice(&header());
    result.extend_from_slice(&payload);
    Ok(result)
}

/// Deserialize a snapshot from bytes.
///
/// This is a pure transformation - no file I/O.
pub fn snapshot_from_bytes(bytes: &[u8]) -> Result<Snapshot, KmerStoreError> {
    if bytes.len() < HEADER_LEN {
        return Err(KmerStoreError::DeserializationError(
            "Data too short: minimum 5 bytes required".to_string(),
        ));
    }
    if bytes.len() as u64 > MAX_SNAPSHOT_SIZE {
        return Err(KmerStoreError::DeserializationError(format!(
            "Data size {} bytes exceeds maximum allowed {} bytes",
            bytes.len(),
            MAX_SNAPSHOT_SIZE
        )));
    }

    check_header(bytes)?;

    postcard::from_bytes(&bytes[HEADER_LEN..]).map_err(|e| {
        KmerStoreError::DeserializationError(format!("Failed to decode snapshot: {}", e))
    })
}

// =============================================================================
// FILE I/O
// =============================================================================

/// Read and decode the snapshot at `path`, checking its size first.
pub fn read_snapshot(path: &Path) -> Result<Snapshot, KmerStoreError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| KmerStoreError::IoError(format!("{}: {}", path.display(), e)))?;
    if metadata.len() > MAX_SNAPSHOT_SIZE {
        return Err(KmerStoreError::DeserializationError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            MAX_SNAPSHOT_SIZE
        )));
    }
    let bytes = std::fs::read(path)
        .map_err(|e| KmerStoreError::IoError(format!("{}: {}", path.display(), e)))?;
    snapshot_from_bytes(&bytes)
}

/// Encode `entries` and write them to `path`.
pub fn write_snapshot<'a>(
    path: &Path,
    config: &StoreConfig,
    entries: impl Iterator<Item = Entry<'a>>,
) -> Result<(), KmerStoreError> {
    let bytes = snapshot_to_bytes(&Snapshot::from_entries(config, entries))?;
    std::fs::write(path, bytes)
        .map_err(|e| KmerStoreError::IoError(format!("{}: {}", path.display(), e)))
}

// =============================================================================
// CHECKSUMS
// =============================================================================

/// BLAKE3 hash of encoded snapshot bytes, as 64 hex characters.
#[cfg(feature = "crypto-hash")]
#[must_use]
pub fn snapshot_hash(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

// =============================================================================
// TESTS
// =============================================================================
