//! # Core Type Definitions
//!
//! Shared vocabulary for the k-mer store:
//! - Traversal direction (`ExtDirection`)
//! - Process identity for partitioned deployments (`ProcessId`)
//! - Error types (`KmerStoreError`)
//!
//! Keys live in [`crate::kmer`], node records in [`crate::extension`].

use crate::kmer::Kmer;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// DIRECTION
// =============================================================================

/// One of the two traversal directions out of a k-mer.
///
/// SENSE extends past the 3' end (append a symbol), ANTISENSE extends past
/// the 5' end (prepend a symbol). The two are independent edge namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ExtDirection {
    Sense,
    Antisense,
}

impl ExtDirection {
    /// Both directions, SENSE first.
    pub const ALL: [ExtDirection; 2] = [ExtDirection::Sense, ExtDirection::Antisense];

    /// The opposite direction.
    #[must_use]
    pub const fn complement(self) -> Self {
        match self {
            Self::Sense => Self::Antisense,
            Self::Antisense => Self::Sense,
        }
    }
}

impl fmt::Display for ExtDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sense => f.write_str("sense"),
            Self::Antisense => f.write_str("antisense"),
        }
    }
}

// =============================================================================
// PROCESS IDENTITY
// =============================================================================

/// Rank of a cooperating process in a partitioned deployment.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct ProcessId(pub u32);

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rank {}", self.0)
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the k-mer store.
///
/// Benign no-ops (removing an absent key, detaching an unknown listener,
/// setting an edge that is already present) are not errors; they report
/// `false` or do nothing.
#[derive(Debug, Error)]
pub enum KmerStoreError {
    /// Direct access to a k-mer that is not stored.
    #[error("K-mer not found: {0}")]
    NotFound(Kmer),

    /// A symbol outside the active alphabet.
    #[error("Invalid symbol {0:?}")]
    InvalidSymbol(char),

    /// A symbol code outside 0..=3.
    #[error("Invalid base code: {0}")]
    InvalidBase(u8),

    /// K-mer length outside 1..=MAX_KMER_LENGTH.
    #[error("Invalid k-mer length: {0}")]
    InvalidKmerLength(usize),

    /// A symbol position past the end of a k-mer.
    #[error("Position {index} out of range for a {len}-mer")]
    PositionOutOfRange { index: usize, len: usize },

    /// A key whose length does not match the store's k.
    #[error("K-mer length mismatch: expected {expected}, got {actual}")]
    KmerLengthMismatch { expected: usize, actual: usize },

    /// Persisted or remote data produced under a different configuration.
    #[error("Configuration mismatch: {0}")]
    ConfigMismatch(String),

    /// Rejected configuration value.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A serialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A deserialization error occurred.
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),

    /// The message fabric between processes failed.
    #[error("Transport error: {0}")]
    TransportError(String),
}

impl From<std::io::Error> for KmerStoreError {
    fn from(e: std::io::Error) -> Self {
        Self::IoError(e.to_string())
    }
}

// =============================================================================
// TESTS
// =============================================================================
