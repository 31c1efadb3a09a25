//! # kmerstore-core
//!
//! The k-mer graph store behind the kmerstore assembler tools.
//!
//! Every distinct k-mer is a node; adjacency is recorded on the node itself
//! as two 4-bit extension masks (one per direction) rather than as pointers,
//! so a node's neighbours are found by shifting one symbol in and looking the
//! result up again.
//!
//! ## Layout
//!
//! - `kmer`, `extension`: packed keys and per-node records
//! - `collection`: the [`SequenceCollection`] contract shared by all backends
//! - `store`: the single-process [`KmerStore`]
//! - `observer`: change notification
//! - `partition`, `message`, `transport`, `distributed`: key-space sharding
//!   across cooperating processes
//! - `formats`: snapshot files
//! - `ingestor`: reads to k-mers
//!
//! The core does no I/O of its own apart from snapshot files, and has no
//! async runtime.

// =============================================================================
// MODULES
// =============================================================================

pub mod collection;
pub mod config;
pub mod distributed;
pub mod extension;
pub mod formats;
pub mod ingestor;
pub mod kmer;
pub mod message;
pub mod observer;
pub mod partition;
pub mod primitives;
pub mod stats;
pub mod store;
pub mod transport;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use extension::{ExtensionRecord, KmerData, SeqExt, SeqFlag, SeqFlags};
pub use kmer::{Alphabet, Base, Kmer};
pub use types::{ExtDirection, KmerStoreError, ProcessId};

// =============================================================================
// RE-EXPORTS: Store
// =============================================================================

pub use collection::{Entry, SequenceCollection};
pub use config::StoreConfig;
pub use ingestor::{IngestStats, Ingestor};
pub use observer::{
    ListenerId, ListenerRegistry, Mutation, MutationKind, MutationListener, MutationTally,
};
pub use stats::LoadReport;
pub use store::KmerStore;

// =============================================================================
// RE-EXPORTS: Distribution
// =============================================================================

pub use distributed::{DistributedStore, TrafficCounters};
pub use message::SeqMessage;
pub use partition::{HashPartitioner, Route};
pub use transport::{ChannelTransport, Transport};

// =============================================================================
// RE-EXPORTS: Formats
// =============================================================================

pub use formats::{Snapshot, read_snapshot, snapshot_from_bytes, snapshot_to_bytes};

#[cfg(feature = "crypto-hash")]
pub use formats::snapshot_hash;
