//! # Sequence Collection Contract
//!
//! The single interface every k-mer store backend implements, whether it
//! holds the whole key space in memory ([`crate::KmerStore`]) or one
//! partition of it ([`crate::DistributedStore`]).
//!
//! All mutations return `Result<_, KmerStoreError>` so that backends with a
//! fallible transport share one signature with the in-memory store.

use crate::config::StoreConfig;
use crate::extension::{ExtensionRecord, KmerData, SeqExt, SeqFlag};
use crate::formats::snapshot::{self, Snapshot};
use crate::kmer::{Base, Kmer};
use crate::observer::{ListenerId, MutationListener};
use crate::stats::LoadReport;
use crate::types::{ExtDirection, KmerStoreError};
use std::path::Path;
use std::sync::Arc;

/// Borrowed `(key, node)` pair yielded by iteration.
pub type Entry<'a> = (&'a Kmer, &'a KmerData);

/// Mutable, observable k-mer graph storage.
pub trait SequenceCollection {
    // -------------------------------------------------------------------------
    // Keyed store
    // -------------------------------------------------------------------------

    /// Insert `kmer` with multiplicity 1, or count one more observation of
    /// an existing node. Edges and flags of an existing node are untouched.
    fn add(&mut self, kmer: &Kmer) -> Result<(), KmerStoreError>;

    /// Delete the node for `kmer`; no-op if absent.
    fn remove(&mut self, kmer: &Kmer) -> Result<(), KmerStoreError>;

    /// Fold a whole record into the node for `kmer`, creating it if absent.
    ///
    /// Multiplicities add, extension masks and flags are unioned.
    fn merge(&mut self, kmer: &Kmer, data: KmerData) -> Result<(), KmerStoreError>;

    /// True iff no keys are stored (locally, for partitioned backends).
    fn is_empty(&self) -> bool;

    /// Number of stored keys (locally, for partitioned backends).
    fn len(&self) -> usize;

    /// Extension record and multiplicity of `kmer`, if present.
    fn get_seq_data(&self, kmer: &Kmer) -> Option<(ExtensionRecord, u32)>;

    /// Direct view of the stored entry.
    ///
    /// Fails with `NotFound` when `kmer` is absent; callers are expected to
    /// have checked presence first.
    fn get_seq_and_data(&self, kmer: &Kmer) -> Result<Entry<'_>, KmerStoreError>;

    /// Every stored entry, in no meaningful order.
    fn iter(&self) -> Box<dyn Iterator<Item = Entry<'_>> + '_>;

    /// Occupancy diagnostics; also emitted as a log event.
    fn print_load(&self) -> LoadReport;

    // -------------------------------------------------------------------------
    // Edge codec
    // -------------------------------------------------------------------------

    /// Set the edge labelled `base` in `dir`.
    ///
    /// Returns whether the state changed; `false` if the edge was already
    /// present or `kmer` is absent.
    fn set_base_extension(
        &mut self,
        kmer: &Kmer,
        dir: ExtDirection,
        base: Base,
    ) -> Result<bool, KmerStoreError>;

    /// Clear the edges in `ext` for `dir`. The opposite direction is never
    /// affected.
    fn remove_extension(
        &mut self,
        kmer: &Kmer,
        dir: ExtDirection,
        ext: SeqExt,
    ) -> Result<(), KmerStoreError>;

    /// Clear the single edge labelled `base`.
    fn remove_base_extension(
        &mut self,
        kmer: &Kmer,
        dir: ExtDirection,
        base: Base,
    ) -> Result<(), KmerStoreError> {
        self.remove_extension(kmer, dir, SeqExt::from_base(base))
    }

    /// Remove every edge in `dir`, making `kmer` a dead end on that side.
    fn clear_extensions(&mut self, kmer: &Kmer, dir: ExtDirection) -> Result<(), KmerStoreError> {
        self.remove_extension(kmer, dir, SeqExt::full())
    }

    /// Set a flag without touching other flags or edges; no-op if absent.
    fn set_flag(&mut self, kmer: &Kmer, flag: SeqFlag) -> Result<(), KmerStoreError>;

    /// Clear a flag without touching other flags or edges; no-op if absent.
    fn clear_flag(&mut self, kmer: &Kmer, flag: SeqFlag) -> Result<(), KmerStoreError>;

    /// Mark `kmer` as visited while walking in `dir`.
    fn mark(&mut self, kmer: &Kmer, dir: ExtDirection) -> Result<(), KmerStoreError> {
        self.set_flag(kmer, SeqFlag::mark(dir))
    }

    // -------------------------------------------------------------------------
    // Change notifier
    // -------------------------------------------------------------------------

    /// Register a listener; it fires after all previously attached ones.
    fn attach(&mut self, listener: Arc<dyn MutationListener>) -> ListenerId;

    /// Unregister a listener. Returns false if it was not attached.
    fn detach(&mut self, id: ListenerId) -> bool;

    // -------------------------------------------------------------------------
    // Distributed pump
    // -------------------------------------------------------------------------

    /// Apply pending remote mutations addressed to locally owned keys.
    ///
    /// Returns the number of messages drained; 0 with nothing pending.
    fn pump_network(&mut self) -> Result<usize, KmerStoreError>;

    // -------------------------------------------------------------------------
    // Configuration and persistence
    // -------------------------------------------------------------------------

    /// The configuration this collection was built with.
    fn config(&self) -> &StoreConfig;

    /// Whether symbols are colour-space digits.
    fn colour_space(&self) -> bool {
        self.config().colour_space
    }

    /// Merge every entry of the snapshot at `path` into this collection.
    ///
    /// Entries go through [`SequenceCollection::merge`], so listeners see
    /// them and partitioned backends route them to their owners.
    /// Returns the number of entries read.
    fn load(&mut self, path: &Path) -> Result<usize, KmerStoreError> {
        let count = self.load_snapshot(snapshot::read_snapshot(path)?)?;
        tracing::info!(path = %path.display(), entries = count, "snapshot loaded");
        Ok(count)
    }

    /// Merge an already decoded snapshot, as [`SequenceCollection::load`]
    /// does for a file.
    fn load_snapshot(&mut self, loaded: Snapshot) -> Result<usize, KmerStoreError> {
        loaded.check_compatible(self.config())?;

        let count = loaded.entries.len();
        for (kmer, data) in loaded.entries {
            self.merge(&kmer, data)?;
        }
        Ok(count)
    }

    /// Write the locally stored entries to a snapshot at `path`.
    fn save(&self, path: &Path) -> Result<(), KmerStoreError> {
        snapshot::write_snapshot(path, self.config(), self.iter())?;
        tracing::info!(path = %path.display(), entries = self.len(), "snapshot saved");
        Ok(())
    }
}
