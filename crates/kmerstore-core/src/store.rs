//! # Keyed Store
//!
//! The in-memory k-mer store: one fixed-layout [`KmerData`] record per key
//! in an Fx-hashed map, giving O(1) expected access without per-node
//! allocation. Adjacency lives in each record's extension masks, never in
//! pointers between nodes.
//!
//! Iterators borrow the store, so the borrow checker already forbids
//! holding one across a mutating call.

use crate::collection::{Entry, SequenceCollection};
use crate::config::StoreConfig;
use crate::extension::{ExtensionRecord, KmerData, SeqExt, SeqFlag};
use crate::kmer::{Alphabet, Base, Kmer};
use crate::observer::{ListenerId, ListenerRegistry, Mutation, MutationKind, MutationListener};
use crate::stats::LoadReport;
use crate::types::{ExtDirection, KmerStoreError};
use rustc_hash::FxHashMap;
use std::collections::hash_map::Entry as Slot;
use std::sync::Arc;

/// Hash-indexed k-mer store owning every node it holds.
#[derive(Debug)]
pub struct KmerStore {
    config: StoreConfig,
    nodes: FxHashMap<Kmer, KmerData>,
    listeners: ListenerRegistry,
}

impl KmerStore {
    /// Create an empty store. The configuration is validated and frozen.
    pub fn new(config: StoreConfig) -> Result<Self, KmerStoreError> {
        config.validate()?;
        Ok(Self {
            config,
            nodes: FxHashMap::default(),
            listeners: ListenerRegistry::new(),
        })
    }

    /// Create an empty store with room for `capacity` keys.
    pub fn with_capacity(config: StoreConfig, capacity: usize) -> Result<Self, KmerStoreError> {
        let mut store = Self::new(config)?;
        store.nodes.reserve(capacity);
        Ok(store)
    }

    #[must_use]
    pub fn alphabet(&self) -> Alphabet {
        self.config.alphabet()
    }

    #[must_use]
    pub fn kmer_length(&self) -> usize {
        self.config.kmer_length
    }

    #[must_use]
    pub fn contains(&self, kmer: &Kmer) -> bool {
        self.nodes.contains_key(kmer)
    }

    /// Stored record for `kmer`, if any.
    #[must_use]
    pub fn get(&self, kmer: &Kmer) -> Option<&KmerData> {
        self.nodes.get(kmer)
    }

    /// Iterate all entries without boxing.
    pub fn entries(&self) -> impl Iterator<Item = Entry<'_>> + '_ {
        self.nodes.iter()
    }

    /// Slots currently allocated by the underlying map.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.nodes.capacity()
    }

    /// Number of attached listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn check_length(&self, kmer: &Kmer) -> Result<(), KmerStoreError> {
        if kmer.len() != self.config.kmer_length {
            return Err(KmerStoreError::KmerLengthMismatch {
                expected: self.config.kmer_length,
                actual: kmer.len(),
            });
        }
        Ok(())
    }

    fn notify(&self, kind: MutationKind, kmer: &Kmer) {
        if self.listeners.is_empty() {
            return;
        }
        if let Some((key, data)) = self.nodes.get_key_value(kmer) {
            self.listeners.dispatch(
                self,
                &Mutation {
                    kind,
                    kmer: key,
                    data,
                },
            );
        }
    }

    /// Apply `f` to the record of `kmer` and notify if it reports a change.
    fn update(
        &mut self,
        kmer: &Kmer,
        kind: MutationKind,
        f: impl FnOnce(&mut KmerData) -> bool,
    ) -> bool {
        let changed = self.nodes.get_mut(kmer).is_some_and(f);
        if changed {
            self.notify(kind, kmer);
        }
        changed
    }
}

impl SequenceCollection for KmerStore {
    fn add(&mut self, kmer: &Kmer) -> Result<(), KmerStoreError> {
        self.check_length(kmer)?;
        self.nodes
            .entry(*kmer)
            .and_modify(KmerData::observe)
            .or_insert_with(KmerData::new);
        self.notify(MutationKind::Added, kmer);
        Ok(())
    }

    fn remove(&mut self, kmer: &Kmer) -> Result<(), KmerStoreError> {
        if self.nodes.contains_key(kmer) {
            self.notify(MutationKind::Removed, kmer);
            self.nodes.remove(kmer);
        }
        Ok(())
    }

    /// A new node is created with multiplicity at least 1. Listeners see
    /// `Added` only when the stored record actually changed.
    fn merge(&mut self, kmer: &Kmer, data: KmerData) -> Result<(), KmerStoreError> {
        self.check_length(kmer)?;
        let changed = match self.nodes.entry(*kmer) {
            Slot::Occupied(mut slot) => {
                let before = *slot.get();
                slot.get_mut().absorb(&data);
                *slot.get() != before
            }
            Slot::Vacant(slot) => {
                slot.insert(KmerData {
                    multiplicity: data.multiplicity.max(1),
                    ..data
                });
                true
            }
        };
        if changed {
            self.notify(MutationKind::Added, kmer);
        }
        Ok(())
    }

    fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn len(&self) -> usize {
        self.nodes.len()
    }

    fn get_seq_data(&self, kmer: &Kmer) -> Option<(ExtensionRecord, u32)> {
        self.nodes.get(kmer).map(|data| (data.ext, data.multiplicity))
    }

    fn get_seq_and_data(&self, kmer: &Kmer) -> Result<Entry<'_>, KmerStoreError> {
        self.nodes
            .get_key_value(kmer)
            .ok_or(KmerStoreError::NotFound(*kmer))
    }

    fn iter(&self) -> Box<dyn Iterator<Item = Entry<'_>> + '_> {
        Box::new(self.nodes.iter())
    }

    fn print_load(&self) -> LoadReport {
        let report = LoadReport::from_entries(self.nodes.iter(), self.nodes.capacity());
        tracing::info!(
            entries = report.entries,
            capacity = report.capacity,
            load_per_thousand = report.load_per_thousand,
            dead_ends = report.dead_ends,
            ambiguous = report.ambiguous,
            "store load"
        );
        report
    }

    fn set_base_extension(
        &mut self,
        kmer: &Kmer,
        dir: ExtDirection,
        base: Base,
    ) -> Result<bool, KmerStoreError> {
        Ok(self.update(kmer, MutationKind::ExtensionChanged, |data| {
            data.ext.set_base(dir, base)
        }))
    }

    fn remove_extension(
        &mut self,
        kmer: &Kmer,
        dir: ExtDirection,
        ext: SeqExt,
    ) -> Result<(), KmerStoreError> {
        self.update(kmer, MutationKind::ExtensionChanged, |data| {
            data.ext.remove(dir, ext)
        });
        Ok(())
    }

    fn set_flag(&mut self, kmer: &Kmer, flag: SeqFlag) -> Result<(), KmerStoreError> {
        self.update(kmer, MutationKind::FlagChanged, |data| data.flags.insert(flag));
        Ok(())
    }

    fn clear_flag(&mut self, kmer: &Kmer, flag: SeqFlag) -> Result<(), KmerStoreError> {
        self.update(kmer, MutationKind::FlagChanged, |data| data.flags.remove(flag));
        Ok(())
    }

    fn attach(&mut self, listener: Arc<dyn MutationListener>) -> ListenerId {
        self.listeners.attach(listener)
    }

    fn detach(&mut self, id: ListenerId) -> bool {
        self.listeners.detach(id)
    }

    /// A single-process store never has remote messages.
    fn pump_network(&mut self) -> Result<usize, KmerStoreError> {
        Ok(0)
    }

    fn config(&self) -> &StoreConfig {
        &self.config
    }
}

impl<'a> IntoIterator for &'a KmerStore {
    type Item = Entry<'a>;
    type IntoIter = std::collections::hash_map::Iter<'a, Kmer, KmerData>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}

// =============================================================================
// TESTS
// =============================================================================
