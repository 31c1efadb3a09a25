//! # Property-Based Tests
//!
//! Invariants of the keyed store and edge codec under arbitrary input.

use kmerstore_core::{
    Base, ExtDirection, Kmer, KmerStore, SeqExt, SequenceCollection, Snapshot, StoreConfig,
    snapshot_to_bytes,
};
use proptest::collection::vec;
use proptest::prelude::*;
use std::collections::BTreeMap;

const K: usize = 6;

fn store() -> KmerStore {
    KmerStore::new(StoreConfig::with_kmer_length(K)).expect("store")
}

fn arb_kmer() -> impl Strategy<Value = Kmer> {
    (0u128..(1 << (2 * K))).prop_map(|bits| Kmer::from_raw(K, bits).expect("kmer"))
}

fn arb_base() -> impl Strategy<Value = Base> {
    (0usize..4).prop_map(|i| Base::ALL[i])
}

fn arb_dir() -> impl Strategy<Value = ExtDirection> {
    prop_oneof![Just(ExtDirection::Sense), Just(ExtDirection::Antisense)]
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// Multiplicity equals the number of times a key was added.
    #[test]
    fn multiplicity_counts_adds(keys in vec(arb_kmer(), 1..200)) {
        let mut s = store();
        let mut expected: BTreeMap<Kmer, u32> = BTreeMap::new();
        for k in &keys {
            s.add(k).expect("add");
            *expected.entry(*k).or_default() += 1;
        }

        prop_assert_eq!(s.len(), expected.len());
        for (k, count) in &expected {
            prop_assert_eq!(s.get_seq_data(k).map(|(_, m)| m), Some(*count));
        }
    }

    /// Setting then removing a fresh edge restores the record.
    #[test]
    fn set_remove_restores(
        k in arb_kmer(),
        seed in vec((arb_dir(), arb_base()), 0..6),
        dir in arb_dir(),
        base in arb_base(),
    ) {
        let mut s = store();
        s.add(&k).expect("add");
        for (d, b) in &seed {
            s.set_base_extension(&k, *d, *b).expect("ext");
        }
        let (before, _) = s.get_seq_data(&k).expect("present");
        prop_assume!(!before.get(dir).has_base(base));

        prop_assert!(s.set_base_extension(&k, dir, base).expect("ext"));
        s.remove_base_extension(&k, dir, base).expect("remove");

        let (after, _) = s.get_seq_data(&k).expect("present");
        prop_assert_eq!(after, before);
    }

    /// Edits in one direction never touch the other.
    #[test]
    fn directions_are_independent(
        k in arb_kmer(),
        ops in vec((arb_dir(), arb_base(), any::<bool>()), 1..30),
    ) {
        let mut s = store();
        s.add(&k).expect("add");
        let mut model = [SeqExt::EMPTY, SeqExt::EMPTY];

        for (dir, base, set) in &ops {
            let slot = match dir {
                ExtDirection::Sense => 0,
                ExtDirection::Antisense => 1,
            };
            if *set {
                s.set_base_extension(&k, *dir, *base).expect("ext");
                model[slot] = model[slot].union(SeqExt::from_base(*base));
            } else {
                s.remove_base_extension(&k, *dir, *base).expect("remove");
                model[slot] = model[slot].without(SeqExt::from_base(*base));
            }
        }

        let (ext, _) = s.get_seq_data(&k).expect("present");
        prop_assert_eq!(ext.sense, model[0]);
        prop_assert_eq!(ext.antisense, model[1]);
    }

    /// Insertion order does not change the snapshot bytes.
    #[test]
    fn snapshot_ignores_insertion_order(keys in vec(arb_kmer(), 1..100)) {
        let config = StoreConfig::with_kmer_length(K);
        let mut forward = store();
        let mut backward = store();
        for k in &keys {
            forward.add(k).expect("add");
        }
        for k in keys.iter().rev() {
            backward.add(k).expect("add");
        }

        let a = snapshot_to_bytes(&Snapshot::from_entries(&config, forward.iter())).expect("encode");
        let b = snapshot_to_bytes(&Snapshot::from_entries(&config, backward.iter())).expect("encode");
        prop_assert_eq!(a, b);
    }

    /// Reverse complement is an involution and canonical form is shared.
    #[test]
    fn canonical_is_orientation_free(k in arb_kmer(), colour in any::<bool>()) {
        let config = StoreConfig { colour_space: colour, ..StoreConfig::with_kmer_length(K) };
        let alphabet = config.alphabet();
        let rc = k.reverse_complement(alphabet);
        prop_assert_eq!(rc.reverse_complement(alphabet), k);
        prop_assert_eq!(k.canonical(alphabet).0, rc.canonical(alphabet).0);
    }
}
