//! # Edge Codec
//!
//! Bit-level encoding of a node's adjacency and state.
//!
//! Every k-mer carries one fixed-size [`KmerData`] record:
//! - two 4-bit extension masks, one per direction, where bit `b` means
//!   "an edge labelled with symbol `b` leaves in this direction"
//! - a saturating multiplicity counter
//! - a small flag set for traversal marks
//!
//! Neighbours are never stored; they are recomputed with [`crate::Kmer::shift`].

use crate::kmer::{Alphabet, Base};
use crate::primitives::FULL_EXTENSION_MASK;
use crate::types::ExtDirection;
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// SEQEXT (one direction)
// =============================================================================

/// The extension mask of a single direction.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(from = "u8", into = "u8")]
pub struct SeqExt(u8);

impl From<u8> for SeqExt {
    fn from(bits: u8) -> Self {
        Self::mask(bits)
    }
}

impl From<SeqExt> for u8 {
    fn from(ext: SeqExt) -> Self {
        ext.0
    }
}

impl SeqExt {
    /// No edges.
    pub const EMPTY: SeqExt = SeqExt(0);

    /// Mask with the single bit for `base`.
    #[must_use]
    pub const fn from_base(base: Base) -> Self {
        Self(1 << base.code())
    }

    /// Mask from raw bits; bits above the low nibble are dropped.
    #[must_use]
    pub const fn mask(bits: u8) -> Self {
        Self(bits & FULL_EXTENSION_MASK)
    }

    /// Every symbol set.
    #[must_use]
    pub const fn full() -> Self {
        Self(FULL_EXTENSION_MASK)
    }

    /// Raw mask bits.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[must_use]
    pub const fn has_base(self, base: Base) -> bool {
        self.0 & (1 << base.code()) != 0
    }

    /// True when no edge leaves in this direction (a dead end).
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True when more than one edge leaves in this direction.
    #[must_use]
    pub const fn is_ambiguous(self) -> bool {
        self.0.count_ones() > 1
    }

    /// Number of outgoing edges.
    #[must_use]
    pub const fn degree(self) -> u32 {
        self.0.count_ones()
    }

    #[must_use]
    pub const fn union(self, other: SeqExt) -> Self {
        Self(self.0 | other.0)
    }

    #[must_use]
    pub const fn without(self, other: SeqExt) -> Self {
        Self(self.0 & !other.0)
    }

    /// Symbols present, in code order.
    pub fn bases(self) -> impl Iterator<Item = Base> {
        Base::ALL.into_iter().filter(move |b| self.has_base(*b))
    }

    /// The mask as seen from the reverse-complement strand.
    ///
    /// Nucleotide bit `i` moves to bit `3 - i`; colour space is unchanged.
    #[must_use]
    pub const fn complement(self, alphabet: Alphabet) -> Self {
        match alphabet {
            Alphabet::ColourSpace => self,
            Alphabet::Nucleotide => {
                let b = self.0;
                Self(
                    ((b & 0b0001) << 3)
                        | ((b & 0b0010) << 1)
                        | ((b & 0b0100) >> 1)
                        | ((b & 0b1000) >> 3),
                )
            }
        }
    }
}

impl From<Base> for SeqExt {
    fn from(base: Base) -> Self {
        Self::from_base(base)
    }
}

impl SeqExt {
    /// Edge labels under `alphabet`, or `-` for a dead end.
    #[must_use]
    pub fn render(self, alphabet: Alphabet) -> String {
        if self.is_empty() {
            return "-".to_string();
        }
        self.bases().map(|b| b.to_symbol(alphabet)).collect()
    }
}

/// Nucleotide letters; use [`SeqExt::render`] for colour space.
impl fmt::Display for SeqExt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(Alphabet::Nucleotide))
    }
}

// =============================================================================
// EXTENSION RECORD (both directions)
// =============================================================================

/// Outgoing edges of a k-mer in both directions.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct ExtensionRecord {
    pub sense: SeqExt,
    pub antisense: SeqExt,
}

impl ExtensionRecord {
    #[must_use]
    pub const fn new(sense: SeqExt, antisense: SeqExt) -> Self {
        Self { sense, antisense }
    }

    /// Mask for `dir`.
    #[must_use]
    pub const fn get(&self, dir: ExtDirection) -> SeqExt {
        match dir {
            ExtDirection::Sense => self.sense,
            ExtDirection::Antisense => self.antisense,
        }
    }

    fn get_mut(&mut self, dir: ExtDirection) -> &mut SeqExt {
        match dir {
            ExtDirection::Sense => &mut self.sense,
            ExtDirection::Antisense => &mut self.antisense,
        }
    }

    /// Set the edge for `base` in `dir`. Returns whether the record changed.
    pub fn set_base(&mut self, dir: ExtDirection, base: Base) -> bool {
        let slot = self.get_mut(dir);
        let before = *slot;
        *slot = before.union(SeqExt::from_base(base));
        *slot != before
    }

    /// Clear the bits of `ext` in `dir`. Returns whether the record changed.
    pub fn remove(&mut self, dir: ExtDirection, ext: SeqExt) -> bool {
        let slot = self.get_mut(dir);
        let before = *slot;
        *slot = before.without(ext);
        *slot != before
    }

    /// Replace the mask for `dir`. Returns whether the record changed.
    pub fn replace(&mut self, dir: ExtDirection, ext: SeqExt) -> bool {
        let slot = self.get_mut(dir);
        let changed = *slot != ext;
        *slot = ext;
        changed
    }

    /// True when both directions are dead ends.
    #[must_use]
    pub const fn is_isolated(&self) -> bool {
        self.sense.is_empty() && self.antisense.is_empty()
    }

    /// The record as seen from the reverse-complement strand: directions
    /// swap and each mask is complemented.
    #[must_use]
    pub const fn complement(&self, alphabet: Alphabet) -> Self {
        Self {
            sense: self.antisense.complement(alphabet),
            antisense: self.sense.complement(alphabet),
        }
    }
}

impl ExtensionRecord {
    /// `antisense|sense` labels under `alphabet`.
    #[must_use]
    pub fn render(&self, alphabet: Alphabet) -> String {
        format!(
            "{}|{}",
            self.antisense.render(alphabet),
            self.sense.render(alphabet)
        )
    }
}

impl fmt::Display for ExtensionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(Alphabet::Nucleotide))
    }
}

// =============================================================================
// FLAGS
// =============================================================================

/// A single per-node state flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SeqFlag {
    /// Visited while walking in the SENSE direction.
    MarkSense = 0x1,
    /// Visited while walking in the ANTISENSE direction.
    MarkAntisense = 0x2,
    /// Scheduled for removal.
    Delete = 0x4,
    /// Already extended into a contig.
    Extended = 0x8,
}

impl SeqFlag {
    pub const ALL: [SeqFlag; 4] = [
        SeqFlag::MarkSense,
        SeqFlag::MarkAntisense,
        SeqFlag::Delete,
        SeqFlag::Extended,
    ];

    /// The mark flag for a traversal direction.
    #[must_use]
    pub const fn mark(dir: ExtDirection) -> Self {
        match dir {
            ExtDirection::Sense => Self::MarkSense,
            ExtDirection::Antisense => Self::MarkAntisense,
        }
    }

    #[must_use]
    pub const fn bit(self) -> u8 {
        self as u8
    }
}

/// A set of [`SeqFlag`]s.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(from = "u8", into = "u8")]
pub struct SeqFlags(u8);

impl From<u8> for SeqFlags {
    fn from(bits: u8) -> Self {
        Self::from_bits(bits)
    }
}

impl From<SeqFlags> for u8 {
    fn from(flags: SeqFlags) -> Self {
        flags.0
    }
}

impl SeqFlags {
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Flags from raw bits; unknown bits are dropped.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & 0x0f)
    }

    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[must_use]
    pub const fn contains(self, flag: SeqFlag) -> bool {
        self.0 & flag.bit() != 0
    }

    /// Set `flag`. Returns whether the set changed.
    pub fn insert(&mut self, flag: SeqFlag) -> bool {
        let before = self.0;
        self.0 |= flag.bit();
        self.0 != before
    }

    /// Clear `flag`. Returns whether the set changed.
    pub fn remove(&mut self, flag: SeqFlag) -> bool {
        let before = self.0;
        self.0 &= !flag.bit();
        self.0 != before
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn union(self, other: SeqFlags) -> Self {
        Self(self.0 | other.0)
    }

    /// Flags present, in bit order.
    pub fn iter(self) -> impl Iterator<Item = SeqFlag> {
        SeqFlag::ALL.into_iter().filter(move |f| self.contains(*f))
    }
}

// =============================================================================
// NODE RECORD
// =============================================================================

/// Everything stored for one k-mer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KmerData {
    pub ext: ExtensionRecord,
    pub multiplicity: u32,
    pub flags: SeqFlags,
}

impl KmerData {
    /// A freshly observed k-mer: no edges, multiplicity 1, no flags.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ext: ExtensionRecord::new(SeqExt::EMPTY, SeqExt::EMPTY),
            multiplicity: 1,
            flags: SeqFlags::empty(),
        }
    }

    /// Count one more observation (saturating).
    pub fn observe(&mut self) {
        self.multiplicity = self.multiplicity.saturating_add(1);
    }

    /// Fold another record for the same k-mer into this one: counts add,
    /// edges and flags union.
    pub fn absorb(&mut self, other: &KmerData) {
        self.multiplicity = self.multiplicity.saturating_add(other.multiplicity);
        self.ext.sense = self.ext.sense.union(other.ext.sense);
        self.ext.antisense = self.ext.antisense.union(other.ext.antisense);
        self.flags = self.flags.union(other.flags);
    }

    #[must_use]
    pub const fn is_marked(&self, dir: ExtDirection) -> bool {
        self.flags.contains(SeqFlag::mark(dir))
    }

    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.flags.contains(SeqFlag::Delete)
    }
}

impl Default for KmerData {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// TESTS
// =============================================================================
