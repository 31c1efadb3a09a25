//! # K-mer Keys
//!
//! Fixed-length symbol sequences packed two bits per symbol.
//!
//! The first symbol occupies the most significant used bits, so for equal
//! lengths numeric order of the packed value equals lexicographic order of
//! the text. Canonicalisation and snapshot ordering rely on this.

use crate::primitives::MAX_KMER_LENGTH;
use crate::types::{ExtDirection, KmerStoreError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// ALPHABET
// =============================================================================

/// Symbol encoding of a store.
///
/// Fixed at construction; both alphabets share the 2-bit codes 0..=3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Alphabet {
    /// `A C G T`.
    #[default]
    Nucleotide,
    /// Colour-space digits `0 1 2 3`.
    ColourSpace,
}

impl Alphabet {
    #[must_use]
    pub const fn from_colour_space(colour_space: bool) -> Self {
        if colour_space {
            Self::ColourSpace
        } else {
            Self::Nucleotide
        }
    }

    #[must_use]
    pub const fn is_colour_space(self) -> bool {
        matches!(self, Self::ColourSpace)
    }
}

// =============================================================================
// BASE
// =============================================================================

/// One symbol of the alphabet, stored as its 2-bit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Base {
    A = 0,
    C = 1,
    G = 2,
    T = 3,
}

impl Base {
    pub const ALL: [Base; 4] = [Base::A, Base::C, Base::G, Base::T];

    /// The 2-bit code of this symbol.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Decode a symbol character under the given alphabet.
    pub fn from_symbol(symbol: u8, alphabet: Alphabet) -> Result<Self, KmerStoreError> {
        let code = match (alphabet, symbol.to_ascii_uppercase()) {
            (Alphabet::Nucleotide, b'A') | (Alphabet::ColourSpace, b'0') => 0,
            (Alphabet::Nucleotide, b'C') | (Alphabet::ColourSpace, b'1') => 1,
            (Alphabet::Nucleotide, b'G') | (Alphabet::ColourSpace, b'2') => 2,
            (Alphabet::Nucleotide, b'T') | (Alphabet::ColourSpace, b'3') => 3,
            _ => return Err(KmerStoreError::InvalidSymbol(symbol as char)),
        };
        Self::try_from(code)
    }

    /// Render this symbol under the given alphabet.
    #[must_use]
    pub const fn to_symbol(self, alphabet: Alphabet) -> char {
        match alphabet {
            Alphabet::Nucleotide => match self {
                Self::A => 'A',
                Self::C => 'C',
                Self::G => 'G',
                Self::T => 'T',
            },
            Alphabet::ColourSpace => match self {
                Self::A => '0',
                Self::C => '1',
                Self::G => '2',
                Self::T => '3',
            },
        }
    }

    /// Watson-Crick complement; colour-space symbols are their own complement.
    #[must_use]
    pub const fn complement(self, alphabet: Alphabet) -> Self {
        match alphabet {
            Alphabet::ColourSpace => self,
            Alphabet::Nucleotide => match self {
                Self::A => Self::T,
                Self::C => Self::G,
                Self::G => Self::C,
                Self::T => Self::A,
            },
        }
    }
}

impl TryFrom<u8> for Base {
    type Error = KmerStoreError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::A),
            1 => Ok(Self::C),
            2 => Ok(Self::G),
            3 => Ok(Self::T),
            other => Err(KmerStoreError::InvalidBase(other)),
        }
    }
}

// =============================================================================
// KMER
// =============================================================================

/// A packed k-mer of length 1..=`MAX_KMER_LENGTH`.
///
/// Two keys are equal iff their symbol sequences are equal.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawKmer", into = "RawKmer")]
pub struct Kmer {
    len: u8,
    bits: u128,
}

/// Unvalidated wire form of a [`Kmer`].
#[derive(Serialize, Deserialize)]
struct RawKmer {
    len: u8,
    bits: u128,
}

impl TryFrom<RawKmer> for Kmer {
    type Error = KmerStoreError;

    fn try_from(raw: RawKmer) -> Result<Self, Self::Error> {
        Kmer::from_raw(raw.len as usize, raw.bits)
    }
}

impl From<Kmer> for RawKmer {
    fn from(kmer: Kmer) -> Self {
        Self {
            len: kmer.len,
            bits: kmer.bits,
        }
    }
}

/// Mask covering the low `2 * len` bits.
const fn len_mask(len: usize) -> u128 {
    if len >= MAX_KMER_LENGTH {
        u128::MAX
    } else {
        (1u128 << (2 * len)) - 1
    }
}

const fn check_len(len: usize) -> Result<(), KmerStoreError> {
    if len == 0 || len > MAX_KMER_LENGTH {
        return Err(KmerStoreError::InvalidKmerLength(len));
    }
    Ok(())
}

impl Kmer {
    /// Parse a k-mer from symbol text under the given alphabet.
    pub fn parse(text: &str, alphabet: Alphabet) -> Result<Self, KmerStoreError> {
        Self::from_symbols(text.as_bytes(), alphabet)
    }

    /// Build a k-mer from raw symbol bytes.
    pub fn from_symbols(symbols: &[u8], alphabet: Alphabet) -> Result<Self, KmerStoreError> {
        check_len(symbols.len())?;
        let mut bits = 0u128;
        for &symbol in symbols {
            let base = Base::from_symbol(symbol, alphabet)?;
            bits = (bits << 2) | base.code() as u128;
        }
        Ok(Self {
            len: symbols.len() as u8,
            bits,
        })
    }

    /// Build a k-mer from a base slice.
    pub fn from_bases(bases: &[Base]) -> Result<Self, KmerStoreError> {
        check_len(bases.len())?;
        let bits = bases
            .iter()
            .fold(0u128, |acc, base| (acc << 2) | base.code() as u128);
        Ok(Self {
            len: bases.len() as u8,
            bits,
        })
    }

    /// Rebuild a k-mer from its packed form, rejecting stray high bits.
    pub fn from_raw(len: usize, bits: u128) -> Result<Self, KmerStoreError> {
        check_len(len)?;
        if bits & !len_mask(len) != 0 {
            return Err(KmerStoreError::DeserializationError(format!(
                "packed k-mer has bits beyond length {}",
                len
            )));
        }
        Ok(Self {
            len: len as u8,
            bits,
        })
    }

    /// Number of symbols.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len as usize
    }

    /// Always false; zero-length k-mers cannot be constructed.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The packed value.
    #[must_use]
    pub const fn bits(&self) -> u128 {
        self.bits
    }

    /// Symbol at position `i` (0 = 5' end).
    pub fn base_at(&self, i: usize) -> Result<Base, KmerStoreError> {
        if i >= self.len() {
            return Err(KmerStoreError::PositionOutOfRange {
                index: i,
                len: self.len(),
            });
        }
        let shift = 2 * (self.len() - 1 - i);
        Base::try_from(((self.bits >> shift) & 0b11) as u8)
    }

    /// Symbol at the 5' end.
    pub fn first_base(&self) -> Result<Base, KmerStoreError> {
        self.base_at(0)
    }

    /// Symbol at the 3' end.
    pub fn last_base(&self) -> Result<Base, KmerStoreError> {
        Base::try_from((self.bits & 0b11) as u8)
    }

    /// All symbols, 5' to 3'.
    pub fn bases(&self) -> impl Iterator<Item = Base> + '_ {
        (0..self.len()).filter_map(|i| self.base_at(i).ok())
    }

    /// The neighbouring k-mer one step away in `dir`.
    ///
    /// SENSE drops the first symbol and appends `base`; ANTISENSE drops the
    /// last symbol and prepends `base`.
    #[must_use]
    pub fn shift(&self, dir: ExtDirection, base: Base) -> Self {
        let len = self.len();
        let bits = match dir {
            ExtDirection::Sense => ((self.bits << 2) | base.code() as u128) & len_mask(len),
            ExtDirection::Antisense => {
                (self.bits >> 2) | ((base.code() as u128) << (2 * (len - 1)))
            }
        };
        Self { len: self.len, bits }
    }

    /// The reverse complement (pure reversal in colour space).
    #[must_use]
    pub fn reverse_complement(&self, alphabet: Alphabet) -> Self {
        let mut remaining = self.bits;
        let mut bits = 0u128;
        for _ in 0..self.len() {
            let code = (remaining & 0b11) as u8;
            remaining >>= 2;
            let base = match Base::try_from(code) {
                Ok(base) => base.complement(alphabet),
                Err(_) => Base::A,
            };
            bits = (bits << 2) | base.code() as u128;
        }
        Self { len: self.len, bits }
    }

    /// The lexicographically smaller of this k-mer and its reverse
    /// complement, plus whether the reverse complement was chosen.
    #[must_use]
    pub fn canonical(&self, alphabet: Alphabet) -> (Self, bool) {
        let rc = self.reverse_complement(alphabet);
        if rc.bits < self.bits {
            (rc, true)
        } else {
            (*self, false)
        }
    }

    /// Render under the given alphabet.
    #[must_use]
    pub fn render(&self, alphabet: Alphabet) -> String {
        self.bases().map(|b| b.to_symbol(alphabet)).collect()
    }
}

impl FromStr for Kmer {
    type Err = KmerStoreError;

    /// Parses nucleotide text.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s, Alphabet::Nucleotide)
    }
}

impl fmt::Display for Kmer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(Alphabet::Nucleotide))
    }
}

impl fmt::Debug for Kmer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Kmer({})", self)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn kmer(s: &str) -> Kmer {
        s.parse().expect("valid kmer")
    }

    #[test]
    fn parse_and_render_roundtrip() {
        assert_eq!(kmer("ACGTTGCA").to_string(), "ACGTTGCA");
        assert_eq!(kmer("acgt").to_string(), "ACGT");
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert!(matches!(
            "ACNT".parse::<Kmer>(),
            Err(KmerStoreError::InvalidSymbol('N'))
        ));
        assert!(matches!(
            "".parse::<Kmer>(),
            Err(KmerStoreError::InvalidKmerLength(0))
        ));
        let long = "A".repeat(MAX_KMER_LENGTH + 1);
        assert!(long.parse::<Kmer>().is_err());
    }

    #[test]
    fn colour_space_parsing() {
        let cs = Kmer::parse("0123", Alphabet::ColourSpace).expect("parse");
        assert_eq!(cs, kmer("ACGT"));
        assert_eq!(cs.render(Alphabet::ColourSpace), "0123");
        assert!(Kmer::parse("ACGT", Alphabet::ColourSpace).is_err());
    }

    #[test]
    fn first_and_last_base() {
        let k = kmer("GATC");
        assert_eq!(k.first_base().expect("first"), Base::G);
        assert_eq!(k.last_base().expect("last"), Base::C);
    }

    #[test]
    fn base_at_past_end() {
        assert!(matches!(
            kmer("GATC").base_at(4),
            Err(KmerStoreError::PositionOutOfRange { index: 4, len: 4 })
        ));
    }

    #[test]
    fn shift_in_both_directions() {
        let k = kmer("ACGT");
        assert_eq!(k.shift(ExtDirection::Sense, Base::A), kmer("CGTA"));
        assert_eq!(k.shift(ExtDirection::Antisense, Base::G), kmer("GACG"));
    }

    #[test]
    fn shift_full_width_kmer() {
        let text = "C".repeat(MAX_KMER_LENGTH);
        let k = kmer(&text);
        let shifted = k.shift(ExtDirection::Sense, Base::T);
        assert_eq!(shifted.len(), MAX_KMER_LENGTH);
        assert_eq!(shifted.last_base().expect("last"), Base::T);
        assert_eq!(shifted.first_base().expect("first"), Base::C);
    }

    #[test]
    fn reverse_complement_nucleotide() {
        assert_eq!(kmer("AACG").reverse_complement(Alphabet::Nucleotide), kmer("CGTT"));
        let k = kmer("GATTACA");
        let rc = k.reverse_complement(Alphabet::Nucleotide);
        assert_eq!(rc.reverse_complement(Alphabet::Nucleotide), k);
    }

    #[test]
    fn reverse_complement_colour_space_is_reversal() {
        let k = Kmer::parse("0012", Alphabet::ColourSpace).expect("parse");
        let rc = k.reverse_complement(Alphabet::ColourSpace);
        assert_eq!(rc.render(Alphabet::ColourSpace), "2100");
    }

    #[test]
    fn canonical_picks_smaller_strand() {
        let (c, flipped) = kmer("TTGC").canonical(Alphabet::Nucleotide);
        assert_eq!(c, kmer("GCAA"));
        assert!(flipped);

        let (c, flipped) = kmer("ACGG").canonical(Alphabet::Nucleotide);
        assert_eq!(c, kmer("ACGG"));
        assert!(!flipped);
    }

    #[test]
    fn from_raw_rejects_stray_bits() {
        assert!(Kmer::from_raw(2, 0b1111).is_ok());
        assert!(Kmer::from_raw(2, 0b1_0000).is_err());
        assert!(Kmer::from_raw(0, 0).is_err());
    }

    #[test]
    fn ordering_matches_lexicographic() {
        assert!(kmer("ACGT") < kmer("ACTA"));
        assert!(kmer("AAAA") < kmer("TTTT"));
    }

    #[test]
    fn postcard_rejects_invalid_kmer() {
        let raw = RawKmer { len: 3, bits: u128::MAX };
        let bytes = postcard::to_stdvec(&raw).expect("encode");
        assert!(postcard::from_bytes::<Kmer>(&bytes).is_err());
    }
}
