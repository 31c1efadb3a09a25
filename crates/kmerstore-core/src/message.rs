//! # Remote Mutation Messages
//!
//! A mutation addressed to a k-mer owned by another process. Each variant
//! mirrors one mutating operation of [`crate::SequenceCollection`], and
//! applying a message on the owner goes through that same operation.
//!
//! Wire form: a postcard payload, one message per transport frame.

use crate::collection::SequenceCollection;
use crate::extension::{KmerData, SeqExt, SeqFlag};
use crate::kmer::{Base, Kmer};
use crate::types::{ExtDirection, KmerStoreError};
use serde::{Deserialize, Serialize};

/// A mutation shipped to the owner of its key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeqMessage {
    Add {
        kmer: Kmer,
    },
    Remove {
        kmer: Kmer,
    },
    Merge {
        kmer: Kmer,
        data: KmerData,
    },
    SetFlag {
        kmer: Kmer,
        flag: SeqFlag,
    },
    ClearFlag {
        kmer: Kmer,
        flag: SeqFlag,
    },
    SetBaseExtension {
        kmer: Kmer,
        dir: ExtDirection,
        base: Base,
    },
    RemoveExtension {
        kmer: Kmer,
        dir: ExtDirection,
        ext: SeqExt,
    },
}

impl SeqMessage {
    /// The key this message targets.
    #[must_use]
    pub const fn kmer(&self) -> &Kmer {
        match self {
            Self::Add { kmer }
            | Self::Remove { kmer }
            | Self::Merge { kmer, .. }
            | Self::SetFlag { kmer, .. }
            | Self::ClearFlag { kmer, .. }
            | Self::SetBaseExtension { kmer, .. }
            | Self::RemoveExtension { kmer, .. } => kmer,
        }
    }

    /// Encode to a wire frame.
    pub fn encode(&self) -> Result<Vec<u8>, KmerStoreError> {
        postcard::to_stdvec(self).map_err(|e| KmerStoreError::SerializationError(e.to_string()))
    }

    /// Decode a wire frame.
    pub fn decode(bytes: &[u8]) -> Result<Self, KmerStoreError> {
        postcard::from_bytes(bytes)
            .map_err(|e| KmerStoreError::DeserializationError(format!("bad message: {}", e)))
    }

    /// Apply this message to `collection` through the regular mutation path.
    pub fn apply<C: SequenceCollection + ?Sized>(
        &self,
        collection: &mut C,
    ) -> Result<(), KmerStoreError> {
        match self {
            Self::Add { kmer } => collection.add(kmer),
            Self::Remove { kmer } => collection.remove(kmer),
            Self::Merge { kmer, data } => collection.merge(kmer, *data),
            Self::SetFlag { kmer, flag } => collection.set_flag(kmer, *flag),
            Self::ClearFlag { kmer, flag } => collection.clear_flag(kmer, *flag),
            Self::SetBaseExtension { kmer, dir, base } => {
                collection.set_base_extension(kmer, *dir, *base).map(|_| ())
            }
            Self::RemoveExtension { kmer, dir, ext } => collection.remove_extension(kmer, *dir, *ext),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::store::KmerStore;

    fn kmer(s: &str) -> Kmer {
        s.parse().expect("kmer")
    }

    #[test]
    fn wire_roundtrip() {
        let msg = SeqMessage::SetBaseExtension {
            kmer: kmer("ACGTA"),
            dir: ExtDirection::Antisense,
            base: Base::G,
        };
        let bytes = msg.encode().expect("encode");
        assert_eq!(SeqMessage::decode(&bytes).expect("decode"), msg);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(SeqMessage::decode(&[0xff, 0xff, 0xff]).is_err());
        assert!(SeqMessage::decode(&[]).is_err());
    }

    #[test]
    fn apply_matches_local_calls() {
        let k = kmer("ACGT");
        let mut via_messages = KmerStore::new(StoreConfig::with_kmer_length(4)).expect("store");
        let mut direct = KmerStore::new(StoreConfig::with_kmer_length(4)).expect("store");

        let messages = [
            SeqMessage::Add { kmer: k },
            SeqMessage::Add { kmer: k },
            SeqMessage::SetBaseExtension {
                kmer: k,
                dir: ExtDirection::Sense,
                base: Base::C,
            },
            SeqMessage::SetFlag {
                kmer: k,
                flag: SeqFlag::MarkSense,
            },
            SeqMessage::RemoveExtension {
                kmer: k,
                dir: ExtDirection::Antisense,
                ext: SeqExt::full(),
            },
        ];
        for msg in &messages {
            msg.apply(&mut via_messages).expect("apply");
        }

        direct.add(&k).expect("add");
        direct.add(&k).expect("add");
        direct
            .set_base_extension(&k, ExtDirection::Sense, Base::C)
            .expect("ext");
        direct.mark(&k, ExtDirection::Sense).expect("mark");
        direct
            .clear_extensions(&k, ExtDirection::Antisense)
            .expect("clear");

        assert_eq!(via_messages.get(&k), direct.get(&k));
    }

    #[test]
    fn kmer_accessor() {
        let k = kmer("TTGA");
        let msg = SeqMessage::Remove { kmer: k };
        assert_eq!(msg.kmer(), &k);
    }
}
