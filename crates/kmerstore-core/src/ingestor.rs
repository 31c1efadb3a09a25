//! # Ingestor Module
//!
//! Turns reads into k-mers and adjacency for any [`SequenceCollection`].
//!
//! - Split reads on symbols outside the alphabet
//! - Slide a window of k over each run and count every k-mer
//! - Record the edge to each neighbour inside the run
//! - Optionally store k-mers in canonical orientation

use crate::collection::SequenceCollection;
use crate::kmer::{Alphabet, Base, Kmer};
use crate::types::{ExtDirection, KmerStoreError};
use serde::Serialize;
use std::io::BufRead;

/// Counts from one ingestion call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    /// Reads seen.
    pub reads: usize,
    /// K-mer occurrences added.
    pub kmers: usize,
    /// Symbols outside the alphabet.
    pub skipped_symbols: usize,
}

impl IngestStats {
    /// Add `other`'s counts to these.
    pub fn absorb(&mut self, other: IngestStats) {
        self.reads += other.reads;
        self.kmers += other.kmers;
        self.skipped_symbols += other.skipped_symbols;
    }
}

/// Stateless read loader.
pub struct Ingestor;

impl Ingestor {
    /// Split `read` into maximal runs of valid symbols.
    ///
    /// Returns the runs and the number of symbols skipped between them.
    #[must_use]
    pub fn runs(read: &[u8], alphabet: Alphabet) -> (Vec<Vec<Base>>, usize) {
        let mut runs = Vec::new();
        let mut current = Vec::new();
        let mut skipped = 0;

        for &symbol in read {
            match Base::from_symbol(symbol, alphabet) {
                Ok(base) => current.push(base),
                Err(_) => {
                    skipped += 1;
                    if !current.is_empty() {
                        runs.push(std::mem::take(&mut current));
                    }
                }
            }
        }
        if !current.is_empty() {
            runs.push(current);
        }
        (runs, skipped)
    }

    /// Add every k-mer of `read` to `collection`, with edges to its
    /// neighbours inside the same run.
    ///
    /// K, the alphabet and canonical orientation come from the collection's
    /// configuration. Runs shorter than k contribute nothing.
    pub fn ingest_sequence<C: SequenceCollection + ?Sized>(
        collection: &mut C,
        read: &str,
    ) -> Result<IngestStats, KmerStoreError> {
        let k = collection.config().kmer_length;
        let alphabet = collection.config().alphabet();
        let (runs, skipped) = Self::runs(read.as_bytes(), alphabet);

        let mut stats = IngestStats {
            reads: 1,
            kmers: 0,
            skipped_symbols: skipped,
        };
        for run in runs.iter().filter(|run| run.len() >= k) {
            stats.kmers += Self::ingest_run(collection, run, k)?;
        }
        Ok(stats)
    }

    fn ingest_run<C: SequenceCollection + ?Sized>(
        collection: &mut C,
        run: &[Base],
        k: usize,
    ) -> Result<usize, KmerStoreError> {
        let canonical = collection.config().canonical;
        let alphabet = collection.config().alphabet();
        let mut kmer = Kmer::from_bases(&run[..k])?;
        let windows = run.len() - k + 1;

        for i in 0..windows {
            if i > 0 {
                kmer = kmer.shift(ExtDirection::Sense, run[i + k - 1]);
            }
            let next = run.get(i + k).copied();
            let prev = i.checked_sub(1).map(|p| run[p]);

            let (stored, flipped) = if canonical {
                kmer.canonical(alphabet)
            } else {
                (kmer, false)
            };
            collection.add(&stored)?;

            for (dir, base) in [(ExtDirection::Sense, next), (ExtDirection::Antisense, prev)] {
                let Some(base) = base else { continue };
                if flipped {
                    collection.set_base_extension(
                        &stored,
                        dir.complement(),
                        base.complement(alphabet),
                    )?;
                } else {
                    collection.set_base_extension(&stored, dir, base)?;
                }
            }
        }
        Ok(windows)
    }

    /// Ingest every read from `reader`.
    ///
    /// See [`Ingestor::for_each_record`] for the accepted layouts.
    pub fn ingest_reader<C: SequenceCollection + ?Sized, R: BufRead>(
        collection: &mut C,
        reader: R,
    ) -> Result<IngestStats, KmerStoreError> {
        let mut stats = IngestStats::default();
        Self::for_each_record(reader, |record| {
            stats.absorb(Self::ingest_sequence(&mut *collection, record)?);
            Ok(())
        })?;

        tracing::debug!(
            reads = stats.reads,
            kmers = stats.kmers,
            skipped = stats.skipped_symbols,
            "reads ingested"
        );
        Ok(stats)
    }

    /// Collect every read from `reader`.
    pub fn read_records<R: BufRead>(reader: R) -> Result<Vec<String>, KmerStoreError> {
        let mut records = Vec::new();
        Self::for_each_record(reader, |record| {
            records.push(record.to_string());
            Ok(())
        })?;
        Ok(records)
    }

    /// Call `f` once per read in `reader`.
    ///
    /// Accepts FASTA (header lines start with `>`, a record may span several
    /// lines) or plain text with one read per line. Blank lines end a record.
    pub fn for_each_record<R, F>(reader: R, mut f: F) -> Result<(), KmerStoreError>
    where
        R: BufRead,
        F: FnMut(&str) -> Result<(), KmerStoreError>,
    {
        let mut fasta = false;
        let mut record = String::new();

        for line in reader.lines() {
            let line = line?;
            let line = line.trim();

            let ends_record = if line.starts_with('>') {
                fasta = true;
                true
            } else if line.is_empty() {
                true
            } else {
                record.push_str(line);
                !fasta
            };

            if ends_record && !record.is_empty() {
                f(&record)?;
                record.clear();
            }
        }
        if !record.is_empty() {
            f(&record)?;
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
