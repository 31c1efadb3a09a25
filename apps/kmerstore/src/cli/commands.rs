//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use kmerstore_core::{
    Alphabet, ChannelTransport, DistributedStore, IngestStats, Ingestor, Kmer, KmerData,
    KmerStore, KmerStoreError, LoadReport, SequenceCollection, StoreConfig,
    TrafficCounters, Transport,
    formats::{MAX_SNAPSHOT_SIZE, read_snapshot, snapshot_from_bytes, snapshot_hash},
};
use serde::Serialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Barrier;

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum size of a reads file (16 GiB).
///
/// Reads are streamed, so this only guards against pointing the tool at
/// something that is clearly not a reads file.
const MAX_READS_FILE_SIZE: u64 = 16 * 1024 * 1024 * 1024;

/// Maximum size of a reads file for `simulate` (512 MB).
///
/// Simulation holds every read in memory to deal them out to ranks.
const MAX_SIMULATE_FILE_SIZE: u64 = 512 * 1024 * 1024;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), KmerStoreError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| KmerStoreError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(KmerStoreError::IoError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Validate an input path.
///
/// Canonicalizes the path (resolving symlinks and "..") and ensures it names
/// an existing regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, KmerStoreError> {
    let canonical = path.canonicalize().map_err(|e| {
        KmerStoreError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(KmerStoreError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Validate an output path.
///
/// The parent directory must exist; the file itself may not.
fn validate_output_path(path: &Path) -> Result<PathBuf, KmerStoreError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        KmerStoreError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(KmerStoreError::IoError(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| KmerStoreError::IoError("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

// =============================================================================
// BUILD COMMAND
// =============================================================================

/// Count k-mers from `input` and save a snapshot.
pub fn cmd_build(
    snapshot: &Path,
    config: &StoreConfig,
    json_mode: bool,
    input: &Path,
) -> Result<(), KmerStoreError> {
    let validated_input = validate_file_path(input)?;
    validate_file_size(&validated_input, MAX_READS_FILE_SIZE)?;
    let validated_output = validate_output_path(snapshot)?;

    tracing::info!(
        input = %validated_input.display(),
        k = config.kmer_length,
        canonical = config.canonical,
        colour_space = config.colour_space,
        "building snapshot"
    );

    let single = StoreConfig {
        partitions: 1,
        rank: 0,
        ..config.clone()
    };
    let mut store = KmerStore::new(single)?;
    let reader = BufReader::new(File::open(&validated_input)?);
    let stats = Ingestor::ingest_reader(&mut store, reader)?;
    store.save(&validated_output)?;
    let report = store.print_load();

    if json_mode {
        print_json(&serde_json::json!({
            "snapshot": validated_output.to_string_lossy(),
            "ingest": stats,
            "load": report,
        }));
        return Ok(());
    }

    println!(
        "Ingested {} reads ({} k-mers, {} skipped symbols)",
        stats.reads, stats.kmers, stats.skipped_symbols
    );
    println!("Saved {} k-mers to {:?}", report.entries, validated_output);

    Ok(())
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show load diagnostics of a snapshot.
pub fn cmd_status(snapshot: &Path, json_mode: bool) -> Result<(), KmerStoreError> {
    let store = open_snapshot(snapshot)?;
    let report = store.print_load();

    if json_mode {
        print_json(&serde_json::json!({
            "snapshot": snapshot.to_string_lossy(),
            "kmer_length": store.kmer_length(),
            "colour_space": store.colour_space(),
            "load": report,
        }));
        return Ok(());
    }

    println!("kmerstore Snapshot Status");
    println!("=========================");
    println!("Snapshot:     {:?}", snapshot);
    println!("K:            {}", store.kmer_length());
    println!("Colour space: {}", store.colour_space());
    println!();
    println!("K-mers:       {}", report.entries);
    println!("Capacity:     {}", report.capacity);
    println!("Load:         {} per thousand", report.load_per_thousand);
    println!("Dead ends:    {}", report.dead_ends);
    println!("Ambiguous:    {}", report.ambiguous);
    println!("Marked:       {}", report.marked);
    println!("Deleted:      {}", report.deleted);
    println!("Multiplicity: {}", report.total_multiplicity);

    Ok(())
}

// =============================================================================
// LOOKUP COMMAND
// =============================================================================

/// A lookup hit, as printed.
#[derive(Debug, Serialize)]
struct LookupHit {
    kmer: String,
    reverse_complement: bool,
    antisense: String,
    sense: String,
    multiplicity: u32,
    flags: Vec<String>,
}

impl LookupHit {
    fn new(kmer: &Kmer, data: &KmerData, alphabet: Alphabet, reverse_complement: bool) -> Self {
        Self {
            kmer: kmer.render(alphabet),
            reverse_complement,
            antisense: data.ext.antisense.render(alphabet),
            sense: data.ext.sense.render(alphabet),
            multiplicity: data.multiplicity,
            flags: data.flags.iter().map(|f| format!("{:?}", f)).collect(),
        }
    }
}

/// Show the record stored for `text`, trying its reverse complement too.
pub fn cmd_lookup(snapshot: &Path, json_mode: bool, text: &str) -> Result<(), KmerStoreError> {
    let store = open_snapshot(snapshot)?;
    let alphabet = store.alphabet();
    let query = Kmer::parse(text.trim(), alphabet)?;
    if query.len() != store.kmer_length() {
        return Err(KmerStoreError::KmerLengthMismatch {
            expected: store.kmer_length(),
            actual: query.len(),
        });
    }

    let rc = query.reverse_complement(alphabet);
    let hit = match store.get_seq_and_data(&query) {
        Ok((k, d)) => Some(LookupHit::new(k, d, alphabet, false)),
        Err(KmerStoreError::NotFound(_)) => store
            .get_seq_and_data(&rc)
            .ok()
            .map(|(k, d)| LookupHit::new(k, d, alphabet, true)),
        Err(e) => return Err(e),
    };

    if json_mode {
        print_json(&serde_json::json!({
            "query": query.render(alphabet),
            "found": hit.is_some(),
            "hit": hit,
        }));
        return Ok(());
    }

    match hit {
        Some(hit) => {
            println!("{}", hit.kmer);
            if hit.reverse_complement {
                println!("  (stored as reverse complement of {})", text.trim());
            }
            println!("  Antisense:    {}", hit.antisense);
            println!("  Sense:        {}", hit.sense);
            println!("  Multiplicity: {}", hit.multiplicity);
            if !hit.flags.is_empty() {
                println!("  Flags:        {}", hit.flags.join(", "));
            }
        }
        None => println!("K-mer {} not found", query.render(alphabet)),
    }

    Ok(())
}

// =============================================================================
// SIMULATE COMMAND
// =============================================================================

/// Outcome of one simulated rank.
#[derive(Debug, Clone, Serialize)]
pub struct RankSummary {
    pub rank: u32,
    pub ingest: IngestStats,
    pub pumped: usize,
    pub traffic: TrafficCounters,
    pub load: LoadReport,
}

/// Deal reads out to `ranks` in-process ranks, build, and pump until quiet.
pub fn cmd_simulate(
    config: &StoreConfig,
    json_mode: bool,
    input: &Path,
    ranks: u32,
) -> Result<(), KmerStoreError> {
    let validated_input = validate_file_path(input)?;
    validate_file_size(&validated_input, MAX_SIMULATE_FILE_SIZE)?;
    let records = Ingestor::read_records(BufReader::new(File::open(&validated_input)?))?;

    let summaries = simulate(config, &records, ranks)?;
    let combined = summaries
        .iter()
        .fold(LoadReport::default(), |acc, s| acc.combine(&s.load));

    if json_mode {
        print_json(&serde_json::json!({
            "ranks": summaries,
            "combined": combined,
        }));
        return Ok(());
    }

    println!("Simulated {} ranks over {} reads", ranks, records.len());
    println!();
    println!("Rank  Reads  K-mers  Sent  Applied  Entries");
    for s in &summaries {
        println!(
            "{:>4}  {:>5}  {:>6}  {:>4}  {:>7}  {:>7}",
            s.rank, s.ingest.reads, s.ingest.kmers, s.traffic.sent, s.traffic.applied, s.load.entries
        );
    }
    println!();
    println!("Combined: {}", combined);

    Ok(())
}

/// Run `ranks` ranks on scoped threads. Rank `r` ingests every `ranks`-th
/// read starting at `r`; all ranks finish ingesting before any pumps.
pub fn simulate(
    config: &StoreConfig,
    records: &[String],
    ranks: u32,
) -> Result<Vec<RankSummary>, KmerStoreError> {
    StoreConfig {
        partitions: ranks,
        rank: 0,
        ..config.clone()
    }
    .validate()?;

    let barrier = Barrier::new(ranks as usize);
    let results: Vec<Result<RankSummary, KmerStoreError>> = std::thread::scope(|scope| {
        let handles: Vec<_> = ChannelTransport::mesh(ranks)
            .into_iter()
            .map(|transport| {
                let rank_config = StoreConfig {
                    partitions: ranks,
                    rank: transport.rank().0,
                    ..config.clone()
                };
                let barrier = &barrier;
                scope.spawn(move || run_rank(rank_config, transport, records, barrier))
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| {
                handle.join().unwrap_or_else(|_| {
                    Err(KmerStoreError::TransportError(
                        "rank thread panicked".to_string(),
                    ))
                })
            })
            .collect()
    });

    results.into_iter().collect()
}

fn run_rank(
    config: StoreConfig,
    transport: ChannelTransport,
    records: &[String],
    barrier: &Barrier,
) -> Result<RankSummary, KmerStoreError> {
    let rank = transport.rank();
    let stride = transport.size() as usize;

    let ingested = DistributedStore::new(config, transport).and_then(|mut store| {
        let mut stats = IngestStats::default();
        for record in records.iter().skip(rank.0 as usize).step_by(stride) {
            stats.absorb(Ingestor::ingest_sequence(&mut store, record)?);
        }
        Ok((store, stats))
    });

    // Every rank must reach the barrier, even after a failure, or the
    // others never get past it.
    barrier.wait();
    let (mut store, ingest) = ingested?;

    let mut pumped = 0;
    loop {
        let drained = store.pump_network()?;
        if drained == 0 {
            break;
        }
        pumped += drained;
    }

    tracing::debug!(rank = %rank, pumped, "rank quiescent");
    Ok(RankSummary {
        rank: rank.0,
        ingest,
        pumped,
        traffic: store.traffic(),
        load: store.print_load(),
    })
}

// =============================================================================
// HASH COMMAND
// =============================================================================

/// Compute BLAKE3 checksum of a snapshot.
pub fn cmd_hash(snapshot: &Path, json_mode: bool) -> Result<(), KmerStoreError> {
    let validated = validate_file_path(snapshot)?;
    validate_file_size(&validated, MAX_SNAPSHOT_SIZE)?;
    let bytes = std::fs::read(&validated)?;

    // Refuse to hash something that is not a snapshot.
    let decoded = snapshot_from_bytes(&bytes)?;
    let hash = snapshot_hash(&bytes);

    if json_mode {
        print_json(&serde_json::json!({
            "snapshot": validated.to_string_lossy(),
            "entries": decoded.entries.len(),
            "blake3": hash,
        }));
        return Ok(());
    }

    println!("BLAKE3: {}", hash);
    println!("Entries: {}", decoded.entries.len());

    Ok(())
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Load a snapshot into a single-process store configured to match it.
pub fn open_snapshot(path: &Path) -> Result<KmerStore, KmerStoreError> {
    let validated = validate_file_path(path)?;
    let snapshot = read_snapshot(&validated)?;
    let config = StoreConfig {
        kmer_length: snapshot.kmer_length as usize,
        colour_space: snapshot.colour_space,
        ..StoreConfig::default()
    };

    let mut store = KmerStore::with_capacity(config, snapshot.entries.len())?;
    let entries = store.load_snapshot(snapshot)?;
    tracing::debug!(path = %validated.display(), entries, "snapshot opened");
    Ok(store)
}

fn print_json(value: &serde_json::Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_default()
    );
}
