//! # kmerstore CLI Module
//!
//! This module implements the CLI interface for kmerstore.
//!
//! ## Available Commands
//!
//! - `build` - Count k-mers from a reads file and save a snapshot
//! - `status` - Show load diagnostics of a snapshot
//! - `lookup` - Show the record stored for one k-mer
//! - `simulate` - Build across several in-process ranks
//! - `hash` - Compute BLAKE3 checksum of a snapshot

mod commands;

use clap::{Parser, Subcommand};
use kmerstore_core::KmerStoreError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// kmerstore - k-mer graph store
///
/// Counts k-mers and their adjacency from sequencing reads.
#[derive(Parser, Debug)]
#[command(name = "kmerstore")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the snapshot file
    #[arg(short = 'D', long, global = true, default_value = "kmerstore.kms")]
    pub snapshot: PathBuf,

    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long = "json", global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Count k-mers from a reads file and save a snapshot
    Build {
        /// Reads file (FASTA or one read per line)
        #[arg(short, long)]
        input: PathBuf,

        /// K-mer length (overrides the config file)
        #[arg(short, long)]
        kmer_length: Option<usize>,

        /// Store k-mers in canonical orientation
        #[arg(long)]
        canonical: bool,

        /// Reads are colour-space digits
        #[arg(long)]
        colour_space: bool,
    },

    /// Show load diagnostics of a snapshot
    Status,

    /// Show the record stored for one k-mer
    Lookup {
        /// K-mer text, in the snapshot's alphabet
        #[arg(long)]
        kmer: String,
    },

    /// Build across several in-process ranks and report each partition
    Simulate {
        /// Reads file (FASTA or one read per line)
        #[arg(short, long)]
        input: PathBuf,

        /// Number of ranks
        #[arg(short, long, default_value = "4")]
        ranks: u32,

        /// K-mer length (overrides the config file)
        #[arg(short, long)]
        kmer_length: Option<usize>,
    },

    /// Compute BLAKE3 checksum of a snapshot
    Hash,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), KmerStoreError> {
    let json_mode = cli.json_mode;
    let config = crate::config::AppConfig::resolve(cli.config.as_deref())?;

    match cli.command {
        Some(Commands::Build {
            input,
            kmer_length,
            canonical,
            colour_space,
        }) => {
            let overrides = crate::config::StoreOverrides {
                kmer_length,
                canonical,
                colour_space,
            };
            let store_config = overrides.apply(config.store)?;
            cmd_build(&cli.snapshot, &store_config, json_mode, &input)
        }
        Some(Commands::Status) => cmd_status(&cli.snapshot, json_mode),
        Some(Commands::Lookup { kmer }) => cmd_lookup(&cli.snapshot, json_mode, &kmer),
        Some(Commands::Simulate {
            input,
            ranks,
            kmer_length,
        }) => {
            let overrides = crate::config::StoreOverrides {
                kmer_length,
                ..Default::default()
            };
            let store_config = overrides.apply(config.store)?;
            cmd_simulate(&store_config, json_mode, &input, ranks)
        }
        Some(Commands::Hash) => cmd_hash(&cli.snapshot, json_mode),
        None => {
            // No subcommand - show status by default
            cmd_status(&cli.snapshot, json_mode)
        }
    }
}
