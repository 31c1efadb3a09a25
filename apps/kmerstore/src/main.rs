//! # kmerstore
//!
//! Command-line front end for the k-mer graph store.
//!
//! ## Usage
//!
//! ```bash
//! # Count 31-mers from a FASTA file
//! kmerstore -D reads.kms build -i reads.fa -k 31 --canonical
//!
//! # Inspect the result
//! kmerstore -D reads.kms status
//! kmerstore -D reads.kms lookup --kmer ACGTACGTACGTACGTACGTACGTACGTACG
//!
//! # Exercise the partitioned store on 4 in-process ranks
//! kmerstore simulate -i reads.fa --ranks 4 -k 31
//! ```

use clap::Parser;
use kmerstore::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    // KMERSTORE_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("KMERSTORE_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "kmerstore=info,kmerstore_core=info".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the startup banner.
fn print_banner() {
    println!("kmerstore v{} - k-mer graph store", env!("CARGO_PKG_VERSION"));
    println!();
}
