//! # Formats
//!
//! Byte-level formats: snapshot files (`snapshot`) and the message codec
//! used between processes (see [`crate::message`]).

pub mod snapshot;

pub use snapshot::{
    MAX_SNAPSHOT_SIZE, Snapshot, read_snapshot, snapshot_from_bytes,
    snapshot_to_bytes, write_snapshot,
};

#[cfg(feature = "crypto-hash")]
pub use snapshot::snapshot_hash;
