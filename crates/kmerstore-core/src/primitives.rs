//! # Store Primitives
//!
//! Compile-time constants for the k-mer store.
//! These are fixed in the binary and immutable at runtime.

/// Longest supported k-mer.
///
/// - Keys are packed two bits per symbol into a `u128`.
pub const MAX_KMER_LENGTH: usize = 64;

/// Default k when no configuration is given.
pub const DEFAULT_KMER_LENGTH: usize = 25;

/// Magic bytes for the snapshot file header ("KMSN").
pub const MAGIC_BYTES: &[u8; 4] = b"KMSN";

/// Current snapshot format version.
///
/// Increment this when making breaking changes to the snapshot format.
pub const FORMAT_VERSION: u8 = 1;

/// Bitmask covering every symbol of a direction's extension mask.
pub const FULL_EXTENSION_MASK: u8 = 0x0f;

/// Default upper bound on messages applied by a single pump call.
///
/// Keeps one drain from starving the local worker loop.
pub const DEFAULT_MAX_PUMP_BATCH: usize = 4096;

/// Default wait for the first message of a pump call, in milliseconds.
///
/// Zero means a pump never blocks on an empty queue.
pub const DEFAULT_PUMP_WAIT_MS: u64 = 0;

/// Largest pump wait accepted by configuration validation.
pub const MAX_PUMP_WAIT_MS: u64 = 60_000;

/// Largest partition count accepted by configuration validation.
pub const MAX_PARTITIONS: u32 = 65_536;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kmer_fits_in_u128() {
        assert_eq!(MAX_KMER_LENGTH * 2, 128);
        assert!(DEFAULT_KMER_LENGTH <= MAX_KMER_LENGTH);
    }

    #[test]
    fn magic_bytes_correct() {
        assert_eq!(MAGIC_BYTES, b"KMSN");
    }
}
