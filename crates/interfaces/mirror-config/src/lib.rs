//! Central configuration constants for runtime limits and defaults.

/// Default number of files dispatched to the worker pool per batch.
pub const DEFAULT_FILE_COPY_BATCH_SIZE: usize = 100;

/// Default number of concurrent copy workers.
pub const DEFAULT_MAX_WORKERS: usize = 4;

/// Minimum allowed concurrent copy workers.
pub const MIN_WORKERS: usize = 1;

/// Maximum allowed concurrent copy workers.
pub const MAX_WORKERS: usize = 64;

/// Default read size when hashing file contents (bytes). 64 KiB.
pub const DEFAULT_HASHING_CHUNK_SIZE: usize = 64 * 1024;

/// Suffix of the hidden, randomly named file a copy is staged in before it
/// replaces the destination.
pub const STAGING_SUFFIX: &str = ".mirror-part";

/// Convenience function to clamp a worker count into the allowed range.
pub fn clamp_workers(v: usize) -> usize {
    v.clamp(MIN_WORKERS, MAX_WORKERS)
}
