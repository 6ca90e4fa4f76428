pub mod hashing;

// Re-exports for convenience
pub use hashing::{hash_file, ChunkHasher, ContentHasher, Digest, HashError};
