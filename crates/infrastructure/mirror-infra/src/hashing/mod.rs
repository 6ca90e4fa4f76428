use camino::{Utf8Path, Utf8PathBuf};
use md5::Context;
use std::fmt;
use std::fs::File;
use std::io::{self, Read};

#[derive(Debug, thiserror::Error)]
pub enum HashError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("chunk size must be greater than zero")]
    ZeroChunkSize,
}

/// MD5 digest of a file's full contents.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest(md5::Digest);

impl Digest {
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0 .0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self.0)
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({self})")
    }
}

/// Anything that can produce a content digest for a path.
pub trait ContentHasher: Send + Sync {
    fn digest(&self, path: &Utf8Path) -> Result<Digest, HashError>;
}

/// Reads files sequentially in fixed-size chunks so memory use stays bounded
/// regardless of file size.
#[derive(Debug, Clone, Copy)]
pub struct ChunkHasher {
    chunk_size: usize,
}

impl ChunkHasher {
    pub fn new(chunk_size: usize) -> Self {
        Self { chunk_size }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}

impl ContentHasher for ChunkHasher {
    fn digest(&self, path: &Utf8Path) -> Result<Digest, HashError> {
        hash_file(path, self.chunk_size)
    }
}

/// Compute the digest of `path`, reading `chunk_size` bytes at a time.
pub fn hash_file(path: &Utf8Path, chunk_size: usize) -> Result<Digest, HashError> {
    if chunk_size == 0 {
        return Err(HashError::ZeroChunkSize);
    }
    let io_err = |source| HashError::Io {
        path: path.to_owned(),
        source,
    };
    let file = File::open(path).map_err(io_err)?;
    hash_reader(file, chunk_size).map_err(io_err)
}

/// Digest an arbitrary reader; the result depends only on the bytes read.
pub fn hash_reader<R: Read>(mut reader: R, chunk_size: usize) -> io::Result<Digest> {
    let mut hasher = Context::new();
    let mut buf = vec![0u8; chunk_size.max(1)];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.consume(&buf[..n]);
    }
    Ok(Digest(hasher.finalize()))
}
