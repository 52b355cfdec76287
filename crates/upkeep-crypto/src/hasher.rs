use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use upkeep_types::Fingerprint;

const READ_CHUNK: usize = 64 * 1024;

/// Domain-separated BLAKE3 content hasher.
///
/// The domain tag is fed to the hasher ahead of the content, so a digest
/// computed under one tag never collides with the same bytes under another.
#[derive(Clone, Copy, Debug)]
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    /// Hasher for tracked file contents. Registry rows and tree scans must
    /// both use this one.
    pub const FILE: Self = Self {
        domain: "upkeep-file-v1",
    };

    /// Create a hasher with a custom domain tag.
    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    fn start(&self) -> blake3::Hasher {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher
    }

    /// Hash raw bytes with domain separation.
    pub fn hash(&self, data: &[u8]) -> Fingerprint {
        let mut hasher = self.start();
        hasher.update(data);
        Fingerprint::from_hash(*hasher.finalize().as_bytes())
    }

    /// Hash everything a reader yields, in fixed-size chunks.
    pub fn hash_reader<R: Read>(&self, mut reader: R) -> Result<Fingerprint, HasherError> {
        let mut hasher = self.start();
        let mut buf = vec![0u8; READ_CHUNK];
        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(HasherError::Io(e)),
            };
            hasher.update(&buf[..n]);
        }
        Ok(Fingerprint::from_hash(*hasher.finalize().as_bytes()))
    }

    /// Fingerprint a file on disk without loading it whole.
    pub fn hash_file(&self, path: &Path) -> Result<Fingerprint, HasherError> {
        let file = File::open(path).map_err(HasherError::Io)?;
        self.hash_reader(file)
    }

    /// Verify that data produces the expected fingerprint.
    pub fn verify(&self, data: &[u8], expected: &Fingerprint) -> bool {
        self.hash(data) == *expected
    }

    /// The domain tag used by this hasher.
    pub fn domain(&self) -> &str {
        self.domain
    }
}

/// Errors from hashing operations.
#[derive(Debug, thiserror::Error)]
pub enum HasherError {
    #[error("I/O error while hashing: {0}")]
    Io(#[from] io::Error),
}
