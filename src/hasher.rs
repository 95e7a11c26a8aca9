use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::sync::Arc;

const CHUNK_SIZE: usize = 4 * 1024 * 1024; // 4MB

/// Seam for substituting the content hash, mainly from tests.
pub type FingerprintFn = Arc<dyn Fn(&Path) -> io::Result<String> + Send + Sync>;

pub fn default_fingerprint_fn() -> FingerprintFn {
    Arc::new(fingerprint_file)
}

/// Stream a file through BLAKE3 in fixed-size chunks and return the hex
/// digest. The whole file is never held in memory. Errors surface to the
/// caller, which counts the file as an error and moves on.
pub fn fingerprint_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hasher.finalize().to_hex().to_string())
}

/// Fingerprint of an in-memory buffer. Matches `fingerprint_file` for the
/// same bytes.
pub fn fingerprint_bytes(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}
