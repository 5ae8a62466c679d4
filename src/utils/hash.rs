use anyhow::{Context, Result};
use memmap2::MmapOptions;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use xxhash_rust::xxh3::{Xxh3, xxh3_128};

/// Files at or above this size are memory-mapped instead of read into a buffer.
pub const MMAP_THRESHOLD: u64 = 1_048_576;

/// Content digest of a file or byte slice.
pub type Fingerprint = u128;

#[must_use]
pub fn hash_bytes(data: &[u8]) -> Fingerprint {
    xxh3_128(data)
}

/// Formats a fingerprint as 32 lowercase hex characters.
#[must_use]
pub fn to_hex(fingerprint: Fingerprint) -> String {
    format!("{fingerprint:032x}")
}

/// Hashes the full contents of a file as opaque bytes.
///
/// # Errors
///
/// Returns an error if the file cannot be opened, mapped or read.
pub fn hash_file(path: &Path) -> Result<Fingerprint> {
    let file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let metadata = file
        .metadata()
        .with_context(|| format!("Failed to stat {}", path.display()))?;

    if metadata.len() == 0 {
        return Ok(hash_bytes(b""));
    }

    if metadata.len() < MMAP_THRESHOLD {
        let content =
            std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(hash_bytes(&content))
    } else {
        // SAFETY: the map is read-only and dropped before returning. A concurrent
        // truncation by another process is the only hazard, same as any mmap reader.
        let mmap = unsafe { MmapOptions::new().map(&file) }
            .with_context(|| format!("Failed to map {}", path.display()))?;
        Ok(hash_bytes(&mmap))
    }
}

/// Hashes a file through a fixed-size buffer, never mapping it.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read.
pub fn hash_file_streaming(path: &Path) -> Result<Fingerprint> {
    let mut file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut hasher = Xxh3::new();
    let mut buffer = vec![0u8; 65536];

    loop {
        let bytes_read = file
            .read(&mut buffer)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hasher.digest128())
}

/// Returns whether two existing files have byte-identical contents.
///
/// Files of different lengths are unequal without hashing. Otherwise both
/// files are fingerprinted and the digests compared.
///
/// # Errors
///
/// Returns an error if either file cannot be read. Callers treat this as an
/// inconclusive comparison for that file only.
pub fn files_equal(a: &Path, b: &Path) -> Result<bool> {
    let len_a = std::fs::metadata(a)
        .with_context(|| format!("Failed to stat {}", a.display()))?
        .len();
    let len_b = std::fs::metadata(b)
        .with_context(|| format!("Failed to stat {}", b.display()))?
        .len();
    if len_a != len_b {
        return Ok(false);
    }

    Ok(hash_file(a)? == hash_file(b)?)
}
