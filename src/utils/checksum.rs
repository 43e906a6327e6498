use crate::types::source::ChecksumAlgorithm;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};
use std::fs;
use std::io::Read;
use std::path::Path;

const CHUNK_SIZE: usize = 10_000;

/// Computes the hex digest of a file, reading it in fixed-size chunks.
///
/// ### Parameters
/// - `path`: The file to hash
/// - `algorithm`: The digest function to use
///
pub fn file_checksum(path: &Path, algorithm: ChecksumAlgorithm) -> Result<String, String> {
    match algorithm {
        ChecksumAlgorithm::Sha224 => digest_file::<Sha224>(path),
        ChecksumAlgorithm::Sha256 => digest_file::<Sha256>(path),
        ChecksumAlgorithm::Sha384 => digest_file::<Sha384>(path),
        ChecksumAlgorithm::Sha512 => digest_file::<Sha512>(path),
    }
}

/// Fails with a `checksum mismatch` error when the file digest differs from `expected`.
pub fn verify_file(
    path: &Path,
    expected: &str,
    algorithm: ChecksumAlgorithm,
) -> Result<(), String> {
    let actual = file_checksum(path, algorithm)?;
    if actual.eq_ignore_ascii_case(expected.trim()) {
        Ok(())
    } else {
        Err(format!(
            "{} checksum mismatch for '{}': {} != {}",
            algorithm,
            path.display(),
            actual,
            expected
        ))
    }
}

/// Returns true when the file exists and hashes to `expected`.
pub fn matches(path: &Path, expected: &str, algorithm: ChecksumAlgorithm) -> Result<bool, String> {
    if !path.is_file() {
        return Ok(false);
    }
    let actual = file_checksum(path, algorithm)?;
    Ok(actual.eq_ignore_ascii_case(expected.trim()))
}

fn digest_file<D: Digest>(path: &Path) -> Result<String, String> {
    let mut file = fs::File::open(path)
        .map_err(|e| format!("Failed to open '{}' for hashing: {}", path.display(), e))?;
    let mut hasher = D::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];

    loop {
        let n = file
            .read(&mut buffer)
            .map_err(|e| format!("Failed to read '{}': {}", path.display(), e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}
