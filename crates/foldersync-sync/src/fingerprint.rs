//! Content fingerprint primitive
//!
//! Files are compared by the SHA-256 digest of their full byte stream. The
//! file is streamed through the hasher in fixed-size chunks so memory use is
//! independent of file size.

use std::path::Path;

use foldersync_core::domain::Fingerprint;
use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;

/// Read buffer size for hashing
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Streams `path` through SHA-256
///
/// # Errors
/// Any I/O error opening or reading the file.
pub async fn fingerprint_file(path: &Path) -> std::io::Result<Fingerprint> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; CHUNK_SIZE];

    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(finish(hasher))
}

/// Fingerprint of an in-memory buffer
pub fn fingerprint_bytes(data: &[u8]) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(data);
    finish(hasher)
}

fn finish(hasher: Sha256) -> Fingerprint {
    let digest = hasher.finalize();
    let mut bytes = [0u8; Fingerprint::LEN];
    bytes.copy_from_slice(&digest);
    Fingerprint::from_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_known_digests() {
        assert_eq!(
            fingerprint_bytes(b"").to_hex(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            fingerprint_bytes(b"hello").to_hex(),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[tokio::test]
    async fn test_file_matches_buffer_across_chunks() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("big.bin");
        let data: Vec<u8> = (0..(CHUNK_SIZE * 3 + 17)).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &data).unwrap();

        let fp = fingerprint_file(&path).await.unwrap();
        assert_eq!(fp, fingerprint_bytes(&data));
    }

    #[tokio::test]
    async fn test_identical_bytes_equal_one_byte_differs() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        let c = dir.path().join("c");
        std::fs::write(&a, b"same content").unwrap();
        std::fs::write(&b, b"same content").unwrap();
        std::fs::write(&c, b"same contenT").unwrap();

        let fa = fingerprint_file(&a).await.unwrap();
        assert_eq!(fa, fingerprint_file(&b).await.unwrap());
        assert_ne!(fa, fingerprint_file(&c).await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        assert!(fingerprint_file(&dir.path().join("gone")).await.is_err());
    }
}
