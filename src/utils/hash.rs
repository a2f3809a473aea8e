//! Content hashing.

use crate::Result;
use sha2::{Digest, Sha256};
use std::path::Path;

/// SHA-256 of a byte slice, hex encoded.
pub fn sha256_bytes(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// SHA-256 of a file's content, hex encoded.
pub async fn sha256_file(path: &Path) -> Result<String> {
    let data = tokio::fs::read(path).await?;
    Ok(sha256_bytes(&data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_known_value() {
        assert_eq!(
            sha256_bytes(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn test_sha256_file_matches_bytes() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("f.txt");
        std::fs::write(&path, "hello").unwrap();
        assert_eq!(sha256_file(&path).await.unwrap(), sha256_bytes(b"hello"));
    }
}
