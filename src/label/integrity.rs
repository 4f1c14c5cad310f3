//! SHA-256 content hashing for label templates, grounded on
//! `WorkflowDefinition::content_hash` in `ob-workflow`'s `definition.rs`.

use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::Result;

/// SHA-256 hex digest of a template file's bytes.
pub async fn hash_file(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path).await?;
    Ok(hash_bytes(&bytes))
}

pub fn hash_bytes(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    format!("{digest:x}")
}

/// Integrity status of one template path, comparing a stored hash against
/// what's on disk right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrityStatus {
    Ok,
    Modified,
    Missing,
}

impl IntegrityStatus {
    pub async fn check(path: &Path, stored_hash: &str) -> Result<Self> {
        match hash_file(path).await {
            Ok(hash) if hash == stored_hash => Ok(IntegrityStatus::Ok),
            Ok(_) => Ok(IntegrityStatus::Modified),
            Err(crate::error::EngineError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(IntegrityStatus::Missing)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_stable_sha256_hex() {
        let a = hash_bytes(b"hello");
        let b = hash_bytes(b"hello");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn detects_modified_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backend.md");
        tokio::fs::write(&path, b"original").await.unwrap();
        let original_hash = hash_bytes(b"original");

        assert_eq!(
            IntegrityStatus::check(&path, &original_hash).await.unwrap(),
            IntegrityStatus::Ok
        );

        tokio::fs::write(&path, b"mutated").await.unwrap();
        assert_eq!(
            IntegrityStatus::check(&path, &original_hash).await.unwrap(),
            IntegrityStatus::Modified
        );

        tokio::fs::remove_file(&path).await.unwrap();
        assert_eq!(
            IntegrityStatus::check(&path, &original_hash).await.unwrap(),
            IntegrityStatus::Missing
        );
    }
}
