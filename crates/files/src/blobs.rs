//! Content-addressed blob storage.
//!
//! PDF bytes are stored under their SHA-256 digest with two levels of sharding:
//! `<data_dir>/blobs/sha256/<h[0..2]>/<h[2..4]>/<h>`.
//!
//! - **Deduplication**: identical uploads share one file
//! - **Integrity**: reads are verified against the hash
//! - **Immutability**: a stored blob is never rewritten
//!
//! Blobs are not removed when the documents pointing at them are deleted.

use crate::{FilesError, BLOBS_FOLDER_NAME};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Hex-encoded SHA-256 digest identifying a stored blob.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash(String);

impl ContentHash {
    /// Hashes `bytes`.
    pub fn compute(bytes: &[u8]) -> Self {
        let digest = Sha256::digest(bytes);
        Self(hex::encode(digest))
    }

    /// Validates an externally supplied 64-character lowercase hex digest.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::InvalidHash`] for anything else.
    pub fn parse(input: &str) -> Result<Self, FilesError> {
        let valid = input.len() == 64
            && input
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
        if !valid {
            return Err(FilesError::InvalidHash(input.to_owned()));
        }
        Ok(Self(input.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Blob store rooted at `<data_dir>/blobs`.
///
/// The store is stateless apart from its root path; several instances over the same
/// directory observe the same blobs.
#[derive(Debug, Clone)]
pub struct BlobStore {
    blobs_root: PathBuf,
}

impl BlobStore {
    /// Opens (creating if necessary) the blob directory under `data_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::InvalidDataDirectory`] if the directory cannot be created or
    /// canonicalised.
    pub fn new(data_dir: &Path) -> Result<Self, FilesError> {
        let blobs_root = data_dir.join(BLOBS_FOLDER_NAME);
        fs::create_dir_all(&blobs_root).map_err(|e| {
            FilesError::InvalidDataDirectory(format!(
                "Cannot create blob directory {}: {}",
                blobs_root.display(),
                e
            ))
        })?;

        let blobs_root = blobs_root.canonicalize().map_err(|e| {
            FilesError::InvalidDataDirectory(format!(
                "Cannot canonicalize path {}: {}",
                blobs_root.display(),
                e
            ))
        })?;

        Ok(Self { blobs_root })
    }

    /// Stores `bytes` and returns their hash.
    ///
    /// Storing content that is already present is a no-op returning the existing hash.
    /// New blobs are written to a temporary sibling and renamed into place, so a reader never
    /// observes a partially written blob.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::Io`] if directory creation, the write, or the rename fails.
    pub fn put(&self, bytes: &[u8]) -> Result<ContentHash, FilesError> {
        let hash = ContentHash::compute(bytes);
        let storage_path = self.storage_path(&hash);

        if storage_path.exists() {
            tracing::debug!("blob {} already stored", hash);
            return Ok(hash);
        }

        if let Some(parent) = storage_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                FilesError::Io(std::io::Error::new(
                    e.kind(),
                    format!("Failed to create blob directory {}: {}", parent.display(), e),
                ))
            })?;
        }

        let temp_path = storage_path.with_extension("tmp");
        fs::write(&temp_path, bytes).map_err(|e| {
            FilesError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to write blob to {}: {}", temp_path.display(), e),
            ))
        })?;
        fs::rename(&temp_path, &storage_path)?;

        tracing::debug!("stored blob {} ({} bytes)", hash, bytes.len());
        Ok(hash)
    }

    /// Reads a blob and verifies it still matches its hash.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::BlobNotFound`] if nothing is stored under `hash`,
    /// [`FilesError::IntegrityMismatch`] if the bytes were altered on disk, or
    /// [`FilesError::Io`] for other read failures.
    pub fn read(&self, hash: &ContentHash) -> Result<Vec<u8>, FilesError> {
        let storage_path = self.storage_path(hash);

        let bytes = match fs::read(&storage_path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(FilesError::BlobNotFound(hash.to_string()))
            }
            Err(e) => {
                return Err(FilesError::Io(std::io::Error::new(
                    e.kind(),
                    format!("Failed to read blob from {}: {}", storage_path.display(), e),
                )))
            }
        };

        if ContentHash::compute(&bytes) != *hash {
            return Err(FilesError::IntegrityMismatch(hash.to_string()));
        }

        Ok(bytes)
    }

    /// Returns true if a blob is stored under `hash`.
    pub fn contains(&self, hash: &ContentHash) -> bool {
        self.storage_path(hash).is_file()
    }

    /// Relative path of a blob below the data directory: `blobs/sha256/ab/cd/<hash>`.
    pub fn relative_path(hash: &ContentHash) -> String {
        let hex = hash.as_str();
        format!("{}/sha256/{}/{}/{}", BLOBS_FOLDER_NAME, &hex[0..2], &hex[2..4], hex)
    }

    fn storage_path(&self, hash: &ContentHash) -> PathBuf {
        let hex = hash.as_str();
        self.blobs_root
            .join("sha256")
            .join(&hex[0..2])
            .join(&hex[2..4])
            .join(hex)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_new_creates_blob_directory() {
        let temp = TempDir::new().unwrap();
        let data_dir = temp.path().join("data");

        BlobStore::new(&data_dir).unwrap();

        assert!(data_dir.join(BLOBS_FOLDER_NAME).is_dir());
    }

    #[test]
    fn test_new_fails_when_data_dir_is_a_file() {
        let temp = TempDir::new().unwrap();
        let not_dir = temp.path().join("file.txt");
        fs::write(&not_dir, "not a directory").unwrap();

        let result = BlobStore::new(&not_dir);
        assert!(matches!(result, Err(FilesError::InvalidDataDirectory(_))));
    }

    #[test]
    fn test_put_and_read_round_trip() {
        let temp = TempDir::new().unwrap();
        let store = BlobStore::new(temp.path()).unwrap();

        let hash = store.put(b"%PDF-1.7 body").unwrap();

        assert_eq!(hash.as_str().len(), 64);
        assert!(store.contains(&hash));
        assert_eq!(store.read(&hash).unwrap(), b"%PDF-1.7 body");
    }

    #[test]
    fn test_put_is_sharded_by_hash() {
        let temp = TempDir::new().unwrap();
        let store = BlobStore::new(temp.path()).unwrap();

        let hash = store.put(b"Hello, World!").unwrap();
        assert_eq!(
            hash.as_str(),
            "dffd6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f"
        );

        let relative = BlobStore::relative_path(&hash);
        assert_eq!(
            relative,
            "blobs/sha256/df/fd/dffd6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f"
        );
        assert!(temp.path().join(&relative).is_file());
    }

    #[test]
    fn test_put_same_content_twice_deduplicates() {
        let temp = TempDir::new().unwrap();
        let store = BlobStore::new(temp.path()).unwrap();

        let first = store.put(b"same bytes").unwrap();
        let second = store.put(b"same bytes").unwrap();

        assert_eq!(first, second);
        let shard = temp
            .path()
            .join(BlobStore::relative_path(&first))
            .parent()
            .unwrap()
            .to_path_buf();
        assert_eq!(fs::read_dir(shard).unwrap().count(), 1);
    }

    #[test]
    fn test_read_missing_blob() {
        let temp = TempDir::new().unwrap();
        let store = BlobStore::new(temp.path()).unwrap();
        let hash = ContentHash::compute(b"never stored");

        assert!(!store.contains(&hash));
        assert!(matches!(store.read(&hash), Err(FilesError::BlobNotFound(_))));
    }

    #[test]
    fn test_read_detects_tampering() {
        let temp = TempDir::new().unwrap();
        let store = BlobStore::new(temp.path()).unwrap();
        let hash = store.put(b"original").unwrap();

        fs::write(temp.path().join(BlobStore::relative_path(&hash)), b"tampered").unwrap();

        assert!(matches!(
            store.read(&hash),
            Err(FilesError::IntegrityMismatch(_))
        ));
    }

    #[test]
    fn test_content_hash_parse() {
        let valid = "dffd6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f";
        assert_eq!(ContentHash::parse(valid).unwrap().as_str(), valid);

        assert!(ContentHash::parse(&valid.to_uppercase()).is_err());
        assert!(ContentHash::parse(&valid[..63]).is_err());
        assert!(ContentHash::parse("../../etc/passwd").is_err());
    }
}
