//! # Content-Addressed Storage
//!
//! Package files live at `{base_dir}/{name}/{sha256_hex}.{ext}`. The location
//! is a pure function of `(name, digest)`, so the catalog only ever needs
//! those two values to find a file.
//!
//! ## Write Invariant
//!
//! Bytes are written to a temporary file inside the target directory and
//! then linked into place with a no-clobber rename. Consequences:
//!
//! - The first writer of a given address wins; later writers observe
//!   `AlreadyExists` and discard their temporary file.
//! - A crash mid-write leaves at most a stray temporary file, never a
//!   truncated artifact at its final path.
//!
//! ## Integrity
//!
//! [`ContentStore::put`] refuses bytes whose digest differs from the address.
//! [`ContentStore::read_verified`] re-hashes on the way out and compares in
//! constant time.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use arca_core::{sha256_digest, ContentDigest, PackageName};
use subtle::ConstantTimeEq;

use crate::error::StoreError;

/// Result of a [`ContentStore::put`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutOutcome {
    /// Final location of the artifact.
    pub path: PathBuf,
    /// `false` when a file already occupied the address.
    pub newly_written: bool,
}

/// Filesystem-backed store of package files.
#[derive(Debug, Clone)]
pub struct ContentStore {
    base_dir: PathBuf,
    extension: String,
}

impl ContentStore {
    /// Create a store rooted at `base_dir`. The directory is created lazily
    /// on the first write.
    pub fn new(base_dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            base_dir: base_dir.into(),
            extension: extension.into(),
        }
    }

    /// Root directory of the content tree.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Package file extension (without the dot).
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Deterministic location of `(name, digest)`. No I/O.
    pub fn path_of(&self, name: &PackageName, digest: &ContentDigest) -> PathBuf {
        self.base_dir
            .join(name.as_str())
            .join(format!("{}.{}", digest.to_hex(), self.extension))
    }

    /// Store `bytes` under `(name, digest)`.
    ///
    /// Idempotent: when the address is already occupied the write is skipped
    /// and `newly_written` is `false`. Creates the per-name directory on
    /// first use.
    pub fn put(
        &self,
        name: &PackageName,
        digest: &ContentDigest,
        bytes: &[u8],
    ) -> Result<PutOutcome, StoreError> {
        let path = self.path_of(name, digest);

        let actual = sha256_digest(bytes);
        if actual != *digest {
            return Err(StoreError::Integrity {
                path,
                expected: digest.to_hex(),
                actual: actual.to_hex(),
            });
        }

        if path.is_file() {
            tracing::debug!(name = %name, hash = %digest, "artifact already stored");
            return Ok(PutOutcome {
                path,
                newly_written: false,
            });
        }

        let dir = self.base_dir.join(name.as_str());
        fs::create_dir_all(&dir)?;

        let mut tmp = tempfile::Builder::new()
            .prefix(".incoming-")
            .tempfile_in(&dir)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;

        match tmp.persist_noclobber(&path) {
            Ok(_) => {
                tracing::info!(name = %name, hash = %digest, size = bytes.len(), "stored artifact");
                Ok(PutOutcome {
                    path,
                    newly_written: true,
                })
            }
            Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => {
                // Lost the race to a concurrent identical upload.
                Ok(PutOutcome {
                    path,
                    newly_written: false,
                })
            }
            Err(e) => Err(StoreError::Io(e.error)),
        }
    }

    /// Whether a file exists at the address of `(name, digest)`.
    pub fn exists(&self, name: &PackageName, digest: &ContentDigest) -> bool {
        self.path_of(name, digest).is_file()
    }

    /// Read the stored bytes, or `Ok(None)` if nothing is stored there.
    pub fn read(
        &self,
        name: &PackageName,
        digest: &ContentDigest,
    ) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.path_of(name, digest);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Read the stored bytes and check that they still hash to `digest`.
    pub fn read_verified(
        &self,
        name: &PackageName,
        digest: &ContentDigest,
    ) -> Result<Option<Vec<u8>>, StoreError> {
        let Some(bytes) = self.read(name, digest)? else {
            return Ok(None);
        };
        let recomputed = sha256_digest(&bytes);
        if !bool::from(recomputed.as_bytes().ct_eq(digest.as_bytes())) {
            return Err(StoreError::Integrity {
                path: self.path_of(name, digest),
                expected: digest.to_hex(),
                actual: recomputed.to_hex(),
            });
        }
        Ok(Some(bytes))
    }

    /// All digests stored for `name`, sorted. Files that do not look like
    /// `{digest}.{ext}` (including in-flight temporaries) are ignored.
    pub fn list_hashes(&self, name: &PackageName) -> Result<Vec<ContentDigest>, StoreError> {
        let dir = self.base_dir.join(name.as_str());
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut digests = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(self.extension.as_str()) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if let Ok(digest) = ContentDigest::from_hex(stem) {
                    digests.push(digest);
                }
            }
        }
        digests.sort();
        Ok(digests)
    }

    /// All package names that have a directory in the store, sorted.
    pub fn list_names(&self) -> Result<Vec<PackageName>, StoreError> {
        if !self.base_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&self.base_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(name) = entry
                .file_name()
                .to_str()
                .and_then(|s| PackageName::new(s).ok())
            {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, ContentStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::new(dir.path().join("repository"), "apk");
        (dir, store)
    }

    fn name(s: &str) -> PackageName {
        PackageName::new(s).unwrap()
    }

    #[test]
    fn path_layout_is_name_then_digest() {
        let (_dir, store) = store();
        let digest = sha256_digest(b"bytes");
        let path = store.path_of(&name("app"), &digest);
        assert!(path.ends_with(format!("app/{}.apk", digest.to_hex())));
    }

    #[test]
    fn put_then_read() {
        let (_dir, store) = store();
        let digest = sha256_digest(b"payload");
        let outcome = store.put(&name("app"), &digest, b"payload").unwrap();
        assert!(outcome.newly_written);
        assert!(store.exists(&name("app"), &digest));
        assert_eq!(store.read(&name("app"), &digest).unwrap().unwrap(), b"payload");
    }

    #[test]
    fn put_is_idempotent() {
        let (_dir, store) = store();
        let digest = sha256_digest(b"payload");
        store.put(&name("app"), &digest, b"payload").unwrap();
        let second = store.put(&name("app"), &digest, b"payload").unwrap();
        assert!(!second.newly_written);
        assert_eq!(store.list_hashes(&name("app")).unwrap(), vec![digest]);
    }

    #[test]
    fn put_never_overwrites_existing_file() {
        let (_dir, store) = store();
        let digest = sha256_digest(b"payload");
        let path = store.path_of(&name("app"), &digest);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"first writer").unwrap();

        let outcome = store.put(&name("app"), &digest, b"payload").unwrap();
        assert!(!outcome.newly_written);
        assert_eq!(fs::read(&path).unwrap(), b"first writer");
    }

    #[test]
    fn put_rejects_mismatched_digest() {
        let (_dir, store) = store();
        let wrong = sha256_digest(b"something else");
        let err = store.put(&name("app"), &wrong, b"payload").unwrap_err();
        assert!(matches!(err, StoreError::Integrity { .. }));
        assert!(!store.exists(&name("app"), &wrong));
    }

    #[test]
    fn read_missing_returns_none() {
        let (_dir, store) = store();
        let digest = sha256_digest(b"nothing");
        assert!(store.read(&name("ghost"), &digest).unwrap().is_none());
        assert!(!store.exists(&name("ghost"), &digest));
    }

    #[test]
    fn read_verified_detects_tampering() {
        let (_dir, store) = store();
        let digest = sha256_digest(b"original");
        let outcome = store.put(&name("app"), &digest, b"original").unwrap();
        fs::write(&outcome.path, b"tampered").unwrap();

        assert!(matches!(
            store.read_verified(&name("app"), &digest),
            Err(StoreError::Integrity { .. })
        ));
    }

    #[test]
    fn list_hashes_skips_temporaries_and_foreign_files() {
        let (_dir, store) = store();
        let digest = sha256_digest(b"one");
        store.put(&name("app"), &digest, b"one").unwrap();
        let dir = store.base_dir().join("app");
        fs::write(dir.join(".incoming-abc"), b"partial").unwrap();
        fs::write(dir.join("notes.txt"), b"hi").unwrap();

        assert_eq!(store.list_hashes(&name("app")).unwrap(), vec![digest]);
    }

    #[test]
    fn list_names_reports_directories() {
        let (_dir, store) = store();
        store.put(&name("lib"), &sha256_digest(b"l"), b"l").unwrap();
        store.put(&name("app"), &sha256_digest(b"a"), b"a").unwrap();
        let names: Vec<String> = store
            .list_names()
            .unwrap()
            .into_iter()
            .map(|n| n.to_string())
            .collect();
        assert_eq!(names, vec!["app", "lib"]);
    }

    #[test]
    fn list_on_empty_store_is_empty() {
        let (_dir, store) = store();
        assert!(store.list_names().unwrap().is_empty());
        assert!(store.list_hashes(&name("app")).unwrap().is_empty());
    }
}
