//! # Bundle Assembler
//!
//! Packs stored artifacts into one gzip-compressed tar archive. Entries are
//! written with normalized headers (mtime 0, uid/gid 0, mode 0644) so the
//! same inputs always produce the same archive bytes.
//!
//! A path that no longer exists on disk is skipped with a warning rather
//! than failing the whole bundle.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::StoreError;

/// One file to place in a bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleEntry {
    /// Location of the stored file.
    pub path: PathBuf,
    /// Name the file carries inside the archive, e.g. `app.apk`.
    pub display_name: String,
}

impl BundleEntry {
    pub fn new(path: impl Into<PathBuf>, display_name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            display_name: display_name.into(),
        }
    }
}

/// Build a `.tar.gz` from `entries`, in input order, fully buffered.
pub fn assemble(entries: &[BundleEntry]) -> Result<Vec<u8>, StoreError> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);

    let mut packed = 0usize;
    for entry in entries {
        let data = match fs::read(&entry.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    path = %entry.path.display(),
                    file = %entry.display_name,
                    "bundle member missing on disk, skipping"
                );
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_mtime(0);
        header.set_uid(0);
        header.set_gid(0);
        header.set_entry_type(tar::EntryType::Regular);
        builder
            .append_data(&mut header, &entry.display_name, data.as_slice())
            .map_err(|e| StoreError::Archive(format!("{}: {e}", entry.display_name)))?;
        packed += 1;
    }

    let encoder = builder
        .into_inner()
        .map_err(|e| StoreError::Archive(e.to_string()))?;
    let bytes = encoder
        .finish()
        .map_err(|e| StoreError::Archive(e.to_string()))?;

    tracing::debug!(requested = entries.len(), packed, size = bytes.len(), "assembled bundle");
    Ok(bytes)
}

/// Extract a bundle produced by [`assemble`] into `dest_dir`.
///
/// Returns the extracted file paths in archive order. Entries whose names
/// would escape `dest_dir` are rejected.
pub fn unpack(bundle: &[u8], dest_dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
    fs::create_dir_all(dest_dir)?;

    let mut archive = tar::Archive::new(GzDecoder::new(bundle));
    let mut extracted = Vec::new();

    let entries = archive
        .entries()
        .map_err(|e| StoreError::Archive(e.to_string()))?;
    for entry in entries {
        let mut entry = entry.map_err(|e| StoreError::Archive(e.to_string()))?;
        let name = entry
            .path()
            .map_err(|e| StoreError::Archive(e.to_string()))?
            .into_owned();

        let mut components = name.components();
        let file_name = match (components.next(), components.next()) {
            (Some(std::path::Component::Normal(part)), None) => part.to_owned(),
            _ => {
                return Err(StoreError::Archive(format!(
                    "refusing to extract entry {}",
                    name.display()
                )))
            }
        };

        let mut data = Vec::new();
        entry.read_to_end(&mut data)?;
        let target = dest_dir.join(file_name);
        fs::write(&target, &data)?;
        extracted.push(target);
    }

    Ok(extracted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_bundle_is_valid_archive() {
        let bytes = assemble(&[]).unwrap();
        let out = tempfile::tempdir().unwrap();
        assert!(unpack(&bytes, out.path()).unwrap().is_empty());
    }

    #[test]
    fn entries_keep_input_order_and_display_names() {
        let src = tempfile::tempdir().unwrap();
        let a = src.path().join("aaaa.apk");
        let b = src.path().join("bbbb.apk");
        fs::write(&a, b"alpha").unwrap();
        fs::write(&b, b"beta").unwrap();

        let bytes = assemble(&[
            BundleEntry::new(&b, "zeta.apk"),
            BundleEntry::new(&a, "alpha.apk"),
        ])
        .unwrap();

        let out = tempfile::tempdir().unwrap();
        let files = unpack(&bytes, out.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["zeta.apk", "alpha.apk"]);
        assert_eq!(fs::read(out.path().join("zeta.apk")).unwrap(), b"beta");
        assert_eq!(fs::read(out.path().join("alpha.apk")).unwrap(), b"alpha");
    }

    #[test]
    fn missing_paths_are_skipped() {
        let src = tempfile::tempdir().unwrap();
        let present = src.path().join("present.apk");
        fs::write(&present, b"here").unwrap();

        let bytes = assemble(&[
            BundleEntry::new(src.path().join("gone.apk"), "gone.apk"),
            BundleEntry::new(&present, "present.apk"),
        ])
        .unwrap();

        let out = tempfile::tempdir().unwrap();
        let files = unpack(&bytes, out.path()).unwrap();
        assert_eq!(files.len(), 1);
        assert!(out.path().join("present.apk").is_file());
        assert!(!out.path().join("gone.apk").exists());
    }

    #[test]
    fn assembly_is_deterministic() {
        let src = tempfile::tempdir().unwrap();
        let p = src.path().join("x.apk");
        fs::write(&p, b"same bytes").unwrap();
        let entries = [BundleEntry::new(&p, "x.apk")];
        assert_eq!(assemble(&entries).unwrap(), assemble(&entries).unwrap());
    }

    #[test]
    fn unpack_rejects_garbage() {
        let out = tempfile::tempdir().unwrap();
        assert!(unpack(b"definitely not gzip", out.path()).is_err());
    }
}
