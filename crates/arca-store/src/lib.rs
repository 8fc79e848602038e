//! # arca-store: Artifact Bytes on Disk
//!
//! Two pieces, both synchronous and filesystem-only:
//!
//! - [`ContentStore`] writes and reads package files at
//!   `{base_dir}/{name}/{sha256}.{ext}`. Writes are create-if-absent, so
//!   duplicate uploads are no-ops and an existing file is never touched.
//! - [`bundle`] packs a list of stored files into a single gzip-compressed
//!   tar archive for multi-artifact downloads.
//!
//! Callers running on an async runtime should move these calls onto a
//! blocking thread.

pub mod bundle;
pub mod cas;
pub mod error;

pub use bundle::{assemble, unpack, BundleEntry};
pub use cas::{ContentStore, PutOutcome};
pub use error::StoreError;
