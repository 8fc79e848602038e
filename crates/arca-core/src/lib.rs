//! # arca-core: Foundational Types for Arca
//!
//! Leaf crate of the workspace. Defines the identifiers and records that
//! every other crate passes around:
//!
//! - [`ContentDigest`]: SHA-256 of an artifact's bytes, the artifact's
//!   primary identity.
//! - [`PackageName`] / [`VersionName`]: validated string newtypes. A package
//!   name doubles as a directory name in the content store, so validation is
//!   what keeps uploads from escaping the repository root.
//! - [`VersionSelector`]: either the reserved `latest` selector or a concrete
//!   frozen version.
//! - [`Artifact`], [`VersionSummary`], [`NameSummary`], [`NameHistory`]:
//!   catalog records as seen by callers.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `arca-*` crates.
//! - No `.unwrap()` outside tests.

pub mod digest;
pub mod error;
pub mod names;
pub mod records;

pub use digest::{sha256_digest, ContentDigest};
pub use error::ValidationError;
pub use names::{PackageName, VersionName, VersionSelector, LATEST_SELECTOR};
pub use records::{Artifact, HistoryEntry, NameHistory, NameSummary, VersionSummary};
