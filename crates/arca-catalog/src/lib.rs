//! # arca-catalog: Artifact Catalog and Versioning Engine
//!
//! The SQLite-backed core of the repository:
//!
//! - [`catalog`]: every pushed artifact, deduplicated by content hash, and
//!   the latest-per-name view derived from it.
//! - [`registry`]: named versions and their memberships.
//! - [`freeze`]: snapshotting the latest-per-name view into a version.
//! - [`resolver`]: turning `(version | latest, name)` queries into stored
//!   file locations.
//! - [`repository`]: the [`Repository`] handle that combines all of the
//!   above with an [`arca_store::ContentStore`].
//!
//! ## Invariants
//!
//! - At most one artifact row per content hash.
//! - At most one member per package name per version.
//! - A freeze is atomic: readers never observe partial membership.
//! - A catalog row is only inserted after its file is on disk.

pub mod catalog;
pub mod db;
pub mod error;
pub mod freeze;
pub mod registry;
pub mod repository;
pub mod resolver;

mod rows;

pub use catalog::CatalogStats;
pub use db::init_pool;
pub use error::CatalogError;
pub use freeze::{FreezeEngine, FreezeReport};
pub use repository::{PushOutcome, PushStatus, Repository, RepositoryLayout, VerifyReport};
pub use resolver::{ResolvedArtifact, ResolvedBundle};
