//! # Catalog Records
//!
//! Plain data returned by the catalog and version registry. These are
//! values, not handles: nothing here can mutate catalog state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::digest::ContentDigest;
use crate::names::{PackageName, VersionName};

/// One uploaded package file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub name: PackageName,
    pub content_hash: ContentDigest,
    /// Free-text message supplied at upload time (empty when none).
    pub annotation: String,
    /// Assigned by the catalog at insert; non-decreasing across inserts.
    pub uploaded_at: DateTime<Utc>,
}

/// A frozen version as listed by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionSummary {
    pub version: VersionName,
    pub created_at: DateTime<Utc>,
    pub member_count: u64,
}

/// A package name with its newest upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameSummary {
    pub name: PackageName,
    pub latest_hash: ContentDigest,
    pub latest_uploaded_at: DateTime<Utc>,
    /// Newest frozen version whose membership includes `latest_hash`.
    pub version_tag: Option<VersionName>,
}

/// One upload in a package's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub content_hash: ContentDigest,
    pub uploaded_at: DateTime<Utc>,
    pub annotation: String,
    /// Every frozen version that includes this upload, newest first.
    pub version_tags: Vec<VersionName>,
}

/// Full upload history of a package name, newest upload first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameHistory {
    pub name: PackageName,
    pub versions: Vec<HistoryEntry>,
}
