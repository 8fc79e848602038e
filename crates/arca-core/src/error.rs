//! # Validation Errors
//!
//! Raised when a caller-supplied identifier does not satisfy the format
//! rules of its newtype. Everything else in the workspace wraps these.

use thiserror::Error;

/// A value failed validation at construction time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Package name is empty, too long, or contains characters outside
    /// `[A-Za-z0-9._-]`.
    #[error("invalid package name: {0:?} (expected 1-128 chars of [A-Za-z0-9._-], starting with a letter or digit)")]
    InvalidPackageName(String),

    /// Version name is empty, too long, or contains characters outside
    /// `[A-Za-z0-9._+-]`.
    #[error("invalid version name: {0:?} (expected 1-64 chars of [A-Za-z0-9._+-], starting with a letter or digit)")]
    InvalidVersionName(String),

    /// `latest` is the retrieval selector and cannot name a frozen version.
    #[error("version name {0:?} is reserved")]
    ReservedVersionName(String),

    /// Digest string is not 64 hex characters.
    #[error("invalid content digest: {0:?} (expected 64 hex chars)")]
    InvalidDigest(String),

    /// Uploaded filename does not carry the configured package extension.
    #[error("unsupported file {filename:?}: only .{expected} packages are accepted")]
    UnsupportedExtension {
        /// The filename as uploaded.
        filename: String,
        /// The extension the repository accepts (without the dot).
        expected: String,
    },

    /// Uploaded package has no content.
    #[error("package {0:?} is empty")]
    EmptyPackage(String),
}
