//! # Package and Version Names
//!
//! String newtypes validated at construction. Deserialization routes through
//! the same constructors so an invalid name can never be materialized from
//! JSON or YAML either.
//!
//! A [`PackageName`] becomes a directory under the repository root, so the
//! character set is deliberately narrow: no separators, no leading dot, no
//! `..` sequences.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// The selector that resolves to the newest frozen version (bundles) or the
/// newest push (single artifacts).
pub const LATEST_SELECTOR: &str = "latest";

macro_rules! impl_validating_deserialize {
    ($ty:ident) => {
        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let raw = String::deserialize(deserializer)?;
                Self::new(raw).map_err(serde::de::Error::custom)
            }
        }
    };
}

fn valid_identifier(s: &str, max_len: usize, extra: &[char]) -> bool {
    if s.is_empty() || s.len() > max_len || s.contains("..") {
        return false;
    }
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphanumeric() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || extra.contains(&c))
}

// ---------------------------------------------------------------------------
// PackageName
// ---------------------------------------------------------------------------

/// Logical package identifier: the uploaded filename without its extension.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PackageName(String);

impl_validating_deserialize!(PackageName);

impl PackageName {
    /// Validate and wrap a package name.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        if !valid_identifier(&s, 128, &['.', '_', '-']) {
            return Err(ValidationError::InvalidPackageName(s));
        }
        Ok(Self(s))
    }

    /// Derive a package name from an uploaded filename.
    ///
    /// Any directory components are discarded, the extension must equal
    /// `extension` (compared case-insensitively), and the remaining stem
    /// must be a valid package name.
    pub fn from_filename(filename: &str, extension: &str) -> Result<Self, ValidationError> {
        let base = filename
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(filename)
            .trim();
        let unsupported = || ValidationError::UnsupportedExtension {
            filename: filename.to_string(),
            expected: extension.to_string(),
        };
        let (stem, ext) = base.rsplit_once('.').ok_or_else(unsupported)?;
        if !ext.eq_ignore_ascii_case(extension) {
            return Err(unsupported());
        }
        Self::new(stem)
    }

    /// The filename this package is served under: `{name}.{extension}`.
    pub fn display_filename(&self, extension: &str) -> String {
        format!("{}.{}", self.0, extension)
    }

    /// Access the name string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PackageName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for PackageName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

// ---------------------------------------------------------------------------
// VersionName
// ---------------------------------------------------------------------------

/// Label of a frozen version, e.g. `r1` or `2024.06-rc+1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct VersionName(String);

impl_validating_deserialize!(VersionName);

impl VersionName {
    /// Validate and wrap a version name. `latest` (any case) is rejected.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        if s.eq_ignore_ascii_case(LATEST_SELECTOR) {
            return Err(ValidationError::ReservedVersionName(s));
        }
        if !valid_identifier(&s, 64, &['.', '_', '-', '+']) {
            return Err(ValidationError::InvalidVersionName(s));
        }
        Ok(Self(s))
    }

    /// Access the name string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VersionName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for VersionName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

// ---------------------------------------------------------------------------
// VersionSelector
// ---------------------------------------------------------------------------

/// Which version a retrieval refers to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VersionSelector {
    /// Newest frozen version for bundles; newest push for single artifacts.
    Latest,
    /// A specific frozen version.
    Named(VersionName),
}

impl VersionSelector {
    /// Parse `latest` or a concrete version name.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        if s == LATEST_SELECTOR {
            Ok(Self::Latest)
        } else {
            VersionName::new(s).map(Self::Named)
        }
    }
}

impl std::str::FromStr for VersionSelector {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for VersionSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Latest => f.write_str(LATEST_SELECTOR),
            Self::Named(v) => write!(f, "{v}"),
        }
    }
}

impl From<VersionName> for VersionSelector {
    fn from(v: VersionName) -> Self {
        Self::Named(v)
    }
}
