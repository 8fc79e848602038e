//! # API Route Modules
//!
//! - `push`: package upload (multipart).
//! - `freeze`: snapshot the newest upload of every name into a version.
//! - `pull`: version bundles (`.tar.gz`) and single package files.
//! - `listing`: versions, package names and upload history.

pub mod freeze;
pub mod listing;
pub mod pull;
pub mod push;

use chrono::{DateTime, SecondsFormat, Utc};

/// RFC 3339 rendering used by every JSON timestamp the API returns.
pub(crate) fn timestamp(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}
