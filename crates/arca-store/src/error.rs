//! # Store Error Types

use std::path::PathBuf;

use thiserror::Error;

/// Errors from the content store and bundle assembler.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Disk or stream fault.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored or supplied bytes do not hash to the address they claim.
    #[error("integrity violation at {}: expected {expected}, found {actual}", path.display())]
    Integrity {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    /// Archive could not be built or read.
    #[error("archive error: {0}")]
    Archive(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_from_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err = StoreError::from(io_err);
        assert!(err.to_string().contains("file missing"));
    }

    #[test]
    fn integrity_display_names_both_digests() {
        let err = StoreError::Integrity {
            path: PathBuf::from("/repo/app/abc.apk"),
            expected: "abc".to_string(),
            actual: "def".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/repo/app/abc.apk"));
        assert!(msg.contains("abc"));
        assert!(msg.contains("def"));
    }
}
