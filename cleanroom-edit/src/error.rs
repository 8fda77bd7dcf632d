//! Error types for cleanroom-edit.
//!
//! - Conflicts (exit code 2): the suggested edits cannot be applied safely.
//! - Runtime errors (exit code 1): I/O failures while reading or writing.

use camino::Utf8PathBuf;
use std::ops::Range;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EditError {
    /// Edits were rejected before any file was written.
    #[error("conflicting edits: {0}")]
    Conflict(#[from] ConflictError),

    #[error("runtime error: {0:#}")]
    Runtime(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConflictError {
    #[error("{file}: edit {second:?} overlaps edit {first:?}")]
    Overlap {
        file: Utf8PathBuf,
        first: Range<usize>,
        second: Range<usize>,
    },

    #[error("{file}: edit target is outside the module")]
    OutsideRoot { file: Utf8PathBuf },

    #[error("{file}: edit {range:?} is outside the file ({len} bytes)")]
    OutOfRange {
        file: Utf8PathBuf,
        range: Range<usize>,
        len: usize,
    },
}

impl EditError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, EditError::Conflict(_))
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            EditError::Conflict(_) => 2,
            EditError::Runtime(_) => 1,
        }
    }
}

pub type EditResult<T> = Result<T, EditError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_reports_exit_code_2() {
        let err = EditError::from(ConflictError::Overlap {
            file: "a.go".into(),
            first: 4..9,
            second: 6..7,
        });
        assert!(err.is_conflict());
        assert_eq!(err.exit_code(), 2);
        assert_eq!(
            err.to_string(),
            "conflicting edits: a.go: edit 6..7 overlaps edit 4..9"
        );
    }

    #[test]
    fn runtime_error_reports_exit_code_1() {
        let err = EditError::from(anyhow::anyhow!("disk full"));
        assert!(!err.is_conflict());
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("disk full"));
    }
}
